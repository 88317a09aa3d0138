use ratatui::style::Color;

/// Nord palette with the semantic names the form uses.
pub struct NordTheme {
    // Polar Night
    pub nord0: Color, // #2E3440 background, status bar
    pub nord1: Color, // #3B4252 secondary background, dropdown
    pub nord2: Color, // #434C5E borders
    pub nord3: Color, // #616E88 muted text, hints

    // Snow Storm
    pub nord4: Color, // #D8DEE9 body text
    pub nord5: Color, // #E5E9F0 headings

    // Frost
    pub nord8: Color,  // #88C0D0 focused field
    pub nord9: Color,  // #81A1C1 labels
    pub nord10: Color, // #5E81AC mode badge

    // Aurora
    pub nord11: Color, // #BF616A errors
    pub nord12: Color, // #D08770 warnings, dirty marker
    pub nord13: Color, // #EBCB8B spinner
    pub nord14: Color, // #A3BE8C suggestion list, saved
}

impl Default for NordTheme {
    fn default() -> Self {
        Self {
            nord0: Color::Rgb(46, 52, 64),
            nord1: Color::Rgb(59, 66, 82),
            nord2: Color::Rgb(67, 76, 94),
            nord3: Color::Rgb(97, 110, 136),
            nord4: Color::Rgb(216, 222, 233),
            nord5: Color::Rgb(229, 233, 240),
            nord8: Color::Rgb(136, 192, 208),
            nord9: Color::Rgb(129, 161, 193),
            nord10: Color::Rgb(94, 129, 172),
            nord11: Color::Rgb(191, 97, 106),
            nord12: Color::Rgb(208, 135, 112),
            nord13: Color::Rgb(235, 203, 139),
            nord14: Color::Rgb(163, 190, 140),
        }
    }
}

impl NordTheme {
    pub fn bg(&self) -> Color {
        self.nord0
    }
    pub fn bg_secondary(&self) -> Color {
        self.nord1
    }
    pub fn border(&self) -> Color {
        self.nord2
    }
    pub fn muted(&self) -> Color {
        self.nord3
    }

    pub fn fg(&self) -> Color {
        self.nord4
    }
    pub fn fg_bright(&self) -> Color {
        self.nord5
    }

    pub fn frost_ice(&self) -> Color {
        self.nord8
    }
    pub fn frost_blue(&self) -> Color {
        self.nord9
    }
    pub fn frost_dark(&self) -> Color {
        self.nord10
    }

    pub fn red(&self) -> Color {
        self.nord11
    }
    pub fn orange(&self) -> Color {
        self.nord12
    }
    pub fn yellow(&self) -> Color {
        self.nord13
    }
    pub fn green(&self) -> Color {
        self.nord14
    }

    // Logic aliases
    pub fn active_field(&self) -> Color {
        self.frost_ice()
    }
    pub fn inactive_field(&self) -> Color {
        self.frost_blue()
    }
    pub fn danger(&self) -> Color {
        self.red()
    }
    pub fn warning(&self) -> Color {
        self.orange()
    }
    pub fn success(&self) -> Color {
        self.green()
    }
}
