use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem};
use ruian_core::Stage;

use super::highlight::Segment;
use crate::theme::NordTheme;

/// Everything the renderer needs from the address field, borrowed from its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView<'a> {
    pub input: &'a str,
    pub stage: Stage,
    pub loading: bool,
    pub list_visible: bool,
    pub items: Vec<SuggestionItem<'a>>,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionItem<'a> {
    pub segments: Vec<Segment<'a>>,
    pub selected: bool,
    pub is_street: bool,
}

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
const MAX_VISIBLE: usize = 8;

/// Spinner glyph for the given animation tick, or blank when idle.
pub fn spinner(loading: bool, tick: usize) -> &'static str {
    if loading { SPINNER[tick % SPINNER.len()] } else { " " }
}

/// Spans for the input line: text, cursor, spinner and stage hint.
pub fn input_spans<'a>(
    view: &FieldView<'a>,
    focused: bool,
    tick: usize,
    theme: &NordTheme,
) -> Vec<Span<'a>> {
    let mut spans = vec![Span::styled(view.input, Style::default().fg(theme.fg()))];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(theme.frost_ice())));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        spinner(view.loading, tick),
        Style::default().fg(theme.yellow()),
    ));
    let hint = match view.stage {
        Stage::Street => " street",
        Stage::NumberTown => " number / town",
    };
    spans.push(Span::styled(
        hint,
        Style::default().fg(theme.muted()).add_modifier(Modifier::DIM),
    ));
    spans
}

/// Draw the dropdown below `anchor`, clipped to `bounds`.
pub fn render_suggestions(
    frame: &mut Frame,
    view: &FieldView<'_>,
    anchor: Rect,
    bounds: Rect,
    theme: &NordTheme,
) {
    if !view.list_visible || view.items.is_empty() {
        return;
    }

    let y = anchor.y + 1;
    let available = bounds.bottom().saturating_sub(y);
    let height = (view.items.len().min(MAX_VISIBLE) as u16 + 2).min(available);
    if height < 3 {
        return;
    }
    let area = Rect {
        x: anchor.x,
        y,
        width: anchor.width.min(bounds.right().saturating_sub(anchor.x)),
        height,
    };
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = view
        .items
        .iter()
        .map(|item| {
            let base = if item.selected {
                Style::default()
                    .bg(theme.green())
                    .fg(theme.bg())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.fg())
            };
            let marker = if item.is_street { " ▸ " } else { " # " };
            let mut spans = vec![Span::styled(marker, base)];
            spans.extend(item.segments.iter().map(|segment| {
                let style = if segment.emphasized {
                    base.add_modifier(Modifier::UNDERLINED).fg(if item.selected {
                        theme.bg()
                    } else {
                        theme.frost_ice()
                    })
                } else {
                    base
                };
                Span::styled(segment.text, style)
            }));
            ListItem::new(Line::from(spans)).style(base)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.green()))
        .style(Style::default().bg(theme.bg_secondary()));
    frame.render_widget(List::new(items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_is_blank_when_idle() {
        assert_eq!(spinner(false, 3), " ");
        assert_ne!(spinner(true, 0), spinner(true, 1));
        assert_eq!(spinner(true, 0), spinner(true, 4));
    }

    #[test]
    fn test_input_spans_show_stage() {
        let view = FieldView {
            input: "Main St ",
            stage: Stage::NumberTown,
            loading: false,
            list_visible: false,
            items: Vec::new(),
            error: None,
        };
        let text: String = input_spans(&view, true, 0, &NordTheme::default())
            .iter()
            .map(|s| s.content.to_string())
            .collect();
        assert!(text.starts_with("Main St █"));
        assert!(text.ends_with("number / town"));
    }
}
