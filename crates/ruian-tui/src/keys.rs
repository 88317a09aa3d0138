use crossterm::event::{KeyCode, KeyModifiers};

use crate::app::{App, Focus};

/// Route a key press to the focused input.
pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('c') | KeyCode::Char('q') => app.quit(),
            KeyCode::Char('s') => app.save(),
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Esc => {
            if app.focus == Focus::Address && app.address.is_list_visible() {
                app.address.clear_suggestions();
            } else {
                app.quit();
            }
        }
        _ if app.focus == Focus::Address => handle_address_key(app, code),
        KeyCode::Enter | KeyCode::Down => app.focus_next(),
        KeyCode::Up => app.focus_prev(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_back(),
        _ => {}
    }
}

fn handle_address_key(app: &mut App, code: KeyCode) {
    let list_open = app.address.is_list_visible();
    match code {
        KeyCode::Down if list_open => app.address.move_down(),
        KeyCode::Up if list_open => app.address.move_up(),
        KeyCode::Enter => {
            if !app.accept_suggestion() {
                app.focus_next();
            }
        }
        KeyCode::Down => app.focus_next(),
        KeyCode::Up => app.focus_prev(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_back(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSource;
    use ruian_core::config::AutocompleteConfig;
    use ruian_core::{AddressField, Suggestion};
    use std::sync::Arc;
    use std::time::Duration;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, code, KeyModifiers::NONE);
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn wait_for_lookup(app: &mut App) {
        tokio::time::sleep(Duration::from_millis(600)).await;
        app.drain_messages();
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.drain_messages();
    }

    #[test]
    fn test_ctrl_keys() {
        let mut app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        handle_key(&mut app, KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert!(app.saved && app.should_quit);

        let mut app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        handle_key(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
        assert!(!app.saved);
    }

    #[test]
    fn test_tab_moves_focus() {
        let mut app = App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default());
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Address);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Field(AddressField::Street));
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focus, Focus::Name);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_address_flow() {
        let source = StaticSource::with_answer("Mai", vec![
            Suggestion::street(8, "Maine Road"),
            Suggestion::street(7, "Main St"),
        ])
        .and_answer("Main St 12", vec![
            Suggestion::address("21003", "12", "Lhota", "53701"),
            Suggestion::address("21001", "12", "Brno", "60200"),
        ]);
        let mut app = App::new(Arc::new(source), &AutocompleteConfig::default());

        type_text(&mut app, "ACME");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Mai");
        wait_for_lookup(&mut app).await;
        assert_eq!(app.address.suggestions().len(), 2);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.address.street_id(), Some(7));
        assert_eq!(app.address.input(), "Main St ");

        type_text(&mut app, "12");
        wait_for_lookup(&mut app).await;
        assert_eq!(app.address.suggestions().len(), 2);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.address.input(), "Main St 12, Brno, 60200");
        let values = app.form.values();
        assert_eq!(values.street, "Main St 12");
        assert_eq!(values.city, "Brno");
        assert_eq!(values.zip, "60200");
        assert_eq!(values.ruian_code, "21001");

        handle_key(&mut app, KeyCode::Char('s'), KeyModifiers::CONTROL);
        let record = app.record().unwrap();
        assert_eq!(record.name, "ACME");
        assert_eq!(record.address.ruian_code, "21001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_esc_closes_list_before_quitting() {
        let source = StaticSource::with_answer("Mai", vec![Suggestion::street(7, "Main St")]);
        let mut app = App::new(Arc::new(source), &AutocompleteConfig::default());
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Mai");
        wait_for_lookup(&mut app).await;
        assert!(app.address.is_list_visible());

        press(&mut app, KeyCode::Esc);
        assert!(!app.address.is_list_visible());
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
