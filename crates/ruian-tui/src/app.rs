use std::sync::Arc;

use ruian_core::config::AutocompleteConfig;
use ruian_core::{AddressField, LookupContext, PartnerAddress, SuggestionSource};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::theme::NordTheme;
use crate::widget::{AddressAutocompleteField, AddressForm, FieldMessage, FieldSettings, FormHost};

/// Which input currently receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Name,
    Address,
    Field(AddressField),
}

impl Focus {
    pub const ORDER: [Focus; 6] = [
        Focus::Name,
        Focus::Address,
        Focus::Field(AddressField::Street),
        Focus::Field(AddressField::City),
        Focus::Field(AddressField::Zip),
        Focus::Field(AddressField::RuianCode),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Focus::Name => "Name",
            Focus::Address => "Address",
            Focus::Field(field) => field.label(),
        }
    }

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// What a saved form hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerRecord {
    pub name: String,
    #[serde(flatten)]
    pub address: PartnerAddress,
}

/// Main application state.
pub struct App {
    pub name: String,
    pub address: AddressAutocompleteField,
    pub form: AddressForm,
    pub focus: Focus,
    pub status_message: String,
    pub should_quit: bool,
    pub saved: bool,
    /// Animation counter, advanced on every idle tick.
    pub tick: usize,
    pub theme: NordTheme,
    messages: UnboundedReceiver<FieldMessage>,
}

impl App {
    pub fn new(source: Arc<dyn SuggestionSource>, config: &AutocompleteConfig) -> Self {
        let (tx, messages) = mpsc::unbounded_channel();
        let context = LookupContext {
            locale: config.locale.clone(),
            limit: None,
        };
        let address = AddressAutocompleteField::new(source, context, FieldSettings::from(config), tx);

        Self {
            name: String::new(),
            address,
            form: AddressForm::new(),
            focus: Focus::Name,
            status_message: "Tab: next field  Ctrl-S: save  Esc: quit".to_string(),
            should_quit: false,
            saved: false,
            tick: 0,
            theme: NordTheme::default(),
            messages,
        }
    }

    /// Start from an existing partner record.
    pub fn with_record(mut self, record: PartnerRecord) -> Self {
        self.name = record.name;
        self.form = AddressForm::with_values(record.address);
        self
    }

    /// Feed finished background work to the address field.
    pub fn drain_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.address.handle_message(message);
            handled += 1;
        }
        handled
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    // ─── Focus ─────────────────────────────────────────────

    pub fn set_focus(&mut self, focus: Focus) {
        if self.focus == focus {
            return;
        }
        if self.focus == Focus::Address {
            self.address.on_blur();
        }
        self.focus = focus;
        if focus == Focus::Address {
            self.address.on_focus();
        }
    }

    pub fn focus_next(&mut self) {
        self.set_focus(self.focus.next());
    }

    pub fn focus_prev(&mut self) {
        self.set_focus(self.focus.prev());
    }

    // ─── Editing ───────────────────────────────────────────

    pub fn insert_char(&mut self, c: char) {
        match self.focus {
            Focus::Name => self.name.push(c),
            Focus::Address => {
                let mut text = self.address.input().to_string();
                text.push(c);
                self.address.on_input(text);
            }
            Focus::Field(field) => {
                let mut value = self.form.value(field).to_string();
                value.push(c);
                self.form.set_value(field, value);
            }
        }
    }

    pub fn delete_back(&mut self) {
        match self.focus {
            Focus::Name => {
                self.name.pop();
            }
            Focus::Address => {
                let mut text = self.address.input().to_string();
                if text.pop().is_some() {
                    self.address.on_input(text);
                }
            }
            Focus::Field(field) => {
                let mut value = self.form.value(field).to_string();
                if value.pop().is_some() {
                    self.form.set_value(field, value);
                }
            }
        }
    }

    /// Pick the highlighted suggestion, if the list is open.
    pub fn accept_suggestion(&mut self) -> bool {
        let accepted = self.address.select_current(&mut self.form);
        if accepted {
            self.status_message = format!("Address: {}", self.address.input());
        }
        accepted
    }

    // ─── Lifecycle ─────────────────────────────────────────

    /// Finish with the form saved, unless a field is invalid.
    pub fn save(&mut self) {
        if let Some((field, message)) = self.form.errors().first() {
            self.status_message = format!("Cannot save, {}: {message}", field.label());
            return;
        }
        self.saved = true;
        self.should_quit = true;
        tracing::info!(name = %self.name, "partner form saved");
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Stop the address field's timer and lookups.
    pub fn shutdown(&mut self) {
        self.address.teardown();
    }

    /// The partner record, if the user saved.
    pub fn record(&self) -> Option<PartnerRecord> {
        self.saved.then(|| PartnerRecord {
            name: self.name.clone(),
            address: self.form.values().clone(),
        })
    }

    /// Text for the status bar. Lookup failures win over validation errors,
    /// which win over the last informational message.
    pub fn status_line(&self) -> (StatusKind, String) {
        if let Some(error) = self.address.error() {
            return (StatusKind::Error, error.to_string());
        }
        if let Some((field, message)) = self.form.errors().first() {
            return (StatusKind::Warning, format!("{}: {message}", field.label()));
        }
        (StatusKind::Info, self.status_message.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSource;
    use ruian_core::Suggestion;
    use std::time::Duration;

    fn app() -> App {
        App::new(Arc::new(StaticSource::default()), &AutocompleteConfig::default())
    }

    #[test]
    fn test_focus_cycles() {
        assert_eq!(Focus::Name.next(), Focus::Address);
        assert_eq!(Focus::Name.prev(), Focus::Field(AddressField::RuianCode));
        assert_eq!(Focus::Field(AddressField::RuianCode).next(), Focus::Name);
    }

    #[test]
    fn test_plain_fields_go_through_form_host() {
        let mut app = app();
        app.set_focus(Focus::Field(AddressField::Zip));
        for c in "602".chars() {
            app.insert_char(c);
        }
        assert_eq!(app.form.values().zip, "602");
        assert!(app.form.is_field_dirty(AddressField::Zip));
        assert_eq!(app.status_line().0, StatusKind::Warning);

        app.save();
        assert!(!app.saved);
        assert!(app.status_message.starts_with("Cannot save"));

        app.insert_char('0');
        app.insert_char('0');
        app.delete_back();
        app.insert_char('0');
        app.save();
        assert!(app.saved);
        assert_eq!(app.record().unwrap().address.zip, "60200");
    }

    #[test]
    fn test_record_only_after_save() {
        let mut app = app();
        app.name = "ACME s.r.o.".to_string();
        assert!(app.record().is_none());
        app.save();
        let record = app.record().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "ACME s.r.o.");
        assert_eq!(json["city"], "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_in_address_reaches_the_list() {
        let source = StaticSource::with_answer("Mai", vec![Suggestion::street(7, "Main St")]);
        let mut app = App::new(Arc::new(source), &AutocompleteConfig::default());
        app.set_focus(Focus::Address);
        for c in "Mai".chars() {
            app.insert_char(c);
        }

        tokio::time::sleep(Duration::from_millis(600)).await;
        app.drain_messages();
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.drain_messages();

        assert!(app.address.is_list_visible());
        assert!(app.accept_suggestion());
        assert_eq!(app.form.values().street, "Main St");
        assert_eq!(app.address.input(), "Main St ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_address_drops_pending_lookup() {
        let source = StaticSource::with_answer("Main", vec![Suggestion::street(7, "Main St")]);
        let mut app = App::new(Arc::new(source), &AutocompleteConfig::default());
        app.set_focus(Focus::Address);
        for c in "Main".chars() {
            app.insert_char(c);
        }
        app.set_focus(Focus::Field(AddressField::City));

        tokio::time::sleep(Duration::from_millis(600)).await;
        app.drain_messages();
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.drain_messages();

        assert_eq!(app.focus, Focus::Field(AddressField::City));
        assert!(!app.address.is_list_visible());
        assert!(app.address.suggestions().is_empty());
        assert!(!app.address.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_shows_in_status() {
        let source = StaticSource::failing();
        let mut app = App::new(Arc::new(source), &AutocompleteConfig::default());
        app.set_focus(Focus::Address);
        app.address.fetch_suggestions("Main");

        tokio::time::sleep(Duration::from_millis(1)).await;
        app.drain_messages();

        let (kind, text) = app.status_line();
        assert_eq!(kind, StatusKind::Error);
        assert!(text.starts_with("Address lookup failed"));
        assert!(!app.address.is_loading());
    }
}
