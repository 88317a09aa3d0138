use std::sync::Arc;
use std::time::Duration;

use ruian_core::config::AutocompleteConfig;
use ruian_core::{
    AddressField, LookupContext, Stage, SuggestRequest, Suggestion, SuggestionSource,
    strip_street_prefix,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::debounce::Debouncer;
use super::form::FormHost;
use super::highlight::highlight_segments;
use super::view::{FieldView, SuggestionItem};

/// Messages the field's background tasks post back to the owning event loop.
#[derive(Debug)]
pub enum FieldMessage {
    /// The debounce window closed without newer input.
    DebounceElapsed { generation: u64, text: String },
    /// A lookup finished, failed or was aborted.
    FetchCompleted(FetchOutcome),
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub seq: u64,
    pub result: Result<Vec<Suggestion>, String>,
}

/// Tuning knobs for [`AddressAutocompleteField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSettings {
    pub debounce: Duration,
    /// Inputs with fewer characters never trigger a lookup.
    pub min_query_chars: usize,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_query_chars: 3,
        }
    }
}

impl From<&AutocompleteConfig> for FieldSettings {
    fn from(config: &AutocompleteConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_chars: config.min_query_chars,
        }
    }
}

/// Reports the outcome of a fetch even when its task is aborted mid-lookup.
struct FetchGuard {
    seq: u64,
    tx: Option<UnboundedSender<FieldMessage>>,
}

impl FetchGuard {
    fn finish(mut self, result: Result<Vec<Suggestion>, String>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(FieldMessage::FetchCompleted(FetchOutcome {
                seq: self.seq,
                result,
            }));
        }
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(FieldMessage::FetchCompleted(FetchOutcome {
                seq: self.seq,
                result: Err("lookup aborted".to_string()),
            }));
        }
    }
}

/// Two-stage RUIAN address lookup bound to a text input.
///
/// The first stage suggests streets. Picking one remembers its id and moves
/// the lookup to house numbers and towns within that street. Picking an
/// address fills the host form's street, city, zip and RUIAN code fields.
///
/// Background work (the debounce timer and lookups) reports back through the
/// channel given to [`new`](Self::new); the owner feeds those messages to
/// [`handle_message`](Self::handle_message).
pub struct AddressAutocompleteField {
    input: String,
    street_id: Option<i64>,
    street_name: Option<String>,
    suggestions: Vec<Suggestion>,
    list_visible: bool,
    selected: Option<usize>,
    loading: bool,
    error: Option<String>,
    latest_seq: u64,
    debouncer: Debouncer,
    in_flight: Option<JoinHandle<()>>,
    settings: FieldSettings,
    source: Arc<dyn SuggestionSource>,
    context: LookupContext,
    tx: UnboundedSender<FieldMessage>,
}

impl AddressAutocompleteField {
    pub fn new(
        source: Arc<dyn SuggestionSource>,
        context: LookupContext,
        settings: FieldSettings,
        tx: UnboundedSender<FieldMessage>,
    ) -> Self {
        Self {
            input: String::new(),
            street_id: None,
            street_name: None,
            suggestions: Vec::new(),
            list_visible: false,
            selected: None,
            loading: false,
            error: None,
            latest_seq: 0,
            debouncer: Debouncer::new(settings.debounce),
            in_flight: None,
            settings,
            source,
            context,
            tx,
        }
    }

    // ─── State accessors ───────────────────────────────────

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn street_id(&self) -> Option<i64> {
        self.street_id
    }

    pub fn stage(&self) -> Stage {
        Stage::for_street(self.street_id)
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn is_list_visible(&self) -> bool {
        self.list_visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// One-line notice left by the last failed lookup.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Sequence number of the most recently issued lookup.
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn is_debounce_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn long_enough(&self, text: &str) -> bool {
        text.chars().count() >= self.settings.min_query_chars
    }

    // ─── Input events ──────────────────────────────────────

    /// The user changed the text.
    pub fn on_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.error = None;

        if let Some(name) = &self.street_name
            && strip_street_prefix(&self.input, name).is_none()
        {
            tracing::debug!(street = %name, "input left the chosen street");
            self.street_id = None;
            self.street_name = None;
        }

        if !self.long_enough(&self.input) {
            self.debouncer.cancel();
            self.clear_suggestions();
            return;
        }

        let tx = self.tx.clone();
        let text = self.input.clone();
        self.debouncer.schedule(move |generation| async move {
            let _ = tx.send(FieldMessage::DebounceElapsed { generation, text });
        });
    }

    /// The field gained focus. Long enough input is looked up right away.
    pub fn on_focus(&mut self) {
        if self.long_enough(&self.input) {
            self.debouncer.cancel();
            self.fetch_suggestions(self.input.clone());
        }
    }

    /// The field lost focus. Pending and in-flight lookups are dropped so
    /// nothing reopens the list behind another field.
    pub fn on_blur(&mut self) {
        self.invalidate_pending();
        self.clear_suggestions();
    }

    /// Issue a lookup for `query` in the current stage.
    pub fn fetch_suggestions(&mut self, query: impl Into<String>) {
        self.latest_seq += 1;
        self.loading = true;
        self.error = None;

        let seq = self.latest_seq;
        let request = SuggestRequest::new(query, self.street_id, self.context.clone());
        tracing::debug!(seq, stage = %request.stage, query = %request.query, "fetching suggestions");

        let source = Arc::clone(&self.source);
        let guard = FetchGuard {
            seq,
            tx: Some(self.tx.clone()),
        };
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.suggest(request).await.map_err(|e| e.to_string());
            guard.finish(result);
        }));
    }

    /// Apply a message posted by one of the field's background tasks.
    pub fn handle_message(&mut self, message: FieldMessage) {
        match message {
            FieldMessage::DebounceElapsed { generation, text } => {
                if self.debouncer.fire(generation) {
                    self.fetch_suggestions(text);
                }
            }
            FieldMessage::FetchCompleted(outcome) => self.apply_outcome(outcome),
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if outcome.seq != self.latest_seq {
            tracing::debug!(
                seq = outcome.seq,
                latest = self.latest_seq,
                "dropping stale suggestions"
            );
            return;
        }

        self.loading = false;
        self.in_flight = None;
        match outcome.result {
            Ok(suggestions) => self.render_suggestions(suggestions),
            Err(message) => {
                tracing::warn!(seq = outcome.seq, error = %message, "suggestion lookup failed");
                self.clear_suggestions();
                self.error = Some(format!("Address lookup failed: {message}"));
            }
        }
    }

    fn render_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestions = suggestions;
        self.list_visible = !self.suggestions.is_empty();
        self.selected = self.list_visible.then_some(0);
    }

    pub fn clear_suggestions(&mut self) {
        self.suggestions.clear();
        self.list_visible = false;
        self.selected = None;
    }

    /// Forget pending and in-flight work. Late outcomes no longer match.
    fn invalidate_pending(&mut self) {
        self.debouncer.cancel();
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.latest_seq += 1;
        self.loading = false;
    }

    // ─── Selection ─────────────────────────────────────────

    pub fn move_down(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = Some(match self.selected {
                Some(i) => (i + 1) % self.suggestions.len(),
                None => 0,
            });
        }
    }

    pub fn move_up(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = Some(match self.selected {
                Some(0) | None => self.suggestions.len() - 1,
                Some(i) => i - 1,
            });
        }
    }

    /// Select the highlighted suggestion. False when nothing is highlighted.
    pub fn select_current(&mut self, form: &mut impl FormHost) -> bool {
        let Some(suggestion) = self
            .selected
            .filter(|_| self.list_visible)
            .and_then(|i| self.suggestions.get(i))
            .cloned()
        else {
            return false;
        };
        self.select_suggestion(&suggestion, form);
        true
    }

    pub fn select_suggestion(&mut self, suggestion: &Suggestion, form: &mut impl FormHost) {
        self.invalidate_pending();

        match suggestion {
            Suggestion::Street { payload, .. } => {
                self.street_id = Some(payload.id);
                self.street_name = Some(payload.name.clone());
                form.set_value(AddressField::Street, payload.name.clone());
                form.set_value(AddressField::City, String::new());
                form.set_value(AddressField::Zip, String::new());
                form.set_value(AddressField::RuianCode, String::new());
                self.input = format!("{} ", payload.name);
            }
            Suggestion::Address { payload, .. } => {
                let street = self
                    .input
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                form.set_value(AddressField::Street, street.clone());
                form.set_value(AddressField::City, payload.city.clone());
                form.set_value(AddressField::Zip, payload.zip.clone());
                form.set_value(AddressField::RuianCode, payload.id.clone());
                self.input = format!("{street}, {}, {}", payload.city, payload.zip);
            }
        }
        tracing::debug!(input = %self.input, stage = %self.stage(), "suggestion selected");

        self.clear_suggestions();
    }

    // ─── View ──────────────────────────────────────────────

    /// Project the current state into what the renderer draws.
    pub fn view(&self) -> FieldView<'_> {
        let items = if self.list_visible {
            self.suggestions
                .iter()
                .enumerate()
                .map(|(i, suggestion)| SuggestionItem {
                    segments: highlight_segments(suggestion.display(), &self.input),
                    selected: self.selected == Some(i),
                    is_street: matches!(suggestion, Suggestion::Street { .. }),
                })
                .collect()
        } else {
            Vec::new()
        };

        FieldView {
            input: &self.input,
            stage: self.stage(),
            loading: self.loading,
            list_visible: self.list_visible,
            items,
            error: self.error.as_deref(),
        }
    }

    /// Cancel the debounce timer and any lookup still running.
    pub fn teardown(&mut self) {
        self.invalidate_pending();
    }
}

impl Drop for AddressAutocompleteField {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
