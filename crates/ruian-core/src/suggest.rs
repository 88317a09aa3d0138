//! The suggestion lookup behind the address field.
//!
//! [`SuggestService`] answers a [`SuggestRequest`] against the local registry.
//! The widget never calls it directly: it goes through [`SuggestionSource`],
//! an async seam that can be backed by the local database or a remote host.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AutocompleteConfig;
use crate::error::{Result, RuianError};
use crate::models::{Stage, SuggestRequest, Suggestion};
use crate::storage::database::Database;

pub struct SuggestService<'a> {
    db: &'a Database,
    street_limit: usize,
    number_limit: usize,
}

impl<'a> SuggestService<'a> {
    pub fn new(db: &'a Database, config: &AutocompleteConfig) -> Self {
        Self {
            db,
            street_limit: config.street_limit,
            number_limit: config.number_limit,
        }
    }

    pub fn suggest(&self, request: &SuggestRequest) -> Result<Vec<Suggestion>> {
        let query = request.query.trim();
        let suggestions: Vec<Suggestion> = match request.stage {
            Stage::Street => {
                if query.is_empty() {
                    return Ok(Vec::new());
                }
                let limit = request.context.limit.unwrap_or(self.street_limit);
                self.db
                    .search_streets(query, limit)?
                    .into_iter()
                    .map(|street| Suggestion::street(street.id, street.name))
                    .collect()
            }
            Stage::NumberTown => {
                let Some(street_id) = request.street_id else {
                    return Ok(Vec::new());
                };
                let street = self.db.get_street(street_id)?;
                let terms = number_terms(query, &street.name);
                let limit = request.context.limit.unwrap_or(self.number_limit);

                self.db
                    .numbers_in_street(street.id, &terms, limit)?
                    .into_iter()
                    .map(|(number, town)| {
                        let (city, zip) = town
                            .map(|t| (t.name, t.postal_code))
                            .unwrap_or_default();
                        Suggestion::address(number.code.to_string(), number.name, city, zip)
                    })
                    .collect()
            }
        };

        tracing::debug!(
            stage = %request.stage,
            locale = %request.context.locale,
            query,
            count = suggestions.len(),
            "suggestions resolved"
        );
        Ok(suggestions)
    }
}

/// Split what the user typed after the street name into search terms.
///
/// The field keeps the chosen street at the front of its text, so a leading
/// occurrence of the street name is dropped before splitting on whitespace
/// and commas.
pub fn number_terms(query: &str, street_name: &str) -> Vec<String> {
    let query = query.trim_start();
    let rest = strip_street_prefix(query, street_name).unwrap_or(query);

    rest.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove a leading street name, ignoring case.
///
/// The name only counts when it ends on a word boundary: end of text,
/// whitespace or a comma. "Main Street" does not start with "Main St".
pub fn strip_street_prefix<'q>(text: &'q str, street_name: &str) -> Option<&'q str> {
    if street_name.is_empty() {
        return None;
    }
    let mut text_chars = text.char_indices();
    for p in street_name.chars() {
        let (_, t) = text_chars.next()?;
        if !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    match text_chars.next() {
        Some((idx, c)) if c.is_whitespace() || c == ',' => Some(&text[idx..]),
        Some(_) => None,
        None => Some(""),
    }
}

/// The opaque lookup the address widget calls.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, request: SuggestRequest) -> Result<Vec<Suggestion>>;
}

/// Runs [`SuggestService`] on the blocking pool over a shared database.
#[derive(Clone)]
pub struct LocalSuggestionSource {
    db: Arc<Database>,
    config: AutocompleteConfig,
}

impl LocalSuggestionSource {
    pub fn new(db: Arc<Database>, config: AutocompleteConfig) -> Self {
        Self { db, config }
    }
}

#[async_trait]
impl SuggestionSource for LocalSuggestionSource {
    async fn suggest(&self, request: SuggestRequest) -> Result<Vec<Suggestion>> {
        let db = Arc::clone(&self.db);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || SuggestService::new(&db, &config).suggest(&request))
            .await
            .map_err(|e| RuianError::Task(e.to_string()))?
    }
}
