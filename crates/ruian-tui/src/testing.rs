use std::collections::HashMap;

use async_trait::async_trait;
use ruian_core::{Result, RuianError, SuggestRequest, Suggestion, SuggestionSource};

/// Answers lookups from a fixed table keyed by query text.
#[derive(Default)]
pub struct StaticSource {
    answers: HashMap<String, Vec<Suggestion>>,
    fail: bool,
}

impl StaticSource {
    pub fn with_answer(query: &str, suggestions: Vec<Suggestion>) -> Self {
        Self::default().and_answer(query, suggestions)
    }

    pub fn and_answer(mut self, query: &str, suggestions: Vec<Suggestion>) -> Self {
        self.answers.insert(query.to_string(), suggestions);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SuggestionSource for StaticSource {
    async fn suggest(&self, request: SuggestRequest) -> Result<Vec<Suggestion>> {
        if self.fail {
            return Err(RuianError::Task("registry unavailable".to_string()));
        }
        Ok(self.answers.get(&request.query).cloned().unwrap_or_default())
    }
}
