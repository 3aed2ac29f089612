//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Typeahead parameters (`?q=`), used by order title and item name suggestions.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionParams {
    pub q: Option<String>,
}

/// Generic `?limit=` parameter for capped feeds.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
