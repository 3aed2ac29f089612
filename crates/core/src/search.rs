//! Pagination and text-search helpers shared by the listing endpoints.

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default and maximum page size for order listings.
pub const ORDER_PAGE_SIZE: i64 = 20;

/// Maximum number of typeahead suggestions (order titles, item names).
pub const SUGGESTION_LIMIT: i64 = 6;

/// Maximum number of notifications returned to their owner.
pub const NOTIFICATION_LIMIT: i64 = 50;

/// Default and maximum number of rows for the admin activity views.
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
pub const MAX_ACTIVITY_LIMIT: i64 = 500;

/// Number of most recent history entries attached to an order when requested.
pub const RECENT_HISTORY_LIMIT: i64 = 5;

/// Clamp a user-provided limit to valid bounds. Zero and negative limits
/// fall back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.filter(|l| *l > 0).unwrap_or(default).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Text search
// ---------------------------------------------------------------------------

/// Trim a search term; blank input means "no search".
pub fn normalize_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Build a `%term%` pattern for `ILIKE`, escaping LIKE metacharacters.
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Build a `term%` pattern for prefix matching.
pub fn prefix_pattern(term: &str) -> String {
    format!("{}%", escape_like(term))
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
