//! Item list sanitizer.
//!
//! Turns the loosely-typed rows a client submits into a validated list that
//! can be written straight to `order_items`. Names are trimmed, empty rows are
//! dropped, quantities and prices are parsed and rounded, and duplicate names
//! are rejected case-insensitively.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::status::ItemStatus;

/// Decimal places kept for quantities (`NUMERIC(10,3)`).
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places kept for prices (`NUMERIC(10,2)`).
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound for quantities and prices (`NUMERIC(10,_)` integer digits).
const MAX_QUANTITY_EXCLUSIVE: i64 = 10_000_000;
const MAX_PRICE_EXCLUSIVE: i64 = 100_000_000;

/// Plain non-negative decimal, as typed into a form field.
static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.?\d*|\.\d+)$").expect("valid regex"));

/// One row as submitted by a client. Every field is optional and loosely typed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawItem {
    #[serde(default)]
    pub name: Option<String>,
    /// A JSON number or a numeric string.
    #[serde(default)]
    pub quantity: Option<Value>,
    /// A JSON number, a numeric string, an empty string or null.
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawItem {
    pub fn new(name: &str, quantity: impl Into<Value>) -> Self {
        Self {
            name: Some(name.to_string()),
            quantity: Some(quantity.into()),
            price: None,
            status: None,
        }
    }

    pub fn with_price(mut self, price: impl Into<Value>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }
}

/// A validated item ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanItem {
    pub name: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    /// Explicit status sent by the client; `None` lets the previous status carry over.
    pub status: Option<ItemStatus>,
}

/// Options for [`sanitize_items`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizeOptions {
    /// Accept a list that is empty after dropping blank rows.
    pub allow_empty: bool,
}

/// Validate and normalize a submitted item list.
///
/// The same input always produces the same output or the same error. The first
/// problem found in input order is reported.
pub fn sanitize_items(items: &[RawItem], opts: SanitizeOptions) -> Result<Vec<CleanItem>, CoreError> {
    let mut cleaned = Vec::with_capacity(items.len());
    let mut seen_names: HashSet<String> = HashSet::new();

    for (index, raw) in items.iter().enumerate() {
        let name = raw.name.as_deref().unwrap_or("").trim().to_string();
        let quantity_raw = non_blank(raw.quantity.as_ref());

        if name.is_empty() && quantity_raw.is_none() {
            continue;
        }

        if name.is_empty() {
            return Err(CoreError::Validation(format!(
                "Item {} is missing a name",
                index + 1
            )));
        }

        let quantity = quantity_raw
            .and_then(parse_decimal)
            .map(|q| round(q, QUANTITY_SCALE))
            .filter(|q| *q > Decimal::ZERO && *q < Decimal::from(MAX_QUANTITY_EXCLUSIVE))
            .ok_or_else(|| CoreError::Validation(format!("Invalid quantity for \"{name}\"")))?;

        let price = match non_blank(raw.price.as_ref()) {
            None => None,
            Some(value) => Some(
                parse_decimal(value)
                    .map(|p| round(p, PRICE_SCALE))
                    .filter(|p| *p >= Decimal::ZERO && *p < Decimal::from(MAX_PRICE_EXCLUSIVE))
                    .ok_or_else(|| CoreError::Validation(format!("Invalid price for \"{name}\"")))?,
            ),
        };

        if !seen_names.insert(name.to_lowercase()) {
            return Err(CoreError::Validation(format!("Duplicate item \"{name}\"")));
        }

        let status = ItemStatus::parse_optional(raw.status.as_deref())
            .map_err(|_| CoreError::Validation(format!("Invalid status for \"{name}\"")))?;

        cleaned.push(CleanItem {
            name,
            quantity,
            price,
            status,
        });
    }

    if !opts.allow_empty && cleaned.is_empty() {
        return Err(CoreError::Validation(
            "Order must have at least one item".into(),
        ));
    }

    Ok(cleaned)
}

/// Treat `null` and whitespace-only strings as "not provided".
fn non_blank(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !NUMERIC_RE.is_match(s) {
                return None;
            }
            let s = if s.starts_with('.') { format!("0{s}") } else { s.to_string() };
            Decimal::from_str(s.trim_end_matches('.')).ok()
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64),
        },
        _ => None,
    }
}

/// Half-away-from-zero rounding, the way a form calculator rounds.
fn round(value: Decimal, scale: u32) -> Decimal {
    value
        .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sanitize(items: &[RawItem]) -> Result<Vec<CleanItem>, CoreError> {
        sanitize_items(items, SanitizeOptions::default())
    }

    fn validation_message(result: Result<Vec<CleanItem>, CoreError>) -> String {
        match result {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn trims_names_and_rounds_quantities() {
        let items = vec![
            RawItem::new("  Apples ", "2.00049"),
            RawItem::new("Pears", json!(1.5)),
            RawItem::new("Figs", json!(3)),
        ];
        let cleaned = sanitize(&items).unwrap();

        assert_eq!(cleaned.len(), 3);
        assert_eq!(cleaned[0].name, "Apples");
        assert_eq!(cleaned[0].quantity, dec("2"));
        assert_eq!(cleaned[1].quantity, dec("1.5"));
        assert_eq!(cleaned[2].quantity, dec("3"));
    }

    #[test]
    fn quantity_rounds_half_away_from_zero_to_three_places() {
        let cleaned = sanitize(&[RawItem::new("Salt", "0.0125")]).unwrap();
        assert_eq!(cleaned[0].quantity, dec("0.013"));
    }

    #[test]
    fn leading_dot_quantity_is_accepted() {
        let cleaned = sanitize(&[RawItem::new("Saffron", ".5")]).unwrap();
        assert_eq!(cleaned[0].quantity, dec("0.5"));
    }

    #[test]
    fn drops_completely_empty_rows() {
        let items = vec![
            RawItem::new("Milk", 1),
            RawItem {
                name: Some("   ".into()),
                quantity: Some(json!("")),
                ..Default::default()
            },
            RawItem::default(),
        ];
        let cleaned = sanitize(&items).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].name, "Milk");
    }

    #[test]
    fn row_with_quantity_but_no_name_is_rejected() {
        let items = vec![
            RawItem::new("Milk", 1),
            RawItem {
                quantity: Some(json!(4)),
                ..Default::default()
            },
        ];
        assert_eq!(validation_message(sanitize(&items)), "Item 2 is missing a name");
    }

    #[test]
    fn non_positive_or_garbage_quantity_is_rejected() {
        for bad in [json!(0), json!(-2), json!("abc"), json!("1e3"), json!("-1"), json!(true)] {
            let items = vec![RawItem::new("Bread", bad.clone())];
            assert_eq!(
                validation_message(sanitize(&items)),
                "Invalid quantity for \"Bread\"",
                "quantity {bad} should be rejected"
            );
        }
    }

    #[test]
    fn named_row_without_quantity_is_rejected() {
        let items = vec![RawItem {
            name: Some("Eggs".into()),
            ..Default::default()
        }];
        assert_eq!(validation_message(sanitize(&items)), "Invalid quantity for \"Eggs\"");
    }

    #[test]
    fn quantity_that_rounds_to_zero_is_rejected() {
        let items = vec![RawItem::new("Dust", "0.0001")];
        assert_eq!(validation_message(sanitize(&items)), "Invalid quantity for \"Dust\"");
    }

    #[test]
    fn price_is_optional_and_parsed() {
        let items = vec![
            RawItem::new("A", 1).with_price(""),
            RawItem::new("B", 1).with_price(json!(null)),
            RawItem::new("C", 1).with_price("12.345"),
            RawItem::new("D", 1).with_price(json!(7)),
        ];
        let cleaned = sanitize(&items).unwrap();
        assert_eq!(cleaned[0].price, None);
        assert_eq!(cleaned[1].price, None);
        assert_eq!(cleaned[2].price, Some(dec("12.35")));
        assert_eq!(cleaned[3].price, Some(dec("7")));
    }

    #[test]
    fn bad_price_is_rejected() {
        for bad in [json!("12,5"), json!("free"), json!(-3)] {
            let items = vec![RawItem::new("Tea", 1).with_price(bad)];
            assert_eq!(validation_message(sanitize(&items)), "Invalid price for \"Tea\"");
        }
    }

    #[test]
    fn duplicate_names_are_detected_case_insensitively_after_trim() {
        let items = vec![
            RawItem::new("Rice", 1),
            RawItem::new("Sugar", 1),
            RawItem::new(" rice ", 2),
            RawItem::new("SUGAR", 3),
        ];
        assert_eq!(validation_message(sanitize(&items)), "Duplicate item \"rice\"");
    }

    #[test]
    fn empty_list_is_rejected_unless_allowed() {
        assert_eq!(
            validation_message(sanitize(&[])),
            "Order must have at least one item"
        );
        let allowed = sanitize_items(&[RawItem::default()], SanitizeOptions { allow_empty: true });
        assert_eq!(allowed.unwrap(), vec![]);
    }

    #[test]
    fn explicit_status_is_carried_and_validated() {
        let cleaned = sanitize(&[
            RawItem::new("Oil", 1).with_status("collected"),
            RawItem::new("Vinegar", 1).with_status(""),
        ])
        .unwrap();
        assert_eq!(cleaned[0].status, Some(ItemStatus::Collected));
        assert_eq!(cleaned[1].status, None);

        let err = sanitize(&[RawItem::new("Oil", 1).with_status("lost")]);
        assert_matches!(err, Err(CoreError::Validation(msg)) if msg == "Invalid status for \"Oil\"");
    }

    #[test]
    fn same_input_gives_same_output() {
        let items = vec![RawItem::new("Nuts", "1.2345"), RawItem::new("Dates", 2)];
        assert_eq!(sanitize(&items).unwrap(), sanitize(&items).unwrap());
    }
}
