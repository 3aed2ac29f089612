//! Order settings fixed at startup.

use crate::error::CoreError;

/// Cities an order may be routed to, unless overridden by `ORDER_CITIES`.
pub const DEFAULT_CITIES: &[&str] = &[
    "نابلس",
    "الخليل",
    "جنين",
    "طولكرم",
    "بديا",
    "قلقيليا",
    "رامالله",
    "بيت لحم",
    "الداخل",
];

/// Immutable order configuration shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    pub cities: Vec<String>,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl OrderSettings {
    /// Build from a comma-separated list. Blank entries are ignored; an empty
    /// list falls back to the defaults.
    pub fn from_list(list: &str) -> Self {
        let cities: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if cities.is_empty() {
            Self::default()
        } else {
            Self { cities }
        }
    }

    /// Reject a city that is not in the configured set.
    pub fn validate_city(&self, city: &str) -> Result<(), CoreError> {
        if self.cities.iter().any(|c| c == city) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!("Invalid city '{city}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_nine_cities() {
        let settings = OrderSettings::default();
        assert_eq!(settings.cities.len(), 9);
        assert!(settings.validate_city("جنين").is_ok());
    }

    #[test]
    fn list_overrides_defaults() {
        let settings = OrderSettings::from_list(" Haifa, Akka ,,");
        assert_eq!(settings.cities, vec!["Haifa", "Akka"]);
        assert!(settings.validate_city("Haifa").is_ok());
        assert!(settings.validate_city("جنين").is_err());
    }

    #[test]
    fn blank_list_falls_back_to_defaults() {
        assert_eq!(OrderSettings::from_list(" , "), OrderSettings::default());
    }
}
