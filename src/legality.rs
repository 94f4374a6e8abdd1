//! Plate legality lookup
//!
//! A stand-in for a registration database: plates are legal when they appear
//! on a fixed allow-list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Regions a reading can be attributed to, as `(code, label)`
pub const REGIONS: &[(&str, &str)] = &[
    ("US-CA", "California, USA"),
    ("US-NY", "New York, USA"),
    ("US-TX", "Texas, USA"),
    ("CA-ON", "Ontario, Canada"),
    ("UK-ENG", "England, UK"),
    ("AU-NSW", "New South Wales, Australia"),
];

pub const LEGAL_MESSAGE: &str = "This license plate is registered and legal.";
pub const NOT_FOUND_MESSAGE: &str = "Warning: This license plate is not found in the database.";

/// Human-readable label for a region code
pub fn region_label(code: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalitySettings {
    pub allowed_plates: Vec<String>,
    pub default_region: String,
}

impl Default for LegalitySettings {
    fn default() -> Self {
        Self {
            allowed_plates: ["ABC123", "XYZ789", "DEF456", "GHI789", "JKL012"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_region: "US-CA".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalityVerdict {
    pub plate: String,
    pub is_legal: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone)]
pub struct LegalityChecker {
    allowed: HashSet<String>,
}

impl LegalityChecker {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed.into_iter().map(|p| normalize(p.as_ref())).collect(),
        }
    }

    pub fn from_settings(settings: &LegalitySettings) -> Self {
        Self::new(&settings.allowed_plates)
    }

    /// Look a plate up. Input is trimmed and uppercased first; `None` for blank input.
    pub fn check(&self, plate: &str) -> Option<LegalityVerdict> {
        let plate = normalize(plate);
        if plate.is_empty() {
            return None;
        }
        let is_legal = self.allowed.contains(&plate);
        Some(LegalityVerdict {
            plate,
            is_legal,
            message: if is_legal { LEGAL_MESSAGE } else { NOT_FOUND_MESSAGE },
        })
    }
}

impl Default for LegalityChecker {
    fn default() -> Self {
        Self::from_settings(&LegalitySettings::default())
    }
}

fn normalize(plate: &str) -> String {
    plate.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_listed_plate_is_legal() {
        let checker = LegalityChecker::default();
        let verdict = checker.check("ABC123").unwrap();
        assert!(verdict.is_legal);
        assert_eq!(verdict.message, LEGAL_MESSAGE);
    }

    #[test]
    fn test_manual_entry_is_normalized() {
        let checker = LegalityChecker::default();
        let verdict = checker.check("  xyz789 ").unwrap();
        assert_eq!(verdict.plate, "XYZ789");
        assert!(verdict.is_legal);
    }

    #[test]
    fn test_unknown_plate_is_illegal() {
        let checker = LegalityChecker::default();
        let verdict = checker.check("ZZZ999").unwrap();
        assert!(!verdict.is_legal);
        assert_eq!(verdict.message, NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_blank_input_is_not_checked() {
        assert!(LegalityChecker::default().check("   ").is_none());
    }

    #[test]
    fn test_region_labels() {
        assert_eq!(region_label("us-ny"), Some("New York, USA"));
        assert_eq!(region_label("XX-YY"), None);
    }
}
