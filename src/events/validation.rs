//! Sanity checks over a raw event export before it is processed.

use super::{non_blank, EventRecord};
use crate::processing::parse_event_date;
use serde::Serialize;

/// Share of events allowed outside the expected city (regional events).
pub const OUT_OF_CITY_TOLERANCE: f64 = 0.10;

/// Outcome of validating a raw export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    /// `(uid, field)` pairs for every required field that is missing.
    pub missing_fields: Vec<(String, &'static str)>,
    /// Events whose start date does not parse.
    pub invalid_dates: Vec<String>,
    /// Events located in another city.
    pub out_of_city: Vec<String>,
    pub expected_city: String,
}

impl ValidationReport {
    /// Whether the out-of-city share stays within tolerance.
    pub fn city_within_tolerance(&self) -> bool {
        self.out_of_city.len() as f64 <= self.total as f64 * OUT_OF_CITY_TOLERANCE
    }

    /// Whether every check passed.
    pub fn is_valid(&self) -> bool {
        self.total > 0
            && self.missing_fields.is_empty()
            && self.invalid_dates.is_empty()
            && self.city_within_tolerance()
    }
}

/// Validate raw events: required fields present, start dates parseable, and most
/// events located in `expected_city`.
pub fn validate_events(events: &[EventRecord], expected_city: &str) -> ValidationReport {
    let mut report = ValidationReport {
        total: events.len(),
        expected_city: expected_city.to_string(),
        ..Default::default()
    };

    for event in events {
        let uid = event.uid.clone().unwrap_or_else(|| "<no uid>".to_string());

        let required: [(&'static str, bool); 4] = [
            ("uid", event.uid.is_some()),
            ("title", event.title.is_some()),
            ("date_debut", event.date_debut.is_some()),
            ("ville", event.ville.is_some()),
        ];
        for (field, present) in required {
            if !present {
                report.missing_fields.push((uid.clone(), field));
            }
        }

        if let Some(date) = non_blank(&event.date_debut) {
            if parse_event_date(date).is_none() {
                report.invalid_dates.push(uid.clone());
            }
        }

        if let Some(city) = non_blank(&event.ville) {
            if !city.trim().eq_ignore_ascii_case(expected_city) {
                report.out_of_city.push(uid);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(uid: &str, city: &str, date: &str) -> EventRecord {
        EventRecord {
            uid: Some(uid.to_string()),
            title: Some(format!("Event {}", uid)),
            date_debut: Some(date.to_string()),
            ville: Some(city.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_export() {
        let events: Vec<EventRecord> = (0..10)
            .map(|i| event(&i.to_string(), "Lille", "2026-03-14T19:00:00Z"))
            .collect();

        let report = validate_events(&events, "Lille");
        assert!(report.is_valid());
    }

    #[test]
    fn test_empty_export_is_invalid() {
        assert!(!validate_events(&[], "Lille").is_valid());
    }

    #[test]
    fn test_out_of_city_tolerance() {
        let mut events: Vec<EventRecord> = (0..9)
            .map(|i| event(&i.to_string(), "lille", "2026-03-14"))
            .collect();
        events.push(event("9", "Roubaix", "2026-03-14"));

        let report = validate_events(&events, "Lille");
        assert_eq!(report.out_of_city, vec!["9".to_string()]);
        assert!(report.city_within_tolerance());

        events.push(event("10", "Tourcoing", "2026-03-14"));
        let report = validate_events(&events, "Lille");
        assert!(!report.city_within_tolerance());
    }

    #[test]
    fn test_missing_fields_and_bad_dates() {
        let mut broken = event("7", "Lille", "le 14 mars");
        broken.title = None;

        let report = validate_events(&[broken], "Lille");
        assert_eq!(report.missing_fields, vec![("7".to_string(), "title")]);
        assert_eq!(report.invalid_dates, vec!["7".to_string()]);
        assert!(!report.is_valid());
    }
}
