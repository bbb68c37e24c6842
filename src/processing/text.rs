//! Text normalization and event text composition.

use crate::events::{non_blank, EventRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Rendered in place of a missing date. Lines carrying it are left out of the text.
pub const DATE_UNSPECIFIED: &str = "Date non précisée";

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link pattern"));

static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\w\s.,;:!?'"«»\-()àâäéèêëîïôùûüçœæ]"#).expect("valid allow-list pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Clean a raw text field: keep link labels, drop emojis and other symbols, collapse
/// whitespace.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let text = MARKDOWN_LINK.replace_all(raw, "$1");
    let text = DISALLOWED_CHARS.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}

/// Parse the date formats found in agenda exports: RFC 3339 (with `Z` or an offset),
/// naive date-times and bare dates. Offsets are kept as local wall-clock time.
pub fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format an ISO date as `DD/MM/YYYY à HHhMM`. Missing dates give [`DATE_UNSPECIFIED`];
/// unparseable ones are returned unchanged.
pub fn format_date(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DATE_UNSPECIFIED.to_string(),
        Some(raw) => match parse_event_date(raw) {
            Some(dt) => dt.format("%d/%m/%Y à %Hh%M").to_string(),
            None => raw.to_string(),
        },
    }
}

/// Build the labeled multi-line text that gets embedded for an event.
pub fn compose_event_text(event: &EventRecord) -> String {
    let mut parts = Vec::new();

    if let Some(title) = event.title() {
        parts.push(format!("Événement : {}", title));
    }

    if let Some(description) = event.description() {
        let description = normalize(description);
        if !description.is_empty() {
            parts.push(format!("Description : {}", description));
        }
    }

    let start = format_date(event.date_debut.as_deref());
    if start != DATE_UNSPECIFIED {
        parts.push(format!("Date de début : {}", start));
    }
    let end = format_date(event.date_fin.as_deref());
    if end != DATE_UNSPECIFIED {
        parts.push(format!("Date de fin : {}", end));
    }

    if let Some(venue) = non_blank(&event.lieu) {
        parts.push(format!("Lieu : {}", venue));
    }
    if let Some(address) = non_blank(&event.adresse) {
        parts.push(format!("Adresse : {}", address));
    }
    if let Some(city) = non_blank(&event.ville) {
        parts.push(format!("Ville : {}", city));
    }

    if let Some(price) = non_blank(&event.tarifs) {
        let price = normalize(price);
        if !price.is_empty() {
            parts.push(format!("Tarifs : {}", price));
        }
    }

    if !event.keywords().is_empty() {
        parts.push(format!("Catégories : {}", event.keywords().join(", ")));
    }

    if let Some(url) = non_blank(&event.url) {
        parts.push(format!("Plus d'infos : {}", url));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_link_label() {
        assert_eq!(
            normalize("Réservez [ici](https://billetterie.example/abc) vite"),
            "Réservez ici vite"
        );
    }

    #[test]
    fn test_normalize_strips_symbols_and_whitespace() {
        assert_eq!(
            normalize("  Concert 🎸 en plein air !\n\n\tEntrée « libre »  "),
            "Concert en plein air ! Entrée « libre »"
        );
    }

    #[test]
    fn test_normalize_keeps_accents_and_punctuation() {
        let text = "Fête de l'été : théâtre, cœur (1ère partie) - ça va?";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date(Some("2026-03-14T19:30:00Z")), "14/03/2026 à 19h30");
        assert_eq!(format_date(Some("2026-03-14T19:30:00+01:00")), "14/03/2026 à 19h30");
        assert_eq!(format_date(Some("2026-03-14T19:30:00.000+0100")), "14/03/2026 à 19h30");
        assert_eq!(format_date(Some("2026-03-14T08:05:00")), "14/03/2026 à 08h05");
        assert_eq!(format_date(Some("2026-03-14")), "14/03/2026 à 00h00");
    }

    #[test]
    fn test_format_date_fallbacks() {
        assert_eq!(format_date(None), DATE_UNSPECIFIED);
        assert_eq!(format_date(Some("")), DATE_UNSPECIFIED);
        assert_eq!(format_date(Some("samedi soir")), "samedi soir");
    }

    #[test]
    fn test_compose_emits_only_present_fields() {
        let event = EventRecord {
            title: Some("Jazz au parc".to_string()),
            description: Some("Un [concert](http://x.y) en plein air 🎺".to_string()),
            date_debut: Some("2026-06-20T18:00:00Z".to_string()),
            lieu: Some("Parc de la Citadelle".to_string()),
            ville: Some("Lille".to_string()),
            keywords: Some(vec!["musique".to_string(), "jazz".to_string()]),
            url: Some("https://openagenda.com/e/jazz".to_string()),
            ..Default::default()
        };

        assert_eq!(
            compose_event_text(&event),
            "Événement : Jazz au parc\n\
             Description : Un concert en plein air\n\
             Date de début : 20/06/2026 à 18h00\n\
             Lieu : Parc de la Citadelle\n\
             Ville : Lille\n\
             Catégories : musique, jazz\n\
             Plus d'infos : https://openagenda.com/e/jazz"
        );
    }

    #[test]
    fn test_compose_keeps_unparseable_date() {
        let event = EventRecord {
            title: Some("Brocante".to_string()),
            date_debut: Some("tout le week-end".to_string()),
            ..Default::default()
        };
        assert!(compose_event_text(&event).contains("Date de début : tout le week-end"));
    }
}
