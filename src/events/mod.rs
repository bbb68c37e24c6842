//! Raw event records as produced by the ingestion collaborator.
//!
//! The ingestion client (OpenAgenda pagination) lives outside this crate; it writes a
//! JSON array of [`EventRecord`] which is the input of the processing pipeline.

pub mod validation;

pub use validation::{validate_events, ValidationReport};

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::info;

/// A cultural event as extracted from the agenda API.
///
/// Every field is optional: records with missing data are filtered during processing
/// rather than rejected at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "deserialize_uid")]
    pub uid: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO-8601 start of the first timing.
    #[serde(default)]
    pub date_debut: Option<String>,
    /// ISO-8601 end of the last timing.
    #[serde(default)]
    pub date_fin: Option<String>,
    /// Venue name.
    #[serde(default)]
    pub lieu: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Free-form pricing text.
    #[serde(default)]
    pub tarifs: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl EventRecord {
    /// Title if present and non-blank.
    pub fn title(&self) -> Option<&str> {
        non_blank(&self.title)
    }

    /// Raw description if present and non-blank.
    pub fn description(&self) -> Option<&str> {
        non_blank(&self.description)
    }

    /// Category keywords, empty when absent.
    pub fn keywords(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or(&[])
    }
}

/// Return the inner string when it contains something other than whitespace.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Agenda identifiers come as numbers from the API but as strings from older exports.
fn deserialize_uid<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uid {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Uid>::deserialize(deserializer)?.map(|uid| match uid {
        Uid::Text(s) => s,
        Uid::Number(n) => n.to_string(),
    }))
}

/// Load raw events from a JSON file.
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let content = std::fs::read_to_string(path)?;
    let events: Vec<EventRecord> = serde_json::from_str(&content)?;
    info!("Loaded {} raw events from {:?}", events.len(), path);
    Ok(events)
}

/// Save raw events to a JSON file.
pub fn save_events(events: &[EventRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(events)?)?;
    Ok(())
}
