//! Turning raw events into a chunked, retrievable corpus.
//!
//! Events without a title or with a too-short description are dropped here. Dropping
//! is not an error: the counts are logged and reported back to the caller.

mod text;

pub use text::{compose_event_text, format_date, normalize, parse_event_date, DATE_UNSPECIFIED};

use crate::chunking::{chunk_text, Chunk, ChunkMetadata, ChunkingConfig};
use crate::config::Settings;
use crate::error::Result;
use crate::events::EventRecord;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Counts gathered while processing a batch of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessReport {
    pub total_events: usize,
    pub kept_events: usize,
    pub rejected_events: usize,
    /// Kept events whose text had to be split into several chunks.
    pub split_events: usize,
    pub chunks: usize,
}

/// Filters, composes and chunks events.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    chunking: ChunkingConfig,
    min_description_chars: usize,
    default_city: String,
}

impl EventProcessor {
    /// Create a processor with the given chunking limits.
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self {
            chunking,
            min_description_chars: 20,
            default_city: "Lille".to_string(),
        }
    }

    /// Build a processor from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let chunking =
            ChunkingConfig::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
        Ok(Self::new(chunking)
            .with_min_description_chars(settings.chunking.min_description_chars)
            .with_default_city(&settings.events.city))
    }

    /// Set the minimum cleaned description length.
    pub fn with_min_description_chars(mut self, min: usize) -> Self {
        self.min_description_chars = min;
        self
    }

    /// Set the city recorded for events that do not name one.
    pub fn with_default_city(mut self, city: &str) -> Self {
        self.default_city = city.to_string();
        self
    }

    /// Whether an event carries enough information to be indexed.
    pub fn is_usable(&self, event: &EventRecord) -> bool {
        if event.title().is_none() {
            return false;
        }
        match event.description() {
            Some(description) => {
                normalize(description).chars().count() >= self.min_description_chars
            }
            None => false,
        }
    }

    /// Keep usable events, returning them with the number rejected.
    pub fn filter<'a>(&self, events: &'a [EventRecord]) -> (Vec<&'a EventRecord>, usize) {
        let kept: Vec<&EventRecord> = events.iter().filter(|e| self.is_usable(e)).collect();
        let rejected = events.len() - kept.len();

        info!(
            "{} events removed (insufficient data), {} kept",
            rejected,
            kept.len()
        );
        (kept, rejected)
    }

    /// Chunks of a single event.
    pub fn chunk_event(&self, event: &EventRecord) -> Vec<Chunk> {
        let text = compose_event_text(event);
        if text.is_empty() {
            return Vec::new();
        }
        let metadata = ChunkMetadata::for_event(event, &self.default_city);
        chunk_text(&text, &metadata, &self.chunking)
    }

    /// Filter, compose and chunk every event, preserving input order.
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn process(&self, events: &[EventRecord]) -> (Vec<Chunk>, ProcessReport) {
        let (kept, rejected) = self.filter(events);

        let mut report = ProcessReport {
            total_events: events.len(),
            kept_events: kept.len(),
            rejected_events: rejected,
            ..Default::default()
        };

        let mut chunks = Vec::new();
        for event in kept {
            let event_chunks = self.chunk_event(event);
            if event_chunks.len() > 1 {
                report.split_events += 1;
                debug!(
                    "Event '{}' split into {} chunks",
                    event.title().unwrap_or_default(),
                    event_chunks.len()
                );
            }
            chunks.extend(event_chunks);
        }

        report.chunks = chunks.len();
        info!(
            "Processed {} events into {} chunks ({} split)",
            report.kept_events, report.chunks, report.split_events
        );

        (chunks, report)
    }
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(uid: &str, title: Option<&str>, description: Option<&str>) -> EventRecord {
        EventRecord {
            uid: Some(uid.to_string()),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            ville: Some("Lille".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_threshold_boundary() {
        let processor = EventProcessor::default();

        let fifteen = event("1", Some("Court"), Some("Quinze car. ok."));
        let twenty = event("2", Some("Juste"), Some("Vingt caractères pil"));
        assert_eq!(normalize(fifteen.description().unwrap()).chars().count(), 15);
        assert_eq!(normalize(twenty.description().unwrap()).chars().count(), 20);

        assert!(!processor.is_usable(&fifteen));
        assert!(processor.is_usable(&twenty));
    }

    #[test]
    fn test_threshold_counts_cleaned_text() {
        let processor = EventProcessor::default();
        let padded = event("1", Some("Emojis"), Some("🎉🎉🎉 Fête 🎉🎉🎉🎉🎉🎉🎉🎉🎉🎉🎉"));
        assert!(!processor.is_usable(&padded));
    }

    #[test]
    fn test_missing_title_or_description_rejected() {
        let processor = EventProcessor::default();
        let events = vec![
            event("1", None, Some("Une description suffisamment longue")),
            event("2", Some("Sans description"), None),
            event("3", Some("Complet"), Some("Une description suffisamment longue")),
        ];

        let (kept, rejected) = processor.filter(&events);
        assert_eq!(rejected, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].uid.as_deref(), Some("3"));
    }

    #[test]
    fn test_three_event_corpus_chunk_counts() {
        let long = "La fanfare municipale joue dans le parc. ".repeat(30);
        assert!(long.chars().count() >= 1200);

        let events = vec![
            event("a", Some("Fanfare"), Some(&long)),
            event("b", Some("Lecture"), Some("Lecture de contes pour les enfants")),
            event("c", Some("Cinéma"), Some("Projection en plein air d'un classique")),
        ];

        let processor = EventProcessor::new(ChunkingConfig::new(500, 50).unwrap());
        let (chunks, report) = processor.process(&events);

        let count = |uid: &str| {
            chunks
                .iter()
                .filter(|c| c.metadata.uid.as_deref() == Some(uid))
                .count()
        };
        assert!(count("a") >= 3);
        assert_eq!(count("b"), 1);
        assert_eq!(count("c"), 1);

        assert_eq!(report.kept_events, 3);
        assert_eq!(report.split_events, 1);
        assert_eq!(report.chunks, chunks.len());
    }

    #[test]
    fn test_chunks_follow_event_order() {
        let events = vec![
            event("1", Some("Premier"), Some("Une description suffisamment longue")),
            event("2", Some("Second"), Some("Une autre description assez longue")),
        ];
        let (chunks, _) = EventProcessor::default().process(&events);
        let uids: Vec<_> = chunks.iter().map(|c| c.metadata.uid.clone().unwrap()).collect();
        assert_eq!(uids, vec!["1", "2"]);
    }
}
