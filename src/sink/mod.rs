//! Persistence of scraped records.
//!
//! Every sink writes one document per record id and merges the new fields
//! into whatever is already stored, so re-running a scrape never creates
//! duplicates and never erases fields written by other tools.

pub mod firestore;
pub mod json_store;
pub mod memory;

pub use firestore::{FirestoreSink, ServiceAccount};
pub use json_store::JsonStoreSink;
pub use memory::MemorySink;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::error::SinkError;
use crate::record::JobRecord;

pub const SOURCE_TAG: &str = "emploi-public";
pub const ALL_OFFERS_COLLECTION: &str = "emploiPublicAllOffers";
pub const LAST_CHANCE_COLLECTION: &str = "emploiPublicOffers";

pub type Document = serde_json::Map<String, Value>;

pub trait Sink {
    /// Merges `records` into `collection`, keyed by id. Returns the number of documents written.
    fn upsert(&mut self, records: &[JobRecord], collection: &str) -> Result<usize, SinkError>;
}

/// Sortable write time, e.g. `2026-01-15T08:30:00.123456Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The stored form of a record: its fields plus the provenance tag and write time.
pub fn to_document(record: &JobRecord, updated_at: &str) -> Result<(String, Document), SinkError> {
    let id = record.id.clone().ok_or_else(|| SinkError::MissingId {
        title: record.title.clone(),
    })?;

    let mut document = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    document.insert("source".to_string(), Value::String(SOURCE_TAG.to_string()));
    document.insert("updatedAt".to_string(), Value::String(updated_at.to_string()));

    Ok((id, document))
}

/// Overwrites the fields present in `update`, leaves the others untouched.
pub fn merge(existing: &mut Document, update: Document) {
    for (key, value) in update {
        existing.insert(key, value);
    }
}
