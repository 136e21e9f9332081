use std::collections::BTreeMap;

use crate::error::SinkError;
use crate::record::JobRecord;

use super::{merge, timestamp, to_document, Document, Sink};

/// Keeps documents in process, with the same merge semantics as the real stores.
#[derive(Debug, Default)]
pub struct MemorySink {
    collections: BTreeMap<String, BTreeMap<String, Document>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections.get(collection)?.get(id)
    }

    /// Number of documents stored in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }
}

impl Sink for MemorySink {
    fn upsert(&mut self, records: &[JobRecord], collection: &str) -> Result<usize, SinkError> {
        let updated_at = timestamp();
        let documents = self.collections.entry(collection.to_string()).or_default();

        for record in records {
            let (id, document) = to_document(record, &updated_at)?;
            merge(documents.entry(id).or_default(), document);
        }
        Ok(records.len())
    }
}
