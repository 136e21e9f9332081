use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::SinkError;
use crate::record::JobRecord;

use super::{merge, timestamp, to_document, Document, Sink};

pub const DEFAULT_STORE_FILE: &str = "offers_store.json";

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// A local document store: one JSON file holding `{collection: {id: document}}`.
pub struct JsonStoreSink {
    path: PathBuf,
}

impl JsonStoreSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonStoreSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole store. A missing file is an empty store.
    pub fn load(&self) -> Result<Collections, SinkError> {
        if !self.path.exists() {
            info!("No store file at {:?}. Starting fresh.", self.path);
            return Ok(Collections::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Collections::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, collections: &Collections) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(collections)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl Sink for JsonStoreSink {
    fn upsert(&mut self, records: &[JobRecord], collection: &str) -> Result<usize, SinkError> {
        let mut collections = self.load()?;
        let updated_at = timestamp();
        let documents = collections.entry(collection.to_string()).or_default();

        for record in records {
            let (id, document) = to_document(record, &updated_at)?;
            merge(documents.entry(id).or_default(), document);
        }

        self.save(&collections)?;
        info!(
            "Stored {} offers in {:?} ({} documents in {})",
            records.len(),
            self.path,
            collections.get(collection).map_or(0, BTreeMap::len),
            collection
        );
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_file(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("emploi-store-{}-{}", std::process::id(), nanos));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn record(id: &str, title: &str) -> JobRecord {
        JobRecord {
            id: Some(id.to_string()),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_is_empty_store() {
        let sink = JsonStoreSink::new(scratch_file("absent.json"));
        assert!(sink.load().unwrap().is_empty());
    }

    #[test]
    fn upsert_twice_merges_by_id() {
        let path = scratch_file("store.json");
        let mut sink = JsonStoreSink::new(&path);

        let mut first = record("a", "Premier");
        first.deadline = Some("18 Janvier 2026".to_string());
        sink.upsert(&[first, record("b", "Second")], "emploiPublicAllOffers").unwrap();
        sink.upsert(&[record("a", "Premier (modifié)")], "emploiPublicAllOffers").unwrap();

        let collections = JsonStoreSink::new(&path).load().unwrap();
        let documents = &collections["emploiPublicAllOffers"];
        assert_eq!(documents.len(), 2);
        assert_eq!(documents["a"]["title"], "Premier (modifié)");
        assert_eq!(documents["a"]["deadline"], "18 Janvier 2026");
        assert_eq!(documents["b"]["source"], "emploi-public");

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let path = scratch_file("corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let mut sink = JsonStoreSink::new(&path);
        let err = sink.upsert(&[record("a", "x")], "offers").unwrap_err();
        assert!(matches!(err, SinkError::Json(_)));

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
