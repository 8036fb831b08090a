//! File-backed vector record store.
//!
//! The whole store lives in memory and is rewritten to a single JSON file
//! after every mutation. It is a cache over the source documents: a file
//! that cannot be decoded is logged and replaced by an empty store.

use crate::search::{self, SearchHit};
use chrono::{DateTime, Utc};
use ragdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A chunk of source text with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Chunk text, never empty
    #[serde(rename = "content")]
    pub text: String,

    /// Originating document (file name or path)
    #[serde(rename = "filename")]
    pub source_id: String,

    /// Zero-based position of the chunk within its source
    #[serde(rename = "chunk_id")]
    pub sequence_index: u32,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// `None` when no embedder was configured or embedding failed
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentRecord {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>, sequence_index: u32) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            sequence_index,
            metadata: Map::new(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Aggregate figures persisted next to the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub created_at: DateTime<Utc>,
    /// Distinct source documents
    pub total_documents: usize,
    /// Stored records
    pub total_chunks: usize,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            total_documents: 0,
            total_chunks: 0,
        }
    }
}

/// On-disk layout of `vector_store.json`.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    documents: Vec<DocumentRecord>,
    #[serde(default)]
    metadata: StoreMetadata,
}

/// What [`VectorStore::load`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No backing file yet
    Missing,
    /// File decoded with this many records
    Loaded(usize),
    /// File could not be decoded and was ignored
    Corrupt,
}

/// In-memory records mirrored to a JSON file.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    records: Vec<DocumentRecord>,
    metadata: StoreMetadata,
    dimension: Option<usize>,
    /// `(source_id, sequence_index)` of every record
    keys: HashSet<(String, u32)>,
}

impl VectorStore {
    /// An empty store that will persist to `path`. Nothing is read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            metadata: StoreMetadata::default(),
            dimension: None,
            keys: HashSet::new(),
        }
    }

    /// Create a store for `path` and load whatever is already there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    /// Vector length shared by every embedded record.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Add one record and persist the whole store.
    ///
    /// If the write fails the record is taken back out, so memory never
    /// holds a record the file does not.
    ///
    /// # Errors
    /// * `AppError::Knowledge` - If the record text is empty or its key is already stored
    /// * `AppError::DimensionMismatch` - If its embedding length differs from the store's
    /// * `AppError::Io` - If the store file cannot be written
    pub fn append(&mut self, record: DocumentRecord) -> AppResult<()> {
        let len_before = self.records.len();
        self.push(record)?;
        self.refresh_metadata();
        if let Err(e) = self.persist() {
            self.truncate(len_before);
            return Err(e);
        }
        Ok(())
    }

    /// Append records one at a time, persisting after each.
    ///
    /// All or nothing: on the first failure every record added by this
    /// call is removed again and the previous state is written back.
    pub fn append_many<I>(&mut self, records: I) -> AppResult<usize>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        let len_before = self.records.len();
        let mut count = 0;
        for record in records {
            if let Err(e) = self.append(record) {
                if count > 0 {
                    self.truncate(len_before);
                    self.persist_after_rollback();
                }
                return Err(e);
            }
            count += 1;
        }
        Ok(count)
    }

    /// Replace every record of `source_id` with `records`.
    ///
    /// The old records are removed before the new ones are checked, so a
    /// re-learned document may change its chunking or vector length. On
    /// failure the old records are restored in their original positions.
    pub fn replace_source(&mut self, source_id: &str, records: Vec<DocumentRecord>) -> AppResult<usize> {
        let removed = self.detach_source(source_id);
        if !removed.is_empty() {
            tracing::debug!("Replacing {} records of '{}'", removed.len(), source_id);
        }

        match self.append_many(records) {
            Ok(0) if !removed.is_empty() => {
                if let Err(e) = self.persist() {
                    self.reattach(removed);
                    return Err(e);
                }
                Ok(0)
            }
            Ok(count) => Ok(count),
            Err(e) => {
                if !removed.is_empty() {
                    self.reattach(removed);
                    self.persist_after_rollback();
                }
                Err(e)
            }
        }
    }

    /// Take out the records of one source, remembering their positions.
    fn detach_source(&mut self, source_id: &str) -> Vec<(usize, DocumentRecord)> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .enumerate()
            .partition(|(_, r)| r.source_id == source_id);

        self.records = kept.into_iter().map(|(_, r)| r).collect();
        if !removed.is_empty() {
            self.reindex();
        }
        removed
    }

    /// Undo [`Self::detach_source`] after anything appended since was dropped.
    fn reattach(&mut self, removed: Vec<(usize, DocumentRecord)>) {
        for (position, record) in removed {
            let position = position.min(self.records.len());
            self.records.insert(position, record);
        }
        self.reindex();
    }

    fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
        self.reindex();
    }

    /// Rebuild keys, dimension and counts from the records.
    fn reindex(&mut self) {
        self.keys = self
            .records
            .iter()
            .map(|r| (r.source_id.clone(), r.sequence_index))
            .collect();
        self.dimension = self
            .records
            .iter()
            .find_map(|r| r.embedding.as_ref().map(Vec::len));
        self.refresh_metadata();
    }

    fn persist_after_rollback(&self) {
        if let Err(e) = self.persist() {
            tracing::error!("Could not restore {:?} after a failed write: {}", self.path, e);
        }
    }

    fn push(&mut self, record: DocumentRecord) -> AppResult<()> {
        if record.text.trim().is_empty() {
            return Err(AppError::Knowledge(format!(
                "Refusing empty chunk {} of '{}'",
                record.sequence_index, record.source_id
            )));
        }

        let key = (record.source_id.clone(), record.sequence_index);
        if self.keys.contains(&key) {
            return Err(AppError::Knowledge(format!(
                "Chunk {} of '{}' is already stored",
                record.sequence_index, record.source_id
            )));
        }

        if let Some(embedding) = &record.embedding {
            match self.dimension {
                Some(expected) if expected != embedding.len() => {
                    return Err(AppError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
                Some(_) => {}
                None => self.dimension = Some(embedding.len()),
            }
        }

        self.keys.insert(key);
        self.records.push(record);
        Ok(())
    }

    fn refresh_metadata(&mut self) {
        let sources: HashSet<&str> = self.records.iter().map(|r| r.source_id.as_str()).collect();
        self.metadata.total_documents = sources.len();
        self.metadata.total_chunks = self.records.len();
    }

    /// Rank stored records against a query embedding.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchHit<'_>> {
        search::rank(&self.records, query_embedding, top_k)
    }

    /// Write records and metadata to the backing file.
    ///
    /// The JSON goes to a sibling temp file that is synced and then renamed
    /// over the old one, so a crash never leaves half a store behind.
    pub fn persist(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = StoreFile {
            documents: self.records.clone(),
            metadata: self.metadata.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(&json)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            "Persisted {} records to {:?}",
            self.records.len(),
            self.path
        );
        Ok(())
    }

    /// Replace the in-memory state with the backing file's contents.
    ///
    /// Never fails: a missing file leaves the store empty, and an unreadable
    /// one is logged and also leaves it empty.
    pub fn load(&mut self) -> LoadStatus {
        self.reset_memory();

        match read_store_file(&self.path) {
            Ok(None) => {
                tracing::debug!("No vector store at {:?}; starting empty", self.path);
                LoadStatus::Missing
            }
            Ok(Some(file)) => match self.adopt(file) {
                Ok(count) => {
                    tracing::info!("Loaded {} records from {:?}", count, self.path);
                    LoadStatus::Loaded(count)
                }
                Err(e) => {
                    tracing::error!("Ignoring vector store {:?}: {}", self.path, e);
                    self.reset_memory();
                    LoadStatus::Corrupt
                }
            },
            Err(e) => {
                tracing::error!("Ignoring vector store {:?}: {}", self.path, e);
                LoadStatus::Corrupt
            }
        }
    }

    /// Take over decoded records, re-checking the store's invariants.
    fn adopt(&mut self, file: StoreFile) -> AppResult<usize> {
        let created_at = file.metadata.created_at;
        for record in file.documents {
            self.push(record)
                .map_err(|e| AppError::PersistenceCorruption(e.to_string()))?;
        }
        self.refresh_metadata();
        self.metadata.created_at = created_at;
        Ok(self.records.len())
    }

    fn reset_memory(&mut self) {
        self.records.clear();
        self.keys.clear();
        self.metadata = StoreMetadata::default();
        self.dimension = None;
    }

    /// Drop every record and persist the empty store.
    pub fn clear(&mut self) -> AppResult<()> {
        let records = std::mem::take(&mut self.records);
        let metadata = self.metadata.clone();
        self.reset_memory();
        if let Err(e) = self.persist() {
            self.records = records;
            self.reindex();
            self.metadata.created_at = metadata.created_at;
            return Err(e);
        }
        tracing::info!("Cleared vector store at {:?}", self.path);
        Ok(())
    }

    /// Distinct source ids in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.source_id.as_str()))
            .map(|r| r.source_id.clone())
            .collect()
    }

    /// Records that carry a vector.
    pub fn embedded_count(&self) -> usize {
        self.records.iter().filter(|r| r.embedding.is_some()).count()
    }

    /// Sum of chunk lengths in characters.
    pub fn total_characters(&self) -> usize {
        self.records.iter().map(|r| r.text.chars().count()).sum()
    }
}

/// Read and decode a store file. `Ok(None)` means there is no file.
fn read_store_file(path: &Path) -> AppResult<Option<StoreFile>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AppError::PersistenceCorruption(e.to_string())),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::PersistenceCorruption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> VectorStore {
        VectorStore::new(temp.path().join("kb").join("vector_store.json"))
    }

    fn record(text: &str, source: &str, seq: u32, embedding: Vec<f32>) -> DocumentRecord {
        DocumentRecord::new(text, source, seq).with_embedding(Some(embedding))
    }

    #[test]
    fn test_append_persists_and_counts() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);

        store.append(record("first", "a.txt", 0, vec![1.0, 0.0])).unwrap();
        store.append(record("second", "a.txt", 1, vec![0.0, 1.0])).unwrap();
        store.append(record("third", "b.txt", 0, vec![0.5, 0.5])).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.metadata().total_chunks, 3);
        assert_eq!(store.metadata().total_documents, 2);
        assert_eq!(store.dimension(), Some(2));
        assert_eq!(store.sources(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        let records = vec![
            record("Часы посещения с 10 до 18", "visits.md", 0, vec![0.1, 0.2, 0.3])
                .with_metadata("file_size", 25),
            DocumentRecord::new("no vector here", "notes.txt", 0),
        ];
        assert_eq!(store.append_many(records.clone()).unwrap(), 2);

        let reopened = VectorStore::open(store.path());
        assert_eq!(reopened.records(), records.as_slice());
        assert_eq!(reopened.metadata().created_at, store.metadata().created_at);
        assert_eq!(reopened.embedded_count(), 1);
    }

    #[test]
    fn test_file_layout() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(DocumentRecord::new("text", "a.txt", 0)).unwrap();

        let json: Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        let doc = &json["documents"][0];
        assert_eq!(doc["content"], "text");
        assert_eq!(doc["filename"], "a.txt");
        assert_eq!(doc["chunk_id"], 0);
        assert!(doc["embedding"].is_null());
        assert_eq!(json["metadata"]["total_chunks"], 1);
        assert!(json["metadata"]["created_at"].is_string());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        assert_eq!(store.load(), LoadStatus::Missing);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vector_store.json");
        fs::write(&path, "{\"documents\": [oops").unwrap();

        let mut store = VectorStore::new(&path);
        assert_eq!(store.load(), LoadStatus::Corrupt);
        assert!(store.is_empty());
        assert_eq!(store.metadata().total_chunks, 0);
    }

    #[test]
    fn test_load_mixed_dimensions_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vector_store.json");
        let json = serde_json::json!({
            "documents": [
                {"content": "a", "filename": "x", "chunk_id": 0, "metadata": {}, "embedding": [1.0, 0.0]},
                {"content": "b", "filename": "x", "chunk_id": 1, "metadata": {}, "embedding": [1.0]}
            ],
            "metadata": {"created_at": "2024-01-01T00:00:00Z", "total_documents": 1, "total_chunks": 2}
        });
        fs::write(&path, json.to_string()).unwrap();

        let mut store = VectorStore::new(&path);
        assert_eq!(store.load(), LoadStatus::Corrupt);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_rejects_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("a", "x", 0, vec![1.0, 0.0])).unwrap();

        let err = store.append(record("b", "x", 1, vec![1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_rejects_empty_text() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        assert!(store.append(DocumentRecord::new("   ", "x", 0)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("a", "x", 0, vec![1.0])).unwrap();

        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);

        let mut reopened = VectorStore::new(store.path());
        assert_eq!(reopened.load(), LoadStatus::Loaded(0));
    }

    /// Put a directory where the store file goes so the final rename fails.
    fn block_store_file(store: &VectorStore) {
        fs::create_dir_all(store.path().join("occupied")).unwrap();
    }

    #[test]
    fn test_append_rolls_back_when_write_fails() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        block_store_file(&store);

        assert!(store.append(record("a", "x", 0, vec![1.0, 0.0])).is_err());
        assert!(store.is_empty());
        assert_eq!(store.metadata().total_chunks, 0);
        assert_eq!(store.dimension(), None);
        assert!(store.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_append_rejects_duplicate_key() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("a", "x", 0, vec![1.0])).unwrap();

        let err = store.append(record("again", "x", 0, vec![1.0])).unwrap_err();
        assert!(matches!(err, AppError::Knowledge(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].text, "a");
    }

    #[test]
    fn test_append_many_is_all_or_nothing() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("kept", "x", 0, vec![1.0, 0.0])).unwrap();

        let result = store.append_many(vec![
            record("fits", "y", 0, vec![0.0, 1.0]),
            record("too long", "y", 1, vec![0.0, 1.0, 0.0]),
        ]);
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.metadata().total_documents, 1);

        let reopened = VectorStore::open(store.path());
        assert_eq!(reopened.records(), store.records());
    }

    #[test]
    fn test_replace_source_swaps_records() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store
            .append_many(vec![
                record("old one", "x", 0, vec![1.0, 0.0]),
                record("old two", "x", 1, vec![1.0, 0.0]),
                record("other", "y", 0, vec![0.0, 1.0]),
            ])
            .unwrap();

        let added = store
            .replace_source("x", vec![record("new one", "x", 0, vec![0.5, 0.5])])
            .unwrap();
        assert_eq!(added, 1);

        let texts: Vec<&str> = store.records().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["other", "new one"]);
        assert_eq!(store.metadata().total_chunks, 2);
        assert_eq!(store.metadata().total_documents, 2);
        assert_eq!(VectorStore::open(store.path()).len(), 2);
    }

    #[test]
    fn test_replace_source_failure_restores_old_records() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store
            .append_many(vec![
                record("x first", "x", 0, vec![1.0, 0.0]),
                record("y first", "y", 0, vec![0.0, 1.0]),
                record("x second", "x", 1, vec![1.0, 1.0]),
            ])
            .unwrap();
        let before = store.records().to_vec();

        let result = store.replace_source(
            "x",
            vec![
                record("x new", "x", 0, vec![1.0, 0.0]),
                record("x bad", "x", 1, vec![1.0, 0.0, 0.0]),
            ],
        );
        assert!(result.is_err());
        assert_eq!(store.records(), before.as_slice());
        assert_eq!(store.dimension(), Some(2));
        assert_eq!(VectorStore::open(store.path()).records(), before.as_slice());
    }

    #[test]
    fn test_replace_only_source_may_change_dimension() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("a", "x", 0, vec![1.0, 0.0])).unwrap();

        store
            .replace_source("x", vec![record("a", "x", 0, vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn test_clear_keeps_records_when_write_fails() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("a", "x", 0, vec![1.0])).unwrap();
        fs::remove_file(store.path()).unwrap();
        block_store_file(&store);

        assert!(store.clear().is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(1));
    }

    #[test]
    fn test_load_duplicate_keys_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vector_store.json");
        let json = serde_json::json!({
            "documents": [
                {"content": "a", "filename": "x", "chunk_id": 0, "embedding": null},
                {"content": "b", "filename": "x", "chunk_id": 0, "embedding": null}
            ]
        });
        fs::write(&path, json.to_string()).unwrap();

        let mut store = VectorStore::new(&path);
        assert_eq!(store.load(), LoadStatus::Corrupt);
        assert!(store.is_empty());
    }

    #[test]
    fn test_search_delegates_to_rank() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        store.append(record("east", "x", 0, vec![1.0, 0.0])).unwrap();
        store.append(record("north", "x", 1, vec![0.0, 1.0])).unwrap();

        let hits = store.search(&[0.0, 1.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.text, "north");
    }
}
