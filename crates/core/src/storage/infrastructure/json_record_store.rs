use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use uuid::Uuid;

use crate::storage::domain::cutout_file_store::StoreError;
use crate::storage::domain::cutout_record::CutoutRecord;
use crate::storage::domain::record_store::RecordStore;

/// Record collection persisted as one pretty-printed JSON array.
///
/// The whole index is rewritten on every mutation through a temporary
/// sibling and a rename.
pub struct JsonRecordStore {
    path: PathBuf,
    records: Vec<CutoutRecord>,
}

impl JsonRecordStore {
    /// Loads the index at `path`; a missing file is an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records: Vec<CutoutRecord> = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).map_err(|source| StoreError::Serialize {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == IoErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::io("read", &path, e)),
        };
        log::debug!("Loaded {} record(s) from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create", parent, e))?;
        }
        let json =
            serde_json::to_string_pretty(&self.records).map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::io("write", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io("move", &self.path, e)
        })
    }
}

impl RecordStore for JsonRecordStore {
    fn insert(&mut self, record: CutoutRecord) -> Result<(), StoreError> {
        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> Result<Option<CutoutRecord>, StoreError> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = self.records.remove(index);
        if let Err(e) = self.persist() {
            self.records.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    fn list(&self) -> Vec<CutoutRecord> {
        // Reverse first so equal timestamps keep latest-inserted first.
        let mut records: Vec<CutoutRecord> = self.records.iter().rev().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record_at(file_name: &str, minutes_ago: i64) -> CutoutRecord {
        CutoutRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            file_name: file_name.to_string(),
        }
    }

    fn names(records: &[CutoutRecord]) -> Vec<&str> {
        records.iter().map(|r| r.file_name.as_str()).collect()
    }

    #[test]
    fn test_missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::open(dir.path().join("records.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_malformed_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonRecordStore::open(&path),
            Err(StoreError::Serialize { .. })
        ));
    }

    #[test]
    fn test_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonRecordStore::open(dir.path().join("records.json")).unwrap();
        store.insert(record_at("old.png", 10)).unwrap();
        store.insert(record_at("new.png", 1)).unwrap();
        store.insert(record_at("mid.png", 5)).unwrap();
        assert_eq!(names(&store.list()), vec!["new.png", "mid.png", "old.png"]);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");
        let record = record_at("A.png", 0);
        {
            let mut store = JsonRecordStore::open(&path).unwrap();
            store.insert(record.clone()).unwrap();
        }
        let store = JsonRecordStore::open(&path).unwrap();
        assert_eq!(store.list(), vec![record]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_delete_removes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let keep = record_at("keep.png", 2);
        let gone = record_at("gone.png", 1);
        let mut store = JsonRecordStore::open(&path).unwrap();
        store.insert(keep.clone()).unwrap();
        store.insert(gone.clone()).unwrap();

        assert_eq!(store.delete(gone.id).unwrap(), Some(gone));
        assert_eq!(JsonRecordStore::open(&path).unwrap().list(), vec![keep]);
    }

    #[test]
    fn test_delete_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonRecordStore::open(dir.path().join("records.json")).unwrap();
        assert_eq!(store.delete(Uuid::new_v4()).unwrap(), None);
    }
}
