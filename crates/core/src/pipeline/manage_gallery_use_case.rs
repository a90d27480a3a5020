use std::path::PathBuf;

use uuid::Uuid;

use crate::storage::domain::cutout_file_store::{CutoutFileStore, StoreError};
use crate::storage::domain::cutout_record::CutoutRecord;
use crate::storage::domain::record_store::RecordStore;

/// A saved cutout together with where its PNG lives.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryEntry {
    pub record: CutoutRecord,
    pub path: PathBuf,
}

/// Lists and removes saved cutouts.
///
/// Records and files are independent resources. Deleting an entry always
/// removes its record, even when the file cannot be removed.
pub struct CutoutGallery {
    files: Box<dyn CutoutFileStore>,
    records: Box<dyn RecordStore>,
}

impl CutoutGallery {
    pub fn new(files: Box<dyn CutoutFileStore>, records: Box<dyn RecordStore>) -> Self {
        Self { files, records }
    }

    /// Newest first.
    pub fn entries(&self) -> Vec<GalleryEntry> {
        self.records
            .list()
            .into_iter()
            .map(|record| GalleryEntry {
                path: self.files.resolve_path(&record.file_name),
                record,
            })
            .collect()
    }

    /// Looks an entry up by record id or by file name.
    pub fn find(&self, id_or_file_name: &str) -> Option<GalleryEntry> {
        let id = Uuid::parse_str(id_or_file_name).ok();
        self.entries().into_iter().find(|entry| {
            Some(entry.record.id) == id || entry.record.file_name == id_or_file_name
        })
    }

    /// Removes the file, then the record. Returns the removed record, or
    /// `None` when no record has this id.
    pub fn delete(&mut self, id: Uuid) -> Result<Option<CutoutRecord>, StoreError> {
        let Some(record) = self.records.list().into_iter().find(|r| r.id == id) else {
            return Ok(None);
        };

        if let Err(e) = self.files.delete(&record.file_name) {
            log::warn!("Could not remove {}: {e}", record.file_name);
        }

        let removed = self.records.delete(id)?;
        if removed.is_some() {
            log::info!("Deleted cutout {}", record.file_name);
        }
        Ok(removed)
    }
}
