use uuid::Uuid;

use crate::storage::domain::cutout_file_store::StoreError;
use crate::storage::domain::cutout_record::CutoutRecord;

/// Collection of saved cutout records.
pub trait RecordStore: Send {
    fn insert(&mut self, record: CutoutRecord) -> Result<(), StoreError>;

    /// Removes the record with `id`, returning it if it existed.
    fn delete(&mut self, id: Uuid) -> Result<Option<CutoutRecord>, StoreError>;

    /// All records, newest first.
    fn list(&self) -> Vec<CutoutRecord>;
}
