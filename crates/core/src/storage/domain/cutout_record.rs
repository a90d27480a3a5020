use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::constants::CUTOUT_EXTENSION;

/// One saved cutout in the gallery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoutRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Name of the PNG inside the cutout directory.
    pub file_name: String,
}

impl CutoutRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            file_name: file_name.into(),
        }
    }
}

/// Fresh `<UUID>.png` file name, uppercase and hyphenated.
pub fn unique_file_name() -> String {
    format!(
        "{}.{CUTOUT_EXTENSION}",
        Uuid::new_v4().hyphenated().to_string().to_uppercase()
    )
}
