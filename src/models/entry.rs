use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A journal entry as represented by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub text: String,
    /// URL of the generated illustration, once a generation job has finished.
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
