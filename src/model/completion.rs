//! Completion metadata attached to finished tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured record of how a task was completed.
///
/// The three list fields are never empty on a stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionDetails {
    /// Main outcomes.
    pub key_accomplishments: Vec<String>,
    /// How the work was carried out.
    pub implementation_details: Vec<String>,
    /// Problems met along the way.
    pub technical_challenges: Vec<String>,
    /// Score the verifier assigned, 0 to 100.
    pub verification_score: u8,
    /// When the task completed.
    pub completed_at: DateTime<Utc>,
    /// Caller metadata kept verbatim and never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Structured fields a caller may supply when verifying a task.
///
/// Anything left `None` (or empty) is derived from the summary text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionFields {
    /// Main outcomes.
    #[serde(default)]
    pub key_accomplishments: Option<Vec<String>>,
    /// How the work was carried out.
    #[serde(default)]
    pub implementation_details: Option<Vec<String>>,
    /// Problems met along the way.
    #[serde(default)]
    pub technical_challenges: Option<Vec<String>>,
    /// Completion time; defaults to now.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque extra metadata.
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}
