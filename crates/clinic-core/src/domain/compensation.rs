//! Dead-letter record for a compensation step that could not complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationFailure {
    pub id: Uuid,
    /// Flow that was being undone, e.g. `clinic_registration`.
    pub flow: String,
    /// `clinic`, `user` or `subscription`.
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub error: String,
    pub created_at: DateTime<Utc>,
}

impl CompensationFailure {
    pub fn new(flow: &str, entity_kind: &str, entity_id: Uuid, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow: flow.to_string(),
            entity_kind: entity_kind.to_string(),
            entity_id,
            error,
            created_at: Utc::now(),
        }
    }
}
