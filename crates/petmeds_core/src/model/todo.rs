//! ToDo reminder document.
//!
//! Reminders are scoped to one pet and carry an expiry (`delete_after`, epoch
//! milliseconds) after which they may be purged.

use super::ids::{EntityId, UserId};
use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToDoStatus {
    Open,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDo {
    pub id: EntityId,
    pub user_id: UserId,
    pub pet_id: EntityId,
    pub text: String,
    pub status: ToDoStatus,
    pub delete_after: i64,
}

impl ToDo {
    pub fn new(user_id: UserId, pet_id: EntityId, text: impl Into<String>, delete_after: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            pet_id,
            text: text.into(),
            status: ToDoStatus::Open,
            delete_after,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::BlankField("text"));
        }
        Ok(())
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.delete_after <= now_ms
    }
}
