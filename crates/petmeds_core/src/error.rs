//! Error taxonomy surfaced by every core operation.
//!
//! # Invariants
//! - Access and sharing failures are terminal; they are never retried.
//! - Errors propagate unchanged from the patch engine to repository callers.

use crate::model::ids::{EntityId, UserId};
use crate::model::{Collection, ValidationError};
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug)]
pub enum CoreError {
    /// Document id does not resolve in its collection.
    NotFound { collection: Collection, id: String },
    /// No user identity is registered for the given e-mail address.
    UnknownIdentity { email: String },
    /// Caller lacks the relation to the pet the operation requires.
    NoAccess { user_id: UserId, pet_id: EntityId },
    /// Target user already has a pending or accepted share.
    AlreadyInvited { user_id: UserId, pet_id: EntityId },
    /// Caller has no pending share to answer.
    NoOpenInvite { user_id: UserId, pet_id: EntityId },
    Validation(ValidationError),
    Storage(StoreError),
}

impl CoreError {
    pub(crate) fn not_found(collection: Collection, id: impl ToString) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for log lines and request-layer mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::UnknownIdentity { .. } => "not_found",
            Self::NoAccess { .. } => "no_access",
            Self::AlreadyInvited { .. } => "already_invited",
            Self::NoOpenInvite { .. } => "no_open_invite",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, id } => write!(f, "{collection} document not found: {id}"),
            Self::UnknownIdentity { email } => write!(f, "no user registered for '{email}'"),
            Self::NoAccess { user_id, pet_id } => {
                write!(f, "user '{user_id}' has no access to pet '{pet_id}'")
            }
            Self::AlreadyInvited { user_id, pet_id } => write!(
                f,
                "user '{user_id}' is already invited to share pet '{pet_id}'"
            ),
            Self::NoOpenInvite { user_id, pet_id } => write!(
                f,
                "no open invite exists for user '{user_id}' at pet '{pet_id}'"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}
