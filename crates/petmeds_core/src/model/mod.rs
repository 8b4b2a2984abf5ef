//! Document model for pets and their care schedules.
//!
//! # Responsibility
//! - Define the persisted document shapes (one store document per entity).
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Every document is identified by a stable `EntityId` (UUID v4).
//! - Access to Medicine/Food/ToDo is always derived from the parent Pet.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod care_item;
pub mod ids;
pub mod pet;
pub mod todo;

/// Store collection holding one document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Pets,
    Medicines,
    Foods,
    ToDos,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pets => "pets",
            Self::Medicines => "medicines",
            Self::Foods => "foods",
            Self::ToDos => "todos",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level rule violations detected before a document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier string is not a valid UUID.
    InvalidId(String),
    /// Caller identity is empty or contains whitespace.
    InvalidUserId(String),
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Frequency time is not `HH:MM` in 24h format.
    InvalidTime(String),
    /// Frequency interval must be at least one day when set.
    InvalidInterval,
    /// The pet owner appears in its own `sharedWith` list.
    OwnerInSharedWith,
    /// The same user appears twice in `sharedWith`.
    DuplicateShare(String),
    /// The owner cannot be invited to their own pet.
    OwnerCannotBeInvited,
    /// A patch attempted to change a field fixed at creation.
    ImmutableField(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(value) => write!(f, "invalid identifier `{value}`"),
            Self::InvalidUserId(value) => write!(f, "invalid user identifier `{value}`"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::InvalidTime(value) => write!(f, "invalid time of day `{value}`, expected HH:MM"),
            Self::InvalidInterval => write!(f, "frequency interval must be at least one day"),
            Self::OwnerInSharedWith => write!(f, "pet owner must not be listed in sharedWith"),
            Self::DuplicateShare(user) => write!(f, "user `{user}` is listed twice in sharedWith"),
            Self::OwnerCannotBeInvited => write!(f, "pet owner cannot be invited to their own pet"),
            Self::ImmutableField(field) => write!(f, "field `{field}` cannot be changed"),
        }
    }
}

impl Error for ValidationError {}
