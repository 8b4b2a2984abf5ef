//! Pet document model.
//!
//! # Responsibility
//! - Define the root document of the sharing relation.
//! - Provide the partial-update (`PetPatch`) merge rules.
//!
//! # Invariants
//! - `owner_id` is fixed at creation and never listed in `shared_with`.
//! - A user appears at most once in `shared_with`.
//! - Child id lists are not stored; they are derived by query into `PetDetails`.

use super::ids::{EntityId, UserId};
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    Cat,
    Dog,
    Other,
}

/// One entry of the pet sharing relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub user_id: UserId,
    /// `false` while the invite is still open.
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: EntityId,
    pub owner_id: UserId,
    pub name: String,
    pub species: Species,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub shared_with: Vec<Share>,
}

/// Creation input; id and owner are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPet {
    pub name: String,
    pub species: Species,
    pub image_ref: Option<String>,
}

impl Pet {
    pub fn new(owner_id: UserId, input: NewPet) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: input.name,
            species: input.species,
            image_ref: input.image_ref,
            shared_with: Vec::new(),
        }
    }

    pub fn share_for(&self, user_id: &UserId) -> Option<&Share> {
        self.shared_with
            .iter()
            .find(|share| &share.user_id == user_id)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField("name"));
        }

        let mut seen = HashSet::new();
        for share in &self.shared_with {
            if share.user_id == self.owner_id {
                return Err(ValidationError::OwnerInSharedWith);
            }
            if !seen.insert(&share.user_id) {
                return Err(ValidationError::DuplicateShare(share.user_id.to_string()));
            }
        }

        Ok(())
    }
}

/// Partial update for descriptive pet fields.
///
/// `None` means "not supplied". A supplied value overwrites the stored one
/// only when it differs from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetPatch {
    pub name: Option<String>,
    pub species: Option<Species>,
    pub image_ref: Option<String>,
}

impl PetPatch {
    /// Builds a patch from a payload where default values mean "not supplied".
    pub fn from_sparse(name: &str, species: Option<Species>, image_ref: &str) -> Self {
        Self {
            name: non_empty(name),
            species,
            image_ref: non_empty(image_ref),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.species.is_none() && self.image_ref.is_none()
    }

    /// Merges supplied fields into `pet`. Returns whether anything changed.
    pub fn apply(&self, pet: &mut Pet) -> bool {
        let mut changed = false;
        if let Some(name) = self.name.as_ref().filter(|value| **value != pet.name) {
            pet.name = name.clone();
            changed = true;
        }
        if let Some(species) = self.species.filter(|value| *value != pet.species) {
            pet.species = species;
            changed = true;
        }
        if let Some(image_ref) = self
            .image_ref
            .as_ref()
            .filter(|value| pet.image_ref.as_ref() != Some(*value))
        {
            pet.image_ref = Some(image_ref.clone());
            changed = true;
        }
        changed
    }
}

/// Pet with its child ids derived from the children's `petId` back-references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDetails {
    #[serde(flatten)]
    pub pet: Pet,
    pub medicine_ids: Vec<EntityId>,
    pub food_ids: Vec<EntityId>,
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
