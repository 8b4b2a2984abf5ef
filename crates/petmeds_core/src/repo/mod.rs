//! Entity repositories built on the patch engine.
//!
//! # Responsibility
//! - Expose per-entity create/get/list/update/delete scoped by caller identity.
//! - Keep collection queries (by owner, by share, by parent pet) in one place.
//!
//! # Invariants
//! - Every mutation returns the refreshed collection visible to the caller,
//!   read after commit as a best-effort snapshot.
//! - Child documents reference their pet via `petId` only; the pet keeps no
//!   list of child ids.

use crate::error::{CoreError, CoreResult};
use crate::model::ids::{EntityId, UserId};
use crate::model::pet::Pet;
use crate::model::Collection;
use crate::store::{Document, DocumentStore, FieldValue, Filter};
use serde::de::DeserializeOwned;

pub mod care_repo;
pub mod pet_repo;
pub mod todo_repo;

pub(crate) const OWNER_FIELD: &str = "ownerId";
pub(crate) const PET_FIELD: &str = "petId";
pub(crate) const CREATOR_FIELD: &str = "creatorId";
pub(crate) const SHARED_WITH_FIELD: &str = "sharedWith";

pub(crate) fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> CoreResult<Vec<T>> {
    documents
        .iter()
        .map(|document| document.decode::<T>().map_err(CoreError::from))
        .collect()
}

pub(crate) fn share_filter(user_id: &UserId, accepted: bool) -> Filter {
    Filter::ArrayContains {
        array: SHARED_WITH_FIELD,
        fields: vec![
            ("userId", FieldValue::Text(user_id.as_str().to_string())),
            ("accepted", FieldValue::Bool(accepted)),
        ],
    }
}

pub(crate) fn pet_filter(pet_id: EntityId) -> Filter {
    Filter::field_eq(PET_FIELD, pet_id.to_string())
}

/// Pets owned by the user followed by pets shared with them and accepted.
pub(crate) fn visible_pets(store: &dyn DocumentStore, user_id: &UserId) -> CoreResult<Vec<Pet>> {
    let mut pets: Vec<Pet> = decode_all(
        store.query(Collection::Pets, &Filter::field_eq(OWNER_FIELD, user_id.as_str()))?,
    )?;
    pets.extend(decode_all::<Pet>(
        store.query(Collection::Pets, &share_filter(user_id, true))?,
    )?);
    Ok(pets)
}
