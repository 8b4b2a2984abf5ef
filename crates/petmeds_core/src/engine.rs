//! Transactional patch engine shared by every entity repository.
//!
//! # Responsibility
//! - Run read, access check, patch, validate and write inside one store
//!   transaction for any `Entity`.
//! - Resolve access through the owning pet, never through the child itself.
//!
//! # Invariants
//! - A denied access check or a failing patch aborts before any write.
//! - Fields fixed at creation (`id`, owner/creator, `pet_id`) survive every patch.
//! - Patch functions may run more than once when the store retries a conflict.

use crate::access::{evaluate, evaluate_stored, Access, AccessRule};
use crate::context::CallContext;
use crate::error::{CoreError, CoreResult};
use crate::model::care_item::{CareItem, CareUnit};
use crate::model::ids::{EntityId, UserId};
use crate::model::pet::Pet;
use crate::model::todo::ToDo;
use crate::model::{Collection, ValidationError};
use crate::store::{encode, transact, DocumentStore, DocumentTx};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A document kind the engine can create, patch and delete.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> EntityId;
    /// Pet whose sharing relation governs access to this document.
    fn pet_id(&self) -> EntityId;
    /// Returns `Some` when the document is itself the access subject.
    fn as_pet(&self) -> Option<&Pet> {
        None
    }
    fn validate(&self) -> Result<(), ValidationError>;
    /// Fails when `updated` changes a field fixed at creation.
    fn check_immutable(&self, updated: &Self) -> Result<(), ValidationError>;
}

impl Entity for Pet {
    const COLLECTION: Collection = Collection::Pets;

    fn id(&self) -> EntityId {
        self.id
    }

    fn pet_id(&self) -> EntityId {
        self.id
    }

    fn as_pet(&self) -> Option<&Pet> {
        Some(self)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Pet::validate(self)
    }

    fn check_immutable(&self, updated: &Self) -> Result<(), ValidationError> {
        if updated.id != self.id {
            return Err(ValidationError::ImmutableField("id"));
        }
        if updated.owner_id != self.owner_id {
            return Err(ValidationError::ImmutableField("ownerId"));
        }
        Ok(())
    }
}

impl<U: CareUnit> Entity for CareItem<U> {
    const COLLECTION: Collection = U::COLLECTION;

    fn id(&self) -> EntityId {
        self.id
    }

    fn pet_id(&self) -> EntityId {
        self.pet_id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        CareItem::validate(self)
    }

    fn check_immutable(&self, updated: &Self) -> Result<(), ValidationError> {
        check_child_immutable(
            "creatorId",
            (self.id, &self.creator_id, self.pet_id),
            (updated.id, &updated.creator_id, updated.pet_id),
        )
    }
}

impl Entity for ToDo {
    const COLLECTION: Collection = Collection::ToDos;

    fn id(&self) -> EntityId {
        self.id
    }

    fn pet_id(&self) -> EntityId {
        self.pet_id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ToDo::validate(self)
    }

    fn check_immutable(&self, updated: &Self) -> Result<(), ValidationError> {
        check_child_immutable(
            "userId",
            (self.id, &self.user_id, self.pet_id),
            (updated.id, &updated.user_id, updated.pet_id),
        )
    }
}

fn check_child_immutable(
    user_field: &'static str,
    before: (EntityId, &UserId, EntityId),
    after: (EntityId, &UserId, EntityId),
) -> Result<(), ValidationError> {
    if before.0 != after.0 {
        return Err(ValidationError::ImmutableField("id"));
    }
    if before.1 != after.1 {
        return Err(ValidationError::ImmutableField(user_field));
    }
    if before.2 != after.2 {
        return Err(ValidationError::ImmutableField("petId"));
    }
    Ok(())
}

/// Generic access-checked, transactional create/update/delete.
#[derive(Clone)]
pub struct PatchEngine {
    store: Arc<dyn DocumentStore>,
}

impl PatchEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Reads one document after checking the caller against its pet.
    pub fn load<E: Entity>(&self, ctx: &CallContext, id: EntityId, rule: AccessRule) -> CoreResult<E> {
        let current: E = self
            .store
            .get(E::COLLECTION, id)?
            .ok_or_else(|| CoreError::not_found(E::COLLECTION, id))?
            .decode()?;
        let access = match current.as_pet() {
            Some(pet) => evaluate(pet, &ctx.caller),
            None => evaluate(&self.load_pet(current.pet_id())?, &ctx.caller),
        };
        rule.check(access, &ctx.caller, current.pet_id())?;
        Ok(current)
    }

    /// Loads a pet and fails unless the caller satisfies `rule` on it.
    pub fn authorize_pet(&self, ctx: &CallContext, pet_id: EntityId, rule: AccessRule) -> CoreResult<Pet> {
        let pet = self.load_pet(pet_id)?;
        rule.check(evaluate(&pet, &ctx.caller), &ctx.caller, pet_id)?;
        Ok(pet)
    }

    /// Inserts a new document after checking the caller against its pet in
    /// the same transaction.
    pub fn create<E: Entity>(&self, ctx: &CallContext, rule: AccessRule, entity: E) -> CoreResult<E> {
        entity.validate()?;
        let started_at = Instant::now();
        let body = encode(&entity)?;
        let result = transact(self.store(), &ctx.cancellation, |tx| {
            let access = self.access_in_tx(tx, &entity, &ctx.caller)?;
            rule.check(access, &ctx.caller, entity.pet_id())?;
            tx.insert(E::COLLECTION, entity.id(), &body)?;
            Ok(())
        });
        log_outcome("entity_create", E::COLLECTION, entity.id(), started_at, &result);
        result.map(|()| entity)
    }

    /// Applies `patch` to the stored document under optimistic concurrency.
    ///
    /// Returns the document as written.
    pub fn update<E, F>(
        &self,
        ctx: &CallContext,
        id: EntityId,
        rule: AccessRule,
        mut patch: F,
    ) -> CoreResult<E>
    where
        E: Entity,
        F: FnMut(E) -> CoreResult<E>,
    {
        let started_at = Instant::now();
        let result = transact(self.store(), &ctx.cancellation, |tx| {
            let current = load_in_tx::<E>(tx, id)?;
            let access = self.access_in_tx(tx, &current, &ctx.caller)?;
            rule.check(access, &ctx.caller, current.pet_id())?;

            let updated = patch(current.clone())?;
            current.check_immutable(&updated)?;
            updated.validate()?;
            tx.set(E::COLLECTION, id, &encode(&updated)?)?;
            Ok(updated)
        });
        log_outcome("entity_update", E::COLLECTION, id, started_at, &result);
        result
    }

    /// Deletes one document; `cascade` runs first in the same transaction.
    pub fn delete<E, F>(
        &self,
        ctx: &CallContext,
        id: EntityId,
        rule: AccessRule,
        mut cascade: F,
    ) -> CoreResult<E>
    where
        E: Entity,
        F: FnMut(&mut dyn DocumentTx, &E) -> CoreResult<()>,
    {
        let started_at = Instant::now();
        let result = transact(self.store(), &ctx.cancellation, |tx| {
            let current = load_in_tx::<E>(tx, id)?;
            let access = self.access_in_tx(tx, &current, &ctx.caller)?;
            rule.check(access, &ctx.caller, current.pet_id())?;

            cascade(tx, &current)?;
            tx.delete(E::COLLECTION, id)?;
            Ok(current)
        });
        log_outcome("entity_delete", E::COLLECTION, id, started_at, &result);
        result
    }

    fn access_in_tx<E: Entity>(
        &self,
        tx: &mut dyn DocumentTx,
        entity: &E,
        caller: &UserId,
    ) -> CoreResult<Access> {
        match entity.as_pet() {
            Some(pet) => Ok(evaluate(pet, caller)),
            None => evaluate_stored(tx, entity.pet_id(), caller).map(|(_, access)| access),
        }
    }

    fn load_pet(&self, pet_id: EntityId) -> CoreResult<Pet> {
        Ok(self
            .store
            .get(Collection::Pets, pet_id)?
            .ok_or_else(|| CoreError::not_found(Collection::Pets, pet_id))?
            .decode()?)
    }
}

fn load_in_tx<E: Entity>(tx: &mut dyn DocumentTx, id: EntityId) -> CoreResult<E> {
    Ok(tx
        .get(E::COLLECTION, id)?
        .ok_or_else(|| CoreError::not_found(E::COLLECTION, id))?
        .decode()?)
}

fn log_outcome<T>(
    event: &str,
    collection: Collection,
    id: EntityId,
    started_at: Instant,
    result: &CoreResult<T>,
) {
    match result {
        Ok(_) => info!(
            "event={} module=engine collection={} id={} status=ok duration_ms={}",
            event,
            collection,
            id,
            started_at.elapsed().as_millis()
        ),
        Err(err) => debug!(
            "event={} module=engine collection={} id={} status=error duration_ms={} error_code={}",
            event,
            collection,
            id,
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}
