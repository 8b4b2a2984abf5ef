//! Medicine and food repositories.
//!
//! Both kinds go through one generic repository; access is always derived
//! from the live parent pet, never from the item's creator.

use super::{decode_all, pet_filter, CREATOR_FIELD};
use crate::access::AccessRule;
use crate::context::CallContext;
use crate::engine::PatchEngine;
use crate::error::CoreResult;
use crate::model::care_item::{CareItem, CareItemPatch, CareUnit, FoodUnit, MedicineUnit, NewCareItem};
use crate::model::ids::{EntityId, UserId};
use crate::store::{DocumentStore, Filter};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct CareItemRepository<U> {
    engine: PatchEngine,
    _unit: PhantomData<U>,
}

pub type MedicineRepository = CareItemRepository<MedicineUnit>;
pub type FoodRepository = CareItemRepository<FoodUnit>;

impl<U: CareUnit> CareItemRepository<U> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            engine: PatchEngine::new(store),
            _unit: PhantomData,
        }
    }

    /// Creates an item under `pet_id`; the caller must be a member of the pet.
    pub fn create(
        &self,
        ctx: &CallContext,
        pet_id: EntityId,
        input: NewCareItem<U>,
    ) -> CoreResult<Vec<CareItem<U>>> {
        let item = CareItem::new(ctx.caller.clone(), pet_id, input);
        self.engine.create(ctx, AccessRule::Member, item)?;
        self.list_for_pet(ctx, pet_id)
    }

    pub fn get(&self, ctx: &CallContext, id: EntityId) -> CoreResult<CareItem<U>> {
        self.engine.load(ctx, id, AccessRule::Member)
    }

    /// Items of one pet. Access is checked before any row is returned.
    pub fn list_for_pet(&self, ctx: &CallContext, pet_id: EntityId) -> CoreResult<Vec<CareItem<U>>> {
        self.engine.authorize_pet(ctx, pet_id, AccessRule::Member)?;
        decode_all(self.engine.store().query(U::COLLECTION, &pet_filter(pet_id))?)
    }

    /// Items created by `user_id`, across every pet.
    pub fn list_for_owner(&self, user_id: &UserId) -> CoreResult<Vec<CareItem<U>>> {
        decode_all(
            self.engine
                .store()
                .query(U::COLLECTION, &Filter::field_eq(CREATOR_FIELD, user_id.as_str()))?,
        )
    }

    pub fn update(
        &self,
        ctx: &CallContext,
        id: EntityId,
        patch: &CareItemPatch<U>,
    ) -> CoreResult<Vec<CareItem<U>>> {
        self.update_with(ctx, id, |mut item| {
            patch.apply(&mut item);
            Ok(item)
        })
    }

    pub fn update_with<F>(&self, ctx: &CallContext, id: EntityId, patch: F) -> CoreResult<Vec<CareItem<U>>>
    where
        F: FnMut(CareItem<U>) -> CoreResult<CareItem<U>>,
    {
        let updated = self.engine.update(ctx, id, AccessRule::Member, patch)?;
        self.list_for_pet(ctx, updated.pet_id)
    }

    pub fn delete(&self, ctx: &CallContext, id: EntityId) -> CoreResult<Vec<CareItem<U>>> {
        let removed: CareItem<U> =
            self.engine
                .delete(ctx, id, AccessRule::Member, |_, _: &CareItem<U>| Ok(()))?;
        self.list_for_pet(ctx, removed.pet_id)
    }
}
