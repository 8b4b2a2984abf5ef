//! Pet repository and sharing entry points.
//!
//! # Responsibility
//! - Create, read, patch and delete pets through the patch engine.
//! - Drive invite transitions as engine patches so each runs in one transaction.
//!
//! # Invariants
//! - Only the owner deletes a pet; deletion removes its medicines, foods and
//!   to-dos in the same transaction.
//! - Open invites are listed for the invitee even though they grant no
//!   content access.

use super::{decode_all, pet_filter, share_filter, visible_pets, OWNER_FIELD};
use crate::access::AccessRule;
use crate::config::{CoreConfig, InvitePolicy};
use crate::context::CallContext;
use crate::engine::PatchEngine;
use crate::error::{CoreError, CoreResult};
use crate::model::ids::{EntityId, UserId};
use crate::model::pet::{NewPet, Pet, PetDetails, PetPatch};
use crate::model::Collection;
use crate::sharing::{self, InviteDecision};
use crate::store::{DocumentStore, DocumentTx, Filter};
use log::info;
use std::sync::Arc;

const CHILD_COLLECTIONS: [Collection; 3] =
    [Collection::Medicines, Collection::Foods, Collection::ToDos];

pub struct PetRepository {
    engine: PatchEngine,
    invite_policy: InvitePolicy,
}

impl PetRepository {
    pub fn new(store: Arc<dyn DocumentStore>, config: &CoreConfig) -> Self {
        Self {
            engine: PatchEngine::new(store),
            invite_policy: config.invite_policy,
        }
    }

    /// Creates a pet owned by the caller.
    pub fn create(&self, ctx: &CallContext, input: NewPet) -> CoreResult<Vec<Pet>> {
        let pet = Pet::new(ctx.caller.clone(), input);
        self.engine.create(ctx, AccessRule::Member, pet)?;
        self.list_visible(&ctx.caller)
    }

    pub fn get(&self, ctx: &CallContext, pet_id: EntityId) -> CoreResult<Pet> {
        self.engine.load(ctx, pet_id, AccessRule::Member)
    }

    /// Pet plus the ids of its medicines and foods, derived by query.
    pub fn details(&self, ctx: &CallContext, pet_id: EntityId) -> CoreResult<PetDetails> {
        let pet = self.get(ctx, pet_id)?;
        let store = self.engine.store();
        let filter = pet_filter(pet_id);
        let medicine_ids = store
            .query(Collection::Medicines, &filter)?
            .into_iter()
            .map(|document| document.id)
            .collect();
        let food_ids = store
            .query(Collection::Foods, &filter)?
            .into_iter()
            .map(|document| document.id)
            .collect();
        Ok(PetDetails {
            pet,
            medicine_ids,
            food_ids,
        })
    }

    pub fn list_for_owner(&self, user_id: &UserId) -> CoreResult<Vec<Pet>> {
        decode_all(
            self.engine
                .store()
                .query(Collection::Pets, &Filter::field_eq(OWNER_FIELD, user_id.as_str()))?,
        )
    }

    pub fn list_shared_accepted(&self, user_id: &UserId) -> CoreResult<Vec<Pet>> {
        decode_all(
            self.engine
                .store()
                .query(Collection::Pets, &share_filter(user_id, true))?,
        )
    }

    /// Pets with a pending invite for the user.
    pub fn list_open_invites(&self, user_id: &UserId) -> CoreResult<Vec<Pet>> {
        decode_all(
            self.engine
                .store()
                .query(Collection::Pets, &share_filter(user_id, false))?,
        )
    }

    /// Owned pets followed by accepted shared pets.
    pub fn list_visible(&self, user_id: &UserId) -> CoreResult<Vec<Pet>> {
        visible_pets(self.engine.store(), user_id)
    }

    /// Merges descriptive fields into the stored pet.
    pub fn update(&self, ctx: &CallContext, pet_id: EntityId, patch: &PetPatch) -> CoreResult<Vec<Pet>> {
        self.update_with(ctx, pet_id, |mut pet| {
            patch.apply(&mut pet);
            Ok(pet)
        })
    }

    /// Runs an arbitrary patch function. Owner or accepted member only.
    pub fn update_with<F>(&self, ctx: &CallContext, pet_id: EntityId, patch: F) -> CoreResult<Vec<Pet>>
    where
        F: FnMut(Pet) -> CoreResult<Pet>,
    {
        self.patch_under(ctx, pet_id, AccessRule::Member, patch)
    }

    fn patch_under<F>(
        &self,
        ctx: &CallContext,
        pet_id: EntityId,
        rule: AccessRule,
        patch: F,
    ) -> CoreResult<Vec<Pet>>
    where
        F: FnMut(Pet) -> CoreResult<Pet>,
    {
        self.engine.update::<Pet, _>(ctx, pet_id, rule, patch)?;
        self.list_visible(&ctx.caller)
    }

    /// Deletes the pet and its children. Owner only.
    pub fn delete(&self, ctx: &CallContext, pet_id: EntityId) -> CoreResult<Vec<Pet>> {
        self.engine
            .delete::<Pet, _>(ctx, pet_id, AccessRule::OwnerOnly, delete_children)?;
        self.list_visible(&ctx.caller)
    }

    /// Invites `target` to share the pet.
    pub fn invite(&self, ctx: &CallContext, pet_id: EntityId, target: &UserId) -> CoreResult<Vec<Pet>> {
        let policy = self.invite_policy;
        let pets = self.update_with(ctx, pet_id, |pet| {
            if !sharing::may_invite(&pet, &ctx.caller, policy) {
                return Err(CoreError::NoAccess {
                    user_id: ctx.caller.clone(),
                    pet_id,
                });
            }
            sharing::create_invite(pet, target)
        })?;
        info!("event=share_invite module=repo status=ok pet_id={}", pet_id);
        Ok(pets)
    }

    /// Accepts or denies the caller's own open invite.
    pub fn answer_invite(
        &self,
        ctx: &CallContext,
        pet_id: EntityId,
        decision: InviteDecision,
    ) -> CoreResult<Vec<Pet>> {
        let pets = self.patch_under(ctx, pet_id, AccessRule::ShareHolder, |pet| {
            sharing::answer_invite(pet, &ctx.caller, decision)
        })?;
        info!(
            "event=share_answer module=repo status=ok pet_id={} decision={:?}",
            pet_id, decision
        );
        Ok(pets)
    }
}

fn delete_children(tx: &mut dyn DocumentTx, pet: &Pet) -> CoreResult<()> {
    let filter = pet_filter(pet.id);
    for collection in CHILD_COLLECTIONS {
        for document in tx.query(collection, &filter)? {
            tx.delete(collection, document.id)?;
        }
    }
    Ok(())
}
