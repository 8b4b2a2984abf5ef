//! ToDo reminder repository.
//!
//! # Invariants
//! - A to-do is reachable only through a pet the caller is a member of.
//! - `purge_expired` removes every reminder whose `deleteAfter` has passed in
//!   one transaction, regardless of caller.

use super::{decode_all, pet_filter, visible_pets};
use crate::access::AccessRule;
use crate::context::{CallContext, Cancellation};
use crate::engine::PatchEngine;
use crate::error::CoreResult;
use crate::model::ids::{EntityId, UserId};
use crate::model::todo::{ToDo, ToDoStatus};
use crate::model::Collection;
use crate::store::{transact, DocumentStore, Filter};
use log::info;
use std::sync::Arc;

pub struct ToDoRepository {
    engine: PatchEngine,
}

impl ToDoRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            engine: PatchEngine::new(store),
        }
    }

    pub fn create(
        &self,
        ctx: &CallContext,
        pet_id: EntityId,
        text: &str,
        delete_after: i64,
    ) -> CoreResult<Vec<ToDo>> {
        let todo = ToDo::new(ctx.caller.clone(), pet_id, text, delete_after);
        self.engine.create(ctx, AccessRule::Member, todo)?;
        self.list_for_user(&ctx.caller)
    }

    /// Reminders of every pet visible to `user_id`, grouped by pet.
    pub fn list_for_user(&self, user_id: &UserId) -> CoreResult<Vec<ToDo>> {
        let store = self.engine.store();
        let mut todos = Vec::new();
        for pet in visible_pets(store, user_id)? {
            todos.extend(decode_all::<ToDo>(
                store.query(Collection::ToDos, &pet_filter(pet.id))?,
            )?);
        }
        Ok(todos)
    }

    pub fn list_for_pet(&self, ctx: &CallContext, pet_id: EntityId) -> CoreResult<Vec<ToDo>> {
        self.engine.authorize_pet(ctx, pet_id, AccessRule::Member)?;
        decode_all(self.engine.store().query(Collection::ToDos, &pet_filter(pet_id))?)
    }

    pub fn set_status(&self, ctx: &CallContext, id: EntityId, status: ToDoStatus) -> CoreResult<Vec<ToDo>> {
        self.engine
            .update::<ToDo, _>(ctx, id, AccessRule::Member, |mut todo| {
                todo.status = status;
                Ok(todo)
            })?;
        self.list_for_user(&ctx.caller)
    }

    pub fn delete(&self, ctx: &CallContext, id: EntityId) -> CoreResult<Vec<ToDo>> {
        self.engine
            .delete::<ToDo, _>(ctx, id, AccessRule::Member, |_, _| Ok(()))?;
        self.list_for_user(&ctx.caller)
    }

    /// Deletes reminders with `deleteAfter <= now_ms`. Returns how many went.
    pub fn purge_expired(&self, cancellation: &Cancellation, now_ms: i64) -> CoreResult<usize> {
        let purged = transact(self.engine.store(), cancellation, |tx| {
            let mut purged = 0;
            for document in tx.query(Collection::ToDos, &Filter::All)? {
                let todo: ToDo = document.decode()?;
                if todo.is_expired(now_ms) && tx.delete(Collection::ToDos, todo.id)? {
                    purged += 1;
                }
            }
            Ok(purged)
        })?;
        info!("event=todo_purge module=repo status=ok purged={}", purged);
        Ok(purged)
    }
}
