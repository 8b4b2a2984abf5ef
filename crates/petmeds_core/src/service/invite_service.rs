//! Invitation use-cases keyed by e-mail address.
//!
//! # Responsibility
//! - Resolve invitees through an `IdentityDirectory` before running the
//!   invite transition.
//! - Join open invites with the owner's display identity.
//!
//! # Invariants
//! - A missing display identity never fails `open_invites`; the invite is
//!   returned without one.

use crate::context::CallContext;
use crate::error::{CoreError, CoreResult};
use crate::model::ids::{EntityId, UserId};
use crate::model::pet::Pet;
use crate::repo::pet_repo::PetRepository;
use parking_lot::RwLock;
use std::collections::HashMap;

/// External lookup between e-mail addresses, user ids and display names.
pub trait IdentityDirectory: Send + Sync {
    fn user_id_for_email(&self, email: &str) -> CoreResult<Option<UserId>>;
    fn display_identity(&self, user_id: &UserId) -> CoreResult<Option<String>>;
}

/// Map-backed directory for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<String, (UserId, String)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `user_id` under `email`. E-mail matching ignores case.
    pub fn register(&self, email: &str, user_id: UserId, display: impl Into<String>) {
        self.entries
            .write()
            .insert(normalize_email(email), (user_id, display.into()));
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn user_id_for_email(&self, email: &str) -> CoreResult<Option<UserId>> {
        Ok(self
            .entries
            .read()
            .get(&normalize_email(email))
            .map(|(user_id, _)| user_id.clone()))
    }

    fn display_identity(&self, user_id: &UserId) -> CoreResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .values()
            .find(|(candidate, _)| candidate == user_id)
            .map(|(_, display)| display.clone()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Open invite as shown to the invitee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetInvite {
    pub pet: Pet,
    pub owner_display: Option<String>,
}

/// Invitation facade over the pet repository.
pub struct InviteService<D: IdentityDirectory> {
    pets: PetRepository,
    directory: D,
}

impl<D: IdentityDirectory> InviteService<D> {
    pub fn new(pets: PetRepository, directory: D) -> Self {
        Self { pets, directory }
    }

    pub fn pets(&self) -> &PetRepository {
        &self.pets
    }

    /// Invites the user registered under `email` to share the pet.
    pub fn invite_by_email(&self, ctx: &CallContext, pet_id: EntityId, email: &str) -> CoreResult<Vec<Pet>> {
        let target = self
            .directory
            .user_id_for_email(email)?
            .ok_or_else(|| CoreError::UnknownIdentity {
                email: email.to_string(),
            })?;
        self.pets.invite(ctx, pet_id, &target)
    }

    /// Pending invites of `user_id` with the owner's display identity.
    pub fn open_invites(&self, user_id: &UserId) -> CoreResult<Vec<PetInvite>> {
        self.pets
            .list_open_invites(user_id)?
            .into_iter()
            .map(|pet| {
                let owner_display = self.directory.display_identity(&pet.owner_id)?;
                Ok(PetInvite { pet, owner_display })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityDirectory, InMemoryDirectory};
    use crate::model::ids::UserId;

    #[test]
    fn directory_matches_email_case_insensitively() {
        let directory = InMemoryDirectory::new();
        let user_id = UserId::new("uid-a").unwrap();
        directory.register("Alice@Example.com", user_id.clone(), "Alice");

        assert_eq!(
            directory.user_id_for_email(" alice@example.com ").unwrap(),
            Some(user_id.clone())
        );
        assert_eq!(
            directory.display_identity(&user_id).unwrap(),
            Some("Alice".to_string())
        );
        assert_eq!(directory.user_id_for_email("bob@example.com").unwrap(), None);
    }
}
