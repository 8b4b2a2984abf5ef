//! Access evaluation against the pet sharing relation.
//!
//! # Invariants
//! - Owner is decided by `owner_id` alone; `shared_with` never grants ownership.
//! - A pending share grants no content access; it only makes the pet visible
//!   as an open invite and lets the invitee answer it.

use crate::error::{CoreError, CoreResult};
use crate::model::ids::{EntityId, UserId};
use crate::model::pet::Pet;
use crate::model::Collection;
use crate::store::DocumentTx;

/// Relation of one caller to one pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    SharedAccepted,
    SharedPending,
    NoAccess,
}

/// Evaluates the caller's relation to `pet`.
pub fn evaluate(pet: &Pet, caller: &UserId) -> Access {
    if &pet.owner_id == caller {
        return Access::Owner;
    }
    match pet.share_for(caller) {
        Some(share) if share.accepted => Access::SharedAccepted,
        Some(_) => Access::SharedPending,
        None => Access::NoAccess,
    }
}

/// Loads the pet inside `tx` and evaluates the caller's relation to it.
///
/// A missing pet or a storage failure is surfaced as-is, never as `NoAccess`.
pub fn evaluate_stored(
    tx: &mut dyn DocumentTx,
    pet_id: EntityId,
    caller: &UserId,
) -> CoreResult<(Pet, Access)> {
    let pet: Pet = tx
        .get(Collection::Pets, pet_id)?
        .ok_or_else(|| CoreError::not_found(Collection::Pets, pet_id))?
        .decode()?;
    let access = evaluate(&pet, caller);
    Ok((pet, access))
}

/// Which relations an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    /// Owner or accepted member: read/modify pet content and children.
    Member,
    /// Owner only: deleting the pet.
    OwnerOnly,
    /// Listed in `shared_with`, pending or accepted: answering an invite.
    ShareHolder,
}

impl AccessRule {
    pub fn permits(self, access: Access) -> bool {
        match self {
            Self::Member => matches!(access, Access::Owner | Access::SharedAccepted),
            Self::OwnerOnly => access == Access::Owner,
            Self::ShareHolder => {
                matches!(access, Access::SharedPending | Access::SharedAccepted)
            }
        }
    }

    /// Fails with `NoAccess` unless `access` satisfies this rule.
    pub fn check(self, access: Access, caller: &UserId, pet_id: EntityId) -> CoreResult<()> {
        if self.permits(access) {
            return Ok(());
        }
        Err(CoreError::NoAccess {
            user_id: caller.clone(),
            pet_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluate, Access, AccessRule};
    use crate::model::ids::UserId;
    use crate::model::pet::{NewPet, Pet, Share, Species};

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap()
    }

    fn pet_with_shares(shares: &[(&str, bool)]) -> Pet {
        let mut pet = Pet::new(
            user("owner"),
            NewPet {
                name: "Rex".to_string(),
                species: Species::Dog,
                image_ref: None,
            },
        );
        pet.shared_with = shares
            .iter()
            .map(|(id, accepted)| Share {
                user_id: user(id),
                accepted: *accepted,
            })
            .collect();
        pet
    }

    #[test]
    fn evaluates_each_relation() {
        let pet = pet_with_shares(&[("accepted", true), ("pending", false)]);

        assert_eq!(evaluate(&pet, &user("owner")), Access::Owner);
        assert_eq!(evaluate(&pet, &user("accepted")), Access::SharedAccepted);
        assert_eq!(evaluate(&pet, &user("pending")), Access::SharedPending);
        assert_eq!(evaluate(&pet, &user("stranger")), Access::NoAccess);
    }

    #[test]
    fn pending_share_grants_no_content_access() {
        assert!(!AccessRule::Member.permits(Access::SharedPending));
        assert!(AccessRule::ShareHolder.permits(Access::SharedPending));
        assert!(!AccessRule::ShareHolder.permits(Access::Owner));
        assert!(!AccessRule::ShareHolder.permits(Access::NoAccess));
    }

    #[test]
    fn only_owner_passes_owner_rule() {
        assert!(AccessRule::OwnerOnly.permits(Access::Owner));
        assert!(!AccessRule::OwnerOnly.permits(Access::SharedAccepted));
        assert!(AccessRule::Member.permits(Access::SharedAccepted));
    }
}
