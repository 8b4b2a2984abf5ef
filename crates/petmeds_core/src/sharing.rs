//! Sharing invitation state machine.
//!
//! Per `(pet, user)` pair: `NoRelation -> Pending -> Accepted`, and
//! `Pending -> NoRelation` on deny. Transitions are pure functions over a
//! `Pet`; callers drive them through the patch engine so that each one runs
//! inside a single store transaction.

use crate::access::{evaluate, Access};
use crate::config::InvitePolicy;
use crate::error::{CoreError, CoreResult};
use crate::model::ids::UserId;
use crate::model::pet::{Pet, Share};
use crate::model::ValidationError;

/// Invitee's reply to an open invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteDecision {
    Accept,
    Deny,
}

/// Relation state of one user to one pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareState {
    NoRelation,
    Pending,
    Accepted,
}

pub fn share_state(pet: &Pet, user_id: &UserId) -> ShareState {
    match pet.share_for(user_id) {
        Some(share) if share.accepted => ShareState::Accepted,
        Some(_) => ShareState::Pending,
        None => ShareState::NoRelation,
    }
}

/// Whether `inviter` may create invites under `policy`.
pub fn may_invite(pet: &Pet, inviter: &UserId, policy: InvitePolicy) -> bool {
    match (policy, evaluate(pet, inviter)) {
        (_, Access::Owner) => true,
        (InvitePolicy::AnyMember, Access::SharedAccepted) => true,
        _ => false,
    }
}

/// `NoRelation -> Pending` for `target`.
pub fn create_invite(mut pet: Pet, target: &UserId) -> CoreResult<Pet> {
    if &pet.owner_id == target {
        return Err(ValidationError::OwnerCannotBeInvited.into());
    }
    if share_state(&pet, target) != ShareState::NoRelation {
        return Err(CoreError::AlreadyInvited {
            user_id: target.clone(),
            pet_id: pet.id,
        });
    }
    pet.shared_with.push(Share {
        user_id: target.clone(),
        accepted: false,
    });
    Ok(pet)
}

/// `Pending -> Accepted` on accept, `Pending -> NoRelation` on deny.
pub fn answer_invite(mut pet: Pet, user_id: &UserId, decision: InviteDecision) -> CoreResult<Pet> {
    let position = pet
        .shared_with
        .iter()
        .position(|share| &share.user_id == user_id && !share.accepted)
        .ok_or_else(|| CoreError::NoOpenInvite {
            user_id: user_id.clone(),
            pet_id: pet.id,
        })?;

    match decision {
        InviteDecision::Accept => pet.shared_with[position].accepted = true,
        InviteDecision::Deny => {
            pet.shared_with.remove(position);
        }
    }
    Ok(pet)
}

#[cfg(test)]
mod tests {
    use super::{answer_invite, create_invite, may_invite, share_state, InviteDecision, ShareState};
    use crate::config::InvitePolicy;
    use crate::error::CoreError;
    use crate::model::ids::UserId;
    use crate::model::pet::{NewPet, Pet, Species};
    use crate::model::ValidationError;

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap()
    }

    fn pet() -> Pet {
        Pet::new(
            user("owner"),
            NewPet {
                name: "Mia".to_string(),
                species: Species::Cat,
                image_ref: None,
            },
        )
    }

    #[test]
    fn invite_then_accept_reaches_accepted() {
        let a = user("a");
        let pet = create_invite(pet(), &a).unwrap();
        assert_eq!(share_state(&pet, &a), ShareState::Pending);

        let pet = answer_invite(pet, &a, InviteDecision::Accept).unwrap();
        assert_eq!(share_state(&pet, &a), ShareState::Accepted);
        assert_eq!(pet.shared_with.len(), 1);
    }

    #[test]
    fn invite_fails_while_pending_or_accepted() {
        let a = user("a");
        let pending = create_invite(pet(), &a).unwrap();
        assert!(matches!(
            create_invite(pending.clone(), &a),
            Err(CoreError::AlreadyInvited { .. })
        ));

        let accepted = answer_invite(pending, &a, InviteDecision::Accept).unwrap();
        assert!(matches!(
            create_invite(accepted, &a),
            Err(CoreError::AlreadyInvited { .. })
        ));
    }

    #[test]
    fn deny_removes_relation_and_allows_reinvite() {
        let a = user("a");
        let pet = create_invite(pet(), &a).unwrap();
        let pet = answer_invite(pet, &a, InviteDecision::Deny).unwrap();
        assert_eq!(share_state(&pet, &a), ShareState::NoRelation);
        assert!(pet.shared_with.is_empty());

        let pet = create_invite(pet, &a).unwrap();
        assert_eq!(share_state(&pet, &a), ShareState::Pending);
    }

    #[test]
    fn second_accept_finds_no_open_invite() {
        let a = user("a");
        let pet = create_invite(pet(), &a).unwrap();
        let pet = answer_invite(pet, &a, InviteDecision::Accept).unwrap();

        assert!(matches!(
            answer_invite(pet, &a, InviteDecision::Accept),
            Err(CoreError::NoOpenInvite { .. })
        ));
    }

    #[test]
    fn owner_cannot_be_invited() {
        let err = create_invite(pet(), &user("owner")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OwnerCannotBeInvited)
        ));
    }

    #[test]
    fn invite_policy_controls_member_invites() {
        let a = user("a");
        let pet = create_invite(pet(), &a).unwrap();
        assert!(!may_invite(&pet, &a, InvitePolicy::AnyMember));

        let pet = answer_invite(pet, &a, InviteDecision::Accept).unwrap();
        assert!(may_invite(&pet, &a, InvitePolicy::AnyMember));
        assert!(!may_invite(&pet, &a, InvitePolicy::OwnerOnly));
        assert!(may_invite(&pet, &user("owner"), InvitePolicy::OwnerOnly));
    }
}
