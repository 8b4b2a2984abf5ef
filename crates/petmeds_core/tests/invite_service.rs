use petmeds_core::{
    CallContext, CoreConfig, CoreError, DocumentStore, InMemoryDirectory, InviteService, NewPet,
    PetRepository, Species, SqliteDocumentStore, UserId,
};
use std::sync::Arc;

fn service() -> InviteService<InMemoryDirectory> {
    let config = CoreConfig::default();
    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::open_in_memory(&config.store).unwrap());
    let directory = InMemoryDirectory::new();
    directory.register("owner@example.com", UserId::new("owner").unwrap(), "Olivia");
    directory.register("alice@example.com", UserId::new("alice").unwrap(), "Alice");
    InviteService::new(PetRepository::new(store, &config), directory)
}

fn ctx(user: &str) -> CallContext {
    CallContext::new(UserId::new(user).unwrap())
}

#[test]
fn invite_by_email_creates_open_invite_with_owner_display() {
    let service = service();
    let owner = ctx("owner");
    let alice = ctx("alice");
    let pet_id = service
        .pets()
        .create(
            &owner,
            NewPet {
                name: "Mia".to_string(),
                species: Species::Cat,
                image_ref: None,
            },
        )
        .unwrap()[0]
        .id;

    service
        .invite_by_email(&owner, pet_id, "Alice@Example.com")
        .unwrap();

    let invites = service.open_invites(&alice.caller).unwrap();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].pet.id, pet_id);
    assert_eq!(invites[0].owner_display.as_deref(), Some("Olivia"));
}

#[test]
fn unknown_email_reports_not_found() {
    let service = service();
    let owner = ctx("owner");
    let pet_id = service
        .pets()
        .create(
            &owner,
            NewPet {
                name: "Mia".to_string(),
                species: Species::Cat,
                image_ref: None,
            },
        )
        .unwrap()[0]
        .id;

    let err = service
        .invite_by_email(&owner, pet_id, "nobody@example.com")
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownIdentity { .. }));
    assert_eq!(err.code(), "not_found");
    assert!(service.pets().get(&owner, pet_id).unwrap().shared_with.is_empty());
}
