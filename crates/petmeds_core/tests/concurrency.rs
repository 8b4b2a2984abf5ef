use petmeds_core::{
    CallContext, Cancellation, CoreConfig, CoreError, DocumentStore, InviteDecision, NewPet,
    PetPatch, PetRepository, Species, SqliteDocumentStore, StoreError, UserId,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn file_repo(dir: &tempfile::TempDir) -> PetRepository {
    let config = CoreConfig::default();
    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteDocumentStore::open(dir.path().join("petmeds.db"), &config.store).unwrap(),
    );
    PetRepository::new(store, &config)
}

fn ctx(user: &str) -> CallContext {
    CallContext::new(UserId::new(user).unwrap())
}

fn new_pet() -> NewPet {
    NewPet {
        name: "Rex".to_string(),
        species: Species::Dog,
        image_ref: None,
    }
}

#[test]
fn concurrent_patches_to_different_fields_both_commit() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_repo(&dir);
    let owner = ctx("owner");
    let pet_id = repo.create(&owner, new_pet()).unwrap()[0].id;

    let barrier = Barrier::new(2);
    thread::scope(|scope| {
        scope.spawn(|| {
            barrier.wait();
            let patch = PetPatch {
                name: Some("Rexy".to_string()),
                ..PetPatch::default()
            };
            repo.update(&owner, pet_id, &patch).unwrap();
        });
        scope.spawn(|| {
            barrier.wait();
            let patch = PetPatch {
                species: Some(Species::Cat),
                ..PetPatch::default()
            };
            repo.update(&owner, pet_id, &patch).unwrap();
        });
    });

    let pet = repo.get(&owner, pet_id).unwrap();
    assert_eq!(pet.name, "Rexy");
    assert_eq!(pet.species, Species::Cat);
}

#[test]
fn concurrent_invites_are_each_applied_exactly_once() {
    const INVITEES: usize = 6;

    let dir = tempfile::tempdir().unwrap();
    let repo = file_repo(&dir);
    let owner = ctx("owner");
    let pet_id = repo.create(&owner, new_pet()).unwrap()[0].id;
    let invitees: Vec<CallContext> = (0..INVITEES).map(|i| ctx(&format!("user-{i}"))).collect();

    let barrier = Barrier::new(INVITEES);
    thread::scope(|scope| {
        for invitee in &invitees {
            let (repo, owner, barrier) = (&repo, &owner, &barrier);
            scope.spawn(move || {
                barrier.wait();
                repo.invite(owner, pet_id, &invitee.caller).unwrap();
                repo.answer_invite(invitee, pet_id, InviteDecision::Accept)
                    .unwrap();
            });
        }
    });

    let pet = repo.get(&owner, pet_id).unwrap();
    assert_eq!(pet.shared_with.len(), INVITEES);
    assert!(pet.shared_with.iter().all(|share| share.accepted));
    for invitee in &invitees {
        assert!(pet.share_for(&invitee.caller).is_some());
    }
}

#[test]
fn cancelled_call_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let repo = file_repo(&dir);
    let owner = ctx("owner");
    let pet_id = repo.create(&owner, new_pet()).unwrap()[0].id;

    let cancellation = Cancellation::new();
    let cancelled = CallContext::with_cancellation(owner.caller.clone(), cancellation.clone());
    let result = repo.update_with(&cancelled, pet_id, |mut pet| {
        pet.name = "Renamed".to_string();
        cancellation.cancel();
        Ok(pet)
    });

    assert!(matches!(
        result,
        Err(CoreError::Storage(StoreError::Cancelled))
    ));
    assert_eq!(repo.get(&owner, pet_id).unwrap().name, "Rex");
}
