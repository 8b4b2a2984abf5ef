use petmeds_core::store::Filter;
use petmeds_core::{
    CallContext, CareItemPatch, Collection, CoreConfig, CoreError, DocumentStore, EntityId,
    FoodRepository, FoodUnit, Frequency, InviteDecision, MedicineRepository, MedicineUnit,
    NewCareItem, NewPet, PetRepository, Species, SqliteDocumentStore, ToDoRepository, UserId,
    ValidationError,
};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    store: Arc<dyn DocumentStore>,
    pets: PetRepository,
    medicines: MedicineRepository,
    foods: FoodRepository,
    todos: ToDoRepository,
}

fn fixture() -> Fixture {
    let config = CoreConfig::default();
    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::open_in_memory(&config.store).unwrap());
    Fixture {
        pets: PetRepository::new(store.clone(), &config),
        medicines: MedicineRepository::new(store.clone()),
        foods: FoodRepository::new(store.clone()),
        todos: ToDoRepository::new(store.clone()),
        store,
    }
}

fn ctx(user: &str) -> CallContext {
    CallContext::new(UserId::new(user).unwrap())
}

fn create_pet(fixture: &Fixture, owner: &CallContext, name: &str) -> EntityId {
    let visible = fixture
        .pets
        .create(
            owner,
            NewPet {
                name: name.to_string(),
                species: Species::Dog,
                image_ref: None,
            },
        )
        .unwrap();
    visible.iter().find(|pet| pet.name == name).unwrap().id
}

fn new_medicine(name: &str, stock_level: u32) -> NewCareItem<MedicineUnit> {
    NewCareItem {
        name: name.to_string(),
        dosage_amount: 1,
        unit: MedicineUnit::Pills,
        stock_level,
        frequencies: vec![Frequency::new("08:00", None), Frequency::new("20:00", Some(2))],
    }
}

#[test]
fn medicine_access_follows_the_parent_pet() {
    let fixture = fixture();
    let owner = ctx("owner");
    let alice = ctx("alice");
    let pet_id = create_pet(&fixture, &owner, "Rex");

    let items = fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Apoquel", 30))
        .unwrap();
    assert_eq!(items.len(), 1);
    let medicine_id = items[0].id;

    assert!(matches!(
        fixture.medicines.get(&alice, medicine_id),
        Err(CoreError::NoAccess { .. })
    ));
    assert!(matches!(
        fixture.medicines.list_for_pet(&alice, pet_id),
        Err(CoreError::NoAccess { .. })
    ));
    assert!(matches!(
        fixture.medicines.create(&alice, pet_id, new_medicine("Other", 1)),
        Err(CoreError::NoAccess { .. })
    ));

    fixture.pets.invite(&owner, pet_id, &alice.caller).unwrap();
    assert!(matches!(
        fixture.medicines.get(&alice, medicine_id),
        Err(CoreError::NoAccess { .. })
    ));

    fixture
        .pets
        .answer_invite(&alice, pet_id, InviteDecision::Accept)
        .unwrap();
    let loaded = fixture.medicines.get(&alice, medicine_id).unwrap();
    assert_eq!(loaded.creator_id, owner.caller);

    let items = fixture
        .medicines
        .create(&alice, pet_id, new_medicine("Vetmedin", 10))
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(fixture.medicines.list_for_owner(&alice.caller).unwrap().len(), 1);
}

#[test]
fn creating_under_missing_pet_reports_not_found() {
    let fixture = fixture();
    let owner = ctx("owner");

    let err = fixture
        .medicines
        .create(&owner, Uuid::new_v4(), new_medicine("Apoquel", 30))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotFound {
            collection: Collection::Pets,
            ..
        }
    ));
}

#[test]
fn sparse_patch_never_overwrites_with_zero_or_empty() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");
    let medicine_id = fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Rex", 5))
        .unwrap()[0]
        .id;
    let before = fixture.medicines.get(&owner, medicine_id).unwrap();

    let patch = CareItemPatch::from_sparse("", 0, None, 0, Vec::new());
    fixture.medicines.update(&owner, medicine_id, &patch).unwrap();
    assert_eq!(fixture.medicines.get(&owner, medicine_id).unwrap(), before);

    let explicit = CareItemPatch {
        stock_level: Some(0),
        ..CareItemPatch::default()
    };
    let items = fixture.medicines.update(&owner, medicine_id, &explicit).unwrap();
    assert_eq!(items[0].stock_level, 0);
    assert_eq!(items[0].name, "Rex");
}

#[test]
fn patch_cannot_move_item_to_another_pet() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");
    let other_pet = create_pet(&fixture, &owner, "Mia");
    assert_ne!(pet_id, other_pet);
    let medicine_id = fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Apoquel", 5))
        .unwrap()[0]
        .id;

    let result = fixture.medicines.update_with(&owner, medicine_id, |mut item| {
        item.pet_id = other_pet;
        Ok(item)
    });
    assert!(matches!(
        result,
        Err(CoreError::Validation(ValidationError::ImmutableField("petId")))
    ));
}

#[test]
fn invalid_frequency_is_rejected() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");
    let mut input = new_medicine("Apoquel", 5);
    input.frequencies = vec![Frequency::new("8:00", None)];

    assert!(matches!(
        fixture.medicines.create(&owner, pet_id, input),
        Err(CoreError::Validation(ValidationError::InvalidTime(_)))
    ));
}

#[test]
fn food_and_medicine_live_in_separate_collections() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");

    fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Apoquel", 5))
        .unwrap();
    let foods = fixture
        .foods
        .create(
            &owner,
            pet_id,
            NewCareItem {
                name: "Dry food".to_string(),
                dosage_amount: 80,
                unit: FoodUnit::Gramms,
                stock_level: 2,
                frequencies: Vec::new(),
            },
        )
        .unwrap();

    assert_eq!(foods.len(), 1);
    assert_eq!(fixture.medicines.list_for_pet(&owner, pet_id).unwrap().len(), 1);

    let details = fixture.pets.details(&owner, pet_id).unwrap();
    assert_eq!(details.medicine_ids.len(), 1);
    assert_eq!(details.food_ids, vec![foods[0].id]);

    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["name"], "Rex");
    assert_eq!(json["ownerId"], "owner");
    assert_eq!(json["foodIds"][0], foods[0].id.to_string());
}

#[test]
fn deleting_item_returns_remaining_items_of_the_pet() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");
    fixture
        .medicines
        .create(&owner, pet_id, new_medicine("First", 5))
        .unwrap();
    let items = fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Second", 5))
        .unwrap();

    let remaining = fixture.medicines.delete(&owner, items[0].id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, items[1].id);
}

#[test]
fn deleting_pet_cascades_to_children() {
    let fixture = fixture();
    let owner = ctx("owner");
    let pet_id = create_pet(&fixture, &owner, "Rex");
    let kept_pet = create_pet(&fixture, &owner, "Mia");
    assert_ne!(pet_id, kept_pet);

    fixture
        .medicines
        .create(&owner, pet_id, new_medicine("Apoquel", 5))
        .unwrap();
    fixture
        .medicines
        .create(&owner, kept_pet, new_medicine("Kept", 5))
        .unwrap();
    fixture
        .todos
        .create(&owner, pet_id, "Buy more food", i64::MAX)
        .unwrap();

    fixture.pets.delete(&owner, pet_id).unwrap();

    let medicines = fixture
        .store
        .query(Collection::Medicines, &Filter::All)
        .unwrap();
    assert_eq!(medicines.len(), 1);
    assert_eq!(medicines[0].body["petId"], kept_pet.to_string());
    assert!(fixture
        .store
        .query(Collection::ToDos, &Filter::All)
        .unwrap()
        .is_empty());
}
