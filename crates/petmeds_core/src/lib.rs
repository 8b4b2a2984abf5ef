//! Core domain logic for shared pet care records.
//! Access control, sharing and every document mutation live in this crate.

pub mod access;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sharing;
pub mod store;

pub use access::{evaluate, Access, AccessRule};
pub use config::{CoreConfig, InvitePolicy, RetryPolicy, StoreOptions};
pub use context::{CallContext, Cancellation};
pub use engine::{Entity, PatchEngine};
pub use error::{CoreError, CoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::care_item::{
    CareItem, CareItemPatch, CareUnit, Food, FoodUnit, Frequency, Medicine, MedicineUnit,
    NewCareItem,
};
pub use model::ids::{parse_entity_id, EntityId, UserId};
pub use model::pet::{NewPet, Pet, PetDetails, PetPatch, Share, Species};
pub use model::todo::{ToDo, ToDoStatus};
pub use model::{Collection, ValidationError};
pub use repo::care_repo::{CareItemRepository, FoodRepository, MedicineRepository};
pub use repo::pet_repo::PetRepository;
pub use repo::todo_repo::ToDoRepository;
pub use service::invite_service::{IdentityDirectory, InMemoryDirectory, InviteService, PetInvite};
pub use sharing::{InviteDecision, ShareState};
pub use store::{DocumentStore, SqliteDocumentStore, StoreError};

/// Minimal health-check API for embedding layers.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
