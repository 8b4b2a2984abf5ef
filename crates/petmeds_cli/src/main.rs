//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `petmeds_core` linkage and store wiring without a request layer.
//! - Keep output deterministic for quick local sanity checks.

use petmeds_core::{
    CallContext, CoreConfig, NewPet, PetRepository, Species, SqliteDocumentStore, UserId,
};
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    println!("petmeds_core ping={}", petmeds_core::ping());
    println!("petmeds_core version={}", petmeds_core::core_version());

    let config = CoreConfig::default();
    let store = Arc::new(SqliteDocumentStore::open_in_memory(&config.store)?);
    let pets = PetRepository::new(store, &config);
    let ctx = CallContext::new(UserId::new("cli-smoke")?);

    let visible = pets.create(
        &ctx,
        NewPet {
            name: "Smoke".to_string(),
            species: Species::Other,
            image_ref: None,
        },
    )?;
    println!("petmeds_core pets={}", visible.len());
    Ok(())
}
