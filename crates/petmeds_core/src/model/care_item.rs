//! Medicine and food documents.
//!
//! Both kinds share one shape and differ only in their unit enum, so they are
//! modelled as `CareItem<U>` with `Medicine` and `Food` aliases.
//!
//! # Invariants
//! - `pet_id` and `creator_id` are fixed at creation.
//! - Frequency times are `HH:MM` (24h); `every_n_days` is at least 1 when set.

use super::ids::{EntityId, UserId};
use super::pet::non_empty;
use super::{Collection, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

/// Unit enum of one care item kind; also selects the backing collection.
pub trait CareUnit:
    Copy + Eq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const COLLECTION: Collection;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicineUnit {
    Pills,
    Millilitres,
    Units,
    Gramms,
    Other,
}

impl CareUnit for MedicineUnit {
    const COLLECTION: Collection = Collection::Medicines;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodUnit {
    Gramms,
    Bags,
    Cans,
    Other,
}

impl CareUnit for FoodUnit {
    const COLLECTION: Collection = Collection::Foods;
}

/// One scheduled time of day, optionally repeating every N days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frequency {
    pub id: EntityId,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every_n_days: Option<u32>,
}

impl Frequency {
    pub fn new(time: impl Into<String>, every_n_days: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: time.into(),
            every_n_days,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !TIME_OF_DAY_RE.is_match(&self.time) {
            return Err(ValidationError::InvalidTime(self.time.clone()));
        }
        if self.every_n_days == Some(0) {
            return Err(ValidationError::InvalidInterval);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareItem<U> {
    pub id: EntityId,
    pub creator_id: UserId,
    pub pet_id: EntityId,
    pub name: String,
    pub dosage_amount: u32,
    pub unit: U,
    pub stock_level: u32,
    #[serde(default)]
    pub frequencies: Vec<Frequency>,
}

pub type Medicine = CareItem<MedicineUnit>;
pub type Food = CareItem<FoodUnit>;

/// Creation input; id, creator and parent pet are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCareItem<U> {
    pub name: String,
    pub dosage_amount: u32,
    pub unit: U,
    pub stock_level: u32,
    pub frequencies: Vec<Frequency>,
}

impl<U: CareUnit> CareItem<U> {
    pub fn new(creator_id: UserId, pet_id: EntityId, input: NewCareItem<U>) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator_id,
            pet_id,
            name: input.name,
            dosage_amount: input.dosage_amount,
            unit: input.unit,
            stock_level: input.stock_level,
            frequencies: input.frequencies,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField("name"));
        }
        for frequency in &self.frequencies {
            frequency.validate()?;
        }
        Ok(())
    }
}

/// Partial update for a care item; `None` means "not supplied".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareItemPatch<U> {
    pub name: Option<String>,
    pub dosage_amount: Option<u32>,
    pub unit: Option<U>,
    pub stock_level: Option<u32>,
    pub frequencies: Option<Vec<Frequency>>,
}

impl<U> Default for CareItemPatch<U> {
    fn default() -> Self {
        Self {
            name: None,
            dosage_amount: None,
            unit: None,
            stock_level: None,
            frequencies: None,
        }
    }
}

impl<U: CareUnit> CareItemPatch<U> {
    /// Builds a patch from a payload where zero, empty string and empty list
    /// mean "not supplied". Such a payload cannot set stock to zero; use the
    /// struct fields directly for that.
    pub fn from_sparse(
        name: &str,
        dosage_amount: u32,
        unit: Option<U>,
        stock_level: u32,
        frequencies: Vec<Frequency>,
    ) -> Self {
        Self {
            name: non_empty(name),
            dosage_amount: (dosage_amount != 0).then_some(dosage_amount),
            unit,
            stock_level: (stock_level != 0).then_some(stock_level),
            frequencies: (!frequencies.is_empty()).then_some(frequencies),
        }
    }

    /// Merges supplied fields into `item`. Returns whether anything changed.
    pub fn apply(&self, item: &mut CareItem<U>) -> bool {
        let mut changed = false;
        if let Some(name) = self.name.as_ref().filter(|value| **value != item.name) {
            item.name = name.clone();
            changed = true;
        }
        if let Some(dosage) = self.dosage_amount.filter(|value| *value != item.dosage_amount) {
            item.dosage_amount = dosage;
            changed = true;
        }
        if let Some(unit) = self.unit.filter(|value| *value != item.unit) {
            item.unit = unit;
            changed = true;
        }
        if let Some(stock) = self.stock_level.filter(|value| *value != item.stock_level) {
            item.stock_level = stock;
            changed = true;
        }
        if let Some(frequencies) = self
            .frequencies
            .as_ref()
            .filter(|value| **value != item.frequencies)
        {
            item.frequencies = frequencies.clone();
            changed = true;
        }
        changed
    }
}
