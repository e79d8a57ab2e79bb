//! Products and material states.
//!
//! A unit of product is always in exactly one of three storage states.
//! Shelf life is measured from the date the unit *entered* its current
//! state: production for ambient at the manufacturer, the freeze date for
//! frozen, the thaw date for thawed. Thawing restarts the clock.

use crate::ids::ProductId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage state of product mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageState {
    Ambient,
    Frozen,
    Thawed,
}

impl StorageState {
    /// All states, in a fixed order used for deterministic iteration.
    pub const ALL: [StorageState; 3] = [
        StorageState::Ambient,
        StorageState::Frozen,
        StorageState::Thawed,
    ];
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageState::Ambient => write!(f, "ambient"),
            StorageState::Frozen => write!(f, "frozen"),
            StorageState::Thawed => write!(f, "thawed"),
        }
    }
}

/// Shelf life per storage state, in days.
///
/// A unit entering state `s` on day `d` can be consumed on days
/// `d ..= d + L_s - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfLife {
    pub ambient_days: u32,
    pub frozen_days: u32,
    pub thawed_days: u32,
}

impl Default for ShelfLife {
    fn default() -> Self {
        ShelfLife {
            ambient_days: 17,
            frozen_days: 120,
            thawed_days: 14,
        }
    }
}

impl ShelfLife {
    pub fn for_state(&self, state: StorageState) -> u32 {
        match state {
            StorageState::Ambient => self.ambient_days,
            StorageState::Frozen => self.frozen_days,
            StorageState::Thawed => self.thawed_days,
        }
    }
}

/// A stock-keeping unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Canonical SKU id
    pub id: ProductId,
    /// Human-readable name
    pub name: String,
    /// Alternate ids that must resolve to this SKU (legacy codes, pack variants)
    #[serde(default)]
    pub aliases: Vec<ProductId>,
    /// Shelf life per storage state
    #[serde(default)]
    pub shelf_life: ShelfLife,
    /// Production batch granule: output is an integer number of mixes
    pub units_per_mix: u32,
    /// Units per pallet for storage and truck loading
    pub units_per_pallet: u32,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Product {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            shelf_life: ShelfLife::default(),
            units_per_mix: 415,
            units_per_pallet: 320,
        }
    }

    pub fn with_units_per_mix(mut self, units: u32) -> Self {
        self.units_per_mix = units;
        self
    }

    pub fn with_aliases<I: IntoIterator<Item = ProductId>>(mut self, aliases: I) -> Self {
        self.aliases = aliases.into_iter().collect();
        self
    }

    pub fn with_shelf_life(mut self, shelf_life: ShelfLife) -> Self {
        self.shelf_life = shelf_life;
        self
    }

    /// Shelf life in days for a given state.
    pub fn shelf_life_days(&self, state: StorageState) -> u32 {
        self.shelf_life.for_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shelf_life() {
        let p = Product::new("176283", "White Sandwich");
        assert_eq!(p.shelf_life_days(StorageState::Ambient), 17);
        assert_eq!(p.shelf_life_days(StorageState::Frozen), 120);
        assert_eq!(p.shelf_life_days(StorageState::Thawed), 14);
    }

    #[test]
    fn test_builder_methods() {
        let p = Product::new("p1", "P1")
            .with_units_per_mix(100)
            .with_aliases([ProductId::new("p1-old")]);
        assert_eq!(p.units_per_mix, 100);
        assert_eq!(p.aliases.len(), 1);
        assert_eq!(p.units_per_pallet, 320);
    }

    #[test]
    fn test_state_order_is_stable() {
        assert_eq!(StorageState::ALL[0], StorageState::Ambient);
        assert!(StorageState::Ambient < StorageState::Frozen);
    }
}
