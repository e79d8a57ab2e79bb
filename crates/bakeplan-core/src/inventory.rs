//! Initial inventory snapshot.
//!
//! On-hand stock per (node, product, state) as of `snapshot_date`. The
//! true age of snapshot stock is unknown; for display a production date
//! is synthesized at half the state's shelf life before the snapshot.
//! That synthesis never feeds the optimization.

use crate::ids::{NodeId, ProductId};
use crate::product::{ShelfLife, StorageState};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub node: NodeId,
    pub product: ProductId,
    pub state: StorageState,
    pub quantity: f64,
}

impl InventoryEntry {
    pub fn new(
        node: impl Into<NodeId>,
        product: impl Into<ProductId>,
        state: StorageState,
        quantity: f64,
    ) -> Self {
        InventoryEntry {
            node: node.into(),
            product: product.into(),
            state,
            quantity,
        }
    }
}

/// The snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialInventory {
    pub snapshot_date: NaiveDate,
    pub entries: Vec<InventoryEntry>,
}

impl InitialInventory {
    pub fn empty(snapshot_date: NaiveDate) -> Self {
        InitialInventory {
            snapshot_date,
            entries: Vec::new(),
        }
    }

    pub fn new(snapshot_date: NaiveDate, entries: Vec<InventoryEntry>) -> Self {
        InitialInventory {
            snapshot_date,
            entries,
        }
    }

    /// Quantity on hand for a (node, product, state), summing duplicate rows.
    pub fn quantity(&self, node: &NodeId, product: &ProductId, state: StorageState) -> f64 {
        self.entries
            .iter()
            .filter(|e| &e.node == node && &e.product == product && e.state == state)
            .map(|e| e.quantity)
            .sum()
    }

    /// Snapshot aggregated into a deterministic map.
    pub fn by_key(&self) -> BTreeMap<(NodeId, ProductId, StorageState), f64> {
        let mut map = BTreeMap::new();
        for e in &self.entries {
            *map.entry((e.node.clone(), e.product.clone(), e.state))
                .or_insert(0.0) += e.quantity;
        }
        map
    }

    /// Display-only estimated production date for snapshot stock in `state`:
    /// half the shelf life back from the snapshot, at least one day.
    pub fn synthesized_production_date(&self, shelf_life: &ShelfLife, state: StorageState) -> NaiveDate {
        let back = (shelf_life.for_state(state) / 2).max(1);
        self.snapshot_date - Days::new(back as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_quantity_sums_duplicates() {
        let inv = InitialInventory::new(
            d("2025-06-01"),
            vec![
                InventoryEntry::new("br1", "p1", StorageState::Ambient, 100.0),
                InventoryEntry::new("br1", "p1", StorageState::Ambient, 50.0),
            ],
        );
        assert_eq!(
            inv.quantity(&NodeId::new("br1"), &ProductId::new("p1"), StorageState::Ambient),
            150.0
        );
    }

    #[test]
    fn test_synthesized_dates_precede_snapshot() {
        let inv = InitialInventory::empty(d("2025-06-01"));
        let sl = ShelfLife::default();
        for state in StorageState::ALL {
            assert!(inv.synthesized_production_date(&sl, state) < d("2025-06-01"));
        }
        // ambient: 17 / 2 = 8 days back
        assert_eq!(
            inv.synthesized_production_date(&sl, StorageState::Ambient),
            d("2025-05-24")
        );
    }
}
