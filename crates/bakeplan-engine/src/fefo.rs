//! FEFO batch allocation.
//!
//! The aggregate plan says how much moves; it does not say which batch.
//! This module replays the plan deterministically, date by date, and
//! allocates every flow first-expired-first-out: when mass leaves a
//! (node, product, state), the slice with the oldest `state_entry_date`
//! goes first (batch id breaks ties). Under the engine's objective FEFO
//! is age-optimal, so the replay recovers per-batch traceability without
//! another optimization pass.
//!
//! Replay order within a date: production, deliveries due today, freeze,
//! thaw, dispatches, demand consumption, disposal. After each date the
//! per-(node, product, state) slice totals must match the aggregate
//! inventory within tolerance; any deviation aborts with
//! [`PlanError::FefoParity`].

use crate::extract::PlanSolution;
use bakeplan_core::{
    BatchId, NodeId, PlanError, PlanResult, PlanningBundle, ProductId, StorageState,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Where a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOrigin {
    Production,
    OpeningStock,
}

/// A traceability batch: one production event or one opening-stock row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub product: ProductId,
    /// Node where the batch entered the system
    pub node: NodeId,
    pub origin: BatchOrigin,
    /// Actual production date, or the synthesized display date for
    /// opening stock
    pub production_date: NaiveDate,
    /// Quantity created
    pub quantity: f64,
}

impl Batch {
    /// Days since production.
    pub fn total_age(&self, asof: NaiveDate) -> i64 {
        (asof - self.production_date).num_days()
    }
}

/// A slice of a batch sitting at a (node, product, state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStock {
    pub batch: BatchId,
    pub node: NodeId,
    pub product: ProductId,
    pub state: StorageState,
    /// Date the mass entered its current state; shelf life counts from here
    pub state_entry_date: NaiveDate,
    pub production_date: NaiveDate,
    pub quantity: f64,
}

impl BatchStock {
    /// Days in the current state.
    pub fn age_in_state(&self, asof: NaiveDate) -> i64 {
        (asof - self.state_entry_date).num_days()
    }

    /// Days since production.
    pub fn total_age(&self, asof: NaiveDate) -> i64 {
        (asof - self.production_date).num_days()
    }
}

/// How much of one batch rides one shipment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentAllocation {
    /// Index into `PlanSolution::shipments`
    pub shipment_index: usize,
    pub batch: BatchId,
    pub quantity: f64,
}

/// Per-day slice totals, for parity audits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTotalRecord {
    pub node: NodeId,
    pub product: ProductId,
    pub state: StorageState,
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Full batch-level detail recovered from the aggregate plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FefoDetail {
    pub batches: Vec<Batch>,
    /// Slices on hand at the end of the horizon
    pub final_inventory: Vec<BatchStock>,
    pub shipment_allocations: Vec<ShipmentAllocation>,
    /// Per-date totals that matched the aggregate inventory
    pub daily_totals: Vec<BatchTotalRecord>,
}

impl FefoDetail {
    /// Final slices grouped per (node, product, state).
    pub fn batch_inventory(&self) -> BTreeMap<(NodeId, ProductId, StorageState), Vec<&BatchStock>> {
        let mut map: BTreeMap<(NodeId, ProductId, StorageState), Vec<&BatchStock>> = BTreeMap::new();
        for stock in &self.final_inventory {
            map.entry((stock.node.clone(), stock.product.clone(), stock.state))
                .or_default()
                .push(stock);
        }
        map
    }
}

/// A slice in flight between nodes.
#[derive(Debug, Clone)]
struct TransitSlice {
    delivery_date: NaiveDate,
    dest: NodeId,
    product: ProductId,
    arrival_state: StorageState,
    /// Entry date changes to the delivery date when the arrival state
    /// differs from the shipped state (thaw on arrival)
    resets_clock: bool,
    pieces: Vec<Piece>,
}

/// A mutable slice of a batch during replay.
#[derive(Debug, Clone)]
struct Piece {
    batch: BatchId,
    state_entry_date: NaiveDate,
    production_date: NaiveDate,
    quantity: f64,
}

type LocationKey = (NodeId, ProductId, StorageState);

/// Replays the aggregate plan into batch-level detail.
pub struct FefoAllocator<'a> {
    bundle: &'a PlanningBundle,
    solution: &'a PlanSolution,
    batches: Vec<Batch>,
    stock: BTreeMap<LocationKey, Vec<Piece>>,
    in_transit: Vec<TransitSlice>,
    allocations: Vec<ShipmentAllocation>,
    daily_totals: Vec<BatchTotalRecord>,
}

impl<'a> FefoAllocator<'a> {
    pub fn new(bundle: &'a PlanningBundle, solution: &'a PlanSolution) -> Self {
        FefoAllocator {
            bundle,
            solution,
            batches: Vec::new(),
            stock: BTreeMap::new(),
            in_transit: Vec::new(),
            allocations: Vec::new(),
            daily_totals: Vec::new(),
        }
    }

    /// Run the replay.
    pub fn allocate(mut self) -> PlanResult<FefoDetail> {
        self.seed_opening_stock()?;

        let aggregate = self.solution.inventory_map();
        let mut date = self.bundle.planning_start;
        while date <= self.bundle.planning_end {
            self.apply_production(date);
            self.apply_deliveries(date);
            self.apply_freezes(date)?;
            self.apply_thaws(date)?;
            self.apply_dispatches(date)?;
            self.apply_consumption(date)?;
            self.apply_disposals(date)?;
            self.audit_day(date, &aggregate)?;
            date = date + Days::new(1);
        }

        debug!(
            batches = self.batches.len(),
            allocations = self.allocations.len(),
            "replay complete"
        );

        let mut final_inventory = Vec::new();
        for ((node, product, state), pieces) in &self.stock {
            for piece in pieces {
                if piece.quantity > 1e-9 {
                    final_inventory.push(BatchStock {
                        batch: piece.batch,
                        node: node.clone(),
                        product: product.clone(),
                        state: *state,
                        state_entry_date: piece.state_entry_date,
                        production_date: piece.production_date,
                        quantity: piece.quantity,
                    });
                }
            }
        }

        Ok(FefoDetail {
            batches: self.batches,
            final_inventory,
            shipment_allocations: self.allocations,
            daily_totals: self.daily_totals,
        })
    }

    fn new_batch(
        &mut self,
        product: &ProductId,
        node: &NodeId,
        origin: BatchOrigin,
        production_date: NaiveDate,
        quantity: f64,
    ) -> BatchId {
        let id = BatchId::new(self.batches.len());
        self.batches.push(Batch {
            id,
            product: product.clone(),
            node: node.clone(),
            origin,
            production_date,
            quantity,
        });
        id
    }

    fn seed_opening_stock(&mut self) -> PlanResult<()> {
        let snapshot = self.bundle.initial_inventory.snapshot_date;
        for ((node, product, state), quantity) in self.bundle.initial_inventory.by_key() {
            let shelf_life = self
                .bundle
                .product(&product)
                .ok_or_else(|| PlanError::FefoParity {
                    details: format!("opening stock references unknown product {product}"),
                })?
                .shelf_life;
            let production_date = self
                .bundle
                .initial_inventory
                .synthesized_production_date(&shelf_life, state);
            let batch = self.new_batch(&product, &node, BatchOrigin::OpeningStock, production_date, quantity);
            self.stock
                .entry((node.clone(), product.clone(), state))
                .or_default()
                .push(Piece {
                    batch,
                    state_entry_date: snapshot,
                    production_date,
                    quantity,
                });
        }
        Ok(())
    }

    fn apply_production(&mut self, date: NaiveDate) {
        let events: Vec<_> = self
            .solution
            .production
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect();
        for event in events {
            let batch = self.new_batch(
                &event.product,
                &event.node,
                BatchOrigin::Production,
                date,
                event.quantity,
            );
            self.stock
                .entry((event.node.clone(), event.product.clone(), StorageState::Ambient))
                .or_default()
                .push(Piece {
                    batch,
                    state_entry_date: date,
                    production_date: date,
                    quantity: event.quantity,
                });
        }
    }

    fn apply_deliveries(&mut self, date: NaiveDate) {
        let mut arriving = Vec::new();
        self.in_transit.retain(|slice| {
            if slice.delivery_date == date {
                arriving.push(slice.clone());
                false
            } else {
                true
            }
        });
        for slice in arriving {
            let target = self
                .stock
                .entry((slice.dest.clone(), slice.product.clone(), slice.arrival_state))
                .or_default();
            for mut piece in slice.pieces {
                if slice.resets_clock {
                    piece.state_entry_date = slice.delivery_date;
                }
                target.push(piece);
            }
        }
    }

    fn apply_freezes(&mut self, date: NaiveDate) -> PlanResult<()> {
        let flows: Vec<_> = self
            .solution
            .freeze_flows
            .iter()
            .filter(|f| f.date == date)
            .cloned()
            .collect();
        for flow in flows {
            let pieces = self.take_fefo(
                (flow.node.clone(), flow.product.clone(), StorageState::Ambient),
                flow.quantity,
                "freeze",
                date,
            )?;
            let target = self
                .stock
                .entry((flow.node.clone(), flow.product.clone(), StorageState::Frozen))
                .or_default();
            for mut piece in pieces {
                piece.state_entry_date = date;
                target.push(piece);
            }
        }
        Ok(())
    }

    fn apply_thaws(&mut self, date: NaiveDate) -> PlanResult<()> {
        let flows: Vec<_> = self
            .solution
            .thaw_flows
            .iter()
            .filter(|f| f.date == date)
            .cloned()
            .collect();
        for flow in flows {
            let pieces = self.take_fefo(
                (flow.node.clone(), flow.product.clone(), StorageState::Frozen),
                flow.quantity,
                "thaw",
                date,
            )?;
            let target = self
                .stock
                .entry((flow.node.clone(), flow.product.clone(), StorageState::Thawed))
                .or_default();
            for mut piece in pieces {
                // shelf life restarts at thaw
                piece.state_entry_date = date;
                target.push(piece);
            }
        }
        Ok(())
    }

    fn apply_dispatches(&mut self, date: NaiveDate) -> PlanResult<()> {
        let shipments: Vec<(usize, _)> = self
            .solution
            .shipments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.departure_date == date)
            .map(|(i, s)| (i, s.clone()))
            .collect();
        for (index, shipment) in shipments {
            let pieces = self.take_fefo(
                (
                    shipment.origin.clone(),
                    shipment.product.clone(),
                    shipment.ship_state,
                ),
                shipment.quantity,
                "shipment",
                date,
            )?;
            for piece in &pieces {
                self.allocations.push(ShipmentAllocation {
                    shipment_index: index,
                    batch: piece.batch,
                    quantity: piece.quantity,
                });
            }
            self.in_transit.push(TransitSlice {
                delivery_date: shipment.delivery_date,
                dest: shipment.destination.clone(),
                product: shipment.product.clone(),
                arrival_state: shipment.arrival_state,
                resets_clock: shipment.arrival_state != shipment.ship_state,
                pieces,
            });
        }
        Ok(())
    }

    fn apply_consumption(&mut self, date: NaiveDate) -> PlanResult<()> {
        let records: Vec<_> = self
            .solution
            .consumption
            .iter()
            .filter(|c| c.date == date)
            .cloned()
            .collect();
        for record in records {
            if record.from_ambient > 0.0 {
                self.take_fefo(
                    (record.node.clone(), record.product.clone(), StorageState::Ambient),
                    record.from_ambient,
                    "consumption",
                    date,
                )?;
            }
            if record.from_thawed > 0.0 {
                self.take_fefo(
                    (record.node.clone(), record.product.clone(), StorageState::Thawed),
                    record.from_thawed,
                    "consumption",
                    date,
                )?;
            }
        }
        Ok(())
    }

    fn apply_disposals(&mut self, date: NaiveDate) -> PlanResult<()> {
        let events: Vec<_> = self
            .solution
            .disposals
            .iter()
            .filter(|d| d.date == date)
            .cloned()
            .collect();
        for event in events {
            self.take_fefo(
                (event.node.clone(), event.product.clone(), event.state),
                event.quantity,
                "disposal",
                date,
            )?;
        }
        Ok(())
    }

    /// Remove `quantity` from a location, oldest state entry first.
    fn take_fefo(
        &mut self,
        key: LocationKey,
        quantity: f64,
        flow: &str,
        date: NaiveDate,
    ) -> PlanResult<Vec<Piece>> {
        let pieces = self.stock.entry(key.clone()).or_default();
        pieces.sort_by(|a, b| {
            a.state_entry_date
                .cmp(&b.state_entry_date)
                .then(a.batch.cmp(&b.batch))
        });

        let mut taken = Vec::new();
        let mut remaining = quantity;
        while remaining > 1e-9 {
            let Some(front) = pieces.first_mut() else {
                return Err(PlanError::FefoParity {
                    details: format!(
                        "{flow} of {quantity:.3} at {}/{}/{} on {date} exceeds batch stock by {remaining:.3}",
                        key.0, key.1, key.2
                    ),
                });
            };
            let take = remaining.min(front.quantity);
            taken.push(Piece {
                batch: front.batch,
                state_entry_date: front.state_entry_date,
                production_date: front.production_date,
                quantity: take,
            });
            front.quantity -= take;
            remaining -= take;
            if front.quantity <= 1e-9 {
                pieces.remove(0);
            }
        }
        Ok(taken)
    }

    /// Compare slice totals to aggregate inventory for one date.
    fn audit_day(
        &mut self,
        date: NaiveDate,
        aggregate: &BTreeMap<(NodeId, ProductId, StorageState, NaiveDate), f64>,
    ) -> PlanResult<()> {
        let mut totals: BTreeMap<LocationKey, f64> = BTreeMap::new();
        for (key, pieces) in &self.stock {
            let sum: f64 = pieces.iter().map(|p| p.quantity).sum();
            if sum > 1e-9 {
                totals.insert(key.clone(), sum);
            }
        }
        let mut keys: Vec<LocationKey> = totals.keys().cloned().collect();
        for ((node, product, state, d), _) in aggregate.iter() {
            if *d == date {
                keys.push((node.clone(), product.clone(), *state));
            }
        }
        keys.sort();
        keys.dedup();

        for key in keys {
            let batch_total = totals.get(&key).copied().unwrap_or(0.0);
            let agg = aggregate
                .get(&(key.0.clone(), key.1.clone(), key.2, date))
                .copied()
                .unwrap_or(0.0);
            let tolerance = 1e-3 + 1e-6 * agg.abs();
            if (batch_total - agg).abs() > tolerance {
                return Err(PlanError::FefoParity {
                    details: format!(
                        "{}/{}/{} on {date}: batch total {batch_total:.4} vs aggregate {agg:.4}",
                        key.0, key.1, key.2
                    ),
                });
            }
            self.daily_totals.push(BatchTotalRecord {
                node: key.0,
                product: key.1,
                state: key.2,
                date,
                quantity: batch_total,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_reporting() {
        let d0 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let stock = BatchStock {
            batch: BatchId::new(0),
            node: NodeId::new("br"),
            product: ProductId::new("p"),
            state: StorageState::Thawed,
            state_entry_date: d0,
            production_date: d0 - Days::new(10),
            quantity: 50.0,
        };
        let asof = d0 + Days::new(4);
        assert_eq!(stock.age_in_state(asof), 4);
        assert_eq!(stock.total_age(asof), 14);
    }
}
