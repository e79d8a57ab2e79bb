//! Scheduled truck departures.
//!
//! Trucks run on fixed weekdays from an origin to one or more allowed
//! destinations. Loading is palletized: capacity is counted in pallets
//! and loading cost has a fixed component per departure used plus a
//! per-pallet component.

use crate::ids::{NodeId, TruckId};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A recurring scheduled truck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckSchedule {
    pub id: TruckId,
    pub origin: NodeId,
    pub destinations: Vec<NodeId>,
    /// Weekdays on which this truck departs
    pub departure_weekdays: Vec<Weekday>,
    pub capacity_pallets: u32,
    /// Cost incurred once per departure actually used
    pub fixed_cost: f64,
    /// Loading cost per pallet
    pub cost_per_pallet: f64,
}

impl TruckSchedule {
    pub fn new(id: impl Into<TruckId>, origin: impl Into<NodeId>) -> Self {
        TruckSchedule {
            id: id.into(),
            origin: origin.into(),
            destinations: Vec::new(),
            departure_weekdays: Vec::new(),
            capacity_pallets: 44,
            fixed_cost: 0.0,
            cost_per_pallet: 0.0,
        }
    }

    pub fn with_destination(mut self, dest: impl Into<NodeId>) -> Self {
        self.destinations.push(dest.into());
        self
    }

    pub fn with_weekdays<I: IntoIterator<Item = Weekday>>(mut self, days: I) -> Self {
        self.departure_weekdays = days.into_iter().collect();
        self
    }

    pub fn with_costs(mut self, fixed: f64, per_pallet: f64) -> Self {
        self.fixed_cost = fixed;
        self.cost_per_pallet = per_pallet;
        self
    }

    pub fn departs_on(&self, date: NaiveDate) -> bool {
        self.departure_weekdays.contains(&date.weekday())
    }

    pub fn serves(&self, dest: &NodeId) -> bool {
        self.destinations.contains(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_departs_on_weekday() {
        let truck = TruckSchedule::new("t1", "mfg")
            .with_destination("hub1")
            .with_weekdays([Weekday::Mon, Weekday::Wed]);

        // 2025-06-02 is a Monday
        let mon = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert!(truck.departs_on(mon));
        assert!(!truck.departs_on(mon.succ_opt().unwrap()));
    }

    #[test]
    fn test_defaults() {
        let truck = TruckSchedule::new("t1", "mfg");
        assert_eq!(truck.capacity_pallets, 44);
        assert!(!truck.serves(&NodeId::new("hub1")));
    }
}
