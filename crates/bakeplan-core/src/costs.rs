//! Cost parameters for the planning objective.
//!
//! Production unit cost is carried for reporting only; on a fixed horizon
//! it is a pass-through and is excluded from the objective. Freshness is
//! priced implicitly: holding cost per pallet-day discourages idle stock
//! and the end-of-horizon waste charge discourages stock the plan cannot
//! consume. Both are parameters, not constants, because they are coupled:
//! waste must outweigh holding without forcing disposal of stock that
//! could still be consumed.

use crate::product::StorageState;
use serde::{Deserialize, Serialize};

/// All cost and production-shape parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostStructure {
    /// Reference production cost per unit (reporting only)
    pub production_cost_per_unit: f64,
    /// Holding cost per pallet per day, by storage state
    pub holding_cost_ambient: f64,
    pub holding_cost_frozen: f64,
    pub holding_cost_thawed: f64,
    /// Charged when the pallet count of a (node, product, state) grows
    pub pallet_entry_cost: f64,
    /// Penalty per unit of unmet demand
    pub shortage_penalty_per_unit: f64,
    /// Charge per pallet still on hand at the end of the horizon
    pub waste_cost_per_pallet: f64,
    /// Cost per unit explicitly disposed
    pub disposal_cost_per_unit: f64,
    /// Fixed cost per production run start (changeover)
    pub changeover_cost: f64,
    /// Production rate in units per labor hour
    pub production_rate_units_per_hour: f64,
    /// Labor overhead per run start
    pub changeover_hours: f64,
    /// Labor overhead on any day with production
    pub daily_startup_hours: f64,
    /// Hard ceiling on production hours per day
    pub max_hours_per_day: f64,
}

impl Default for CostStructure {
    fn default() -> Self {
        CostStructure {
            production_cost_per_unit: 0.80,
            holding_cost_ambient: 0.40,
            holding_cost_frozen: 0.60,
            holding_cost_thawed: 0.40,
            pallet_entry_cost: 2.0,
            shortage_penalty_per_unit: 10.0,
            waste_cost_per_pallet: 50.0,
            disposal_cost_per_unit: 0.50,
            changeover_cost: 15.0,
            production_rate_units_per_hour: 1400.0,
            changeover_hours: 0.25,
            daily_startup_hours: 0.5,
            max_hours_per_day: 14.0,
        }
    }
}

impl CostStructure {
    pub fn holding_cost(&self, state: StorageState) -> f64 {
        match state {
            StorageState::Ambient => self.holding_cost_ambient,
            StorageState::Frozen => self.holding_cost_frozen,
            StorageState::Thawed => self.holding_cost_thawed,
        }
    }

    /// Maximum producible units in one day at the stated rate and ceiling.
    pub fn max_daily_production(&self) -> f64 {
        self.max_hours_per_day * self.production_rate_units_per_hour
    }
}
