//! MIP formulation of the integrated production-distribution plan.
//!
//! Decisions are aggregate SKU-level flows plus integer pallets and
//! mixes; no per-batch variables exist. Shelf life is enforced with
//! sliding-window inequalities over state entries and exits
//! ([`shelf`]), which keeps the model O(horizon) instead of the cubic
//! blow-up a per-cohort formulation pays. Per-batch traceability is
//! recovered after the solve by the FEFO replay in [`crate::fefo`].
//!
//! Build order: declare every column family, then add rows family by
//! family (stock balances, demand split, shelf-life windows, labor and
//! production linking, pallets and trucks). The objective is carried on
//! the columns themselves; rows never contribute cost.

mod balance;
mod demand;
mod labor;
mod pallets;
mod shelf;
pub mod vars;

use crate::config::SolveConfig;
use crate::indices::PlanningIndices;
use bakeplan_core::{PlanError, PlanResult, PlanningBundle, StorageState};
use highs::RowProblem;
use tracing::debug;
use vars::{lp_name, LinExpr, RowMeta, RowSense, VarKey, VarMeta, VariableMap};

/// The fully declared model, ready for the solver driver.
pub struct BuiltModel {
    pub problem: RowProblem,
    pub vars: VariableMap,
    pub rows: Vec<RowMeta>,
    /// Tie-breaker objective weight on the per-SKU production indicators
    pub tiebreak: f64,
}

impl BuiltModel {
    pub fn num_cols(&self) -> usize {
        self.vars.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_integer_cols(&self) -> usize {
        self.vars.metas().iter().filter(|m| m.integer).count()
    }

    /// One-line shape summary for logs and error diagnostics.
    pub fn shape(&self) -> String {
        format!(
            "{} columns ({} integer), {} rows",
            self.num_cols(),
            self.num_integer_cols(),
            self.num_rows()
        )
    }
}

/// Formulates the planning MIP over the index sets.
pub struct ModelBuilder<'a> {
    pub(crate) bundle: &'a PlanningBundle,
    pub(crate) idx: &'a PlanningIndices,
    pub(crate) cfg: &'a SolveConfig,
    pub(crate) problem: RowProblem,
    pub(crate) vars: VariableMap,
    pub(crate) rows: Vec<RowMeta>,
    pub(crate) tiebreak: f64,
}

impl<'a> ModelBuilder<'a> {
    /// Build the complete model.
    pub fn build(
        bundle: &'a PlanningBundle,
        idx: &'a PlanningIndices,
        cfg: &'a SolveConfig,
    ) -> PlanResult<BuiltModel> {
        let tiebreak = indicator_tiebreak(bundle, idx);
        let mut builder = ModelBuilder {
            bundle,
            idx,
            cfg,
            problem: RowProblem::default(),
            vars: VariableMap::new(),
            rows: Vec::new(),
            tiebreak,
        };

        builder.declare_production_and_labor()?;
        builder.declare_inventory();
        builder.declare_shipments();
        builder.declare_state_changes();
        builder.declare_demand();
        builder.declare_disposal();

        builder.add_balance_rows();
        builder.add_demand_rows();
        builder.add_shelf_life_rows();
        builder.add_labor_rows()?;
        builder.add_pallet_and_truck_rows();

        let model = BuiltModel {
            problem: builder.problem,
            vars: builder.vars,
            rows: builder.rows,
            tiebreak,
        };
        debug!(shape = %model.shape(), tiebreak, "model built");
        Ok(model)
    }

    // ----- column helpers -------------------------------------------------

    pub(crate) fn add_var(
        &mut self,
        key: VarKey,
        name: String,
        lower: f64,
        upper: Option<f64>,
        integer: bool,
        objective: f64,
    ) -> usize {
        let col = match (integer, upper) {
            (true, Some(ub)) => self.problem.add_integer_column(objective, lower..=ub),
            (true, None) => self.problem.add_integer_column(objective, lower..),
            (false, Some(ub)) => self.problem.add_column(objective, lower..=ub),
            (false, None) => self.problem.add_column(objective, lower..),
        };
        self.vars.insert(
            key,
            col,
            VarMeta {
                name,
                lower,
                upper,
                integer,
                objective,
            },
        )
    }

    /// Position of a column that the declaration pass is guaranteed to
    /// have created. A miss is a formulation bug, not an input error.
    pub(crate) fn pos(&self, key: &VarKey) -> usize {
        self.vars
            .position(key)
            .unwrap_or_else(|| panic!("column {key:?} missing from declaration pass"))
    }

    pub(crate) fn try_pos(&self, key: &VarKey) -> Option<usize> {
        self.vars.position(key)
    }

    // ----- row helper -----------------------------------------------------

    pub(crate) fn add_row(&mut self, name: String, expr: LinExpr, sense: RowSense, rhs: f64) {
        let expr = expr.compact();
        let rhs = rhs - expr.constant;
        let terms: Vec<(highs::Col, f64)> = expr
            .terms
            .iter()
            .map(|(pos, coef)| (self.vars.col_at(*pos), *coef))
            .collect();
        match sense {
            RowSense::Eq => self.problem.add_row(rhs..=rhs, terms),
            RowSense::Le => self.problem.add_row(..=rhs, terms),
            RowSense::Ge => self.problem.add_row(rhs.., terms),
        }
        self.rows.push(RowMeta {
            name,
            terms: expr.terms,
            sense,
            rhs,
        });
    }

    // ----- shared naming --------------------------------------------------

    pub(crate) fn node_tag(&self, node: usize) -> String {
        lp_name(self.idx.nodes[node].id.as_str())
    }

    pub(crate) fn product_tag(&self, product: usize) -> String {
        lp_name(self.idx.products[product].id.as_str())
    }

    pub(crate) fn state_tag(state: StorageState) -> &'static str {
        match state {
            StorageState::Ambient => "amb",
            StorageState::Frozen => "frz",
            StorageState::Thawed => "thw",
        }
    }

    // ----- declaration passes --------------------------------------------

    fn declare_production_and_labor(&mut self) -> PlanResult<()> {
        let idx = self.idx;
        let costs = &self.bundle.cost_structure;
        let max_daily = costs.max_daily_production();
        let max_hours = costs.max_hours_per_day;
        let delta = self.tiebreak;

        for &n in &idx.producers {
            let ntag = self.node_tag(n);
            for day in 0..idx.horizon() {
                let date = idx.date(day);
                let labor = self.bundle.labor_calendar.day(date).ok_or_else(|| {
                    PlanError::ModelBuild(format!("labor calendar has no entry for {date}"))
                })?;

                self.add_var(
                    VarKey::AnyProduction { node: n, day },
                    format!("any_{ntag}_d{day}"),
                    0.0,
                    Some(1.0),
                    true,
                    0.0,
                );
                self.add_var(
                    VarKey::LaborUsed { node: n, day },
                    format!("hours_used_{ntag}_d{day}"),
                    0.0,
                    Some(max_hours),
                    false,
                    0.0,
                );
                self.add_var(
                    VarKey::LaborPaid { node: n, day },
                    format!("hours_paid_{ntag}_d{day}"),
                    0.0,
                    Some(max_hours),
                    false,
                    0.0,
                );
                self.add_var(
                    VarKey::LaborRegular { node: n, day },
                    format!("hours_reg_{ntag}_d{day}"),
                    0.0,
                    Some(if labor.is_fixed { labor.fixed_hours } else { 0.0 }),
                    false,
                    labor.regular_rate,
                );
                self.add_var(
                    VarKey::LaborOvertime { node: n, day },
                    format!("hours_ot_{ntag}_d{day}"),
                    0.0,
                    Some(max_hours),
                    false,
                    labor.overtime_rate,
                );

                for p in 0..self.idx.products.len() {
                    let ptag = self.product_tag(p);
                    let units_per_mix = self.idx.products[p].units_per_mix as f64;
                    let max_mixes = (max_daily / units_per_mix).ceil();
                    self.add_var(
                        VarKey::Production { node: n, product: p, day },
                        format!("prod_{ntag}_{ptag}_d{day}"),
                        0.0,
                        Some(max_daily),
                        false,
                        0.0,
                    );
                    self.add_var(
                        VarKey::MixCount { node: n, product: p, day },
                        format!("mixes_{ntag}_{ptag}_d{day}"),
                        0.0,
                        Some(max_mixes),
                        true,
                        0.0,
                    );
                    self.add_var(
                        VarKey::ProductProduced { node: n, product: p, day },
                        format!("made_{ntag}_{ptag}_d{day}"),
                        0.0,
                        Some(1.0),
                        true,
                        delta,
                    );
                    self.add_var(
                        VarKey::ProductStart { node: n, product: p, day },
                        format!("start_{ntag}_{ptag}_d{day}"),
                        0.0,
                        Some(1.0),
                        true,
                        costs.changeover_cost,
                    );
                }
            }
        }
        Ok(())
    }

    fn declare_inventory(&mut self) {
        let costs = &self.bundle.cost_structure;
        let last_day = self.idx.horizon() - 1;

        for &(n, state) in &self.idx.storage {
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            let capacity = self.idx.nodes[n].capacity(state);
            for p in 0..self.idx.products.len() {
                let ptag = self.product_tag(p);
                let units_per_pallet = self.idx.products[p].units_per_pallet as f64;
                for day in 0..self.idx.horizon() {
                    let mut holding = costs.holding_cost(state);
                    if day == last_day {
                        holding += costs.waste_cost_per_pallet;
                    }
                    // With pallet tracking the holding charge rides the
                    // integer pallet count; without it, stock is charged
                    // fractional pallet equivalents directly.
                    let inv_obj = if self.cfg.pallet_tracking {
                        0.0
                    } else {
                        holding / units_per_pallet
                    };
                    self.add_var(
                        VarKey::Inventory { node: n, product: p, state, day },
                        format!("inv_{ntag}_{ptag}_{stag}_d{day}"),
                        0.0,
                        None,
                        false,
                        inv_obj,
                    );
                    if self.cfg.pallet_tracking {
                        let pallet_ub = capacity.map(|c| (c / units_per_pallet).ceil());
                        self.add_var(
                            VarKey::PalletCount { node: n, product: p, state, day },
                            format!("pallets_{ntag}_{ptag}_{stag}_d{day}"),
                            0.0,
                            pallet_ub,
                            true,
                            holding,
                        );
                        self.add_var(
                            VarKey::PalletEntry { node: n, product: p, state, day },
                            format!("pallet_in_{ntag}_{ptag}_{stag}_d{day}"),
                            0.0,
                            None,
                            false,
                            costs.pallet_entry_cost,
                        );
                    }
                }
            }
        }
    }

    fn declare_shipments(&mut self) {
        for ri in 0..self.idx.routes.len() {
            let (otag, dtag, cost, days) = {
                let r = &self.idx.routes[ri];
                (
                    self.node_tag(r.origin),
                    self.node_tag(r.dest),
                    r.route.cost_per_unit,
                    r.departure_days.clone(),
                )
            };
            for p in 0..self.idx.products.len() {
                let ptag = self.product_tag(p);
                for &day in &days {
                    self.add_var(
                        VarKey::InTransit { route: ri, product: p, day },
                        format!("ship_{otag}_{dtag}_{ptag}_d{day}"),
                        0.0,
                        None,
                        false,
                        cost,
                    );
                }
            }
        }

        if !self.cfg.pallet_tracking {
            return;
        }
        for &(truck, day) in &self.idx.truck_departures {
            let (ttag, fixed, per_pallet, capacity, dests) = {
                let t = &self.idx.trucks[truck];
                (
                    lp_name(t.schedule.id.as_str()),
                    t.schedule.fixed_cost,
                    t.schedule.cost_per_pallet,
                    t.schedule.capacity_pallets as f64,
                    t.destinations.clone(),
                )
            };
            self.add_var(
                VarKey::TruckUsed { truck, day },
                format!("truck_{ttag}_d{day}"),
                0.0,
                Some(1.0),
                true,
                fixed,
            );
            for (dest, ri) in dests {
                if !self.idx.routes[ri].departs_on(day) {
                    continue;
                }
                let dtag = self.node_tag(dest);
                for p in 0..self.idx.products.len() {
                    let ptag = self.product_tag(p);
                    self.add_var(
                        VarKey::TruckLoad { truck, route: ri, product: p, day },
                        format!("load_{ttag}_{dtag}_{ptag}_d{day}"),
                        0.0,
                        Some(capacity),
                        true,
                        per_pallet,
                    );
                }
            }
        }
    }

    fn declare_state_changes(&mut self) {
        for n in 0..self.idx.nodes.len() {
            let ntag = self.node_tag(n);
            if self.idx.nodes[n].can_freeze {
                for p in 0..self.idx.products.len() {
                    let ptag = self.product_tag(p);
                    for day in 0..self.idx.horizon() {
                        self.add_var(
                            VarKey::Freeze { node: n, product: p, day },
                            format!("freeze_{ntag}_{ptag}_d{day}"),
                            0.0,
                            None,
                            false,
                            0.0,
                        );
                    }
                }
            }
            if self.idx.nodes[n].can_thaw {
                for p in 0..self.idx.products.len() {
                    let ptag = self.product_tag(p);
                    for day in 0..self.idx.horizon() {
                        self.add_var(
                            VarKey::Thaw { node: n, product: p, day },
                            format!("thaw_{ntag}_{ptag}_d{day}"),
                            0.0,
                            None,
                            false,
                            0.0,
                        );
                    }
                }
            }
        }
    }

    fn declare_demand(&mut self) {
        let penalty = self.bundle.cost_structure.shortage_penalty_per_unit;
        for (&(n, p, day), &qty) in &self.idx.demand {
            let ntag = self.node_tag(n);
            let ptag = self.product_tag(p);
            if self.idx.stores(n, StorageState::Ambient) {
                self.add_var(
                    VarKey::ConsumedAmbient { node: n, product: p, day },
                    format!("eat_amb_{ntag}_{ptag}_d{day}"),
                    0.0,
                    Some(qty),
                    false,
                    0.0,
                );
            }
            if self.idx.stores(n, StorageState::Thawed) {
                self.add_var(
                    VarKey::ConsumedThawed { node: n, product: p, day },
                    format!("eat_thw_{ntag}_{ptag}_d{day}"),
                    0.0,
                    Some(qty),
                    false,
                    0.0,
                );
            }
            if self.cfg.allow_shortages {
                self.add_var(
                    VarKey::Shortage { node: n, product: p, day },
                    format!("short_{ntag}_{ptag}_d{day}"),
                    0.0,
                    Some(qty),
                    false,
                    penalty,
                );
            }
        }
    }

    fn declare_disposal(&mut self) {
        let cost = self.bundle.cost_structure.disposal_cost_per_unit;
        for &(n, state) in &self.idx.storage {
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            for p in 0..self.idx.products.len() {
                let ptag = self.product_tag(p);
                for day in 0..self.idx.horizon() {
                    if !self.idx.disposal_eligible(n, p, state, day) {
                        continue;
                    }
                    self.add_var(
                        VarKey::Disposal { node: n, product: p, state, day },
                        format!("dispose_{ntag}_{ptag}_{stag}_d{day}"),
                        0.0,
                        None,
                        false,
                        cost,
                    );
                }
            }
        }
    }
}

/// Tie-breaker weight for the per-SKU production indicators: three to
/// four orders of magnitude under the smallest real cost coefficient,
/// which still dominates solver degeneracy on the indicator columns.
fn indicator_tiebreak(bundle: &PlanningBundle, idx: &PlanningIndices) -> f64 {
    let costs = &bundle.cost_structure;
    let mut coefficients: Vec<f64> = vec![
        costs.holding_cost_ambient,
        costs.holding_cost_frozen,
        costs.holding_cost_thawed,
        costs.pallet_entry_cost,
        costs.shortage_penalty_per_unit,
        costs.waste_cost_per_pallet,
        costs.disposal_cost_per_unit,
        costs.changeover_cost,
    ];
    for r in &idx.routes {
        coefficients.push(r.route.cost_per_unit);
    }
    for t in &idx.trucks {
        coefficients.push(t.schedule.fixed_cost);
        coefficients.push(t.schedule.cost_per_pallet);
    }
    for day in &bundle.labor_calendar.days {
        coefficients.push(day.1.regular_rate);
        coefficients.push(day.1.overtime_rate);
    }
    let smallest = coefficients
        .into_iter()
        .filter(|c| *c > 0.0)
        .fold(f64::INFINITY, f64::min);
    if smallest.is_finite() {
        5e-4 * smallest
    } else {
        1e-6
    }
}
