//! Solution extraction.
//!
//! Turns raw column values into the typed, serializable plan record:
//! production events, labor hours, shipments with truck assignment,
//! per-state inventory, freeze/thaw flows, the demand consumption split,
//! shortages, disposals, and the cost breakdown. All reads are
//! stale-safe (absent or NaN values count as zero) and quantities under
//! [`QUANTITY_EPSILON`] are dropped.

use crate::indices::PlanningIndices;
use crate::model::vars::VarKey;
use crate::solver::SolveOutput;
use bakeplan_core::{
    NodeId, PlanResult, PlanningBundle, ProductId, StorageState, TruckId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Quantities below this are treated as solver noise and dropped.
pub const QUANTITY_EPSILON: f64 = 1e-6;

/// Shipment records below this are dropped; coarser than the general
/// epsilon because lane rows are enforced to solver feasibility
/// tolerance only.
pub const SHIPMENT_EPSILON: f64 = 1e-4;

/// One production event (one SKU, one day, one site).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionEvent {
    pub node: NodeId,
    pub product: ProductId,
    pub date: NaiveDate,
    pub quantity: f64,
    pub mixes: i64,
}

/// Labor hours and cost at a producing node on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborRecord {
    pub node: NodeId,
    pub date: NaiveDate,
    pub hours_used: f64,
    pub hours_paid: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub cost: f64,
}

/// Aggregated labor hours for one date (all producing nodes).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LaborHours {
    pub used: f64,
    pub paid: f64,
    pub regular: f64,
    pub overtime: f64,
}

/// A planned shipment. With pallet tracking on, one record per carrying
/// truck; otherwise one record per (route, product, departure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub origin: NodeId,
    pub destination: NodeId,
    pub product: ProductId,
    pub departure_date: NaiveDate,
    pub delivery_date: NaiveDate,
    /// State the mass travels in
    pub ship_state: StorageState,
    /// State the mass lands in (thawed when a frozen route meets a
    /// destination without frozen storage)
    pub arrival_state: StorageState,
    pub quantity: f64,
    pub pallets: Option<i64>,
    pub truck: Option<TruckId>,
}

/// End-of-day stock for one (node, product, state, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub node: NodeId,
    pub product: ProductId,
    pub state: StorageState,
    pub date: NaiveDate,
    pub quantity: f64,
    pub pallets: Option<i64>,
}

/// A freeze or thaw flow at a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFlow {
    pub node: NodeId,
    pub product: ProductId,
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Demand service split by source state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub node: NodeId,
    pub product: ProductId,
    pub date: NaiveDate,
    pub from_ambient: f64,
    pub from_thawed: f64,
}

impl ConsumptionRecord {
    pub fn total(&self) -> f64 {
        self.from_ambient + self.from_thawed
    }
}

/// Unmet demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortageRecord {
    pub node: NodeId,
    pub product: ProductId,
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Explicit removal of expired stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalEvent {
    pub node: NodeId,
    pub product: ProductId,
    pub state: StorageState,
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Cost components; `total` is their sum.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub labor: f64,
    pub transport: f64,
    pub holding: f64,
    pub pallet_entry: f64,
    pub shortage: f64,
    pub changeover: f64,
    pub waste: f64,
    pub disposal: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn component_sum(&self) -> f64 {
        self.labor
            + self.transport
            + self.holding
            + self.pallet_entry
            + self.shortage
            + self.changeover
            + self.waste
            + self.disposal
    }
}

/// The validated plan record returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSolution {
    /// Formulation discriminator
    pub model_type: String,
    /// Terminal solver status ("optimal" or "feasible")
    pub status: String,
    pub objective_value: f64,
    pub solve_time_seconds: f64,
    pub planning_start: NaiveDate,
    pub planning_end: NaiveDate,
    pub production: Vec<ProductionEvent>,
    pub labor: Vec<LaborRecord>,
    pub shipments: Vec<Shipment>,
    pub inventory: Vec<InventoryRecord>,
    pub freeze_flows: Vec<StateFlow>,
    pub thaw_flows: Vec<StateFlow>,
    pub consumption: Vec<ConsumptionRecord>,
    pub shortages: Vec<ShortageRecord>,
    pub disposals: Vec<DisposalEvent>,
    pub costs: CostBreakdown,
}

impl PlanSolution {
    /// Stock lookup map; absent keys are zero stock.
    pub fn inventory_map(&self) -> BTreeMap<(NodeId, ProductId, StorageState, NaiveDate), f64> {
        self.inventory
            .iter()
            .map(|r| {
                (
                    (r.node.clone(), r.product.clone(), r.state, r.date),
                    r.quantity,
                )
            })
            .collect()
    }

    /// Labor hours aggregated per date across producing nodes.
    pub fn labor_hours_by_date(&self) -> BTreeMap<NaiveDate, LaborHours> {
        let mut map: BTreeMap<NaiveDate, LaborHours> = BTreeMap::new();
        for rec in &self.labor {
            let h = map.entry(rec.date).or_default();
            h.used += rec.hours_used;
            h.paid += rec.hours_paid;
            h.regular += rec.regular_hours;
            h.overtime += rec.overtime_hours;
        }
        map
    }

    pub fn total_production(&self) -> f64 {
        self.production.iter().map(|p| p.quantity).sum()
    }

    pub fn total_consumed(&self) -> f64 {
        self.consumption.iter().map(|c| c.total()).sum()
    }

    pub fn total_shortage(&self) -> f64 {
        self.shortages.iter().map(|s| s.quantity).sum()
    }

    pub fn total_disposed(&self) -> f64 {
        self.disposals.iter().map(|d| d.quantity).sum()
    }

    /// Format a human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Plan Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Status: {}\n", self.status));
        s.push_str(&format!("Objective: ${:.2}\n", self.objective_value));
        s.push_str(&format!("Total Cost: ${:.2}\n", self.costs.total));
        s.push_str(&format!("  Labor:        ${:.2}\n", self.costs.labor));
        s.push_str(&format!("  Transport:    ${:.2}\n", self.costs.transport));
        s.push_str(&format!("  Holding:      ${:.2}\n", self.costs.holding));
        s.push_str(&format!("  Pallet entry: ${:.2}\n", self.costs.pallet_entry));
        s.push_str(&format!("  Shortage:     ${:.2}\n", self.costs.shortage));
        s.push_str(&format!("  Changeover:   ${:.2}\n", self.costs.changeover));
        s.push_str(&format!("  Waste:        ${:.2}\n", self.costs.waste));
        s.push_str(&format!("  Disposal:     ${:.2}\n", self.costs.disposal));
        s.push_str(&format!("Production: {:.0} units\n", self.total_production()));
        s.push_str(&format!("Consumed:   {:.0} units\n", self.total_consumed()));
        s.push_str(&format!("Shortage:   {:.0} units\n", self.total_shortage()));
        s.push_str(&format!("Shipments:  {}\n", self.shipments.len()));
        s.push_str(&format!("Solve Time: {:.2}s\n", self.solve_time_seconds));
        s
    }

    /// Export to pretty JSON.
    pub fn to_json(&self, path: &Path) -> PlanResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Convert to a JSON value (for streaming/stdout).
    pub fn to_json_value(&self) -> PlanResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Assemble the plan record from solver output.
pub fn extract_solution(
    bundle: &PlanningBundle,
    idx: &PlanningIndices,
    out: &SolveOutput,
    pallet_tracking: bool,
) -> PlanResult<PlanSolution> {
    let vars = &out.vars;
    let values = &out.values;
    let costs = &bundle.cost_structure;
    let last_day = idx.horizon() - 1;

    let mut production = Vec::new();
    let mut labor = Vec::new();
    let mut cost_labor = 0.0;
    let mut cost_changeover = 0.0;
    for &n in &idx.producers {
        let node_id = idx.nodes[n].id.clone();
        for day in 0..idx.horizon() {
            let date = idx.date(day);
            let cal = bundle
                .labor_calendar
                .day(date)
                .expect("calendar coverage checked at validation");
            let regular = vars.value(values, &VarKey::LaborRegular { node: n, day });
            let overtime = vars.value(values, &VarKey::LaborOvertime { node: n, day });
            let used = vars.value(values, &VarKey::LaborUsed { node: n, day });
            let paid = vars.value(values, &VarKey::LaborPaid { node: n, day });
            let day_cost = regular * cal.regular_rate + overtime * cal.overtime_rate;
            cost_labor += day_cost;
            if paid > QUANTITY_EPSILON || used > QUANTITY_EPSILON {
                labor.push(LaborRecord {
                    node: node_id.clone(),
                    date,
                    hours_used: used,
                    hours_paid: paid,
                    regular_hours: regular,
                    overtime_hours: overtime,
                    cost: day_cost,
                });
            }

            for p in 0..idx.products.len() {
                let quantity = vars.value(values, &VarKey::Production { node: n, product: p, day });
                cost_changeover += costs.changeover_cost
                    * vars.value(values, &VarKey::ProductStart { node: n, product: p, day });
                if quantity > QUANTITY_EPSILON {
                    production.push(ProductionEvent {
                        node: node_id.clone(),
                        product: idx.products[p].id.clone(),
                        date,
                        quantity,
                        mixes: vars.int_value(values, &VarKey::MixCount { node: n, product: p, day }),
                    });
                }
            }
        }
    }

    let mut inventory = Vec::new();
    let mut cost_holding = 0.0;
    let mut cost_waste = 0.0;
    let mut cost_pallet_entry = 0.0;
    for &(n, state) in &idx.storage {
        let node_id = idx.nodes[n].id.clone();
        for p in 0..idx.products.len() {
            let units_per_pallet = idx.products[p].units_per_pallet as f64;
            for day in 0..idx.horizon() {
                let quantity =
                    vars.value(values, &VarKey::Inventory { node: n, product: p, state, day });
                let (pallets, pallet_equiv) = if pallet_tracking {
                    let count =
                        vars.int_value(values, &VarKey::PalletCount { node: n, product: p, state, day });
                    cost_pallet_entry += costs.pallet_entry_cost
                        * vars.value(values, &VarKey::PalletEntry { node: n, product: p, state, day });
                    (Some(count), count as f64)
                } else {
                    (None, quantity / units_per_pallet)
                };
                cost_holding += costs.holding_cost(state) * pallet_equiv;
                if day == last_day {
                    cost_waste += costs.waste_cost_per_pallet * pallet_equiv;
                }
                if quantity > QUANTITY_EPSILON {
                    inventory.push(InventoryRecord {
                        node: node_id.clone(),
                        product: idx.products[p].id.clone(),
                        state,
                        date: idx.date(day),
                        quantity,
                        pallets,
                    });
                }
            }
        }
    }

    let (shipments, cost_transport) = extract_shipments(bundle, idx, out, pallet_tracking);

    let mut freeze_flows = Vec::new();
    let mut thaw_flows = Vec::new();
    for n in 0..idx.nodes.len() {
        let node_id = idx.nodes[n].id.clone();
        for p in 0..idx.products.len() {
            for day in 0..idx.horizon() {
                let frozen = vars.value(values, &VarKey::Freeze { node: n, product: p, day });
                if frozen > QUANTITY_EPSILON {
                    freeze_flows.push(StateFlow {
                        node: node_id.clone(),
                        product: idx.products[p].id.clone(),
                        date: idx.date(day),
                        quantity: frozen,
                    });
                }
                let thawed = vars.value(values, &VarKey::Thaw { node: n, product: p, day });
                if thawed > QUANTITY_EPSILON {
                    thaw_flows.push(StateFlow {
                        node: node_id.clone(),
                        product: idx.products[p].id.clone(),
                        date: idx.date(day),
                        quantity: thawed,
                    });
                }
            }
        }
    }

    let mut consumption = Vec::new();
    let mut shortages = Vec::new();
    let mut cost_shortage = 0.0;
    for (&(n, p, day), _) in &idx.demand {
        let from_ambient = vars.value(values, &VarKey::ConsumedAmbient { node: n, product: p, day });
        let from_thawed = vars.value(values, &VarKey::ConsumedThawed { node: n, product: p, day });
        consumption.push(ConsumptionRecord {
            node: idx.nodes[n].id.clone(),
            product: idx.products[p].id.clone(),
            date: idx.date(day),
            from_ambient,
            from_thawed,
        });
        let missed = vars.value(values, &VarKey::Shortage { node: n, product: p, day });
        cost_shortage += costs.shortage_penalty_per_unit * missed;
        if missed > QUANTITY_EPSILON {
            shortages.push(ShortageRecord {
                node: idx.nodes[n].id.clone(),
                product: idx.products[p].id.clone(),
                date: idx.date(day),
                quantity: missed,
            });
        }
    }

    let mut disposals = Vec::new();
    let mut cost_disposal = 0.0;
    for &(n, state) in &idx.storage {
        for p in 0..idx.products.len() {
            for day in 0..idx.horizon() {
                let quantity =
                    vars.value(values, &VarKey::Disposal { node: n, product: p, state, day });
                cost_disposal += costs.disposal_cost_per_unit * quantity;
                if quantity > QUANTITY_EPSILON {
                    disposals.push(DisposalEvent {
                        node: idx.nodes[n].id.clone(),
                        product: idx.products[p].id.clone(),
                        state,
                        date: idx.date(day),
                        quantity,
                    });
                }
            }
        }
    }

    let mut costs_out = CostBreakdown {
        labor: cost_labor,
        transport: cost_transport,
        holding: cost_holding,
        pallet_entry: cost_pallet_entry,
        shortage: cost_shortage,
        changeover: cost_changeover,
        waste: cost_waste,
        disposal: cost_disposal,
        total: 0.0,
    };
    costs_out.total = costs_out.component_sum();

    // The objective additionally carries the tiny indicator tie-breaker,
    // so it sits a hair above the component sum.
    let drift = (out.objective - costs_out.total).abs();
    if drift > 1e-3 * (1.0 + costs_out.total.abs()) + 1.0 {
        warn!(
            objective = out.objective,
            component_sum = costs_out.total,
            "cost breakdown drifted from objective"
        );
    }

    Ok(PlanSolution {
        model_type: "sliding-window".to_string(),
        status: out.status.to_string(),
        objective_value: out.objective,
        solve_time_seconds: out.solve_time.as_secs_f64(),
        planning_start: bundle.planning_start,
        planning_end: bundle.planning_end,
        production,
        labor,
        shipments,
        inventory,
        freeze_flows,
        thaw_flows,
        consumption,
        shortages,
        disposals,
        costs: costs_out,
    })
}

/// Shipments with truck assignment, plus total transport cost.
fn extract_shipments(
    _bundle: &PlanningBundle,
    idx: &PlanningIndices,
    out: &SolveOutput,
    pallet_tracking: bool,
) -> (Vec<Shipment>, f64) {
    let vars = &out.vars;
    let values = &out.values;
    let mut shipments = Vec::new();
    let mut cost = 0.0;

    for (ri, route) in idx.routes.iter().enumerate() {
        let origin_id = idx.nodes[route.origin].id.clone();
        let dest_id = idx.nodes[route.dest].id.clone();
        for p in 0..idx.products.len() {
            let product_id = idx.products[p].id.clone();
            let units_per_pallet = idx.products[p].units_per_pallet as f64;
            for &day in &route.departure_days {
                let total = vars.value(values, &VarKey::InTransit { route: ri, product: p, day });
                cost += route.route.cost_per_unit * total;
                if total <= SHIPMENT_EPSILON {
                    continue;
                }
                let departure_date = idx.date(day);
                let delivery_date = idx.date(day + route.transit_days);

                let mut remaining = total;
                if pallet_tracking && !route.trucks.is_empty() {
                    let first_trucked = shipments.len();
                    for &truck in &route.trucks {
                        let pallets = vars
                            .int_value(values, &VarKey::TruckLoad { truck, route: ri, product: p, day });
                        if pallets <= 0 {
                            continue;
                        }
                        let carried = remaining.min(pallets as f64 * units_per_pallet);
                        if carried <= QUANTITY_EPSILON {
                            continue;
                        }
                        shipments.push(Shipment {
                            origin: origin_id.clone(),
                            destination: dest_id.clone(),
                            product: product_id.clone(),
                            departure_date,
                            delivery_date,
                            ship_state: route.ship_state,
                            arrival_state: route.arrival_state,
                            quantity: carried,
                            pallets: Some(pallets),
                            truck: Some(idx.trucks[truck].schedule.id.clone()),
                        });
                        remaining -= carried;
                    }
                    // lane rows cover the whole shipment with pallets, so
                    // anything left here is solver tolerance; ride it on
                    // the last truck rather than invent a truckless record
                    if remaining > 0.0 && shipments.len() > first_trucked {
                        if let Some(last) = shipments.last_mut() {
                            last.quantity += remaining;
                        }
                        remaining = 0.0;
                    }
                }
                if remaining > SHIPMENT_EPSILON {
                    shipments.push(Shipment {
                        origin: origin_id.clone(),
                        destination: dest_id.clone(),
                        product: product_id.clone(),
                        departure_date,
                        delivery_date,
                        ship_state: route.ship_state,
                        arrival_state: route.arrival_state,
                        quantity: remaining,
                        pallets: None,
                        truck: None,
                    });
                }
            }
        }
    }

    // fixed and per-pallet loading charges
    if pallet_tracking {
        for &(truck, day) in &idx.truck_departures {
            let data = &idx.trucks[truck];
            cost += data.schedule.fixed_cost
                * vars.value(values, &VarKey::TruckUsed { truck, day });
            for &(_, ri) in &data.destinations {
                if !idx.routes[ri].departs_on(day) {
                    continue;
                }
                for p in 0..idx.products.len() {
                    cost += data.schedule.cost_per_pallet
                        * vars.value(values, &VarKey::TruckLoad { truck, route: ri, product: p, day });
                }
            }
        }
    }

    (shipments, cost)
}
