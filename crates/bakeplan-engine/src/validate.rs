//! Post-solve invariant checks.
//!
//! The solver's status is not the authority on correctness; these checks
//! are. A solve can come back optimal and still be rejected here, for
//! example when a formulation change reintroduces phantom supply. Every
//! failure carries the check name plus expected and actual values, and
//! is fatal to the return path: callers never see silently-wrong data.

use crate::extract::{PlanSolution, QUANTITY_EPSILON};
use crate::fefo::{BatchOrigin, FefoDetail};
use bakeplan_core::{NodeId, PlanError, PlanResult, PlanningBundle, ProductId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Run every check; the first failure aborts.
pub fn validate_solution(
    bundle: &PlanningBundle,
    solution: &PlanSolution,
    fefo: &FefoDetail,
) -> PlanResult<()> {
    check_conservation(bundle, solution)?;
    check_no_phantom_supply(bundle, solution)?;
    check_labor_without_production(solution)?;
    check_weekend_minimum(bundle, solution)?;
    check_demand_service(bundle, solution)?;
    check_opening_stock_dates(bundle, fefo)?;
    check_post_horizon_shipments(bundle, solution)?;
    check_fefo_parity(solution, fefo)?;
    check_cost_sum(solution)?;
    debug!("all solution invariants hold");
    Ok(())
}

fn conservation_tolerance(bundle: &PlanningBundle, scale: f64) -> f64 {
    let horizon = bundle.horizon_days() as f64;
    1e-3 + 1e-6 * horizon * (1.0 + scale)
}

/// init + production = consumed + final inventory + disposal, per product.
fn check_conservation(bundle: &PlanningBundle, solution: &PlanSolution) -> PlanResult<()> {
    for product in &bundle.products {
        let init: f64 = bundle
            .initial_inventory
            .entries
            .iter()
            .filter(|e| e.product == product.id)
            .map(|e| e.quantity)
            .sum();
        let produced: f64 = solution
            .production
            .iter()
            .filter(|e| e.product == product.id)
            .map(|e| e.quantity)
            .sum();
        let consumed: f64 = solution
            .consumption
            .iter()
            .filter(|c| c.product == product.id)
            .map(|c| c.total())
            .sum();
        let final_inventory: f64 = solution
            .inventory
            .iter()
            .filter(|r| r.product == product.id && r.date == bundle.planning_end)
            .map(|r| r.quantity)
            .sum();
        let disposed: f64 = solution
            .disposals
            .iter()
            .filter(|d| d.product == product.id)
            .map(|d| d.quantity)
            .sum();

        let supply = init + produced;
        let accounted = consumed + final_inventory + disposed;
        let tolerance = conservation_tolerance(bundle, supply);
        if (supply - accounted).abs() > tolerance {
            return Err(PlanError::invariant(
                "conservation",
                format!(
                    "product {}: init {init:.3} + produced {produced:.3} = {supply:.3}, \
                     but consumed {consumed:.3} + final {final_inventory:.3} + disposed {disposed:.3} = {accounted:.3}",
                    product.id
                ),
            ));
        }
    }
    Ok(())
}

/// Consumption can never exceed what physically entered the system.
fn check_no_phantom_supply(bundle: &PlanningBundle, solution: &PlanSolution) -> PlanResult<()> {
    for product in &bundle.products {
        let init: f64 = bundle
            .initial_inventory
            .entries
            .iter()
            .filter(|e| e.product == product.id)
            .map(|e| e.quantity)
            .sum();
        let produced: f64 = solution
            .production
            .iter()
            .filter(|e| e.product == product.id)
            .map(|e| e.quantity)
            .sum();
        let consumed: f64 = solution
            .consumption
            .iter()
            .filter(|c| c.product == product.id)
            .map(|c| c.total())
            .sum();
        let tolerance = conservation_tolerance(bundle, init + produced);
        if consumed > init + produced + tolerance {
            return Err(PlanError::invariant(
                "no-phantom-supply",
                format!(
                    "product {}: consumed {consumed:.3} exceeds init {init:.3} + produced {produced:.3}",
                    product.id
                ),
            ));
        }
    }
    Ok(())
}

fn production_by_node_date(solution: &PlanSolution) -> BTreeMap<(NodeId, NaiveDate), f64> {
    let mut map = BTreeMap::new();
    for event in &solution.production {
        *map.entry((event.node.clone(), event.date)).or_insert(0.0) += event.quantity;
    }
    map
}

/// Paid labor hours require production on the same node-day.
fn check_labor_without_production(solution: &PlanSolution) -> PlanResult<()> {
    let produced = production_by_node_date(solution);
    for record in &solution.labor {
        if record.hours_paid > 1e-4 {
            let made = produced
                .get(&(record.node.clone(), record.date))
                .copied()
                .unwrap_or(0.0);
            if made <= QUANTITY_EPSILON {
                return Err(PlanError::invariant(
                    "labor-without-production",
                    format!(
                        "{} on {}: {:.3} paid hours with zero production",
                        record.node, record.date, record.hours_paid
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Non-fixed days with production pay at least the minimum block.
fn check_weekend_minimum(bundle: &PlanningBundle, solution: &PlanSolution) -> PlanResult<()> {
    let produced = production_by_node_date(solution);
    let paid: BTreeMap<(NodeId, NaiveDate), f64> = solution
        .labor
        .iter()
        .map(|r| ((r.node.clone(), r.date), r.hours_paid))
        .collect();
    for ((node, date), quantity) in &produced {
        // ignore integer-tolerance noise on the production columns
        if *quantity <= 1e-3 {
            continue;
        }
        let Some(day) = bundle.labor_calendar.day(*date) else {
            continue;
        };
        if day.is_fixed || day.minimum_paid_hours <= 0.0 {
            continue;
        }
        let hours = paid.get(&(node.clone(), *date)).copied().unwrap_or(0.0);
        if hours + 1e-6 < day.minimum_paid_hours {
            return Err(PlanError::invariant(
                "weekend-minimum-payment",
                format!(
                    "{node} on {date}: paid {hours:.3}h under the {:.1}h minimum",
                    day.minimum_paid_hours
                ),
            ));
        }
    }
    Ok(())
}

/// consumed + shortage must equal demand for every in-horizon entry.
fn check_demand_service(bundle: &PlanningBundle, solution: &PlanSolution) -> PlanResult<()> {
    let mut demand: BTreeMap<(NodeId, ProductId, NaiveDate), f64> = BTreeMap::new();
    for entry in &bundle.forecast.entries {
        if entry.date < bundle.planning_start
            || entry.date > bundle.planning_end
            || entry.quantity <= 0.0
        {
            continue;
        }
        *demand
            .entry((entry.node.clone(), entry.product.clone(), entry.date))
            .or_insert(0.0) += entry.quantity;
    }

    let mut served: BTreeMap<(NodeId, ProductId, NaiveDate), f64> = BTreeMap::new();
    for record in &solution.consumption {
        *served
            .entry((record.node.clone(), record.product.clone(), record.date))
            .or_insert(0.0) += record.total();
    }
    for record in &solution.shortages {
        *served
            .entry((record.node.clone(), record.product.clone(), record.date))
            .or_insert(0.0) += record.quantity;
    }

    for (key, quantity) in &demand {
        let got = served.get(key).copied().unwrap_or(0.0);
        let tolerance = 1e-3 * (1.0 + quantity);
        if (got - quantity).abs() > tolerance {
            return Err(PlanError::invariant(
                "demand-service",
                format!(
                    "{}/{} on {}: consumed + shortage {got:.3} vs demand {quantity:.3}",
                    key.0, key.1, key.2
                ),
            ));
        }
    }
    Ok(())
}

/// Synthesized opening-stock production dates must precede the horizon.
fn check_opening_stock_dates(bundle: &PlanningBundle, fefo: &FefoDetail) -> PlanResult<()> {
    for batch in &fefo.batches {
        if batch.origin == BatchOrigin::OpeningStock && batch.production_date >= bundle.planning_start
        {
            return Err(PlanError::invariant(
                "opening-stock-dates",
                format!(
                    "batch {} at {}: synthesized production date {} not before {}",
                    batch.id, batch.node, batch.production_date, bundle.planning_start
                ),
            ));
        }
    }
    Ok(())
}

/// No shipment may deliver past the end of the horizon.
fn check_post_horizon_shipments(bundle: &PlanningBundle, solution: &PlanSolution) -> PlanResult<()> {
    for shipment in &solution.shipments {
        if shipment.delivery_date > bundle.planning_end {
            return Err(PlanError::invariant(
                "post-horizon-shipments",
                format!(
                    "{} -> {} departing {} delivers {} after horizon end {}",
                    shipment.origin,
                    shipment.destination,
                    shipment.departure_date,
                    shipment.delivery_date,
                    bundle.planning_end
                ),
            ));
        }
    }
    Ok(())
}

/// Batch totals must equal aggregate inventory for every key and day.
fn check_fefo_parity(solution: &PlanSolution, fefo: &FefoDetail) -> PlanResult<()> {
    let aggregate = solution.inventory_map();
    let mut audited: BTreeMap<(NodeId, ProductId, bakeplan_core::StorageState, NaiveDate), f64> =
        BTreeMap::new();
    for record in &fefo.daily_totals {
        audited.insert(
            (
                record.node.clone(),
                record.product.clone(),
                record.state,
                record.date,
            ),
            record.quantity,
        );
    }
    for (key, agg) in &aggregate {
        let batch_total = audited.get(key).copied().unwrap_or(0.0);
        let tolerance = 1e-3 + 1e-6 * agg.abs();
        if (batch_total - agg).abs() > tolerance {
            return Err(PlanError::invariant(
                "fefo-parity",
                format!(
                    "{}/{}/{} on {}: batch total {batch_total:.4} vs aggregate {agg:.4}",
                    key.0, key.1, key.2, key.3
                ),
            ));
        }
    }
    Ok(())
}

/// Cost components must sum to the reported total.
fn check_cost_sum(solution: &PlanSolution) -> PlanResult<()> {
    let sum = solution.costs.component_sum();
    let tolerance = 1e-6 * (1.0 + sum.abs());
    if (sum - solution.costs.total).abs() > tolerance {
        return Err(PlanError::invariant(
            "cost-sum",
            format!("components sum to {sum:.6} but total is {:.6}", solution.costs.total),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{CostBreakdown, LaborRecord, ProductionEvent};
    use crate::test_utils::simple_bundle;

    fn empty_solution(bundle: &PlanningBundle) -> PlanSolution {
        PlanSolution {
            model_type: "sliding-window".into(),
            status: "optimal".into(),
            objective_value: 0.0,
            solve_time_seconds: 0.0,
            planning_start: bundle.planning_start,
            planning_end: bundle.planning_end,
            production: vec![],
            labor: vec![],
            shipments: vec![],
            inventory: vec![],
            freeze_flows: vec![],
            thaw_flows: vec![],
            consumption: vec![],
            shortages: vec![],
            disposals: vec![],
            costs: CostBreakdown::default(),
        }
    }

    fn empty_fefo() -> FefoDetail {
        FefoDetail {
            batches: vec![],
            final_inventory: vec![],
            shipment_allocations: vec![],
            daily_totals: vec![],
        }
    }

    #[test]
    fn test_phantom_supply_detected() {
        let bundle = simple_bundle(7);
        let mut solution = empty_solution(&bundle);
        // claim consumption without any production or opening stock
        solution.consumption.push(crate::extract::ConsumptionRecord {
            node: NodeId::new("br1"),
            product: bundle.products[0].id.clone(),
            date: bundle.planning_start,
            from_ambient: 100.0,
            from_thawed: 0.0,
        });
        let err = check_no_phantom_supply(&bundle, &solution).unwrap_err();
        assert!(err.to_string().contains("no-phantom-supply"));
    }

    #[test]
    fn test_labor_without_production_detected() {
        let bundle = simple_bundle(7);
        let mut solution = empty_solution(&bundle);
        solution.labor.push(LaborRecord {
            node: NodeId::new("mfg"),
            date: bundle.planning_start,
            hours_used: 0.0,
            hours_paid: 4.0,
            regular_hours: 0.0,
            overtime_hours: 4.0,
            cost: 300.0,
        });
        let err = check_labor_without_production(&solution).unwrap_err();
        assert!(err.to_string().contains("labor-without-production"));
    }

    #[test]
    fn test_conservation_accepts_balanced_plan() {
        let bundle = simple_bundle(7);
        let mut solution = empty_solution(&bundle);
        solution.production.push(ProductionEvent {
            node: NodeId::new("mfg"),
            product: bundle.products[0].id.clone(),
            date: bundle.planning_start,
            quantity: 200.0,
            mixes: 2,
        });
        solution.consumption.push(crate::extract::ConsumptionRecord {
            node: NodeId::new("br1"),
            product: bundle.products[0].id.clone(),
            date: bundle.planning_start,
            from_ambient: 200.0,
            from_thawed: 0.0,
        });
        assert!(check_conservation(&bundle, &solution).is_ok());
        // drop the consumption: now 200 units vanish
        solution.consumption.clear();
        assert!(check_conservation(&bundle, &solution).is_err());
    }

    #[test]
    fn test_cost_sum_detects_drift() {
        let bundle = simple_bundle(7);
        let mut solution = empty_solution(&bundle);
        solution.costs.labor = 10.0;
        solution.costs.total = 9.0;
        assert!(check_cost_sum(&solution).is_err());
        solution.costs.total = 10.0;
        assert!(check_cost_sum(&solution).is_ok());
    }

    #[test]
    fn test_post_horizon_shipment_detected() {
        let bundle = simple_bundle(7);
        let mut solution = empty_solution(&bundle);
        solution.shipments.push(crate::extract::Shipment {
            origin: NodeId::new("mfg"),
            destination: NodeId::new("br1"),
            product: bundle.products[0].id.clone(),
            departure_date: bundle.planning_end,
            delivery_date: bundle.planning_end + chrono::Days::new(1),
            ship_state: bakeplan_core::StorageState::Ambient,
            arrival_state: bakeplan_core::StorageState::Ambient,
            quantity: 10.0,
            pallets: None,
            truck: None,
        });
        let err = check_post_horizon_shipments(&bundle, &solution).unwrap_err();
        assert!(err.to_string().contains("post-horizon"));
    }

    #[test]
    fn test_validate_accepts_empty_plan_for_zero_demand() {
        let mut bundle = simple_bundle(7);
        bundle.forecast.entries.clear();
        let solution = empty_solution(&bundle);
        let fefo = empty_fefo();
        assert!(validate_solution(&bundle, &solution, &fefo).is_ok());
    }
}
