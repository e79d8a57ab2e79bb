//! End-to-end planning scenarios. Every solve here runs HiGHS and then
//! passes the post-solve validation gate inside `solve_plan`.

use bakeplan_core::{
    CostStructure, DemandEntry, Diagnostics, Forecast, InitialInventory, Network, Node,
    PlanError, PlanningBundle, Product,
};
use bakeplan_engine::test_utils::{
    flat_calendar, frozen_chain_bundle, horizon_start, simple_bundle, stocked_breadroom_bundle,
    trucked_bundle,
};
use bakeplan_engine::{solve_plan, SolveConfig};
use chrono::Days;

/// A single node that produces, stores ambient, and consumes its own
/// output. `demand` is (0-based day, quantity).
fn factory_bundle(horizon: usize, demand: Vec<(usize, f64)>) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut factory = Node::manufacturing("mfg", "Plant");
    factory.has_demand = true;

    let mut network = Network::new();
    network.add_node(factory);

    let forecast = demand
        .into_iter()
        .map(|(day, quantity)| DemandEntry::new("mfg", "p1", start + Days::new(day as u64), quantity))
        .collect();

    PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(forecast),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    }
    .validated()
    .unwrap()
}

#[test]
fn fresh_production_covers_a_week_of_demand() {
    // five days of 500 units each, no opening stock
    let bundle = factory_bundle(7, (1..=5).map(|d| (d, 500.0)).collect());
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!((solution.total_production() - 2500.0).abs() < 1.0);
    assert!(solution.shortages.is_empty());
    assert!((solution.total_consumed() - 2500.0).abs() < 1.0);
    // every labor record coincides with production (gate already checked)
    assert!(!solution.labor.is_empty());
}

#[test]
fn frozen_buffer_serves_the_thaw_receiving_breadroom() {
    let bundle = frozen_chain_bundle(12, 10, 100.0);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!(solution.shortages.is_empty());
    assert!(!solution.freeze_flows.is_empty(), "mass must be frozen at the buffer");

    let thawed_arrival = solution.shipments.iter().any(|s| {
        s.ship_state == bakeplan_core::StorageState::Frozen
            && s.arrival_state == bakeplan_core::StorageState::Thawed
    });
    assert!(thawed_arrival, "the frozen lane must deliver thawed");

    let from_thawed: f64 = solution.consumption.iter().map(|c| c.from_thawed).sum();
    assert!((from_thawed - 100.0).abs() < 1.0);
}

#[test]
fn opening_stock_is_consumed_not_disposed() {
    // 300 units on hand, 250 demanded over ten days, no way to produce:
    // everything demanded must come from stock. A formulation that caps
    // consumption with end-of-day inventory would strand a third of the
    // stock and report shortages here.
    let bundle = stocked_breadroom_bundle(12, 300.0, 250.0, 10);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!((solution.total_consumed() - 250.0).abs() < 1.0);
    assert!(solution.shortages.is_empty());
    assert!(solution.total_disposed() <= 50.0 + 1.0);
}

#[test]
fn zero_demand_means_zero_activity() {
    let mut bundle = simple_bundle(7);
    bundle.forecast.entries.clear();
    let bundle = bundle.validated().unwrap();

    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!(solution.production.is_empty());
    assert!(solution.labor.is_empty(), "no phantom labor on idle days");
    assert!(solution.shipments.is_empty());
    assert!(solution.costs.total.abs() < 1e-6);
}

#[test]
fn excess_demand_lands_in_shortages() {
    // 70k on day 2 against a 19.6k/day ceiling: at most three days of
    // output can arrive in time.
    let bundle = factory_bundle(5, vec![(2, 70_000.0)]);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!(!solution.shortages.is_empty());
    let supply_cap = 3.0 * bundle.cost_structure.max_daily_production();
    assert!(solution.total_consumed() <= supply_cap + 1.0);
    assert!(
        (solution.total_consumed() + solution.total_shortage() - 70_000.0).abs() < 1.0,
        "consumed + shortage must partition the demand"
    );
}

#[test]
fn impossible_demand_without_shortages_is_infeasible() {
    let bundle = factory_bundle(5, vec![(2, 70_000.0)]);
    let mut cfg = SolveConfig::quick();
    cfg.allow_shortages = false;
    match solve_plan(&bundle, &cfg) {
        Err(PlanError::Infeasible { .. }) => {}
        other => panic!("expected Infeasible, got {other:?}"),
    }
}

#[test]
fn one_day_horizon_runs_on_opening_stock() {
    let bundle = stocked_breadroom_bundle(1, 300.0, 100.0, 1);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!((solution.total_consumed() - 100.0).abs() < 1.0);
    assert!(solution.shortages.is_empty());
    assert!(solution.production.is_empty());
}

#[test]
fn trucked_lane_respects_pallet_capacity() {
    let bundle = trucked_bundle(14);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let solution = &outcome.solution;

    assert!(solution.shortages.is_empty());
    // every trucked shipment reports its pallets and truck id
    for shipment in solution
        .shipments
        .iter()
        .filter(|s| s.origin == bakeplan_engine::test_utils::node("mfg"))
    {
        let pallets = shipment.pallets.expect("trucked shipments carry pallets");
        assert!(pallets >= 1);
        assert!(pallets <= 44);
        assert!(shipment.truck.is_some());
    }
}

#[test]
fn repeated_solves_are_reproducible() {
    let bundle = simple_bundle(7);
    let mut cfg = SolveConfig::quick();
    cfg.threads = 1;

    let first = solve_plan(&bundle, &cfg).expect("first solve");
    let second = solve_plan(&bundle, &cfg).expect("second solve");

    let rel = (first.solution.objective_value - second.solution.objective_value).abs()
        / (1.0 + first.solution.objective_value.abs());
    assert!(rel < 1e-9, "objective must be reproducible");
    assert_eq!(
        first.fefo.batches.len(),
        second.fefo.batches.len(),
        "replay must allocate the same batches"
    );
    assert_eq!(
        first.fefo.shipment_allocations.len(),
        second.fefo.shipment_allocations.len()
    );
}

#[test]
fn solution_record_round_trips_through_json() {
    let bundle = simple_bundle(7);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");

    let value = outcome.solution.to_json_value().unwrap();
    let restored: bakeplan_engine::PlanSolution = serde_json::from_value(value.clone()).unwrap();
    let value_again = restored.to_json_value().unwrap();
    assert_eq!(value, value_again);
    assert_eq!(restored.production.len(), outcome.solution.production.len());
}

#[test]
fn lp_dump_artifact_is_written_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow_model_debug.lp");
    let bundle = simple_bundle(7);
    let cfg = SolveConfig::quick().with_lp_dump(&path);

    solve_plan(&bundle, &cfg).expect("plan should solve");

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Minimize"));
    assert!(text.contains("Subject To"));
}

#[test]
fn cost_components_sum_to_the_total() {
    let bundle = trucked_bundle(14);
    let outcome = solve_plan(&bundle, &SolveConfig::quick()).expect("plan should solve");
    let costs = &outcome.solution.costs;

    let sum = costs.component_sum();
    assert!((sum - costs.total).abs() < 1e-6 * (1.0 + sum.abs()));
    // labor and transport must both be engaged in this scenario
    assert!(costs.labor > 0.0);
    assert!(costs.transport > 0.0);
}
