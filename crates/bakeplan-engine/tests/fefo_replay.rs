//! FEFO replay tests over hand-built aggregate plans: no solver
//! involved, the aggregate records are written to be self-consistent.

use bakeplan_core::{
    CostStructure, Diagnostics, Forecast, InitialInventory, Network, Node, NodeId, PlanningBundle,
    Product, ProductId, StorageState,
};
use bakeplan_engine::extract::{
    ConsumptionRecord, CostBreakdown, InventoryRecord, PlanSolution, ProductionEvent, Shipment,
};
use bakeplan_engine::fefo::{BatchOrigin, FefoAllocator};
use bakeplan_engine::test_utils::{flat_calendar, horizon_start};
use chrono::{Days, NaiveDate};

fn bare_bundle(horizon: usize) -> PlanningBundle {
    let start = horizon_start();
    let mut network = Network::new();
    let mut plant = Node::manufacturing("mfg", "Plant");
    plant.has_demand = true;
    network.add_node(plant);

    PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::default(),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: start + Days::new(horizon as u64 - 1),
        diagnostics: Diagnostics::new(),
    }
}

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

fn day(start: NaiveDate, offset: u64) -> NaiveDate {
    start + Days::new(offset)
}

fn production(node: &str, product: &str, date: NaiveDate, quantity: f64) -> ProductionEvent {
    ProductionEvent {
        node: NodeId::new(node),
        product: ProductId::new(product),
        date,
        quantity,
        mixes: (quantity / 100.0).round() as i64,
    }
}

fn stock(node: &str, product: &str, date: NaiveDate, quantity: f64) -> InventoryRecord {
    InventoryRecord {
        node: NodeId::new(node),
        product: ProductId::new(product),
        state: StorageState::Ambient,
        date,
        quantity,
        pallets: None,
    }
}

#[test]
fn oldest_batch_is_consumed_first() {
    // Two production events five days apart feed one demand; FEFO must
    // exhaust the older batch before touching the newer one.
    let bundle = bare_bundle(7);
    let start = bundle.planning_start;
    let mut solution = empty_solution(&bundle);

    solution.production.push(production("mfg", "p1", day(start, 0), 100.0));
    solution.production.push(production("mfg", "p1", day(start, 5), 100.0));
    solution.consumption.push(ConsumptionRecord {
        node: NodeId::new("mfg"),
        product: ProductId::new("p1"),
        date: day(start, 6),
        from_ambient: 120.0,
        from_thawed: 0.0,
    });
    for offset in 0..5 {
        solution.inventory.push(stock("mfg", "p1", day(start, offset), 100.0));
    }
    solution.inventory.push(stock("mfg", "p1", day(start, 5), 200.0));
    solution.inventory.push(stock("mfg", "p1", day(start, 6), 80.0));

    let detail = FefoAllocator::new(&bundle, &solution)
        .allocate()
        .expect("replay must succeed");

    assert_eq!(detail.batches.len(), 2);
    assert!(detail
        .batches
        .iter()
        .all(|b| b.origin == BatchOrigin::Production));

    // all that remains is 80 units of the *newer* batch
    assert_eq!(detail.final_inventory.len(), 1);
    let remaining = &detail.final_inventory[0];
    assert_eq!(remaining.batch, detail.batches[1].id);
    assert!((remaining.quantity - 80.0).abs() < 1e-6);
    // its in-state age at horizon end equals end - newer production date
    let end = bundle.planning_end;
    assert_eq!(remaining.age_in_state(end), 1);
    assert_eq!(remaining.total_age(end), 1);
}

#[test]
fn shipment_allocations_travel_and_thaw_on_arrival() {
    let start = horizon_start();
    let mut bundle = bare_bundle(8);
    // add a frozen buffer shipping into a thaw-receiving room
    bundle
        .network
        .add_node(Node::frozen_buffer("buf", "Cold Store"));
    bundle
        .network
        .add_node(Node::thawing_breadroom("wa", "Western Room"));

    let mut solution = empty_solution(&bundle);
    // 200 units frozen at the buffer from two freeze cohorts, shipped
    // frozen on day 3, delivered thawed on day 5
    solution.production.push(production("buf", "p1", day(start, 0), 120.0));
    solution.production.push(production("buf", "p1", day(start, 1), 80.0));
    solution.freeze_flows.push(bakeplan_engine::extract::StateFlow {
        node: NodeId::new("buf"),
        product: ProductId::new("p1"),
        date: day(start, 1),
        quantity: 120.0,
    });
    solution.freeze_flows.push(bakeplan_engine::extract::StateFlow {
        node: NodeId::new("buf"),
        product: ProductId::new("p1"),
        date: day(start, 2),
        quantity: 80.0,
    });
    solution.shipments.push(Shipment {
        origin: NodeId::new("buf"),
        destination: NodeId::new("wa"),
        product: ProductId::new("p1"),
        departure_date: day(start, 3),
        delivery_date: day(start, 5),
        ship_state: StorageState::Frozen,
        arrival_state: StorageState::Thawed,
        quantity: 150.0,
        pallets: None,
        truck: None,
    });

    // aggregate inventory consistent with the flows above
    solution.inventory.push(stock("buf", "p1", day(start, 0), 120.0));
    solution.inventory.push(InventoryRecord {
        state: StorageState::Frozen,
        ..stock("buf", "p1", day(start, 1), 120.0)
    });
    solution.inventory.push(InventoryRecord {
        state: StorageState::Ambient,
        ..stock("buf", "p1", day(start, 1), 80.0)
    });
    solution.inventory.push(InventoryRecord {
        state: StorageState::Frozen,
        ..stock("buf", "p1", day(start, 2), 200.0)
    });
    solution.inventory.push(InventoryRecord {
        state: StorageState::Frozen,
        ..stock("buf", "p1", day(start, 3), 50.0)
    });
    solution.inventory.push(InventoryRecord {
        state: StorageState::Frozen,
        ..stock("buf", "p1", day(start, 4), 50.0)
    });
    for offset in 5..8 {
        solution.inventory.push(InventoryRecord {
            state: StorageState::Frozen,
            ..stock("buf", "p1", day(start, offset), 50.0)
        });
        solution.inventory.push(InventoryRecord {
            node: NodeId::new("wa"),
            state: StorageState::Thawed,
            ..stock("wa", "p1", day(start, offset), 150.0)
        });
    }

    let detail = FefoAllocator::new(&bundle, &solution)
        .allocate()
        .expect("replay must succeed");

    // the shipment drew the oldest frozen cohort (120 frozen day 1)
    // before the newer one
    let allocated: f64 = detail
        .shipment_allocations
        .iter()
        .map(|a| a.quantity)
        .sum();
    assert!((allocated - 150.0).abs() < 1e-6);
    assert_eq!(detail.shipment_allocations.len(), 2);
    assert!((detail.shipment_allocations[0].quantity - 120.0).abs() < 1e-6);

    // thawed arrivals restart the shelf-life clock at delivery
    let thawed = detail
        .final_inventory
        .iter()
        .find(|s| s.node == NodeId::new("wa") && s.state == StorageState::Thawed)
        .expect("thawed stock at the breadroom");
    assert_eq!(thawed.state_entry_date, day(start, 5));
    assert_eq!(thawed.age_in_state(bundle.planning_end), 2);
}

#[test]
fn aggregate_divergence_is_a_parity_error() {
    let bundle = bare_bundle(3);
    let start = bundle.planning_start;
    let mut solution = empty_solution(&bundle);
    solution.production.push(production("mfg", "p1", day(start, 0), 100.0));
    // aggregate claims more than the batches hold
    for offset in 0..3 {
        solution.inventory.push(stock("mfg", "p1", day(start, offset), 150.0));
    }

    let err = FefoAllocator::new(&bundle, &solution)
        .allocate()
        .unwrap_err();
    assert!(matches!(err, bakeplan_core::PlanError::FefoParity { .. }));
}

#[test]
fn opening_stock_batches_get_display_dates_before_the_horizon() {
    let start = horizon_start();
    let mut bundle = bare_bundle(3);
    bundle.initial_inventory = InitialInventory::new(
        start - Days::new(1),
        vec![bakeplan_core::InventoryEntry::new(
            "mfg",
            "p1",
            StorageState::Ambient,
            64.0,
        )],
    );
    let mut solution = empty_solution(&bundle);
    for offset in 0..3 {
        solution.inventory.push(stock("mfg", "p1", day(start, offset), 64.0));
    }

    let detail = FefoAllocator::new(&bundle, &solution)
        .allocate()
        .expect("replay must succeed");

    assert_eq!(detail.batches.len(), 1);
    let batch = &detail.batches[0];
    assert_eq!(batch.origin, BatchOrigin::OpeningStock);
    assert!(batch.production_date < bundle.planning_start);
    // ambient: half of 17 days, so 8 days before the snapshot
    assert_eq!(batch.production_date, start - Days::new(1) - Days::new(8));
}
