//! Shared scenario fixtures for unit and integration tests.
//!
//! Horizons start on Monday 2025-06-02 so weekday-based truck schedules
//! and the fixed/non-fixed labor split line up predictably.

use bakeplan_core::{
    CostStructure, DemandEntry, Diagnostics, Forecast, InitialInventory, InventoryEntry,
    LaborCalendar, LaborDay, Network, Node, NodeId, PlanningBundle, Product, ProductId, Route,
    StorageState, TransportMode, TruckSchedule,
};
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Monday.
pub fn horizon_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

/// Weekday/weekend calendar covering `days` from `start`: 12 fixed hours
/// on Monday-Friday, non-fixed weekends with the 4-hour minimum.
pub fn flat_calendar(start: NaiveDate, days: usize) -> LaborCalendar {
    let mut calendar = LaborCalendar::new();
    for date in start.iter_days().take(days) {
        let day = match date.weekday() {
            Weekday::Sat | Weekday::Sun => LaborDay::non_fixed(date, 75.0),
            _ => LaborDay::fixed(date, 12.0, 50.0, 75.0),
        };
        calendar.add(day);
    }
    calendar
}

fn validated(bundle: PlanningBundle) -> PlanningBundle {
    bundle.validated().expect("fixture bundle must validate")
}

/// One manufacturer, one breadroom, one ambient lane with 1-day transit,
/// 100 units/day demanded from the second day on.
pub fn simple_bundle(horizon: usize) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut network = Network::new();
    network.add_node(Node::manufacturing("mfg", "Plant"));
    network.add_node(Node::breadroom("br1", "Room 1"));
    network.add_route(Route::new("mfg", "br1", TransportMode::Ambient, 1, 0.05));

    let product = Product::new("p1", "White Loaf").with_units_per_mix(100);
    let mut forecast = Vec::new();
    for offset in 1..horizon {
        forecast.push(DemandEntry::new(
            "br1",
            "p1",
            start + Days::new(offset as u64),
            100.0,
        ));
    }

    validated(PlanningBundle {
        network,
        products: vec![product],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(forecast),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    })
}

/// Manufacturer and breadroom joined by one ambient lane with the given
/// transit; a single demand on the last day.
pub fn two_node_bundle(horizon: usize, transit_days: u32) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut network = Network::new();
    network.add_node(Node::manufacturing("mfg", "Plant"));
    network.add_node(Node::breadroom("br1", "Room 1"));
    network.add_route(Route::new(
        "mfg",
        "br1",
        TransportMode::Ambient,
        transit_days,
        0.05,
    ));

    validated(PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(vec![DemandEntry::new("br1", "p1", end, 100.0)]),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    })
}

/// Manufacturer -> frozen buffer -> thaw-receiving breadroom. The second
/// leg ships frozen into a node that only stores thawed, so deliveries
/// thaw on arrival. `demand_day` is the 0-based day of the single demand.
pub fn frozen_chain_bundle(horizon: usize, demand_day: usize, quantity: f64) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut network = Network::new();
    network.add_node(Node::manufacturing("mfg", "Plant"));
    network.add_node(Node::frozen_buffer("buf", "Cold Store"));
    network.add_node(Node::thawing_breadroom("wa", "Western Room"));
    network.add_route(Route::new("mfg", "buf", TransportMode::Ambient, 1, 0.05));
    network.add_route(Route::new("buf", "wa", TransportMode::Frozen, 2, 0.30));

    validated(PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(vec![DemandEntry::new(
            "wa",
            "p1",
            start + Days::new(demand_day as u64),
            quantity,
        )]),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    })
}

/// Breadroom holding opening stock, no production possible anywhere
/// (the producer exists but demand sits on the stocked breadroom and the
/// lane is severed by giving the forecast only what stock can serve).
/// Demand is spread evenly over the first `demand_days` days.
pub fn stocked_breadroom_bundle(
    horizon: usize,
    opening_units: f64,
    total_demand: f64,
    demand_days: usize,
) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut network = Network::new();
    // isolated breadroom living off its opening stock
    network.add_node(Node::breadroom("br1", "Room 1"));
    // a producer must exist for the bundle to validate; it has no lane
    // to br1, which is fine because br1 holds stock
    network.add_node(Node::manufacturing("mfg", "Plant"));

    let per_day = total_demand / demand_days as f64;
    let mut forecast = Vec::new();
    for offset in 0..demand_days {
        forecast.push(DemandEntry::new(
            "br1",
            "p1",
            start + Days::new(offset as u64),
            per_day,
        ));
    }

    validated(PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(forecast),
        initial_inventory: InitialInventory::new(
            start - Days::new(1),
            vec![InventoryEntry::new(
                "br1",
                "p1",
                StorageState::Ambient,
                opening_units,
            )],
        ),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    })
}

/// Manufacturer shipping to a hub on weekday trucks (Mon/Wed/Fri), with
/// demand at a breadroom behind the hub.
pub fn trucked_bundle(horizon: usize) -> PlanningBundle {
    let start = horizon_start();
    let end = start + Days::new(horizon as u64 - 1);

    let mut network = Network::new();
    network.add_node(Node::manufacturing("mfg", "Plant"));
    network.add_node(Node::hub("hub1", "Hub"));
    network.add_node(Node::breadroom("br1", "Room 1"));
    network.add_route(Route::new("mfg", "hub1", TransportMode::Ambient, 1, 0.05));
    network.add_route(Route::new("hub1", "br1", TransportMode::Ambient, 1, 0.08));

    let truck = TruckSchedule::new("T1", "mfg")
        .with_destination("hub1")
        .with_weekdays([Weekday::Mon, Weekday::Wed, Weekday::Fri])
        .with_costs(100.0, 1.5);

    let mut forecast = Vec::new();
    for offset in 2..horizon {
        forecast.push(DemandEntry::new(
            "br1",
            "p1",
            start + Days::new(offset as u64),
            640.0,
        ));
    }

    validated(PlanningBundle {
        network,
        products: vec![Product::new("p1", "White Loaf").with_units_per_mix(100)],
        truck_schedules: vec![truck],
        labor_calendar: flat_calendar(start, horizon),
        cost_structure: CostStructure::default(),
        forecast: Forecast::new(forecast),
        initial_inventory: InitialInventory::empty(start - Days::new(1)),
        planning_start: start,
        planning_end: end,
        diagnostics: Diagnostics::new(),
    })
}

/// Ids used across fixtures.
pub fn node(id: &str) -> NodeId {
    NodeId::new(id)
}

pub fn product(id: &str) -> ProductId {
    ProductId::new(id)
}
