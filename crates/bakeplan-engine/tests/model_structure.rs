//! Structural tests over the built model: which columns and rows exist,
//! without invoking the solver.

use bakeplan_core::StorageState;
use bakeplan_engine::indices::PlanningIndices;
use bakeplan_engine::model::vars::VarKey;
use bakeplan_engine::model::ModelBuilder;
use bakeplan_engine::test_utils::{frozen_chain_bundle, simple_bundle, trucked_bundle, two_node_bundle};
use bakeplan_engine::SolveConfig;

#[test]
fn post_horizon_shipment_variables_are_never_created() {
    // 28-day horizon, 2-day transit: departures on the last two days
    // would deliver after the horizon and must not exist.
    let bundle = two_node_bundle(28, 2);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    assert!(model
        .vars
        .position(&VarKey::InTransit { route: 0, product: 0, day: 25 })
        .is_some());
    for day in [26, 27] {
        assert!(
            model
                .vars
                .position(&VarKey::InTransit { route: 0, product: 0, day })
                .is_none(),
            "departure on day {day} would deliver past the horizon"
        );
    }
}

#[test]
fn disposal_variables_only_exist_where_stock_can_expire() {
    // No opening stock and 17-day ambient shelf life: nothing can be
    // expired before day 17.
    let bundle = simple_bundle(21);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    let mfg = idx.node_index[&bakeplan_engine::test_utils::node("mfg")];
    assert!(model
        .vars
        .position(&VarKey::Disposal { node: mfg, product: 0, state: StorageState::Ambient, day: 16 })
        .is_none());
    assert!(model
        .vars
        .position(&VarKey::Disposal { node: mfg, product: 0, state: StorageState::Ambient, day: 17 })
        .is_some());
}

#[test]
fn shelf_life_rows_start_once_the_window_leaves_the_horizon_start() {
    let bundle = simple_bundle(21);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    // ambient life is 17: first window row is day 17
    assert!(!model.rows.iter().any(|r| r.name.ends_with("_amb_d16") && r.name.starts_with("life_")));
    assert!(model.rows.iter().any(|r| r.name.starts_with("life_") && r.name.ends_with("_amb_d17")));
}

#[test]
fn consumption_is_partitioned_by_what_the_node_stores() {
    let bundle = frozen_chain_bundle(12, 10, 100.0);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    let wa = idx.node_index[&bakeplan_engine::test_utils::node("wa")];
    // thaw-receiving breadroom: served from thawed only
    assert!(model
        .vars
        .position(&VarKey::ConsumedThawed { node: wa, product: 0, day: 10 })
        .is_some());
    assert!(model
        .vars
        .position(&VarKey::ConsumedAmbient { node: wa, product: 0, day: 10 })
        .is_none());
}

#[test]
fn truck_loads_follow_the_departure_weekdays() {
    let bundle = trucked_bundle(14);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    // horizon starts on a Monday; the truck runs Mon/Wed/Fri
    let monday = 0;
    let tuesday = 1;
    assert!(model
        .vars
        .position(&VarKey::TruckLoad { truck: 0, route: 0, product: 0, day: monday })
        .is_some());
    assert!(model
        .vars
        .position(&VarKey::TruckLoad { truck: 0, route: 0, product: 0, day: tuesday })
        .is_none());
    // the untrucked hub lane ships on any in-horizon day
    assert!(model
        .vars
        .position(&VarKey::InTransit { route: 1, product: 0, day: tuesday })
        .is_some());
    // trucked lane shipments only on truck days
    assert!(model
        .vars
        .position(&VarKey::InTransit { route: 0, product: 0, day: tuesday })
        .is_none());
}

#[test]
fn pallet_tracking_flag_controls_the_integer_layer() {
    let bundle = trucked_bundle(14);
    let idx = PlanningIndices::build(&bundle).unwrap();

    let tracked = ModelBuilder::build(&bundle, &idx, &SolveConfig::default()).unwrap();
    let mfg = idx.node_index[&bakeplan_engine::test_utils::node("mfg")];
    assert!(tracked
        .vars
        .position(&VarKey::PalletCount { node: mfg, product: 0, state: StorageState::Ambient, day: 0 })
        .is_some());
    assert!(tracked
        .vars
        .position(&VarKey::TruckUsed { truck: 0, day: 0 })
        .is_some());

    let mut cfg = SolveConfig::default();
    cfg.pallet_tracking = false;
    let untracked = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();
    assert!(untracked
        .vars
        .position(&VarKey::PalletCount { node: mfg, product: 0, state: StorageState::Ambient, day: 0 })
        .is_none());
    assert!(untracked
        .vars
        .position(&VarKey::TruckUsed { truck: 0, day: 0 })
        .is_none());
    assert!(untracked.num_cols() < tracked.num_cols());
}

#[test]
fn lp_dump_contains_the_model_sections() {
    let bundle = simple_bundle(7);
    let idx = PlanningIndices::build(&bundle).unwrap();
    let cfg = SolveConfig::default();
    let model = ModelBuilder::build(&bundle, &idx, &cfg).unwrap();

    let text = bakeplan_engine::lp::render_lp(&model);
    assert!(text.starts_with("\\ bakeplan planning model"));
    for section in ["Minimize", "Subject To", "Bounds", "General", "Binary", "End"] {
        assert!(text.contains(section), "missing section {section}");
    }
    // every row name appears
    assert!(text.contains("bal_mfg_p1_amb_d0"));
    assert!(text.contains("dem_br1_p1_d1"));
}
