//! # bakeplan-engine: Sliding-Window Production-Distribution Planning
//!
//! Plans production, shipment, freezing/thawing, and demand service for
//! a perishable-goods network over a multi-week horizon, as one
//! mixed-integer program over aggregate SKU-level flows.
//!
//! | Stage | Module | Responsibility |
//! |-------|--------|----------------|
//! | Index build | [`indices`] | Enumerate the sparse sets variables range over |
//! | Formulation | [`model`] | Declare columns, rows, and objective |
//! | Solve | [`solver`] | Drive HiGHS; accept optimal or screened incumbents |
//! | Extraction | [`extract`] | Typed plan record with cost breakdown |
//! | Batch replay | [`fefo`] | First-expired-first-out traceability |
//! | Validation | [`validate`] | Invariant gate over the returned plan |
//!
//! ## Shelf life without batch variables
//!
//! Mass lives in three states (ambient, frozen, thawed) and a unit may
//! only leave a state within that state's shelf life of *entering* it.
//! Instead of per-batch age variables, the model bounds cumulative
//! outflows of each (node, product, state) by cumulative state entries
//! over a sliding window of the state's shelf-life length. Thawing
//! resets the clock, including implicitly when a frozen lane delivers
//! into a node that cannot store frozen. Batch-level answers are
//! recovered afterwards by deterministic FEFO replay, which is
//! age-optimal under this objective.
//!
//! ## Example
//!
//! ```ignore
//! use bakeplan_core::PlanningBundle;
//! use bakeplan_engine::{solve_plan, SolveConfig};
//!
//! let bundle: PlanningBundle = load_inputs()?.validated()?;
//! let config = SolveConfig::default();
//! let outcome = solve_plan(&bundle, &config)?;
//! println!("{}", outcome.solution.summary());
//! ```

pub mod config;
pub mod extract;
pub mod fefo;
pub mod indices;
pub mod lp;
pub mod model;
pub mod planner;
pub mod solver;
pub mod test_utils;
pub mod validate;

pub use config::{SolveConfig, SolverBackend};
pub use extract::{CostBreakdown, PlanSolution, Shipment};
pub use fefo::{Batch, BatchOrigin, BatchStock, FefoDetail, ShipmentAllocation};
pub use planner::{solve_plan, PlanOutcome};
pub use solver::SolveStatus;
