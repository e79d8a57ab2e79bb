//! # bakeplan-core: Supply-Chain Planning Domain Model
//!
//! Provides the domain objects and the validated input boundary for the
//! bakeplan production and distribution planner.
//!
//! ## Design Philosophy
//!
//! The planning network is a directed graph of typed nodes (manufacturing
//! sites, hubs, frozen buffers, breadrooms) connected by transport routes.
//! Product mass moves through three storage states (ambient, frozen,
//! thawed), and shelf life is measured from the date mass *entered* its
//! current state, not from the production date. Thawing resets the clock.
//!
//! Everything the engine consumes arrives through one type:
//! [`PlanningBundle`]. Its `validated()` constructor is the single point
//! where input errors surface; after it succeeds the engine may assume
//! alias-resolved product ids, feasible routes, a covered labor calendar,
//! and reachable demand nodes.
//!
//! ## Core Data Structures
//!
//! - [`Network`] / [`Node`] / [`Route`] - topology with capability bits
//! - [`Product`] / [`StorageState`] / [`ShelfLife`] - SKUs and material states
//! - [`TruckSchedule`] - palletized scheduled departures
//! - [`LaborCalendar`] / [`LaborDay`] - fixed and non-fixed labor days
//! - [`Forecast`] / [`InitialInventory`] - demand and opening stock
//! - [`CostStructure`] - objective cost parameters
//! - [`PlanError`] / [`PlanResult`] - unified error handling
//! - [`Diagnostics`] - validation findings (warnings and errors)

pub mod bundle;
pub mod calendar;
pub mod costs;
pub mod demand;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod network;
pub mod product;
pub mod trucks;

pub use bundle::PlanningBundle;
pub use calendar::{LaborCalendar, LaborDay};
pub use costs::CostStructure;
pub use demand::{DemandEntry, Forecast};
pub use diagnostics::{Diagnostics, Finding, Severity};
pub use error::{PlanError, PlanResult};
pub use ids::{BatchId, NodeId, ProductId, TruckId};
pub use inventory::{InitialInventory, InventoryEntry};
pub use network::{Network, Node, NodeRole, Route, TransportMode};
pub use product::{Product, ShelfLife, StorageState};
pub use trucks::TruckSchedule;
