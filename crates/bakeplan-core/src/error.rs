//! Unified error types for the bakeplan ecosystem
//!
//! This module provides a common error type [`PlanError`] that can represent
//! errors from any stage of planning. Stage-specific failures are folded into
//! `PlanError` so callers handle one type at the API boundary.
//!
//! # Example
//!
//! ```ignore
//! use bakeplan_core::{PlanError, PlanResult};
//!
//! fn plan(bundle_path: &str) -> PlanResult<()> {
//!     let bundle = load_bundle(bundle_path)?;
//!     solve_plan(&bundle)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all planning operations.
///
/// Input errors surface once, when the planning bundle is validated.
/// Everything after that point is either a solver-side failure or an
/// internal invariant violation detected by the post-solve checks.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Malformed or inconsistent planning inputs
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A product id in the forecast or inventory matched no catalog entry or alias
    #[error("Unresolved product alias: {product} ({context})")]
    AliasUnresolved { product: String, context: String },

    /// Index-set enumeration failed (dangling references, empty horizon, ...)
    #[error("Index build error: {0}")]
    IndexBuild(String),

    /// Model construction failed
    #[error("Model build error: {0}")]
    ModelBuild(String),

    /// The solver itself failed (setup, licensing, unexpected status)
    #[error("Solver error: {0}")]
    Solver(String),

    /// The model was proven infeasible
    #[error("Problem infeasible: {diagnostics}")]
    Infeasible { diagnostics: String },

    /// The time limit elapsed before any usable incumbent was found
    #[error("Time limit reached with no incumbent solution")]
    NoIncumbent,

    /// A post-solve invariant check rejected the solution
    #[error("Solution invariant violated [{check}]: {details}")]
    InvariantViolation { check: String, details: String },

    /// Batch-level inventory diverged from the aggregate plan during replay
    #[error("Batch/aggregate parity error: {details}")]
    FefoParity { details: String },

    /// I/O errors from optional debug artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors from optional debug artifacts
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    /// Shorthand for an invariant violation with expected/actual context.
    pub fn invariant(check: &str, details: impl Into<String>) -> Self {
        PlanError::InvariantViolation {
            check: check.to_string(),
            details: details.into(),
        }
    }
}

/// Convenience type alias for Results using PlanError.
pub type PlanResult<T> = Result<T, PlanError>;

// Conversion from anyhow::Error (artifact-export helpers use anyhow contexts)
impl From<anyhow::Error> for PlanError {
    fn from(err: anyhow::Error) -> Self {
        PlanError::Io(std::io::Error::other(err.to_string()))
    }
}
