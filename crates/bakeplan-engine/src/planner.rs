//! End-to-end planning orchestration.
//!
//! One call runs the whole chain: index build, model build, solve,
//! extraction, FEFO replay, and the post-solve validation gate. The
//! engine owns its model and records for the duration of the call and
//! shares nothing across calls.

use crate::config::SolveConfig;
use crate::extract::{extract_solution, PlanSolution};
use crate::fefo::{FefoAllocator, FefoDetail};
use crate::indices::PlanningIndices;
use crate::model::ModelBuilder;
use crate::solver::solve_model;
use crate::validate::validate_solution;
use bakeplan_core::{PlanResult, PlanningBundle};
use tracing::info;

/// The validated plan plus its batch-level detail.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub solution: PlanSolution,
    pub fefo: FefoDetail,
}

/// Plan the bundle under the given configuration.
///
/// Returns only solutions that passed every post-solve invariant; a
/// solver-optimal result that violates an invariant surfaces as
/// `PlanError::InvariantViolation`, never as data.
pub fn solve_plan(bundle: &PlanningBundle, config: &SolveConfig) -> PlanResult<PlanOutcome> {
    info!(
        start = %bundle.planning_start,
        end = %bundle.planning_end,
        products = bundle.products.len(),
        nodes = bundle.network.nodes.len(),
        "planning"
    );

    let indices = PlanningIndices::build(bundle)?;
    let model = ModelBuilder::build(bundle, &indices, config)?;
    let output = solve_model(model, config)?;
    let solution = extract_solution(bundle, &indices, &output, config.pallet_tracking)?;
    let fefo = FefoAllocator::new(bundle, &solution).allocate()?;
    validate_solution(bundle, &solution, &fefo)?;

    info!(
        status = %solution.status,
        total_cost = solution.costs.total,
        "plan validated"
    );
    Ok(PlanOutcome { solution, fefo })
}
