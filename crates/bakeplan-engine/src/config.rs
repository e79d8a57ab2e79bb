//! Solve configuration.

use bakeplan_core::{PlanError, PlanResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Solver backend selection.
///
/// HiGHS is the only backend built in; the name-based constructor keeps
/// the configuration surface stable if others are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverBackend {
    #[default]
    Highs,
}

impl FromStr for SolverBackend {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "highs" => Ok(SolverBackend::Highs),
            other => Err(PlanError::InvalidInput(format!(
                "unknown solver backend: {other}"
            ))),
        }
    }
}

/// Configuration for one planning solve.
#[derive(Debug, Clone)]
pub struct SolveConfig {
    pub solver: SolverBackend,
    /// Wall-clock limit for the MIP solve (seconds)
    pub time_limit_seconds: f64,
    /// Relative MIP optimality gap tolerance
    pub mip_gap: f64,
    /// Solver worker threads (0 = one per hardware thread)
    pub threads: u32,
    /// Forward solver log output to the console
    pub verbose: bool,
    /// Track integer pallets for storage and truck loading
    pub pallet_tracking: bool,
    /// Allow unmet demand at the shortage penalty; with this off a
    /// demand that cannot be served makes the model infeasible
    pub allow_shortages: bool,
    /// Request a warm start from a prior solution where the backend supports it
    pub use_warmstart: bool,
    /// Write the fully built model in LP format before solving
    pub lp_output_path: Option<PathBuf>,
}

impl Default for SolveConfig {
    fn default() -> Self {
        SolveConfig {
            solver: SolverBackend::Highs,
            time_limit_seconds: 300.0,
            mip_gap: 0.01,
            threads: 0,
            verbose: false,
            pallet_tracking: true,
            allow_shortages: true,
            use_warmstart: false,
            lp_output_path: None,
        }
    }
}

impl SolveConfig {
    /// Config with a short time limit, for tests and smoke runs.
    pub fn quick() -> Self {
        SolveConfig {
            time_limit_seconds: 30.0,
            ..SolveConfig::default()
        }
    }

    pub fn with_lp_dump(mut self, path: impl Into<PathBuf>) -> Self {
        self.lp_output_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!(SolverBackend::from_str("highs").unwrap(), SolverBackend::Highs);
        assert_eq!(SolverBackend::from_str("HiGHS").unwrap(), SolverBackend::Highs);
        assert!(SolverBackend::from_str("gurobi").is_err());
    }

    #[test]
    fn test_defaults() {
        let cfg = SolveConfig::default();
        assert_eq!(cfg.time_limit_seconds, 300.0);
        assert!(cfg.pallet_tracking);
        assert!(cfg.allow_shortages);
        assert!(cfg.lp_output_path.is_none());
    }
}
