//! CPLEX-LP dump of the built model.
//!
//! Debugging artifact: writes the exact columns, rows, bounds, and
//! integrality the solver sees, from the builder's shadow records. The
//! conventional file name is `workflow_model_debug.lp`.

use crate::model::vars::{RowSense, VarMeta};
use crate::model::BuiltModel;
use anyhow::Context;
use bakeplan_core::PlanResult;
use std::fmt::Write as _;
use std::path::Path;

/// Default artifact file name.
pub const DEFAULT_LP_FILE: &str = "workflow_model_debug.lp";

/// Render the model in LP format.
pub fn render_lp(model: &BuiltModel) -> String {
    let metas = model.vars.metas();
    let mut out = String::new();
    let _ = writeln!(out, "\\ bakeplan planning model: {}", model.shape());

    out.push_str("Minimize\n obj:");
    let objective: Vec<(usize, f64)> = metas
        .iter()
        .enumerate()
        .filter(|(_, m)| m.objective != 0.0)
        .map(|(i, m)| (i, m.objective))
        .collect();
    if objective.is_empty() {
        let _ = write!(out, " 0 {}", metas.first().map_or("x0", |m| m.name.as_str()));
    } else {
        append_terms(&mut out, &objective, metas);
    }
    out.push('\n');

    out.push_str("Subject To\n");
    for row in &model.rows {
        let _ = write!(out, " {}:", row.name);
        append_terms(&mut out, &row.terms, metas);
        let op = match row.sense {
            RowSense::Eq => "=",
            RowSense::Le => "<=",
            RowSense::Ge => ">=",
        };
        let _ = writeln!(out, " {op} {}", row.rhs);
    }

    out.push_str("Bounds\n");
    for meta in metas {
        match meta.upper {
            Some(ub) => {
                let _ = writeln!(out, " {} <= {} <= {}", meta.lower, meta.name, ub);
            }
            None => {
                let _ = writeln!(out, " {} >= {}", meta.name, meta.lower);
            }
        }
    }

    let generals: Vec<&VarMeta> = metas
        .iter()
        .filter(|m| m.integer && m.upper != Some(1.0))
        .collect();
    if !generals.is_empty() {
        out.push_str("General\n");
        for meta in generals {
            let _ = writeln!(out, " {}", meta.name);
        }
    }
    let binaries: Vec<&VarMeta> = metas
        .iter()
        .filter(|m| m.integer && m.lower == 0.0 && m.upper == Some(1.0))
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binary\n");
        for meta in binaries {
            let _ = writeln!(out, " {}", meta.name);
        }
    }

    out.push_str("End\n");
    out
}

/// Write the LP rendering to a file.
pub fn write_lp_file(model: &BuiltModel, path: &Path) -> PlanResult<()> {
    let text = render_lp(model);
    std::fs::write(path, text)
        .with_context(|| format!("writing LP model to {}", path.display()))?;
    Ok(())
}

fn append_terms(out: &mut String, terms: &[(usize, f64)], metas: &[VarMeta]) {
    for (written, (pos, coef)) in terms.iter().enumerate() {
        let sign = if *coef < 0.0 { '-' } else { '+' };
        // wrap long rows; LP readers dislike very long lines
        if written > 0 && written % 8 == 0 {
            out.push_str("\n   ");
        }
        let _ = write!(out, " {sign} {} {}", coef.abs(), metas[*pos].name);
    }
}
