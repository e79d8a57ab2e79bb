//! Diagnostics collected while validating planning inputs.
//!
//! Validation distinguishes findings that abort planning (errors) from
//! findings the engine tolerates with a note (warnings), e.g. forecast
//! rows outside the horizon. Each finding carries a category and an
//! optional entity reference ("node 6122", "product 176283") so reports
//! stay actionable.

use serde::Serialize;

/// Severity level for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but planning continued (e.g. ignored forecast row)
    Warning,
    /// Input cannot be planned against
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Grouping key: "alias", "topology", "calendar", "inventory", ...
    pub category: String,
    pub message: String,
    /// Entity the finding refers to, if any
    pub entity: Option<String>,
}

/// Collector for validation findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub findings: Vec<Finding>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.into(),
            entity: None,
        });
    }

    pub fn add_error(&mut self, category: &str, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.into(),
            entity: None,
        });
    }

    pub fn add_error_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.findings.push(Finding {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    pub fn add_warning_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    pub fn warning_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// One line per finding, errors first.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for severity in [Severity::Error, Severity::Warning] {
            for f in self.findings.iter().filter(|f| f.severity == severity) {
                let tag = match severity {
                    Severity::Error => "ERROR",
                    Severity::Warning => "WARN",
                };
                match &f.entity {
                    Some(e) => lines.push(format!("[{tag}] {}: {} ({e})", f.category, f.message)),
                    None => lines.push(format!("[{tag}] {}: {}", f.category, f.message)),
                }
            }
        }
        lines.join("\n")
    }
}
