//! Quorum validation over a fan-out outcome.
//!
//! "Quorum" here is a success-ratio threshold over *attempted* destinations,
//! not a consensus vote. Validation is a separate, explicit call from
//! execution: the orchestrator reports what happened, the caller decides
//! whether it happened enough.

use serde::{Deserialize, Serialize};

use super::WriteReport;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuorumPolicy {
    /// Minimum fraction of attempted destinations that must have succeeded,
    /// inclusive. Defaults to a simple majority.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

impl QuorumPolicy {
    /// Returns true iff the report's success ratio meets the threshold.
    /// A report with no results never validates.
    #[must_use]
    pub fn validate(&self, report: &WriteReport) -> bool {
        if report.results.is_empty() {
            tracing::warn!("no replica results to validate");
            return false;
        }

        let succeeded = report.success_count();
        // A hand-built report cannot understate the denominator below the
        // results it carries.
        let attempted = report.attempted.max(report.results.len());
        let ratio = succeeded as f64 / attempted as f64;
        let valid = ratio >= self.threshold;
        tracing::info!(
            succeeded,
            attempted,
            ratio = format!("{:.1}%", ratio * 100.0),
            valid,
            "multi-replica quorum check"
        );

        valid
    }
}
