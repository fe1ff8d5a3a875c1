//! Aggregate statistics over a fan-out outcome.
//!
//! Pure reporting, independent of the quorum decision.

use serde::Serialize;

use super::WriteReport;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReplicaStats {
    /// Destinations attempted, including those that produced no result.
    pub total_replicas: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// `succeeded / total_replicas`, 0 when nothing was attempted.
    pub success_ratio: f64,
    /// Bytes written by successful replicas only.
    pub total_bytes: u64,
}

impl ReplicaStats {
    /// Aggregates one fan-out report.
    #[must_use]
    pub fn collect(report: &WriteReport) -> Self {
        // Clamped so a hand-built report with an understated attempted count
        // cannot produce negative failure counts or a ratio above 1.
        let total_replicas = report.attempted.max(report.results.len());
        let succeeded = report.success_count();
        let total_bytes = report
            .results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.size)
            .sum();

        Self {
            total_replicas,
            succeeded,
            failed: total_replicas - succeeded,
            success_ratio: if total_replicas == 0 {
                0.0
            } else {
                succeeded as f64 / total_replicas as f64
            },
            total_bytes,
        }
    }
}
