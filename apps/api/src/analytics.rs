//! Summary statistics over evaluation history. Read-only: everything here
//! is computed from `query_evaluations` results, no charts, no writes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::evaluation::EvaluationRow;

/// Reporting window presets for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Year => 365,
        }
    }

    /// Start of the window ending at `now`.
    pub fn start_from(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationStats {
    pub total_evaluations: usize,
    pub shortlisted: usize,
    pub rejected: usize,
    /// Percentage in [0, 100]; 0 when there are no evaluations.
    pub rejection_rate: f64,
}

pub fn compute_stats(rows: &[EvaluationRow]) -> EvaluationStats {
    let total = rows.len();
    let shortlisted = rows.iter().filter(|r| r.is_shortlisted()).count();
    let rejected = total - shortlisted;
    let rejection_rate = if total > 0 {
        rejected as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    EvaluationStats {
        total_evaluations: total,
        shortlisted,
        rejected,
        rejection_rate,
    }
}
