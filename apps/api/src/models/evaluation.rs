use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The two admissible screening outcomes. Anything else coming back from
/// the AI service is a contract violation, never a stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Shortlist,
    Reject,
}

impl Decision {
    /// Lowercase form used in the database column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Shortlist => "shortlist",
            Decision::Reject => "reject",
        }
    }
}

/// A persisted evaluation outcome. Append-only: rows are never updated
/// after insert, so history stays intact for analytics.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub resume_filename: String,
    pub decision: String,
    pub match_score: f64,
    pub justification: String,
    pub key_matches: Vec<String>,
    pub missing_requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl EvaluationRow {
    pub fn is_shortlisted(&self) -> bool {
        self.decision == Decision::Shortlist.as_str()
    }
}

/// An evaluation about to be committed. Built by the orchestrator from a
/// verdict; the store validates the invariants before insert.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub job_id: Uuid,
    pub resume_filename: String,
    pub decision: Decision,
    pub match_score: f64,
    pub justification: String,
    pub key_matches: Vec<String>,
    pub missing_requirements: Vec<String>,
}
