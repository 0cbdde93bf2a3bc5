use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{PositionResult, TallyOutcome};
use crate::model::{
    api::position::ShapeDesc,
    mongodb::{serde_hex, Id},
};

/// Participation counts for the whole electorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Every registered user.
    pub total_voters: u64,
    /// Users with at least one vote on any position.
    pub voted_count: u64,
    pub not_voted_count: u64,
    pub positions_count: u64,
    pub candidates_count: u64,
}

impl Stats {
    pub fn new(
        total_voters: u64,
        voted_count: u64,
        positions_count: u64,
        candidates_count: u64,
    ) -> Self {
        Self {
            total_voters,
            voted_count,
            not_voted_count: total_voters.saturating_sub(voted_count),
            positions_count,
            candidates_count,
        }
    }
}

/// One candidate's line in an exported report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(with = "serde_hex")]
    pub candidate_id: Id,
    pub candidate_name: String,
    /// Selections for a multiple-candidate position, yes votes for a single one.
    pub votes: u64,
    /// No votes; only present for a single-candidate position.
    pub no_votes: Option<u64>,
    /// The denominator of `percentage`: ballots cast, or yes plus no.
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPosition {
    #[serde(with = "serde_hex")]
    pub position_id: Id,
    pub position_name: String,
    pub shape: ShapeDesc,
    pub rows: Vec<ExportRow>,
}

impl From<PositionResult> for ExportPosition {
    fn from(result: PositionResult) -> Self {
        let (shape, rows) = match result.outcome {
            TallyOutcome::Approval(approval) => (
                ShapeDesc::Single,
                vec![ExportRow {
                    percentage: approval.exact_yes_percentage(),
                    candidate_id: approval.candidate_id,
                    candidate_name: approval.candidate_name,
                    votes: approval.yes_count,
                    no_votes: Some(approval.no_count),
                    total: approval.total,
                }],
            ),
            TallyOutcome::Selection { candidates } => (
                ShapeDesc::Multiple,
                candidates
                    .into_iter()
                    .map(|row| ExportRow {
                        percentage: row.percentage(),
                        candidate_id: row.candidate_id,
                        candidate_name: row.candidate_name,
                        votes: row.selected_count,
                        no_votes: None,
                        total: row.total_ballots,
                    })
                    .collect(),
            ),
            TallyOutcome::Unvotable => (ShapeDesc::Unvotable, Vec::new()),
        };
        Self {
            position_id: result.position_id,
            position_name: result.position_name,
            shape,
            rows,
        }
    }
}

/// Everything an external report generator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsExport {
    pub election_name: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Stats,
    pub positions: Vec<ExportPosition>,
}
