use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Selection;
use crate::model::{
    common::vote::{Choice, VoteKind},
    db::vote::Vote,
    mongodb::{serde_hex, Id},
};

/// A voter's selection for one position, as submitted.
///
/// Either `{"candidate": "<id>"}` for a position with several candidates, or
/// `{"choices": {"<id>": "yes"}}` for a position with a single one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionSpec {
    Candidate { candidate: String },
    Approvals { choices: HashMap<String, Choice> },
}

impl From<SelectionSpec> for Selection {
    fn from(spec: SelectionSpec) -> Self {
        match spec {
            SelectionSpec::Candidate { candidate } => Self::Candidate(candidate),
            SelectionSpec::Approvals { choices } => Self::Approvals(choices),
        }
    }
}

/// One position's entry on a full ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    #[serde(with = "serde_hex")]
    pub position_id: Id,
    pub selection: SelectionSpec,
}

/// A stored vote as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDesc {
    #[serde(with = "serde_hex")]
    pub id: Id,
    #[serde(with = "serde_hex")]
    pub position_id: Id,
    #[serde(with = "serde_hex")]
    pub candidate_id: Id,
    pub kind: VoteKind,
    pub choice: Choice,
    pub timestamp: DateTime<Utc>,
}

impl From<Vote> for VoteDesc {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id,
            position_id: vote.vote.position_id,
            candidate_id: vote.vote.candidate_id,
            kind: vote.vote.kind,
            choice: vote.vote.choice,
            timestamp: vote.vote.timestamp,
        }
    }
}

/// A vote naming a candidate, with who cast it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVoteDesc {
    #[serde(with = "serde_hex")]
    pub voter_id: Id,
    /// `None` if the voter's account has since been removed.
    pub voter_username: Option<String>,
    pub choice: Choice,
    pub timestamp: DateTime<Utc>,
}

/// The positions the caller has already voted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotedPositions {
    pub position_ids: Vec<String>,
}
