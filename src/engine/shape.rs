use serde::{Deserialize, Serialize};

use crate::model::common::vote::VoteKind;

/// How a position is decided, derived from how many candidates it has right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotShape {
    /// One candidate, approved or rejected.
    Single,
    /// Several candidates, exactly one chosen.
    Multiple,
}

impl BallotShape {
    /// The kind of vote record this shape produces.
    pub fn vote_kind(self) -> VoteKind {
        match self {
            Self::Single => VoteKind::Single,
            Self::Multiple => VoteKind::Multiple,
        }
    }
}

/// Resolve the ballot shape for a position with `candidate_count` candidates.
///
/// `None` means the position is unvotable and must be left off the ballot.
/// Never store the result: candidates can be registered between any two calls.
pub fn shape_of(candidate_count: usize) -> Option<BallotShape> {
    match candidate_count {
        0 => None,
        1 => Some(BallotShape::Single),
        _ => Some(BallotShape::Multiple),
    }
}
