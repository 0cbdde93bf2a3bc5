use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::{
    clock::is_voting_open,
    shape::{shape_of, BallotShape},
};
use crate::model::{
    common::vote::Choice,
    db::{candidate::Candidate, settings::ElectionSettingsCore, vote::NewVote},
    mongodb::Id,
};

/// Why a vote was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("Voter has already voted for this position")]
    AlreadyVoted,
    #[error("Voting is not currently open")]
    ElectionClosed,
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Position has no candidates")]
    NoCandidates,
}

impl VoteError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already_voted",
            Self::ElectionClosed => "election_closed",
            Self::InvalidSelection(_) => "invalid_selection",
            Self::NoCandidates => "no_candidates",
        }
    }
}

/// What a voter submitted for one position.
///
/// Candidate IDs are kept as submitted; they are only resolved once the
/// duplicate and window checks have passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The chosen candidate, for a multi-candidate position.
    Candidate(String),
    /// A yes/no per candidate, for a single-candidate position.
    Approvals(HashMap<String, Choice>),
}

/// Everything the recorder needs to know about the state of the world for one submission.
#[derive(Debug, Clone, Copy)]
pub struct BallotContext<'a> {
    pub voter_id: Id,
    pub position_id: Id,
    /// Whether a vote by this voter for this position is already stored.
    pub already_voted: bool,
    pub settings: &'a ElectionSettingsCore,
    /// The position's candidates as they are now, not as they were when the form was shown.
    pub candidates: &'a [Candidate],
    pub now: DateTime<Utc>,
}

/// Validates submissions and turns them into vote records.
#[derive(Debug, Clone, Copy)]
pub struct VoteRecorder {
    enforce_election_window: bool,
}

impl VoteRecorder {
    /// Create a recorder. With `enforce_election_window` off, the election
    /// clock is not consulted and votes are accepted at any time.
    pub fn new(enforce_election_window: bool) -> Self {
        Self {
            enforce_election_window,
        }
    }

    pub fn enforces_election_window(&self) -> bool {
        self.enforce_election_window
    }

    /// Check a submission and build the records to insert.
    ///
    /// Checks run in a fixed order: duplicate vote, election window, ballot
    /// shape, then the selection itself. Either every record for the position
    /// is returned or none is. The vote kind always comes from the live
    /// candidate count, never from the submission.
    pub fn prepare(
        &self,
        ctx: &BallotContext<'_>,
        selection: &Selection,
    ) -> Result<Vec<NewVote>, VoteError> {
        if ctx.already_voted {
            return Err(VoteError::AlreadyVoted);
        }

        if self.enforce_election_window && !is_voting_open(ctx.settings, ctx.now) {
            return Err(VoteError::ElectionClosed);
        }

        let shape = shape_of(ctx.candidates.len()).ok_or(VoteError::NoCandidates)?;

        match (shape, selection) {
            (BallotShape::Multiple, Selection::Candidate(chosen)) => {
                let chosen = standing_candidate(ctx, chosen)?;
                let vote = NewVote::multiple(ctx.voter_id, ctx.position_id, chosen, ctx.now);
                Ok(vec![vote])
            }
            (BallotShape::Single, Selection::Approvals(choices)) => {
                let choices = choices
                    .iter()
                    .map(|(raw, choice)| Ok((standing_candidate(ctx, raw)?, *choice)))
                    .collect::<Result<HashMap<Id, Choice>, VoteError>>()?;
                ctx.candidates
                    .iter()
                    .map(|candidate| {
                        let choice = choices.get(&candidate.id).ok_or_else(|| {
                            VoteError::InvalidSelection(format!(
                                "no yes/no choice given for candidate {}",
                                candidate.id
                            ))
                        })?;
                        NewVote::single(
                            ctx.voter_id,
                            ctx.position_id,
                            candidate.id,
                            *choice,
                            ctx.now,
                        )
                        .ok_or_else(|| {
                            VoteError::InvalidSelection(format!(
                                "'{choice}' is not a yes/no choice"
                            ))
                        })
                    })
                    .collect()
            }
            (BallotShape::Multiple, Selection::Approvals(_)) => Err(VoteError::InvalidSelection(
                "position has several candidates; choose one".to_string(),
            )),
            (BallotShape::Single, Selection::Candidate(_)) => Err(VoteError::InvalidSelection(
                "position has a single candidate; answer yes or no".to_string(),
            )),
        }
    }
}

/// Resolve a submitted candidate ID against the position's live candidates.
fn standing_candidate(ctx: &BallotContext<'_>, raw: &str) -> Result<Id, VoteError> {
    let id: Id = raw
        .parse()
        .map_err(|_| VoteError::InvalidSelection(format!("bad candidate ID '{raw}'")))?;
    if ctx.candidates.iter().any(|c| c.id == id) {
        Ok(id)
    } else {
        Err(VoteError::InvalidSelection(format!(
            "candidate {id} is not standing for this position"
        )))
    }
}
