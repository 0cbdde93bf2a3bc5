use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::vote::{Choice, VoteKind},
    mongodb::{Coll, Id},
};

/// Core vote data, as stored in the database.
///
/// Votes are immutable once written: there is no update or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub position_id: Id,
    pub candidate_id: Id,
    pub kind: VoteKind,
    pub choice: Choice,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl VoteCore {
    /// A pick of one candidate among several.
    pub fn multiple(voter_id: Id, position_id: Id, candidate_id: Id, now: DateTime<Utc>) -> Self {
        Self {
            voter_id,
            position_id,
            candidate_id,
            kind: VoteKind::Multiple,
            choice: Choice::Selected,
            timestamp: now,
        }
    }

    /// A yes/no judgment on a sole candidate.
    /// Returns `None` if `choice` is not yes or no.
    pub fn single(
        voter_id: Id,
        position_id: Id,
        candidate_id: Id,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        choice.fits(VoteKind::Single).then_some(Self {
            voter_id,
            position_id,
            candidate_id,
            kind: VoteKind::Single,
            choice,
            timestamp: now,
        })
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Has this voter already voted on this position?
    ///
    /// This is only an early exit: the unique index on `(voter_id, position_id)`
    /// has the final say.
    pub async fn exists_for(votes: &Coll<Vote>, voter_id: Id, position_id: Id) -> Result<bool> {
        let filter = doc! {
            "voter_id": voter_id,
            "position_id": position_id,
        };
        Ok(votes.find_one(filter, None).await?.is_some())
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}
