use std::ops::{Deref, DerefMut};

use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// The user standing for the position.
    pub user_id: Id,
    /// Display name, copied from the user at registration.
    pub name: String,
    /// Opaque reference to the candidate's photo, if any.
    pub photo: Option<String>,
    /// The position being contested.
    pub position_id: Id,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    /// All current candidates for a position, in registration order.
    pub async fn for_position(candidates: &Coll<Candidate>, position_id: Id) -> Result<Vec<Self>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let list = candidates
            .find(doc! { "position_id": position_id }, options)
            .await?
            .try_collect()
            .await?;
        Ok(list)
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
