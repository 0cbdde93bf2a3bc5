use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    engine::{shape_of, BallotContext, Selection, VoteError, VoteRecorder},
    error::{Error, Result},
    logging::RequestId,
    model::{
        api::{
            auth::{AuthToken, Voter},
            position::PositionDesc,
            vote::{BallotEntry, SelectionSpec, VoteDesc, VotedPositions},
        },
        db::{
            candidate::Candidate,
            position::Position,
            settings::{ElectionSettings, ElectionSettingsCore},
            vote::{NewVote, Vote},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![get_positions, cast_vote, cast_ballot, get_voted]
}

/// Every position with its current candidates and ballot shape.
#[get("/positions")]
async fn get_positions(
    _token: AuthToken<Voter>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<PositionDesc>>> {
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let all: Vec<Position> = positions.find(None, options).await?.try_collect().await?;

    let mut descs = Vec::with_capacity(all.len());
    for position in all {
        let standing = Candidate::for_position(&candidates, position.id).await?;
        let shape = shape_of(standing.len());
        descs.push(PositionDesc::new(position, shape, standing));
    }
    Ok(Json(descs))
}

#[post("/positions/<position_id>/vote", data = "<selection>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn cast_vote(
    token: AuthToken<Voter>,
    position_id: Id,
    selection: Json<SelectionSpec>,
    request_id: &RequestId,
    config: &State<Config>,
    settings: Coll<ElectionSettings>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
) -> Result<Json<Vec<VoteDesc>>> {
    let recorder = VoteRecorder::new(config.enforce_election_window());
    let settings = ElectionSettings::current(&settings).await?;
    let ballot = Ballot {
        recorder,
        voter_id: token.id,
        settings: &settings,
        now: Utc::now(),
        request_id,
    };

    let selection = Selection::from(selection.0);
    let prepared = ballot
        .prepare(position_id, &selection, &positions, &candidates, &votes)
        .await?;

    if let Err(e) = new_votes.insert_many(&prepared, None).await {
        return Err(ballot.insert_failed(e));
    }
    info!(
        "{request_id}: voter {} voted on position {position_id}",
        token.id
    );

    let filter = doc! {
        "voter_id": token.id,
        "position_id": position_id,
    };
    let stored: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
    Ok(Json(stored.into_iter().map(VoteDesc::from).collect()))
}

/// Submit selections for several positions at once. Nothing is recorded
/// unless every entry is accepted.
#[post("/ballot", data = "<entries>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn cast_ballot(
    token: AuthToken<Voter>,
    entries: Json<Vec<BallotEntry>>,
    request_id: &RequestId,
    config: &State<Config>,
    db_client: &State<Client>,
    settings: Coll<ElectionSettings>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
) -> Result<Json<Vec<VoteDesc>>> {
    let recorder = VoteRecorder::new(config.enforce_election_window());
    let settings = ElectionSettings::current(&settings).await?;
    let ballot = Ballot {
        recorder,
        voter_id: token.id,
        settings: &settings,
        now: Utc::now(),
        request_id,
    };

    if entries.is_empty() {
        let err = VoteError::InvalidSelection("ballot is empty".to_string());
        return Err(ballot.reject(None, err));
    }

    // Validate everything before writing anything.
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    for entry in entries.0 {
        let position_id = entry.position_id;
        let selection = Selection::from(entry.selection);
        let entry_votes = ballot
            .prepare(position_id, &selection, &positions, &candidates, &votes)
            .await?;
        if !seen.insert(position_id) {
            let err = VoteError::InvalidSelection(format!(
                "position {position_id} appears more than once"
            ));
            return Err(ballot.reject(Some(position_id), err));
        }
        prepared.extend(entry_votes);
    }

    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        if let Err(e) = new_votes
            .insert_many_with_session(&prepared, None, &mut session)
            .await
        {
            return Err(ballot.insert_failed(e));
        }
        session.commit_transaction().await?;
    }
    let position_ids: Vec<Id> = prepared.iter().map(|v| v.position_id).collect();
    info!(
        "{request_id}: voter {} cast a ballot for {} position(s)",
        token.id,
        position_ids.len()
    );

    let filter = doc! {
        "voter_id": token.id,
        "position_id": { "$in": position_ids },
    };
    let stored: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
    Ok(Json(stored.into_iter().map(VoteDesc::from).collect()))
}

/// The positions the caller has already voted on.
#[get("/voter/votes")]
async fn get_voted(token: AuthToken<Voter>, votes: Coll<Vote>) -> Result<Json<VotedPositions>> {
    let position_ids = votes
        .distinct("position_id", doc! { "voter_id": token.id }, None)
        .await?
        .into_iter()
        .filter_map(|id| id.as_object_id().map(|id| id.to_hex()))
        .collect();
    Ok(Json(VotedPositions { position_ids }))
}

/// One voter's submission in progress.
struct Ballot<'a> {
    recorder: VoteRecorder,
    voter_id: Id,
    settings: &'a ElectionSettingsCore,
    now: DateTime<Utc>,
    request_id: &'a RequestId,
}

impl Ballot<'_> {
    /// Log a rejected vote and turn it into a response.
    fn reject(&self, position_id: Option<Id>, err: VoteError) -> Error {
        match position_id {
            Some(position_id) => warn!(
                "{}: vote by {} on position {position_id} rejected: {err}",
                self.request_id, self.voter_id
            ),
            None => warn!(
                "{}: ballot by {} rejected: {err}",
                self.request_id, self.voter_id
            ),
        }
        err.into()
    }

    /// Load the live state of a position and run the selection through the recorder.
    async fn prepare(
        &self,
        position_id: Id,
        selection: &Selection,
        positions: &Coll<Position>,
        candidates: &Coll<Candidate>,
        votes: &Coll<Vote>,
    ) -> Result<Vec<NewVote>> {
        if positions.find_one(position_id.as_doc(), None).await?.is_none() {
            return Err(Error::not_found(format!("Position {position_id}")));
        }
        let standing = Candidate::for_position(candidates, position_id).await?;
        let ctx = BallotContext {
            voter_id: self.voter_id,
            position_id,
            already_voted: Vote::exists_for(votes, self.voter_id, position_id).await?,
            settings: self.settings,
            candidates: &standing,
            now: self.now,
        };
        self.recorder
            .prepare(&ctx, selection)
            .map_err(|e| self.reject(Some(position_id), e))
    }

    /// A failed insert. The unique index caught a concurrent duplicate the
    /// pre-check missed.
    fn insert_failed(&self, e: mongodb::error::Error) -> Error {
        if is_duplicate_key_error(&e) {
            self.reject(None, VoteError::AlreadyVoted)
        } else {
            e.into()
        }
    }
}
