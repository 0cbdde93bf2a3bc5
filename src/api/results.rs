use std::collections::HashMap;

use chrono::Utc;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    engine::{tally, PositionResult},
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            results::{ExportPosition, ResultsExport, Stats},
            user::UserDesc,
            vote::CandidateVoteDesc,
        },
        db::{
            candidate::Candidate, position::Position, settings::ElectionSettings, user::User,
            vote::Vote,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_results,
        export_results,
        get_stats,
        get_users,
        get_candidate_votes
    ]
}

#[get("/results")]
async fn get_results(
    _token: AuthToken<Admin>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<PositionResult>>> {
    Ok(Json(all_results(&positions, &candidates, &votes).await?))
}

/// Results with exact percentages and participation counts, for an external report generator.
#[get("/results/export")]
async fn export_results(
    _token: AuthToken<Admin>,
    settings: Coll<ElectionSettings>,
    users: Coll<User>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ResultsExport>> {
    let settings = ElectionSettings::current(&settings).await?;
    let summary = stats(&users, &positions, &candidates, &votes).await?;
    let results = all_results(&positions, &candidates, &votes).await?;
    info!("Exporting results for {} position(s)", results.len());

    Ok(Json(ResultsExport {
        election_name: settings.settings.name,
        generated_at: Utc::now(),
        summary,
        positions: results.into_iter().map(ExportPosition::from).collect(),
    }))
}

#[get("/stats")]
async fn get_stats(
    _token: AuthToken<Admin>,
    users: Coll<User>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<Stats>> {
    Ok(Json(stats(&users, &positions, &candidates, &votes).await?))
}

/// All users, or only those who have (or have not) voted on at least one position.
#[get("/users?<voted>")]
async fn get_users(
    _token: AuthToken<Admin>,
    voted: Option<bool>,
    users: Coll<User>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<UserDesc>>> {
    let filter = match voted {
        None => doc! {},
        Some(voted) => {
            let voters = voter_ids(&votes).await?;
            let operator = if voted { "$in" } else { "$nin" };
            let mut condition = Document::new();
            condition.insert(operator, voters);
            doc! { "_id": condition }
        }
    };
    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let list: Vec<User> = users.find(filter, options).await?.try_collect().await?;
    Ok(Json(list.into_iter().map(UserDesc::from).collect()))
}

/// Every vote naming a candidate, and who cast it.
#[get("/candidates/<candidate_id>/votes")]
async fn get_candidate_votes(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
    users: Coll<User>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<CandidateVoteDesc>>> {
    if candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .is_none()
    {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }

    let options = FindOptions::builder().sort(doc! { "timestamp": 1 }).build();
    let cast: Vec<Vote> = votes
        .find(doc! { "candidate_id": candidate_id }, options)
        .await?
        .try_collect()
        .await?;

    let voter_ids: Vec<Id> = cast.iter().map(|vote| vote.voter_id).collect();
    let voters: Vec<User> = users
        .find(doc! { "_id": { "$in": voter_ids } }, None)
        .await?
        .try_collect()
        .await?;
    let usernames: HashMap<Id, String> = voters
        .into_iter()
        .map(|user| (user.id, user.user.username))
        .collect();

    Ok(Json(
        cast.into_iter()
            .map(|vote| CandidateVoteDesc {
                voter_username: usernames.get(&vote.voter_id).cloned(),
                voter_id: vote.vote.voter_id,
                choice: vote.vote.choice,
                timestamp: vote.vote.timestamp,
            })
            .collect(),
    ))
}

/// Tally every position, in creation order.
async fn all_results(
    positions: &Coll<Position>,
    candidates: &Coll<Candidate>,
    votes: &Coll<Vote>,
) -> Result<Vec<PositionResult>> {
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let all: Vec<Position> = positions.find(None, options).await?.try_collect().await?;

    let mut results = Vec::with_capacity(all.len());
    for position in all {
        let standing = Candidate::for_position(candidates, position.id).await?;
        let cast: Vec<Vote> = votes
            .find(doc! { "position_id": position.id }, None)
            .await?
            .try_collect()
            .await?;
        results.push(tally(&position, &standing, &cast));
    }
    Ok(results)
}

async fn stats(
    users: &Coll<User>,
    positions: &Coll<Position>,
    candidates: &Coll<Candidate>,
    votes: &Coll<Vote>,
) -> Result<Stats> {
    Ok(Stats::new(
        users.count_documents(None, None).await?,
        voter_ids(votes).await?.len() as u64,
        positions.count_documents(None, None).await?,
        candidates.count_documents(None, None).await?,
    ))
}

/// IDs of every user who has voted on at least one position.
async fn voter_ids(votes: &Coll<Vote>) -> Result<Vec<Bson>> {
    Ok(votes.distinct("voter_id", None, None).await?)
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::engine::TallyOutcome;
    use crate::model::{
        common::vote::Choice,
        db::{
            candidate::NewCandidate,
            position::PositionCore,
            user::{NewUser, UserCore},
            vote::NewVote,
        },
    };

    use super::*;

    async fn insert<T: crate::model::mongodb::MongoCollection + serde::Serialize>(
        db: &Database,
        item: T,
    ) -> Id {
        Coll::<T>::from_db(db)
            .insert_one(item, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    fn candidate(name: &str, position_id: Id) -> NewCandidate {
        NewCandidate {
            user_id: Id::new(),
            name: name.to_string(),
            photo: None,
            position_id,
        }
    }

    #[backend_test(admin)]
    async fn results_and_stats(client: Client, db: Database) {
        let voter = insert(&db, NewUser::example()).await;
        insert(&db, NewUser::example2()).await;

        let secretary = insert(&db, PositionCore::secretary()).await;
        let a = insert(&db, candidate("A", secretary)).await;
        insert(&db, candidate("B", secretary)).await;
        let treasurer = insert(&db, PositionCore::treasurer()).await;
        let c = insert(&db, candidate("C", treasurer)).await;
        insert(&db, PositionCore::auditor()).await;

        let now = Utc::now();
        insert(&db, NewVote::multiple(voter, secretary, a, now)).await;
        insert(
            &db,
            NewVote::single(voter, treasurer, c, Choice::Yes, now).unwrap(),
        )
        .await;

        let response = client.get(uri!(get_results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: Vec<PositionResult> = response.into_json().await.unwrap();
        assert_eq!(results.len(), 3);
        match &results[0].outcome {
            TallyOutcome::Selection { candidates } => {
                assert_eq!(candidates[0].selected_count, 1);
                assert_eq!(candidates[0].total_ballots, 1);
                assert_eq!(candidates[1].selected_count, 0);
                assert_eq!(candidates[1].total_ballots, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match &results[1].outcome {
            TallyOutcome::Approval(approval) => {
                assert_eq!(approval.yes_count, 1);
                assert_eq!(approval.yes_percentage, 100);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(results[2].outcome, TallyOutcome::Unvotable);

        let response = client.get(uri!(get_stats)).dispatch().await;
        let stats: Stats = response.into_json().await.unwrap();
        // Bootstrap admin, test admin and the two example voters.
        assert_eq!(stats.total_voters, 4);
        assert_eq!(stats.voted_count, 1);
        assert_eq!(stats.not_voted_count, 3);
        assert_eq!(stats.positions_count, 3);
        assert_eq!(stats.candidates_count, 3);

        let response = client.get("/users?voted=true").dispatch().await;
        let voted: Vec<UserDesc> = response.into_json().await.unwrap();
        assert_eq!(voted.len(), 1);
        assert_eq!(voted[0].id, voter);

        let response = client.get("/users?voted=false").dispatch().await;
        let not_voted: Vec<UserDesc> = response.into_json().await.unwrap();
        assert_eq!(not_voted.len(), 3);

        let response = client.get(uri!(get_candidate_votes(a))).dispatch().await;
        let cast: Vec<CandidateVoteDesc> = response.into_json().await.unwrap();
        assert_eq!(cast.len(), 1);
        assert_eq!(
            cast[0].voter_username.as_deref(),
            Some(UserCore::example().username.as_str())
        );

        let response = client.get(uri!(export_results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let export: ResultsExport = response.into_json().await.unwrap();
        assert_eq!(export.summary, stats);
        assert_eq!(export.positions[1].rows[0].percentage, 100.0);
    }

    #[backend_test(admin)]
    async fn unknown_candidate(client: Client) {
        let response = client
            .get(uri!(get_candidate_votes(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
