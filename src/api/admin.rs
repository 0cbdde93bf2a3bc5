use mongodb::bson::doc;
use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            position::{CandidateDesc, CandidateSpec, PositionDesc, PositionSpec},
            user::{UserDesc, UserSpec},
        },
        db::{
            candidate::{Candidate, NewCandidate},
            position::{NewPosition, Position},
            user::{NewUser, User},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_user, create_position, register_candidate]
}

#[post("/users", data = "<spec>", format = "json")]
async fn create_user(
    _token: AuthToken<Admin>,
    spec: Json<UserSpec>,
    new_users: Coll<NewUser>,
    users: Coll<User>,
) -> Result<Json<UserDesc>> {
    // Check username uniqueness.
    let filter = doc! {
        "username": &spec.username,
    };
    if users.find_one(filter, None).await?.is_some() {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Username already in use: {}", spec.username),
        ));
    }

    let user: NewUser = spec
        .0
        .try_into()
        .map_err(|reason| Error::Status(Status::BadRequest, reason))?;
    let id = match new_users.insert_one(&user, None).await {
        Ok(result) => inserted_id(result.inserted_id)?,
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::Status(
                Status::BadRequest,
                format!("Username already in use: {}", user.username),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    info!("Registered user '{}' ({id})", user.username);

    Ok(Json(User { id, user }.into()))
}

#[post("/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    new_positions: Coll<NewPosition>,
) -> Result<Json<PositionDesc>> {
    let position: NewPosition = spec
        .0
        .try_into()
        .map_err(|reason| Error::Status(Status::BadRequest, reason))?;
    let id = inserted_id(new_positions.insert_one(&position, None).await?.inserted_id)?;
    info!("Created position '{}' ({id})", position.name);

    // A new position has no candidates yet.
    Ok(Json(PositionDesc::new(Position { id, position }, None, Vec::new())))
}

#[post("/positions/<position_id>/candidates", data = "<spec>", format = "json")]
async fn register_candidate(
    _token: AuthToken<Admin>,
    position_id: Id,
    spec: Json<CandidateSpec>,
    positions: Coll<Position>,
    users: Coll<User>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
) -> Result<Json<CandidateDesc>> {
    let position = positions
        .find_one(position_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
    let user = users
        .find_one(spec.user_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", spec.user_id)))?;

    let already_standing = || {
        Error::Status(
            Status::BadRequest,
            format!(
                "'{}' is already a candidate for '{}'",
                user.username, position.name
            ),
        )
    };
    let filter = doc! {
        "user_id": user.id,
        "position_id": position.id,
    };
    if candidates.find_one(filter, None).await?.is_some() {
        return Err(already_standing());
    }

    let candidate = NewCandidate {
        user_id: user.id,
        name: user.username.clone(),
        photo: spec.0.photo,
        position_id: position.id,
    };
    let id = match new_candidates.insert_one(&candidate, None).await {
        Ok(result) => inserted_id(result.inserted_id)?,
        Err(e) if is_duplicate_key_error(&e) => return Err(already_standing()),
        Err(e) => return Err(e.into()),
    };
    info!(
        "Registered '{}' as a candidate for '{}' ({id})",
        candidate.name, position.name
    );

    Ok(Json(Candidate { id, candidate }.into()))
}

/// Extract the ID the database assigned to a newly inserted document.
fn inserted_id(id: mongodb::bson::Bson) -> Result<Id> {
    id.as_object_id().map(Id::from).ok_or_else(|| {
        Error::Status(
            Status::InternalServerError,
            format!("Database returned a non-ObjectId ID: {id}"),
        )
    })
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use crate::model::{api::position::ShapeDesc, db::user::UserCore};

    use super::*;

    async fn create_position_via_api(client: &Client, name: &str) -> PositionDesc {
        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!({ "name": name, "description": "" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    #[backend_test(admin)]
    async fn create_and_reject_users(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&UserSpec::example2()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let created: UserDesc = response.into_json().await.unwrap();
        let stored = users
            .find_one(created.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.username, UserSpec::example2().username);
        assert!(stored.verify_password(UserSpec::example2().password));

        // Duplicate username.
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&UserSpec::example2()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Short password.
        let mut spec = UserSpec::example();
        spec.username = "newcomer".to_string();
        spec.password = "short".to_string();
        let response = client
            .post(uri!(create_user))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(voter)]
    async fn voters_cannot_administer(client: Client) {
        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!({ "name": "Chair" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn register_candidates(client: Client, db: Database, new_users: Coll<NewUser>) {
        let position = create_position_via_api(&client, "Secretary").await;
        assert_eq!(position.shape, ShapeDesc::Unvotable);

        let user_id: Id = new_users
            .insert_one(UserCore::example2(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let register = || async {
            client
                .post(uri!(register_candidate(position.id)))
                .header(ContentType::JSON)
                .body(json!({ "user_id": user_id.to_string() }).to_string())
                .dispatch()
                .await
        };

        let response = register().await;
        assert_eq!(Status::Ok, response.status());
        let candidate: CandidateDesc = response.into_json().await.unwrap();
        assert_eq!(candidate.user_id, user_id);
        assert_eq!(candidate.name, UserCore::example2().username);

        // The same user cannot stand twice for the same position.
        assert_eq!(Status::BadRequest, register().await.status());
        let count = Coll::<Candidate>::from_db(&db)
            .count_documents(doc! { "position_id": position.id }, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Unknown position.
        let response = client
            .post(uri!(register_candidate(Id::new())))
            .header(ContentType::JSON)
            .body(json!({ "user_id": user_id.to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
