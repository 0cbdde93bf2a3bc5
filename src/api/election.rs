use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    engine::{start_manually, stop_manually},
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken, Voter},
            election::{ElectionStatus, SettingsSpec},
        },
        db::settings::ElectionSettings,
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![election_status, update_settings, start_election, stop_election]
}

#[get("/election")]
async fn election_status(
    _token: AuthToken<Voter>,
    settings: Coll<ElectionSettings>,
) -> Result<Json<ElectionStatus>> {
    let current = ElectionSettings::current(&settings).await?;
    Ok(Json(ElectionStatus::new(&current, Utc::now())))
}

#[put("/election", data = "<spec>", format = "json")]
async fn update_settings(
    token: AuthToken<Admin>,
    spec: Json<SettingsSpec>,
    settings: Coll<ElectionSettings>,
) -> Result<Json<ElectionStatus>> {
    let now = Utc::now();
    let mut current = ElectionSettings::current(&settings).await?;
    spec
        .0
        .apply_to(&mut current, now)
        .map_err(|reason| Error::Status(Status::BadRequest, reason))?;
    current.save(&settings).await?;
    info!(
        "Election settings updated by {}: schedule {:?} to {:?}, override {}, active {}",
        token.id,
        current.scheduled_start,
        current.scheduled_end,
        current.is_manual_override,
        current.is_active
    );

    Ok(Json(ElectionStatus::new(&current, now)))
}

#[post("/election/start")]
async fn start_election(
    token: AuthToken<Admin>,
    settings: Coll<ElectionSettings>,
) -> Result<Json<ElectionStatus>> {
    let now = Utc::now();
    let mut current = ElectionSettings::current(&settings).await?;
    start_manually(&mut current, now);
    current.save(&settings).await?;
    info!("Election started manually by {}", token.id);

    Ok(Json(ElectionStatus::new(&current, now)))
}

#[post("/election/stop")]
async fn stop_election(
    token: AuthToken<Admin>,
    settings: Coll<ElectionSettings>,
) -> Result<Json<ElectionStatus>> {
    let now = Utc::now();
    let mut current = ElectionSettings::current(&settings).await?;
    stop_manually(&mut current, now);
    current.save(&settings).await?;
    info!("Election stopped manually by {}", token.id);

    Ok(Json(ElectionStatus::new(&current, now)))
}
