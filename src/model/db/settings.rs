use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, to_document},
    error::Error as DbError,
    options::UpdateOptions,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{serde_optional_datetime, Coll};

/// The fixed ID of the one settings document that is ever consulted.
pub const CURRENT_SETTINGS_ID: &str = "current";

pub const DEFAULT_ELECTION_NAME: &str = "General Election";

/// When voting is open: either a schedule, or a manual override that supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSettingsCore {
    pub name: String,
    /// Open/closed status while under manual override.
    pub is_active: bool,
    /// Use `is_active` instead of the schedule.
    pub is_manual_override: bool,
    #[serde(default, with = "serde_optional_datetime")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, with = "serde_optional_datetime")]
    pub scheduled_end: Option<DateTime<Utc>>,
    /// When voting was last started manually.
    #[serde(default, with = "serde_optional_datetime")]
    pub manual_start: Option<DateTime<Utc>>,
    /// When voting was last stopped manually.
    #[serde(default, with = "serde_optional_datetime")]
    pub manual_end: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ElectionSettingsCore {
    /// Safe defaults: inactive, no override, no schedule.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            name: DEFAULT_ELECTION_NAME.to_string(),
            is_active: false,
            is_manual_override: false,
            scheduled_start: None,
            scheduled_end: None,
            manual_start: None,
            manual_end: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The settings document from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSettings {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub settings: ElectionSettingsCore,
}

impl ElectionSettings {
    /// Load the current settings.
    ///
    /// Startup creates the document, so it should always be there. If it has
    /// gone missing anyway it is recreated with safe defaults rather than
    /// failing the caller.
    pub async fn current(settings: &Coll<ElectionSettings>) -> Result<Self> {
        if let Some(current) = settings.find_one(current_filter(), None).await? {
            return Ok(current);
        }

        warn!("Election settings missing, recreating defaults");
        ensure_election_settings_exist(settings).await?;
        settings
            .find_one(current_filter(), None)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Election settings could not be created".to_string(),
                )
            })
    }

    /// Persist these settings over the stored ones.
    pub async fn save(&self, settings: &Coll<ElectionSettings>) -> Result<()> {
        settings.replace_one(current_filter(), self, None).await?;
        Ok(())
    }
}

impl Deref for ElectionSettings {
    type Target = ElectionSettingsCore;

    fn deref(&self) -> &Self::Target {
        &self.settings
    }
}

impl DerefMut for ElectionSettings {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.settings
    }
}

fn current_filter() -> mongodb::bson::Document {
    doc! { "_id": CURRENT_SETTINGS_ID }
}

/// Ensure the settings document exists, inserting defaults if it does not.
///
/// This operation is idempotent and never overwrites existing settings.
pub async fn ensure_election_settings_exist(
    settings: &Coll<ElectionSettings>,
) -> Result<(), DbError> {
    let defaults = to_document(&ElectionSettingsCore::new(Utc::now()))?;
    let update = doc! { "$setOnInsert": defaults };
    let options = UpdateOptions::builder().upsert(true).build();
    let result = settings
        .update_one(current_filter(), update, options)
        .await?;
    if result.upserted_id.is_some() {
        info!("Created default election settings");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mongodb::bson::Bson;

    use super::*;

    #[test]
    fn defaults_are_closed() {
        let now = Utc::now();
        let settings = ElectionSettingsCore::new(now);
        assert_eq!(settings.name, DEFAULT_ELECTION_NAME);
        assert!(!settings.is_active);
        assert!(!settings.is_manual_override);
        assert_eq!(settings.scheduled_start, None);
        assert_eq!(settings.scheduled_end, None);
        assert_eq!(settings.created_at, now);
    }

    #[test]
    fn stored_under_fixed_id() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        let settings = ElectionSettings {
            id: CURRENT_SETTINGS_ID.to_string(),
            settings: ElectionSettingsCore::new(now),
        };
        let document = to_document(&settings).unwrap();
        assert_eq!(document.get("_id"), Some(&Bson::String("current".into())));
        assert!(matches!(document.get("created_at"), Some(Bson::DateTime(_))));
        assert_eq!(document.get("scheduled_start"), Some(&Bson::Null));
        assert!(!document.get_bool("is_active").unwrap());
    }
}
