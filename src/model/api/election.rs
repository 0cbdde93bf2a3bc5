use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::{is_voting_open, remaining_time};
use crate::model::db::settings::ElectionSettingsCore;

/// Election settings as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDesc {
    pub name: String,
    pub is_active: bool,
    pub is_manual_override: bool,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub manual_start: Option<DateTime<Utc>>,
    pub manual_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ElectionSettingsCore> for SettingsDesc {
    fn from(settings: &ElectionSettingsCore) -> Self {
        Self {
            name: settings.name.clone(),
            is_active: settings.is_active,
            is_manual_override: settings.is_manual_override,
            scheduled_start: settings.scheduled_start,
            scheduled_end: settings.scheduled_end,
            manual_start: settings.manual_start,
            manual_end: settings.manual_end,
            updated_at: settings.updated_at,
        }
    }
}

/// Whether voting is open, and for how much longer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub is_open: bool,
    pub remaining_seconds: Option<i64>,
    /// Human-readable form of `remaining_seconds`.
    pub remaining: Option<String>,
    pub settings: SettingsDesc,
}

impl ElectionStatus {
    pub fn new(settings: &ElectionSettingsCore, now: DateTime<Utc>) -> Self {
        let remaining = remaining_time(settings, now);
        Self {
            is_open: is_voting_open(settings, now),
            remaining_seconds: remaining.map(|r| r.num_seconds()),
            remaining: remaining.map(format_remaining),
            settings: settings.into(),
        }
    }
}

/// New election settings from an administrator. Fields left out are unchanged.
///
/// A schedule bound given as `null` is cleared.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SettingsSpec {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_start: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_end: Option<Option<DateTime<Utc>>>,
    pub is_manual_override: Option<bool>,
    pub is_active: Option<bool>,
}

/// Tell an explicit `null` (`Some(None)`) apart from a missing field (`None`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SettingsSpec {
    /// Apply these changes to `settings`, checking that the result is a usable schedule.
    pub fn apply_to(
        self,
        settings: &mut ElectionSettingsCore,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let mut updated = settings.clone();
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err("Election name must not be empty".to_string());
            }
            updated.name = name.to_string();
        }
        if let Some(start) = self.scheduled_start {
            updated.scheduled_start = start;
        }
        if let Some(end) = self.scheduled_end {
            updated.scheduled_end = end;
        }
        if let Some(is_manual_override) = self.is_manual_override {
            updated.is_manual_override = is_manual_override;
        }
        if let Some(is_active) = self.is_active {
            updated.is_active = is_active;
        }

        if !updated.is_manual_override {
            if let (Some(start), Some(end)) = (updated.scheduled_start, updated.scheduled_end) {
                if end <= start {
                    return Err("Election end time must be after start time".to_string());
                }
            }
        }

        updated.updated_at = now;
        *settings = updated;
        Ok(())
    }
}

/// Describe a remaining duration in words, e.g. "2 days, 3 hours" or "45 minutes".
///
/// Minutes are only shown when less than a day remains.
pub fn format_remaining(remaining: Duration) -> String {
    let total_seconds = remaining.num_seconds();
    if total_seconds <= 0 {
        return "Time expired".to_string();
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    let plural = |n: i64, unit: &str| format!("{n} {unit}{}", if n == 1 { "" } else { "s" });
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 && days == 0 {
        parts.push(plural(minutes, "minute"));
    }

    if parts.is_empty() {
        "Less than a minute".to_string()
    } else {
        parts.join(", ")
    }
}
