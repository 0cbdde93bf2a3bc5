use chrono::{DateTime, Duration, Utc};

use crate::model::db::settings::ElectionSettingsCore;

/// Is voting open at instant `now`?
///
/// Manual override wins outright; the schedule is ignored while it is set.
/// Otherwise a complete schedule is required, and both of its ends are
/// inclusive. Anything else is closed.
pub fn is_voting_open(settings: &ElectionSettingsCore, now: DateTime<Utc>) -> bool {
    if settings.is_manual_override {
        return settings.is_active;
    }

    match (settings.scheduled_start, settings.scheduled_end) {
        (Some(start), Some(end)) => start <= now && now <= end,
        _ => false,
    }
}

/// Time left until the scheduled end, if voting is open and that end lies in the future.
///
/// Under manual override there is no end to count down to, so this is `None`
/// even when the override keeps voting open.
pub fn remaining_time(settings: &ElectionSettingsCore, now: DateTime<Utc>) -> Option<Duration> {
    if !is_voting_open(settings, now) || settings.is_manual_override {
        return None;
    }

    let remaining = settings.scheduled_end? - now;
    (remaining > Duration::zero()).then_some(remaining)
}

/// Open voting immediately, overriding any schedule.
pub fn start_manually(settings: &mut ElectionSettingsCore, now: DateTime<Utc>) {
    settings.is_manual_override = true;
    settings.is_active = true;
    settings.manual_start = Some(now);
    settings.manual_end = None;
    settings.updated_at = now;
}

/// Close voting immediately, overriding any schedule.
pub fn stop_manually(settings: &mut ElectionSettingsCore, now: DateTime<Utc>) {
    settings.is_manual_override = true;
    settings.is_active = false;
    settings.manual_end = Some(now);
    settings.updated_at = now;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap()
    }

    fn scheduled(start: u32, end: u32) -> ElectionSettingsCore {
        let mut settings = ElectionSettingsCore::new(at(0));
        settings.scheduled_start = Some(at(start));
        settings.scheduled_end = Some(at(end));
        settings
    }

    #[test]
    fn closed_by_default() {
        let settings = ElectionSettingsCore::new(at(0));
        assert!(!is_voting_open(&settings, at(12)));
        assert_eq!(remaining_time(&settings, at(12)), None);
    }

    #[test]
    fn schedule_is_inclusive_at_both_ends() {
        let settings = scheduled(9, 17);

        assert!(!is_voting_open(&settings, at(8)));
        assert!(!is_voting_open(&settings, at(9) - Duration::seconds(1)));
        assert!(is_voting_open(&settings, at(9)));
        assert!(is_voting_open(&settings, at(12)));
        assert!(is_voting_open(&settings, at(17)));
        assert!(!is_voting_open(&settings, at(17) + Duration::seconds(1)));
        assert!(!is_voting_open(&settings, at(18)));
    }

    #[test]
    fn half_a_schedule_is_closed() {
        let mut settings = ElectionSettingsCore::new(at(0));
        settings.scheduled_start = Some(at(9));
        assert!(!is_voting_open(&settings, at(12)));

        settings.scheduled_start = None;
        settings.scheduled_end = Some(at(17));
        assert!(!is_voting_open(&settings, at(12)));
    }

    #[test]
    fn override_ignores_schedule() {
        // Schedule entirely in the past, but the override keeps voting open.
        let mut settings = scheduled(1, 2);
        settings.is_manual_override = true;
        settings.is_active = true;
        assert!(is_voting_open(&settings, at(12)));

        // Schedule covering now, but the override keeps voting closed.
        let mut settings = scheduled(9, 17);
        settings.is_manual_override = true;
        settings.is_active = false;
        assert!(!is_voting_open(&settings, at(12)));
    }

    #[test]
    fn remaining_time_counts_down_to_scheduled_end() {
        let settings = scheduled(9, 17);
        assert_eq!(remaining_time(&settings, at(12)), Some(Duration::hours(5)));
        // Open at the closing instant, but nothing left to count.
        assert_eq!(remaining_time(&settings, at(17)), None);
        assert_eq!(remaining_time(&settings, at(18)), None);
    }

    #[test]
    fn no_countdown_under_override() {
        let mut settings = scheduled(9, 17);
        start_manually(&mut settings, at(10));
        assert!(is_voting_open(&settings, at(12)));
        assert_eq!(remaining_time(&settings, at(12)), None);
    }

    #[test]
    fn manual_start_and_stop() {
        let mut settings = ElectionSettingsCore::new(at(0));

        start_manually(&mut settings, at(10));
        assert!(settings.is_manual_override);
        assert!(settings.is_active);
        assert_eq!(settings.manual_start, Some(at(10)));
        assert_eq!(settings.manual_end, None);
        assert!(is_voting_open(&settings, at(11)));

        stop_manually(&mut settings, at(14));
        assert!(settings.is_manual_override);
        assert!(!settings.is_active);
        assert_eq!(settings.manual_start, Some(at(10)));
        assert_eq!(settings.manual_end, Some(at(14)));
        assert!(!is_voting_open(&settings, at(15)));

        // Restarting clears the previous end.
        start_manually(&mut settings, at(16));
        assert_eq!(settings.manual_start, Some(at(16)));
        assert_eq!(settings.manual_end, None);
    }
}
