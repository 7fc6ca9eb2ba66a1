//! Local time lookup from the bundled IANA timezone database.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::{Africa, America, Asia, Australia, Europe, TZ_VARIANTS, Tz};

/// Spoken time format: `03:07 PM on Friday, October 16, 2026`.
pub const TIME_FORMAT: &str = "%I:%M %p on %A, %B %d, %Y";

/// Common city names, matched case-insensitively before the zone search.
const CITY_TIMEZONES: [(&str, Tz); 27] = [
    ("london", Europe::London),
    ("new york", America::New_York),
    ("los angeles", America::Los_Angeles),
    ("tokyo", Asia::Tokyo),
    ("sydney", Australia::Sydney),
    ("paris", Europe::Paris),
    ("berlin", Europe::Berlin),
    ("beijing", Asia::Shanghai),
    ("dubai", Asia::Dubai),
    ("rio", America::Sao_Paulo),
    ("moscow", Europe::Moscow),
    ("hong kong", Asia::Hong_Kong),
    ("singapore", Asia::Singapore),
    ("mumbai", Asia::Kolkata),
    ("cairo", Africa::Cairo),
    ("johannesburg", Africa::Johannesburg),
    ("rome", Europe::Rome),
    ("bangkok", Asia::Bangkok),
    ("toronto", America::Toronto),
    ("mexico city", America::Mexico_City),
    ("san francisco", America::Los_Angeles),
    ("chicago", America::Chicago),
    ("istanbul", Europe::Istanbul),
    ("madrid", Europe::Madrid),
    ("amsterdam", Europe::Amsterdam),
    ("stockholm", Europe::Stockholm),
    ("seoul", Asia::Seoul),
];

/// Resolve a free-form location to a timezone.
///
/// Tries the city table first, then the first zone identifier (in database
/// order) containing the location as a case-insensitive substring.
pub fn resolve_timezone(location: &str) -> Option<Tz> {
    let needle = location.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    CITY_TIMEZONES
        .iter()
        .find(|(city, _)| *city == needle)
        .map(|(_, tz)| *tz)
        .or_else(|| {
            TZ_VARIANTS
                .iter()
                .find(|tz| tz.name().to_lowercase().contains(&needle))
                .copied()
        })
}

pub fn format_local_time(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format(TIME_FORMAT).to_string()
}

type NowFn = dyn Fn() -> DateTime<Utc> + Send + Sync;

/// Answers "what time is it in X".
#[derive(Clone)]
pub struct TimeService {
    now: Arc<NowFn>,
}

impl fmt::Debug for TimeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeService").finish_non_exhaustive()
    }
}

impl Default for TimeService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeService {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use a custom source of "now", e.g. a fixed instant in tests.
    pub fn with_clock<F>(now: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self { now: Arc::new(now) }
    }

    /// Spoken sentence with the current time at `location`, or `None` if no
    /// timezone matches.
    pub fn describe(&self, location: &str) -> Option<String> {
        let tz = resolve_timezone(location)?;
        let formatted = format_local_time((self.now)(), tz);
        Some(format!("The current time in {location} is {formatted}."))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        // Friday 2026-10-16 14:07:00 UTC
        Utc.with_ymd_and_hms(2026, 10, 16, 14, 7, 0).unwrap()
    }

    #[test]
    fn test_city_table_is_case_insensitive() {
        assert_eq!(resolve_timezone("London"), Some(Europe::London));
        assert_eq!(resolve_timezone("NEW YORK"), Some(America::New_York));
        assert_eq!(resolve_timezone("san francisco"), Some(America::Los_Angeles));
    }

    #[test]
    fn test_zone_substring_fallback() {
        assert_eq!(resolve_timezone("Lisbon"), Some(Europe::Lisbon));
        assert_eq!(resolve_timezone("kathmandu"), Some(Asia::Kathmandu));
    }

    #[test]
    fn test_unknown_location() {
        assert_eq!(resolve_timezone("Atlantis"), None);
        assert_eq!(resolve_timezone("   "), None);
    }

    #[test]
    fn test_format_local_time() {
        assert_eq!(
            format_local_time(fixed_now(), Asia::Tokyo),
            "11:07 PM on Friday, October 16, 2026"
        );
        assert_eq!(
            format_local_time(fixed_now(), America::New_York),
            "10:07 AM on Friday, October 16, 2026"
        );
    }

    #[test]
    fn test_describe_echoes_location() {
        let service = TimeService::with_clock(fixed_now);
        assert_eq!(
            service.describe("London").unwrap(),
            "The current time in London is 03:07 PM on Friday, October 16, 2026."
        );
        assert!(service.describe("Atlantis").is_none());
    }
}
