// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback-intent detection and time-phrase parsing.
//!
//! Post-call summaries sometimes say the prospect asked to be called back.
//! [`detect_callback_intent`] spots that; [`parse_callback_time`] turns the
//! free-text time phrase into a concrete timestamp. Both are pure functions of
//! text (and a supplied clock) so they can be table-tested.
//!
//! Parse rules, first match wins:
//! 1. `"tomorrow [at] H[:MM] (am|pm)"` — tomorrow at that time
//! 2. `"[today] [at] H[:MM] (am|pm)"` — today, rolled to tomorrow if past
//! 3. `"in N hour(s)/minute(s)"` — now + N
//! 4. a weekday name — next occurrence at 10:00, a full week out if today
//! 5. anything else — now + 24h
//!
//! Ambiguity is never an error; unparseable text takes the default.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use regex::Regex;

/// Hour of day used when only a weekday is named.
const WEEKDAY_CALLBACK_HOUR: u32 = 10;

/// Phrases that signal the prospect asked for a callback.
const INTENT_KEYWORDS: &[&str] = &[
    "call back",
    "call me back",
    "call him back",
    "call her back",
    "call them back",
    "callback",
    "call later",
    "call again",
    "call tomorrow",
    "ring back",
    "try again later",
    "reach out later",
];

static TOMORROW_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tomorrow(?:\s+at)?\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)").unwrap()
});

static TODAY_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:today\s+)?(?:at\s+)?\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)").unwrap()
});

static IN_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s+(hour|minute)s?\b").unwrap());

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
});

/// Whether the text signals a callback request.
pub fn detect_callback_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Parse a callback time phrase out of free text, relative to `now`.
///
/// Always returns a timestamp; unrecognized text defaults to `now + 24h`.
pub fn parse_callback_time(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_rules(text, now).unwrap_or_else(|| now + Duration::hours(24))
}

fn parse_rules(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = TOMORROW_AT.captures(text) {
        let (hour, minute) = clock_time(&caps)?;
        let date = (now + Duration::days(1)).date_naive();
        return Some(date.and_time(NaiveTime::from_hms_opt(hour, minute, 0)?).and_utc());
    }

    if let Some(caps) = TODAY_AT.captures(text) {
        let (hour, minute) = clock_time(&caps)?;
        let candidate = now
            .date_naive()
            .and_time(NaiveTime::from_hms_opt(hour, minute, 0)?)
            .and_utc();
        // already past today: same time tomorrow
        return Some(if candidate <= now {
            candidate + Duration::days(1)
        } else {
            candidate
        });
    }

    if let Some(caps) = IN_DURATION.captures(text) {
        let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
        let offset = match caps.get(2)?.as_str().to_lowercase().as_str() {
            "hour" => Duration::hours(amount),
            _ => Duration::minutes(amount),
        };
        return Some(now + offset);
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        let target: Weekday = caps.get(1)?.as_str().to_lowercase().parse().ok()?;
        let today = now.weekday();
        let mut days_ahead = (target.num_days_from_monday() as i64
            - today.num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        let date = (now + Duration::days(days_ahead)).date_naive();
        return Some(
            date.and_time(NaiveTime::from_hms_opt(WEEKDAY_CALLBACK_HOUR, 0, 0)?)
                .and_utc(),
        );
    }

    None
}

/// Extract a 24-hour (hour, minute) pair from an am/pm capture.
fn clock_time(caps: &regex::Captures<'_>) -> Option<(u32, u32)> {
    let hour_12: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if hour_12 == 0 || hour_12 > 12 || minute > 59 {
        return None;
    }
    let meridiem = caps.get(3)?.as_str().to_lowercase();
    let hour = match (meridiem.as_str(), hour_12) {
        ("am", 12) => 0,
        ("am", h) => h,
        ("pm", 12) => 12,
        (_, h) => h + 12,
    };
    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn detects_callback_phrases() {
        assert!(detect_callback_intent("Prospect asked us to call back tomorrow"));
        assert!(detect_callback_intent("Please CALL ME BACK at 3pm"));
        assert!(detect_callback_intent("wants a callback next week"));
        assert!(!detect_callback_intent("Prospect is not interested"));
        assert!(!detect_callback_intent("Discussed pricing and next steps"));
    }

    #[test]
    fn tomorrow_at_five_pm() {
        // Wednesday 2026-03-04 09:00
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("call back tomorrow at 5pm", now);
        assert_eq!(t, at(2026, 3, 5, 17, 0));
    }

    #[test]
    fn tomorrow_with_minutes() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("tomorrow 9:30 am works", now);
        assert_eq!(t, at(2026, 3, 5, 9, 30));
    }

    #[test]
    fn today_future_time_stays_today() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("call today at 3pm", now);
        assert_eq!(t, at(2026, 3, 4, 15, 0));
    }

    #[test]
    fn today_past_time_rolls_to_tomorrow() {
        let now = at(2026, 3, 4, 18, 0);
        let t = parse_callback_time("call at 3pm", now);
        assert_eq!(t, at(2026, 3, 5, 15, 0));
    }

    #[test]
    fn in_two_hours() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("call back in 2 hours", now);
        assert_eq!(t, now + Duration::hours(2));
    }

    #[test]
    fn in_forty_five_minutes() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("try again in 45 minutes", now);
        assert_eq!(t, now + Duration::minutes(45));
    }

    #[test]
    fn weekday_is_next_occurrence_at_ten() {
        // Wednesday 2026-03-04
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("call back Tuesday", now);
        // next Tuesday is 2026-03-10
        assert_eq!(t, at(2026, 3, 10, 10, 0));
    }

    #[test]
    fn same_weekday_rolls_a_full_week() {
        // Wednesday 2026-03-04
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("wednesday would be good", now);
        assert_eq!(t, at(2026, 3, 11, 10, 0));
    }

    #[test]
    fn unrecognized_text_defaults_to_one_day() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("whenever suits", now);
        assert_eq!(t, now + Duration::hours(24));
    }

    #[test]
    fn twelve_hour_edges() {
        let now = at(2026, 3, 4, 1, 0);
        assert_eq!(
            parse_callback_time("tomorrow at 12pm", now),
            at(2026, 3, 5, 12, 0)
        );
        assert_eq!(
            parse_callback_time("tomorrow at 12am", now),
            at(2026, 3, 5, 0, 0)
        );
    }

    #[test]
    fn nonsense_hour_falls_back_to_default() {
        let now = at(2026, 3, 4, 9, 0);
        let t = parse_callback_time("tomorrow at 19pm", now);
        assert_eq!(t, now + Duration::hours(24));
    }
}
