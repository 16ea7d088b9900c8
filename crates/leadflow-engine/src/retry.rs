// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry ladder policy for call attempts.
//!
//! Pure functions of configuration and retry count. The ladder gives the wait
//! before each successive attempt; counts past the end reuse the last entry.

use chrono::{DateTime, Duration, Utc};
use leadflow_config::{IntervalUnit, RetryConfig};

/// Decides whether and when a lead may be called again.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    intervals: Vec<f64>,
    unit: IntervalUnit,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            intervals: config.intervals.clone(),
            unit: config.interval_unit,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another call attempt is allowed at this retry count.
    pub fn can_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }

    /// Whether the fallback channels should fire at this retry count.
    pub fn should_trigger_fallback(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }

    /// When the next attempt should happen, measured from `now`.
    ///
    /// Returns `None` when `retry_count` is the final allowed attempt
    /// (`retry_count >= max_retries - 1`): there is nothing left to schedule.
    pub fn next_retry_at(&self, retry_count: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if retry_count >= self.max_retries.saturating_sub(1) {
            return None;
        }
        let idx = (retry_count as usize).min(self.intervals.len().saturating_sub(1));
        let amount = *self.intervals.get(idx)?;
        let wait = match self.unit {
            IntervalUnit::Minutes => Duration::seconds((amount * 60.0) as i64),
            IntervalUnit::Hours => Duration::seconds((amount * 3600.0) as i64),
        };
        Some(now + wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32, intervals: Vec<f64>, unit: IntervalUnit) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_retries,
            intervals,
            interval_unit: unit,
        })
    }

    #[test]
    fn can_retry_below_max() {
        let p = policy(3, vec![1.0, 4.0, 24.0], IntervalUnit::Hours);
        assert!(p.can_retry(0));
        assert!(p.can_retry(2));
        assert!(!p.can_retry(3));
        assert!(!p.can_retry(10));
    }

    #[test]
    fn fallback_fires_at_max() {
        let p = policy(3, vec![1.0], IntervalUnit::Hours);
        assert!(!p.should_trigger_fallback(2));
        assert!(p.should_trigger_fallback(3));
        assert!(p.should_trigger_fallback(7));
    }

    #[test]
    fn next_retry_uses_ladder_entry() {
        let p = policy(3, vec![0.5, 24.0], IntervalUnit::Hours);
        let now = Utc::now();
        let next = p.next_retry_at(0, now).unwrap();
        assert_eq!((next - now).num_minutes(), 30);
        let next = p.next_retry_at(1, now).unwrap();
        assert_eq!((next - now).num_hours(), 24);
    }

    #[test]
    fn final_attempt_has_no_schedule() {
        let p = policy(2, vec![0.5, 24.0], IntervalUnit::Hours);
        let now = Utc::now();
        assert!(p.next_retry_at(0, now).is_some());
        assert!(p.next_retry_at(1, now).is_none());
        assert!(p.next_retry_at(5, now).is_none());
    }

    #[test]
    fn ladder_overrun_reuses_last_entry() {
        let p = policy(10, vec![1.0, 2.0], IntervalUnit::Minutes);
        let now = Utc::now();
        let next = p.next_retry_at(7, now).unwrap();
        assert_eq!((next - now).num_seconds(), 120);
    }

    #[test]
    fn minutes_unit_is_sixty_seconds() {
        let p = policy(5, vec![1.5], IntervalUnit::Minutes);
        let now = Utc::now();
        let next = p.next_retry_at(0, now).unwrap();
        assert_eq!((next - now).num_seconds(), 90);
    }
}
