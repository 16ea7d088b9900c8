// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ended-reason classification for call endings.
//!
//! The voice platform reports free-text `ended_reason` strings. The classifier
//! maps them onto a small outcome vocabulary using configured keyword sets,
//! matched as lowercase substrings. Missed-keywords take precedence over
//! failed-keywords; both route to the missed-call path and record the lead as
//! missed.

use leadflow_config::ClassificationConfig;

/// Outcome of classifying an ended call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndedOutcome {
    /// The call never productively connected (busy, rejected, no answer).
    Missed,
    /// The platform or carrier failed the call.
    Failed,
    /// Nothing in the reason suggests a problem.
    Completed,
}

impl EndedOutcome {
    /// Missed and failed endings both feed the retry/fallback path.
    pub fn is_unproductive(self) -> bool {
        matches!(self, EndedOutcome::Missed | EndedOutcome::Failed)
    }
}

/// Classifies `ended_reason` strings against configured keyword sets.
#[derive(Debug, Clone)]
pub struct ReasonClassifier {
    missed_keywords: Vec<String>,
    failed_keywords: Vec<String>,
}

impl ReasonClassifier {
    pub fn new(config: &ClassificationConfig) -> Self {
        Self {
            missed_keywords: lowercased(&config.missed_keywords),
            failed_keywords: lowercased(&config.failed_keywords),
        }
    }

    /// Classify an ended call.
    ///
    /// `answered_at` absent means the call never connected: that is always
    /// `Missed`, regardless of the reason text. Otherwise the reason is
    /// checked against the missed set first, then the failed set, defaulting
    /// to `Completed`. A connected call whose reason still matches a missed
    /// keyword is classified missed (hang-ups are treated as unproductive).
    pub fn classify(&self, ended_reason: Option<&str>, answered: bool) -> EndedOutcome {
        if !answered {
            return EndedOutcome::Missed;
        }
        let reason = match ended_reason {
            Some(r) => r.to_lowercase(),
            None => return EndedOutcome::Completed,
        };
        if self.missed_keywords.iter().any(|k| reason.contains(k.as_str())) {
            return EndedOutcome::Missed;
        }
        if self.failed_keywords.iter().any(|k| reason.contains(k.as_str())) {
            return EndedOutcome::Failed;
        }
        EndedOutcome::Completed
    }
}

fn lowercased(keywords: &[String]) -> Vec<String> {
    keywords.iter().map(|k| k.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ReasonClassifier {
        ReasonClassifier::new(&ClassificationConfig::default())
    }

    #[test]
    fn unanswered_is_always_missed() {
        let c = classifier();
        assert_eq!(c.classify(None, false), EndedOutcome::Missed);
        assert_eq!(
            c.classify(Some("assistant-ended-call"), false),
            EndedOutcome::Missed
        );
        assert_eq!(c.classify(Some("failed"), false), EndedOutcome::Missed);
    }

    #[test]
    fn missed_keywords_match_as_substrings() {
        let c = classifier();
        assert_eq!(
            c.classify(Some("customer-busy"), true),
            EndedOutcome::Missed
        );
        assert_eq!(
            c.classify(Some("twilio-failed-to-connect: 486 Busy Here"), true),
            EndedOutcome::Missed
        );
        assert_eq!(
            c.classify(Some("customer-did-not-answer"), true),
            EndedOutcome::Completed
        );
        assert_eq!(c.classify(Some("no-answer"), true), EndedOutcome::Missed);
    }

    #[test]
    fn missed_takes_precedence_over_failed() {
        // "rejected" (missed) and "error" (failed) both present
        let c = classifier();
        assert_eq!(
            c.classify(Some("call rejected after carrier error"), true),
            EndedOutcome::Missed
        );
    }

    #[test]
    fn failed_keywords_classify_failed() {
        let c = classifier();
        assert_eq!(
            c.classify(Some("providerfault"), true),
            EndedOutcome::Failed
        );
        assert_eq!(
            c.classify(Some("upstream 503 from carrier"), true),
            EndedOutcome::Failed
        );
    }

    #[test]
    fn clean_ending_is_completed() {
        let c = classifier();
        assert_eq!(
            c.classify(Some("assistant-ended-call"), true),
            EndedOutcome::Completed
        );
        assert_eq!(c.classify(None, true), EndedOutcome::Completed);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify(Some("Customer-Busy"), true), EndedOutcome::Missed);
        assert_eq!(c.classify(Some("PROVIDERFAULT"), true), EndedOutcome::Failed);
    }

    #[test]
    fn unproductive_covers_missed_and_failed() {
        assert!(EndedOutcome::Missed.is_unproductive());
        assert!(EndedOutcome::Failed.is_unproductive());
        assert!(!EndedOutcome::Completed.is_unproductive());
    }
}
