//! Lesson progress reconciliation.
//!
//! A learner posts lesson activity (time spent, quiz answers, a score, a
//! pass flag, an optional status) any number of times. Each post is merged
//! into a single cumulative record per (user, lesson):
//!
//! - a `completed` record never leaves `completed`
//! - `quiz_passed` is a sticky OR across attempts
//! - `time_spent_seconds` is a running total
//! - `completed_at` is stamped once, on the first transition into `completed`
//! - `quiz_attempts` counts only posts carrying at least one well-formed answer
//!
//! Client input is loosely typed; [`sanitize_submission`] drops malformed
//! values instead of rejecting the request, and [`reconcile`] applies the
//! merge without touching storage.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{Progress, ProgressStatus, QuizAnswer};

/// The request body as sent by the client, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProgressSubmission {
    #[serde(default)]
    pub course_id: Option<Value>,
    #[serde(default)]
    pub topic_id: Option<Value>,
    #[serde(default)]
    pub lesson_id: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub quiz_score: Option<Value>,
    #[serde(default)]
    pub quiz_passed: Option<Value>,
    #[serde(default)]
    pub answers: Option<Value>,
    #[serde(default)]
    pub time_spent_seconds: Option<Value>,
}

/// Sanitized activity ready to merge into a progress record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSubmission {
    /// Caller-requested status, if it named a known status.
    pub status: Option<ProgressStatus>,
    /// Score clamped to `[0, 100]`; `None` means "leave unchanged".
    pub quiz_score: Option<f64>,
    pub quiz_passed: Option<bool>,
    /// Well-formed answers only. Empty means no quiz submission.
    pub answers: Vec<QuizAnswer>,
    /// Non-negative whole seconds to add to the running total.
    pub time_spent_delta: i64,
}

impl ProgressSubmission {
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// The (user, course, topic, lesson) tuple a record is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressKey {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub topic_id: Uuid,
    pub lesson_id: Uuid,
}

/// Drop every malformed value from a raw submission.
pub fn sanitize_submission(raw: &RawProgressSubmission) -> ProgressSubmission {
    ProgressSubmission {
        status: raw
            .status
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        quiz_score: raw.quiz_score.as_ref().and_then(sanitize_score),
        quiz_passed: raw.quiz_passed.as_ref().and_then(Value::as_bool),
        answers: raw
            .answers
            .as_ref()
            .map(sanitize_answers)
            .unwrap_or_default(),
        time_spent_delta: raw
            .time_spent_seconds
            .as_ref()
            .map(sanitize_seconds)
            .unwrap_or(0),
    }
}

fn sanitize_score(value: &Value) -> Option<f64> {
    let score = value.as_f64()?;
    if !score.is_finite() {
        return None;
    }
    Some(score.clamp(0.0, 100.0))
}

fn sanitize_seconds(value: &Value) -> i64 {
    match value.as_f64() {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            let floored = secs.floor();
            if floored >= i64::MAX as f64 {
                i64::MAX
            } else {
                floored as i64
            }
        }
        _ => 0,
    }
}

fn sanitize_answers(value: &Value) -> Vec<QuizAnswer> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries.iter().filter_map(sanitize_answer).collect()
}

fn sanitize_answer(entry: &Value) -> Option<QuizAnswer> {
    let obj = entry.as_object()?;

    let question = obj.get("question")?.as_str()?.trim();
    if question.is_empty() {
        return None;
    }

    let selected_option = match obj.get("selectedOption")? {
        Value::Null => None,
        other => Some(u32::try_from(other.as_u64()?).ok()?),
    };

    let is_correct = obj.get("isCorrect")?.as_bool()?;

    Some(QuizAnswer {
        question: question.to_string(),
        selected_option,
        is_correct,
    })
}

/// Resolve the status a record should hold after a submission.
///
/// `completed` is terminal. A passed quiz (now or earlier) completes the
/// lesson. Otherwise the caller's status is honored, defaulting to
/// `in-progress`, but never below what the record already reached.
pub fn resolve_status(
    previous: Option<ProgressStatus>,
    quiz_passed: bool,
    requested: Option<ProgressStatus>,
) -> ProgressStatus {
    if previous == Some(ProgressStatus::Completed) || quiz_passed {
        return ProgressStatus::Completed;
    }
    let requested = requested.unwrap_or(ProgressStatus::InProgress);
    match previous {
        Some(previous) => requested.max(previous),
        None => requested,
    }
}

/// Merge a sanitized submission into the existing record, or create one.
pub fn reconcile(
    existing: Option<&Progress>,
    key: ProgressKey,
    submission: &ProgressSubmission,
    now: DateTime<Utc>,
) -> Progress {
    let mut progress = match existing {
        Some(record) => record.clone(),
        None => Progress {
            id: Uuid::new_v4(),
            user_id: key.user_id,
            course_id: key.course_id,
            topic_id: key.topic_id,
            lesson_id: key.lesson_id,
            status: ProgressStatus::NotStarted,
            time_spent_seconds: 0,
            quiz_score: None,
            quiz_passed: false,
            quiz_attempts: 0,
            answers: Vec::new(),
            last_attempt_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        },
    };

    // The lesson may have moved to another topic or course since the last merge.
    progress.course_id = key.course_id;
    progress.topic_id = key.topic_id;

    progress.time_spent_seconds = progress
        .time_spent_seconds
        .saturating_add(submission.time_spent_delta.max(0));

    if let Some(score) = submission.quiz_score {
        progress.quiz_score = Some(score);
    }

    progress.quiz_passed = progress.quiz_passed || submission.quiz_passed.unwrap_or(false);

    if submission.has_answers() {
        progress.quiz_attempts = progress.quiz_attempts.saturating_add(1);
        progress.answers = submission.answers.clone();
        progress.last_attempt_at = Some(now);
    }

    progress.status = resolve_status(
        existing.map(|p| p.status),
        progress.quiz_passed,
        submission.status,
    );

    if progress.started_at.is_none() {
        progress.started_at = Some(now);
    }
    if progress.status == ProgressStatus::Completed && progress.completed_at.is_none() {
        progress.completed_at = Some(now);
    }

    progress.updated_at = now;
    progress
}

/// Whether a merge moved the record into `completed` for the first time.
pub fn newly_completed(before: Option<&Progress>, after: &Progress) -> bool {
    after.is_completed() && !before.is_some_and(Progress::is_completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn key() -> ProgressKey {
        ProgressKey {
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            topic_id: Uuid::new_v4(),
            lesson_id: Uuid::new_v4(),
        }
    }

    fn raw(body: Value) -> RawProgressSubmission {
        serde_json::from_value(body).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn score_is_clamped_and_garbage_dropped() {
        let s = sanitize_submission(&raw(json!({ "quizScore": 140 })));
        assert_eq!(s.quiz_score, Some(100.0));
        let s = sanitize_submission(&raw(json!({ "quizScore": -3.5 })));
        assert_eq!(s.quiz_score, Some(0.0));
        let s = sanitize_submission(&raw(json!({ "quizScore": "NaN" })));
        assert_eq!(s.quiz_score, None);
        let s = sanitize_submission(&raw(json!({ "quizScore": null })));
        assert_eq!(s.quiz_score, None);
    }

    #[test]
    fn malformed_answers_are_filtered() {
        let s = sanitize_submission(&raw(json!({
            "answers": [
                { "question": "Q1", "selectedOption": 1, "isCorrect": true },
                { "question": "", "selectedOption": 1, "isCorrect": true },
                { "question": "Q3", "selectedOption": -1, "isCorrect": false },
                { "question": "Q4", "selectedOption": null, "isCorrect": false },
                { "question": "Q5", "selectedOption": 2, "isCorrect": "yes" },
                { "question": "Q6", "isCorrect": true },
                "Q7"
            ]
        })));
        let questions: Vec<_> = s.answers.iter().map(|a| a.question.as_str()).collect();
        assert_eq!(questions, vec!["Q1", "Q4"]);
        assert_eq!(s.answers[1].selected_option, None);
    }

    #[test]
    fn non_array_answers_mean_no_submission() {
        let s = sanitize_submission(&raw(json!({ "answers": { "question": "Q1" } })));
        assert!(!s.has_answers());
    }

    #[test]
    fn unknown_status_and_non_bool_pass_are_dropped() {
        let s = sanitize_submission(&raw(json!({ "status": "done", "quizPassed": "true" })));
        assert_eq!(s.status, None);
        assert_eq!(s.quiz_passed, None);
        let s = sanitize_submission(&raw(json!({ "status": "completed", "quizPassed": false })));
        assert_eq!(s.status, Some(ProgressStatus::Completed));
        assert_eq!(s.quiz_passed, Some(false));
    }

    #[test]
    fn time_delta_is_floored_and_non_negative() {
        assert_eq!(
            sanitize_submission(&raw(json!({ "timeSpentSeconds": 12.9 }))).time_spent_delta,
            12
        );
        assert_eq!(
            sanitize_submission(&raw(json!({ "timeSpentSeconds": -40 }))).time_spent_delta,
            0
        );
        assert_eq!(
            sanitize_submission(&raw(json!({ "timeSpentSeconds": "60" }))).time_spent_delta,
            0
        );
    }

    #[test]
    fn passing_quiz_on_fresh_lesson_completes_it() {
        let sub = sanitize_submission(&raw(json!({
            "quizScore": 85,
            "quizPassed": true,
            "answers": [{ "question": "Q1", "selectedOption": 1, "isCorrect": true }]
        })));
        let p = reconcile(None, key(), &sub, t0());
        assert_eq!(p.status, ProgressStatus::Completed);
        assert_eq!(p.quiz_attempts, 1);
        assert_eq!(p.quiz_score, Some(85.0));
        assert_eq!(p.completed_at, Some(t0()));
        assert_eq!(p.started_at, Some(t0()));
        assert!(newly_completed(None, &p));
    }

    #[test]
    fn completion_is_sticky_across_failing_attempts() {
        let k = key();
        let pass = sanitize_submission(&raw(json!({
            "quizScore": 85,
            "quizPassed": true,
            "answers": [{ "question": "Q1", "selectedOption": 1, "isCorrect": true }]
        })));
        let first = reconcile(None, k, &pass, t0());

        let fail = sanitize_submission(&raw(json!({
            "quizScore": 40,
            "quizPassed": false,
            "status": "not-started",
            "answers": [{ "question": "Q1", "selectedOption": 0, "isCorrect": false }]
        })));
        let later = t0() + Duration::minutes(5);
        let second = reconcile(Some(&first), k, &fail, later);

        assert_eq!(second.status, ProgressStatus::Completed);
        assert!(second.quiz_passed);
        assert_eq!(second.quiz_attempts, 2);
        assert_eq!(second.quiz_score, Some(40.0));
        assert_eq!(second.completed_at, Some(t0()));
        assert_eq!(second.last_attempt_at, Some(later));
        assert!(!newly_completed(Some(&first), &second));
    }

    #[test]
    fn time_spent_accumulates() {
        let k = key();
        let sub = sanitize_submission(&raw(json!({ "timeSpentSeconds": 30 })));
        let a = reconcile(None, k, &sub, t0());
        let b = reconcile(Some(&a), k, &sub, t0());
        let neg = sanitize_submission(&raw(json!({ "timeSpentSeconds": -100 })));
        let c = reconcile(Some(&b), k, &neg, t0());
        assert_eq!(a.time_spent_seconds, 30);
        assert_eq!(b.time_spent_seconds, 60);
        assert_eq!(c.time_spent_seconds, 60);
    }

    #[test]
    fn attempts_only_count_with_answers() {
        let k = key();
        let empty = sanitize_submission(&raw(json!({ "answers": [], "quizScore": 50 })));
        let a = reconcile(None, k, &empty, t0());
        assert_eq!(a.quiz_attempts, 0);
        assert_eq!(a.quiz_score, Some(50.0));
        assert_eq!(a.last_attempt_at, None);

        let junk = sanitize_submission(&raw(json!({ "answers": [{ "question": 3 }] })));
        let b = reconcile(Some(&a), k, &junk, t0());
        assert_eq!(b.quiz_attempts, 0);
    }

    #[test]
    fn status_defaults_and_never_regresses() {
        let k = key();
        let a = reconcile(None, k, &ProgressSubmission::default(), t0());
        assert_eq!(a.status, ProgressStatus::InProgress);
        assert_eq!(a.completed_at, None);

        let back = ProgressSubmission {
            status: Some(ProgressStatus::NotStarted),
            ..Default::default()
        };
        let b = reconcile(Some(&a), k, &back, t0());
        assert_eq!(b.status, ProgressStatus::InProgress);

        let fresh = reconcile(None, k, &back, t0());
        assert_eq!(fresh.status, ProgressStatus::NotStarted);
    }

    #[test]
    fn explicit_completion_without_quiz() {
        let sub = ProgressSubmission {
            status: Some(ProgressStatus::Completed),
            ..Default::default()
        };
        let p = reconcile(None, key(), &sub, t0());
        assert_eq!(p.status, ProgressStatus::Completed);
        assert!(!p.quiz_passed);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn earlier_pass_completes_later_post() {
        let k = key();
        // Passed but caller insisted on in-progress: pass wins.
        let sub = ProgressSubmission {
            quiz_passed: Some(true),
            status: Some(ProgressStatus::InProgress),
            ..Default::default()
        };
        let p = reconcile(None, k, &sub, t0());
        assert_eq!(p.status, ProgressStatus::Completed);
    }

    #[test]
    fn started_at_is_kept() {
        let k = key();
        let a = reconcile(None, k, &ProgressSubmission::default(), t0());
        let b = reconcile(
            Some(&a),
            k,
            &ProgressSubmission::default(),
            t0() + Duration::hours(1),
        );
        assert_eq!(b.started_at, Some(t0()));
        assert_eq!(b.id, a.id);
        assert_eq!(b.updated_at, t0() + Duration::hours(1));
    }

    #[test]
    fn merge_follows_a_moved_lesson() {
        let k = key();
        let before = reconcile(None, k, &ProgressSubmission::default(), t0());

        let moved = ProgressKey {
            course_id: Uuid::new_v4(),
            topic_id: Uuid::new_v4(),
            ..k
        };
        let after = reconcile(
            Some(&before),
            moved,
            &ProgressSubmission::default(),
            t0() + Duration::minutes(5),
        );
        assert_eq!(after.id, before.id);
        assert_eq!(after.course_id, moved.course_id);
        assert_eq!(after.topic_id, moved.topic_id);
    }
}
