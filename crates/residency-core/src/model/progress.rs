use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lesson status. Ordered: a record only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ProgressStatus {
    #[default]
    #[serde(rename = "not-started")]
    NotStarted,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

string_enum!(ProgressStatus {
    NotStarted => "not-started",
    InProgress => "in-progress",
    Completed => "completed",
});

/// One answered quiz question, as submitted by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question: String,
    pub selected_option: Option<u32>,
    pub is_correct: bool,
}

/// A learner's cumulative record for a single lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub topic_id: Uuid,
    pub lesson_id: Uuid,
    pub status: ProgressStatus,
    /// Running total in seconds.
    pub time_spent_seconds: i64,
    pub quiz_score: Option<f64>,
    /// Sticky once true.
    pub quiz_passed: bool,
    pub quiz_attempts: i32,
    #[serde(default)]
    pub answers: Vec<QuizAnswer>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set once, on the first transition into `completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}
