//! Courses, topics and lessons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

string_enum!(CourseStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    /// Globally unique.
    pub slug: String,
    pub description: String,
    pub status: CourseStatus,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    /// Unique within the course.
    pub slug: String,
    pub description: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One multiple-choice question attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    /// Unique within the topic.
    pub slug: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub duration_minutes: i32,
    pub position: i32,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    pub passing_score: i32,
    /// Credits granted the first time a learner completes the lesson.
    pub credit_reward: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub const DEFAULT_PASSING_SCORE: i32 = 70;

    /// Whether the lesson sits under the given course and topic.
    pub fn belongs_to(&self, course_id: Uuid, topic_id: Uuid) -> bool {
        self.course_id == course_id && self.topic_id == topic_id
    }
}
