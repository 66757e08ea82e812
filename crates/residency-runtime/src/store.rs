//! Repository traits: the seam between services and storage backends.
//!
//! Every listing takes a filter plus a [`PageRequest`] and returns a
//! [`Paginated`] page. Free-text search is case-insensitive and literal:
//! the text is regex-escaped before it reaches any backend.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use residency_core::{
    Course, CourseStatus, CoreError, CreditTransaction, Lesson, MentorApplication,
    MentorApplicationStatus, PageRequest, Paginated, Progress, Role, Topic, User,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::InMemoryStore;

/// Case-insensitive literal search text.
#[derive(Debug, Clone)]
pub struct SearchText {
    raw: String,
    regex: Regex,
}

impl SearchText {
    /// Build from client input. Blank input means "no search".
    pub fn new(input: &str) -> Result<Option<Self>, CoreError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let regex = RegexBuilder::new(&regex::escape(raw))
            .case_insensitive(true)
            .build()
            .map_err(|e| CoreError::invalid("search", e.to_string()))?;
        Ok(Some(Self {
            raw: raw.to_string(),
            regex,
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Escaped pattern for a backend regex operator (PostgreSQL `~*`).
    pub fn pattern(&self) -> String {
        regex::escape(&self.raw)
    }

    pub fn matches_any<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        fields.iter().any(|f| self.regex.is_match(f.as_ref()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<SearchText>,
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    pub search: Option<SearchText>,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct LessonFilter {
    pub search: Option<SearchText>,
    pub course_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<SearchText>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct MentorApplicationFilter {
    pub search: Option<SearchText>,
    pub status: Option<MentorApplicationStatus>,
}

/// Selects progress records for counting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressFilter {
    pub user_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub completed_only: bool,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. `Conflict` on a duplicate email or firebase uid.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Replace profile fields. The credit balance is left untouched; it only
    /// changes through [`CreditRepository::apply_credit`].
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Returns `false` when no such user existed.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, StoreError>;

    /// Sum of every cached balance.
    async fn total_credits(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Paginated<Course>, StoreError>;

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;

    async fn find_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StoreError>;

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;

    async fn update_course(&self, course: &Course) -> Result<(), StoreError>;

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_courses_by_status(&self) -> Result<Vec<(CourseStatus, u64)>, StoreError>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn list_topics(
        &self,
        filter: &TopicFilter,
        page: PageRequest,
    ) -> Result<Paginated<Topic>, StoreError>;

    async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>, StoreError>;

    async fn find_topic_by_slug(
        &self,
        course_id: Uuid,
        slug: &str,
    ) -> Result<Option<Topic>, StoreError>;

    /// All topics of a course, by position.
    async fn topics_for_course(&self, course_id: Uuid) -> Result<Vec<Topic>, StoreError>;

    async fn insert_topic(&self, topic: &Topic) -> Result<(), StoreError>;

    async fn update_topic(&self, topic: &Topic) -> Result<(), StoreError>;

    async fn delete_topic(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Topics in one course, or in all courses.
    async fn count_topics(&self, course_id: Option<Uuid>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn list_lessons(
        &self,
        filter: &LessonFilter,
        page: PageRequest,
    ) -> Result<Paginated<Lesson>, StoreError>;

    async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>, StoreError>;

    async fn find_lesson_by_slug(
        &self,
        topic_id: Uuid,
        slug: &str,
    ) -> Result<Option<Lesson>, StoreError>;

    /// All lessons of a course, by topic then position.
    async fn lessons_for_course(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError>;

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError>;

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StoreError>;

    async fn delete_lesson(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Lessons matching the id filters. Search text is ignored.
    async fn count_lessons(&self, filter: &LessonFilter) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn find_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<Progress>, StoreError>;

    /// Insert or replace the record for `(user_id, lesson_id)`.
    async fn save_progress(&self, progress: &Progress) -> Result<(), StoreError>;

    /// A learner's records, most recently updated first.
    async fn list_progress_for_user(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Progress>, StoreError>;

    async fn count_progress(&self, filter: ProgressFilter) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Atomically apply `entry.amount` to the user's balance (floored at zero)
    /// and append `entry` to the ledger. Returns the new balance.
    ///
    /// `NotFound` when the user does not exist; nothing is written then.
    async fn apply_credit(&self, entry: &CreditTransaction) -> Result<i64, StoreError>;

    /// Ledger entries for a user, newest first.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Paginated<CreditTransaction>, StoreError>;

    /// Sum of every ledger amount for the user.
    async fn ledger_balance(&self, user_id: Uuid) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait MentorApplicationRepository: Send + Sync {
    async fn list_applications(
        &self,
        filter: &MentorApplicationFilter,
        page: PageRequest,
    ) -> Result<Paginated<MentorApplication>, StoreError>;

    async fn get_application(&self, id: Uuid) -> Result<Option<MentorApplication>, StoreError>;

    async fn find_pending_application(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MentorApplication>, StoreError>;

    async fn insert_application(&self, application: &MentorApplication)
    -> Result<(), StoreError>;

    async fn update_application(&self, application: &MentorApplication)
    -> Result<(), StoreError>;

    async fn delete_application(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_applications_by_status(
        &self,
    ) -> Result<Vec<(MentorApplicationStatus, u64)>, StoreError>;
}

/// Every repository a backend must provide.
pub trait Backend:
    UserRepository
    + CourseRepository
    + TopicRepository
    + LessonRepository
    + ProgressRepository
    + CreditRepository
    + MentorApplicationRepository
    + 'static
{
}

impl<T> Backend for T where
    T: UserRepository
        + CourseRepository
        + TopicRepository
        + LessonRepository
        + ProgressRepository
        + CreditRepository
        + MentorApplicationRepository
        + 'static
{
}

/// Handles to every repository, shared by the services.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub credits: Arc<dyn CreditRepository>,
    pub mentor_applications: Arc<dyn MentorApplicationRepository>,
}

impl Store {
    /// Route every repository to one backend.
    pub fn from_backend<B: Backend>(backend: B) -> Self {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            courses: backend.clone(),
            topics: backend.clone(),
            lessons: backend.clone(),
            progress: backend.clone(),
            credits: backend.clone(),
            mentor_applications: backend,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_is_literal_and_case_insensitive() {
        let s = SearchText::new("  c++ (intro) ").unwrap().unwrap();
        assert_eq!(s.as_str(), "c++ (intro)");
        assert!(s.matches_any(&["Modern C++ (Intro) for founders"]));
        assert!(!s.matches_any(&["cc (intro)"]));
        assert_eq!(s.pattern(), r"c\+\+ \(intro\)");
    }

    #[test]
    fn blank_search_is_none() {
        assert!(SearchText::new("   ").unwrap().is_none());
    }
}
