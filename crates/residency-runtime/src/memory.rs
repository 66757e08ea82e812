//! In-memory backend for tests, demos and local development.
//!
//! All tables sit behind one mutex, so multi-table operations such as
//! [`CreditRepository::apply_credit`] are atomic.

use async_trait::async_trait;
use residency_core::model::credit::clamp_balance;
use residency_core::{
    Course, CourseStatus, CreditTransaction, Lesson, MentorApplication, MentorApplicationStatus,
    PageRequest, Paginated, Progress, Role, Topic, User,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    CourseFilter, CourseRepository, CreditRepository, LessonFilter, LessonRepository,
    MentorApplicationFilter, MentorApplicationRepository, ProgressFilter, ProgressRepository,
    TopicFilter, TopicRepository, UserFilter, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    courses: HashMap<Uuid, Course>,
    topics: HashMap<Uuid, Topic>,
    lessons: HashMap<Uuid, Lesson>,
    progress: HashMap<(Uuid, Uuid), Progress>,
    ledger: Vec<CreditTransaction>,
    applications: HashMap<Uuid, MentorApplication>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable` until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        self.tables
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: PageRequest) -> Paginated<T> {
    let total = items.len() as u64;
    Paginated::new(page.slice(&items), page, total)
}

fn count_by<K: Copy + Eq, T>(
    keys: &[K],
    items: impl Iterator<Item = T>,
    key_of: impl Fn(&T) -> K,
) -> Vec<(K, u64)> {
    let mut counts: Vec<(K, u64)> = keys.iter().map(|k| (*k, 0)).collect();
    for item in items {
        let key = key_of(&item);
        if let Some(slot) = counts.iter_mut().find(|(k, _)| *k == key) {
            slot.1 += 1;
        }
    }
    counts
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<User> = tables
            .users
            .values()
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| s.matches_any(&[&u.email, &u.display_name]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));
        Ok(paginate(rows, page))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.firebase_uid == uid).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' is taken", user.email)));
        }
        if tables.users.values().any(|u| u.firebase_uid == user.firebase_uid) {
            return Err(StoreError::Conflict(format!(
                "firebase uid '{}' is taken",
                user.firebase_uid
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && (u.email == user.email || u.firebase_uid == user.firebase_uid))
        {
            return Err(StoreError::Conflict("email or firebase uid is taken".into()));
        }
        let existing = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        let credits = existing.credits;
        *existing = User {
            credits,
            ..user.clone()
        };
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.users.remove(&id).is_some())
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, StoreError> {
        let tables = self.lock()?;
        Ok(count_by(Role::ALL, tables.users.values(), |u| u.role))
    }

    async fn total_credits(&self) -> Result<i64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .fold(0i64, |acc, u| acc.saturating_add(u.credits)))
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Paginated<Course>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Course> = tables
            .courses
            .values()
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .filter(|c| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| s.matches_any(&[&c.title, &c.description, &c.slug]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(paginate(rows, page))
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn find_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.courses.values().find(|c| c.slug == slug).cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.courses.values().any(|c| c.slug == course.slug) {
            return Err(StoreError::Conflict(format!(
                "course slug '{}' already exists",
                course.slug
            )));
        }
        tables.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables
            .courses
            .values()
            .any(|c| c.id != course.id && c.slug == course.slug)
        {
            return Err(StoreError::Conflict(format!(
                "course slug '{}' already exists",
                course.slug
            )));
        }
        let slot = tables.courses.get_mut(&course.id).ok_or(StoreError::NotFound)?;
        *slot = course.clone();
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.courses.remove(&id).is_some())
    }

    async fn count_courses_by_status(&self) -> Result<Vec<(CourseStatus, u64)>, StoreError> {
        let tables = self.lock()?;
        Ok(count_by(CourseStatus::ALL, tables.courses.values(), |c| c.status))
    }
}

#[async_trait]
impl TopicRepository for InMemoryStore {
    async fn list_topics(
        &self,
        filter: &TopicFilter,
        page: PageRequest,
    ) -> Result<Paginated<Topic>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Topic> = tables
            .topics
            .values()
            .filter(|t| filter.course_id.is_none_or(|c| t.course_id == c))
            .filter(|t| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| s.matches_any(&[&t.title, &t.description]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(paginate(rows, page))
    }

    async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>, StoreError> {
        Ok(self.lock()?.topics.get(&id).cloned())
    }

    async fn find_topic_by_slug(
        &self,
        course_id: Uuid,
        slug: &str,
    ) -> Result<Option<Topic>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .topics
            .values()
            .find(|t| t.course_id == course_id && t.slug == slug)
            .cloned())
    }

    async fn topics_for_course(&self, course_id: Uuid) -> Result<Vec<Topic>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Topic> = tables
            .topics
            .values()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.position, t.created_at));
        Ok(rows)
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables
            .topics
            .values()
            .any(|t| t.course_id == topic.course_id && t.slug == topic.slug)
        {
            return Err(StoreError::Conflict(format!(
                "topic slug '{}' already exists in this course",
                topic.slug
            )));
        }
        tables.topics.insert(topic.id, topic.clone());
        Ok(())
    }

    async fn update_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.topics.values().any(|t| {
            t.id != topic.id && t.course_id == topic.course_id && t.slug == topic.slug
        }) {
            return Err(StoreError::Conflict(format!(
                "topic slug '{}' already exists in this course",
                topic.slug
            )));
        }
        let slot = tables.topics.get_mut(&topic.id).ok_or(StoreError::NotFound)?;
        *slot = topic.clone();
        Ok(())
    }

    async fn delete_topic(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.topics.remove(&id).is_some())
    }

    async fn count_topics(&self, course_id: Option<Uuid>) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .topics
            .values()
            .filter(|t| course_id.is_none_or(|c| t.course_id == c))
            .count() as u64)
    }
}

fn lesson_matches(lesson: &Lesson, filter: &LessonFilter) -> bool {
    filter.course_id.is_none_or(|c| lesson.course_id == c)
        && filter.topic_id.is_none_or(|t| lesson.topic_id == t)
}

#[async_trait]
impl LessonRepository for InMemoryStore {
    async fn list_lessons(
        &self,
        filter: &LessonFilter,
        page: PageRequest,
    ) -> Result<Paginated<Lesson>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Lesson> = tables
            .lessons
            .values()
            .filter(|l| lesson_matches(l, filter))
            .filter(|l| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| s.matches_any(&[&l.title, &l.slug]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(paginate(rows, page))
    }

    async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>, StoreError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn find_lesson_by_slug(
        &self,
        topic_id: Uuid,
        slug: &str,
    ) -> Result<Option<Lesson>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .lessons
            .values()
            .find(|l| l.topic_id == topic_id && l.slug == slug)
            .cloned())
    }

    async fn lessons_for_course(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Lesson> = tables
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by_key(|l| {
            let topic_pos = tables.topics.get(&l.topic_id).map_or(i32::MAX, |t| t.position);
            (topic_pos, l.topic_id, l.position, l.created_at)
        });
        Ok(rows)
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables
            .lessons
            .values()
            .any(|l| l.topic_id == lesson.topic_id && l.slug == lesson.slug)
        {
            return Err(StoreError::Conflict(format!(
                "lesson slug '{}' already exists in this topic",
                lesson.slug
            )));
        }
        tables.lessons.insert(lesson.id, lesson.clone());
        Ok(())
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.lessons.values().any(|l| {
            l.id != lesson.id && l.topic_id == lesson.topic_id && l.slug == lesson.slug
        }) {
            return Err(StoreError::Conflict(format!(
                "lesson slug '{}' already exists in this topic",
                lesson.slug
            )));
        }
        let slot = tables.lessons.get_mut(&lesson.id).ok_or(StoreError::NotFound)?;
        *slot = lesson.clone();
        Ok(())
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.lessons.remove(&id).is_some())
    }

    async fn count_lessons(&self, filter: &LessonFilter) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .lessons
            .values()
            .filter(|l| lesson_matches(l, filter))
            .count() as u64)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryStore {
    async fn find_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<Progress>, StoreError> {
        Ok(self.lock()?.progress.get(&(user_id, lesson_id)).cloned())
    }

    async fn save_progress(&self, progress: &Progress) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables
            .progress
            .insert((progress.user_id, progress.lesson_id), progress.clone());
        Ok(())
    }

    async fn list_progress_for_user(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Progress>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<Progress> = tables
            .progress
            .values()
            .filter(|p| p.user_id == user_id && course_id.is_none_or(|c| p.course_id == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn count_progress(&self, filter: ProgressFilter) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .progress
            .values()
            .filter(|p| filter.user_id.is_none_or(|u| p.user_id == u))
            .filter(|p| filter.lesson_id.is_none_or(|l| p.lesson_id == l))
            .filter(|p| !filter.completed_only || p.is_completed())
            .count() as u64)
    }
}

#[async_trait]
impl CreditRepository for InMemoryStore {
    async fn apply_credit(&self, entry: &CreditTransaction) -> Result<i64, StoreError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .get_mut(&entry.user_id)
            .ok_or(StoreError::NotFound)?;
        user.credits = clamp_balance(user.credits, entry.amount);
        user.updated_at = entry.created_at;
        let balance = user.credits;
        tables.ledger.push(entry.clone());
        Ok(balance)
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Paginated<CreditTransaction>, StoreError> {
        let tables = self.lock()?;
        // Ledger is append-only, so reverse insertion order is newest first.
        let rows: Vec<CreditTransaction> = tables
            .ledger
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(rows, page))
    }

    async fn ledger_balance(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .ledger
            .iter()
            .filter(|t| t.user_id == user_id)
            .fold(0i64, |acc, t| acc.saturating_add(t.amount)))
    }
}

#[async_trait]
impl MentorApplicationRepository for InMemoryStore {
    async fn list_applications(
        &self,
        filter: &MentorApplicationFilter,
        page: PageRequest,
    ) -> Result<Paginated<MentorApplication>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<MentorApplication> = tables
            .applications
            .values()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| s.matches_any(&[&a.full_name, &a.email]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<MentorApplication>, StoreError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    async fn find_pending_application(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MentorApplication>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .find(|a| a.user_id == Some(user_id) && a.status == MentorApplicationStatus::Pending)
            .cloned())
    }

    async fn insert_application(
        &self,
        application: &MentorApplication,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn update_application(
        &self,
        application: &MentorApplication,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let slot = tables
            .applications
            .get_mut(&application.id)
            .ok_or(StoreError::NotFound)?;
        *slot = application.clone();
        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.applications.remove(&id).is_some())
    }

    async fn count_applications_by_status(
        &self,
    ) -> Result<Vec<(MentorApplicationStatus, u64)>, StoreError> {
        let tables = self.lock()?;
        Ok(count_by(
            MentorApplicationStatus::ALL,
            tables.applications.values(),
            |a| a.status,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use residency_core::CreditKind;

    fn user(email: &str, credits: i64) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            firebase_uid: format!("uid-{email}"),
            email: email.to_string(),
            display_name: email.to_string(),
            role: Role::User,
            credits,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn apply_credit_clamps_and_records_raw_amount() {
        let store = InMemoryStore::new();
        let u = user("a@example.com", 10);
        store.insert_user(&u).await.unwrap();

        let entry = CreditTransaction::new(u.id, -30, CreditKind::AdminAdjustment, "penalty", None);
        let balance = store.apply_credit(&entry).await.unwrap();

        assert_eq!(balance, 0);
        let page = store
            .list_transactions(u.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].amount, -30);
        assert_eq!(store.ledger_balance(u.id).await.unwrap(), -30);
    }

    #[tokio::test]
    async fn apply_credit_for_missing_user_writes_nothing() {
        let store = InMemoryStore::new();
        let ghost = Uuid::new_v4();
        let entry = CreditTransaction::new(ghost, 5, CreditKind::Other, "bonus", None);
        assert_eq!(store.apply_credit(&entry).await, Err(StoreError::NotFound));
        assert_eq!(store.ledger_balance(ghost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_user_keeps_balance() {
        let store = InMemoryStore::new();
        let mut u = user("b@example.com", 42);
        store.insert_user(&u).await.unwrap();
        u.credits = 0;
        u.display_name = "Bee".into();
        store.update_user(&u).await.unwrap();
        let stored = store.get_user(u.id).await.unwrap().unwrap();
        assert_eq!(stored.credits, 42);
        assert_eq!(stored.display_name, "Bee");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        store.insert_user(&user("c@example.com", 0)).await.unwrap();
        let mut dup = user("c@example.com", 0);
        dup.firebase_uid = "other".into();
        assert!(matches!(
            store.insert_user(&dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store
            .list_users(&UserFilter::default(), PageRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        store.set_offline(false);
        assert!(store.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_counts_cover_every_role() {
        let store = InMemoryStore::new();
        store.insert_user(&user("d@example.com", 0)).await.unwrap();
        let counts = store.count_users_by_role().await.unwrap();
        assert_eq!(counts.len(), Role::ALL.len());
        assert!(counts.contains(&(Role::User, 1)));
        assert!(counts.contains(&(Role::Admin, 0)));
    }
}
