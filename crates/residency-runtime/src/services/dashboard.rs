//! Aggregate views for the admin and learner dashboards.

use residency_core::{
    CreditTransaction, MentorApplicationStatus, PageRequest, ProgressStatus, User,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::store::{LessonFilter, ProgressFilter, Store};

const RECENT_TRANSACTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub users: CountBreakdown,
    pub courses: CountBreakdown,
    pub topics: u64,
    pub lessons: u64,
    pub progress_records: u64,
    pub completed_lessons: u64,
    pub pending_mentor_applications: u64,
    pub credits_outstanding: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountBreakdown {
    pub total: u64,
    pub by_kind: BTreeMap<String, u64>,
}

impl CountBreakdown {
    fn from_counts<K: std::fmt::Display>(counts: Vec<(K, u64)>) -> Self {
        let by_kind: BTreeMap<String, u64> =
            counts.into_iter().map(|(k, n)| (k.to_string(), n)).collect();
        Self {
            total: by_kind.values().sum(),
            by_kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerDashboard {
    pub credits: i64,
    pub recent_transactions: Vec<CreditTransaction>,
    pub courses: Vec<CourseProgress>,
    pub completed_lessons: u64,
    pub total_time_spent_seconds: i64,
}

/// Completion within one course the learner has started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: Uuid,
    pub title: String,
    pub slug: String,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    /// Whole percent, 0..=100.
    pub percent: u8,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Store,
}

impl DashboardService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn admin_summary(&self) -> ServiceResult<AdminDashboard> {
        let users = CountBreakdown::from_counts(self.store.users.count_users_by_role().await?);
        let courses =
            CountBreakdown::from_counts(self.store.courses.count_courses_by_status().await?);
        let topics = self.store.topics.count_topics(None).await?;
        let lessons = self
            .store
            .lessons
            .count_lessons(&LessonFilter::default())
            .await?;
        let progress_records = self
            .store
            .progress
            .count_progress(ProgressFilter::default())
            .await?;
        let completed_lessons = self
            .store
            .progress
            .count_progress(ProgressFilter {
                completed_only: true,
                ..Default::default()
            })
            .await?;
        let pending_mentor_applications = self
            .store
            .mentor_applications
            .count_applications_by_status()
            .await?
            .into_iter()
            .find(|(s, _)| *s == MentorApplicationStatus::Pending)
            .map_or(0, |(_, n)| n);
        let credits_outstanding = self.store.users.total_credits().await?;

        Ok(AdminDashboard {
            users,
            courses,
            topics,
            lessons,
            progress_records,
            completed_lessons,
            pending_mentor_applications,
            credits_outstanding,
        })
    }

    pub async fn learner_summary(&self, learner: &User) -> ServiceResult<LearnerDashboard> {
        let credits = self
            .store
            .users
            .get_user(learner.id)
            .await?
            .map_or(learner.credits, |u| u.credits);

        let recent_transactions = self
            .store
            .credits
            .list_transactions(learner.id, PageRequest::new(Some(1), Some(RECENT_TRANSACTIONS)))
            .await?
            .items;

        let records = self
            .store
            .progress
            .list_progress_for_user(learner.id, None)
            .await?;

        let total_time_spent_seconds = records
            .iter()
            .fold(0i64, |acc, p| acc.saturating_add(p.time_spent_seconds));

        // Course order follows the most recently touched record.
        let mut order: Vec<Uuid> = Vec::new();
        let mut completed: HashMap<Uuid, u64> = HashMap::new();
        for record in &records {
            if !order.contains(&record.course_id) {
                order.push(record.course_id);
            }
            if record.status == ProgressStatus::Completed {
                *completed.entry(record.course_id).or_default() += 1;
            }
        }

        let mut courses = Vec::with_capacity(order.len());
        for course_id in order {
            let Some(course) = self.store.courses.get_course(course_id).await? else {
                continue;
            };
            let total_lessons = self
                .store
                .lessons
                .count_lessons(&LessonFilter {
                    course_id: Some(course_id),
                    ..Default::default()
                })
                .await?;
            let done = completed.get(&course_id).copied().unwrap_or(0);
            courses.push(CourseProgress {
                course_id,
                title: course.title,
                slug: course.slug,
                completed_lessons: done,
                total_lessons,
                percent: percent(done, total_lessons),
            });
        }

        Ok(LearnerDashboard {
            credits,
            recent_transactions,
            completed_lessons: completed.values().sum(),
            courses,
            total_time_spent_seconds,
        })
    }
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done.min(total) * 100) / total;
    u8::try_from(pct).unwrap_or(100)
}
