//! Lesson progress recording.

use chrono::{DateTime, Utc};
use residency_core::{
    CreditKind, Progress, ProgressKey, ProgressStatus, RawProgressSubmission, User,
    newly_completed, reconcile, sanitize_submission,
};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::credits::CreditService;
use super::id_from_json;
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// What a learner gets back after posting progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutcome {
    pub id: Uuid,
    pub status: ProgressStatus,
    pub quiz_score: Option<f64>,
    pub quiz_passed: bool,
    pub quiz_attempts: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
    /// Credits granted by this call for completing the lesson.
    #[serde(skip_serializing_if = "is_zero")]
    pub credits_awarded: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl ProgressOutcome {
    fn from_progress(progress: &Progress, credits_awarded: i64) -> Self {
        Self {
            id: progress.id,
            status: progress.status,
            quiz_score: progress.quiz_score,
            quiz_passed: progress.quiz_passed,
            quiz_attempts: progress.quiz_attempts,
            completed_at: progress.completed_at,
            time_spent_seconds: progress.time_spent_seconds,
            credits_awarded,
        }
    }
}

#[derive(Clone)]
pub struct ProgressService {
    store: Store,
    credits: CreditService,
}

impl ProgressService {
    pub fn new(store: Store, credits: CreditService) -> Self {
        Self { store, credits }
    }

    /// Merge a lesson submission into the learner's record.
    ///
    /// The lesson must exist and sit under the stated course and topic. The
    /// first time a record reaches `completed`, the lesson's credit reward
    /// (if any) is added to the learner's balance.
    pub async fn record(
        &self,
        learner: &User,
        raw: &RawProgressSubmission,
    ) -> ServiceResult<ProgressOutcome> {
        let course_id = id_from_json("courseId", raw.course_id.as_ref())?;
        let topic_id = id_from_json("topicId", raw.topic_id.as_ref())?;
        let lesson_id = id_from_json("lessonId", raw.lesson_id.as_ref())?;

        let lesson = self
            .store
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("lesson"))?;
        if !lesson.belongs_to(course_id, topic_id) {
            return Err(ServiceError::validation(
                "lesson does not belong to the given course and topic",
            ));
        }

        let submission = sanitize_submission(raw);
        let existing = self
            .store
            .progress
            .find_progress(learner.id, lesson_id)
            .await?;

        let key = ProgressKey {
            user_id: learner.id,
            course_id,
            topic_id,
            lesson_id,
        };
        let updated = reconcile(existing.as_ref(), key, &submission, Utc::now());
        self.store.progress.save_progress(&updated).await?;

        debug!(
            user_id = %learner.id,
            lesson_id = %lesson_id,
            status = %updated.status,
            attempts = updated.quiz_attempts,
            "progress saved"
        );

        let mut credits_awarded = 0;
        if newly_completed(existing.as_ref(), &updated) {
            info!(user_id = %learner.id, lesson_id = %lesson_id, "lesson completed");
            if lesson.credit_reward > 0 {
                let note = format!("Completed lesson: {}", lesson.title);
                match self
                    .credits
                    .record(
                        learner.id,
                        lesson.credit_reward,
                        CreditKind::LessonCompletion,
                        &note,
                        None,
                    )
                    .await
                {
                    Ok(_) => credits_awarded = lesson.credit_reward,
                    // Progress is already saved; the learner keeps completion.
                    Err(e) => error!(
                        user_id = %learner.id,
                        lesson_id = %lesson_id,
                        error = %e,
                        "failed to award lesson credits"
                    ),
                }
            }
        }

        Ok(ProgressOutcome::from_progress(&updated, credits_awarded))
    }

    /// A learner's records, optionally limited to one course.
    pub async fn list_for_user(
        &self,
        learner: &User,
        course_id: Option<Uuid>,
    ) -> ServiceResult<Vec<Progress>> {
        Ok(self
            .store
            .progress
            .list_progress_for_user(learner.id, course_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::{CatalogService, CourseInput, LessonInput, TopicInput};
    use crate::services::users::{UserInput, UserService};
    use residency_core::{Lesson, PageRequest};
    use serde_json::{Value, json};

    struct Fixture {
        progress: ProgressService,
        users: UserService,
        credits: CreditService,
        learner: User,
        lesson: Lesson,
    }

    async fn fixture(reward: i64) -> Fixture {
        let store = Store::in_memory();
        let catalog = CatalogService::new(store.clone());
        let users = UserService::new(store.clone());
        let credits = CreditService::new(store.clone());

        let course = catalog
            .create_course(CourseInput {
                title: Some("Go To Market".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let topic = catalog
            .create_topic(TopicInput {
                course_id: Some(course.id.to_string()),
                title: Some("Pricing".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let lesson = catalog
            .create_lesson(LessonInput {
                topic_id: Some(topic.id.to_string()),
                title: Some("Value metrics".into()),
                credit_reward: Some(reward),
                ..Default::default()
            })
            .await
            .unwrap();
        let learner = users
            .create(UserInput {
                email: Some("learner@example.com".into()),
                firebase_uid: Some("uid-learner".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        Fixture {
            progress: ProgressService::new(store, credits.clone()),
            users,
            credits,
            learner,
            lesson,
        }
    }

    fn body(lesson: &Lesson, extra: Value) -> RawProgressSubmission {
        let mut value = json!({
            "courseId": lesson.course_id.to_string(),
            "topicId": lesson.topic_id.to_string(),
            "lessonId": lesson.id.to_string(),
        });
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn passing_then_failing_stays_completed() {
        let f = fixture(0).await;
        let first = f
            .progress
            .record(
                &f.learner,
                &body(
                    &f.lesson,
                    json!({
                        "quizScore": 85,
                        "quizPassed": true,
                        "answers": [{ "question": "Q1", "selectedOption": 1, "isCorrect": true }]
                    }),
                ),
            )
            .await
            .unwrap();
        assert_eq!(first.status, ProgressStatus::Completed);
        assert_eq!(first.quiz_attempts, 1);
        assert!(first.completed_at.is_some());

        let second = f
            .progress
            .record(
                &f.learner,
                &body(
                    &f.lesson,
                    json!({
                        "quizScore": 40,
                        "quizPassed": false,
                        "answers": [{ "question": "Q1", "selectedOption": 0, "isCorrect": false }]
                    }),
                ),
            )
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, ProgressStatus::Completed);
        assert!(second.quiz_passed);
        assert_eq!(second.quiz_attempts, 2);
        assert_eq!(second.completed_at, first.completed_at);
    }

    #[tokio::test]
    async fn ids_are_validated() {
        let f = fixture(0).await;

        let missing: RawProgressSubmission =
            serde_json::from_value(json!({ "lessonId": f.lesson.id.to_string() })).unwrap();
        assert!(matches!(
            f.progress.record(&f.learner, &missing).await,
            Err(ServiceError::Validation(_))
        ));

        let malformed = body(&f.lesson, json!({ "topicId": "xyz" }));
        assert!(matches!(
            f.progress.record(&f.learner, &malformed).await,
            Err(ServiceError::Validation(_))
        ));

        let unknown = body(&f.lesson, json!({ "lessonId": Uuid::new_v4().to_string() }));
        assert!(matches!(
            f.progress.record(&f.learner, &unknown).await,
            Err(ServiceError::NotFound(_))
        ));

        let mismatch = body(&f.lesson, json!({ "courseId": Uuid::new_v4().to_string() }));
        assert!(matches!(
            f.progress.record(&f.learner, &mismatch).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn completion_awards_credits_once() {
        let f = fixture(25).await;
        let done = json!({ "status": "completed", "timeSpentSeconds": 120 });

        let first = f
            .progress
            .record(&f.learner, &body(&f.lesson, done.clone()))
            .await
            .unwrap();
        assert_eq!(first.credits_awarded, 25);

        let again = f
            .progress
            .record(&f.learner, &body(&f.lesson, done))
            .await
            .unwrap();
        assert_eq!(again.credits_awarded, 0);
        assert_eq!(again.time_spent_seconds, 240);

        assert_eq!(f.users.get(f.learner.id).await.unwrap().credits, 25);
        let ledger = f
            .credits
            .list_transactions(f.learner.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(ledger.items.len(), 1);
        assert_eq!(ledger.items[0].kind, CreditKind::LessonCompletion);
    }

    #[tokio::test]
    async fn list_for_user_filters_by_course() {
        let f = fixture(0).await;
        f.progress
            .record(&f.learner, &body(&f.lesson, json!({ "timeSpentSeconds": 5 })))
            .await
            .unwrap();

        let all = f.progress.list_for_user(&f.learner, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ProgressStatus::InProgress);

        let other = f
            .progress
            .list_for_user(&f.learner, Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
