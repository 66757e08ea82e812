//! Courses, topics and lessons.

use chrono::Utc;
use residency_core::{
    CoreError, Course, CourseStatus, Lesson, PageRequest, Paginated, QuizQuestion, Topic,
    parse_id, slugify,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{optional_text, required_text};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{CourseFilter, LessonFilter, ProgressFilter, SearchText, Store, TopicFilter};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInput {
    /// Optional on create: the course is taken from the topic, and a
    /// mismatching value is rejected.
    pub course_id: Option<String>,
    pub topic_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub position: Option<i32>,
    pub quiz: Option<Vec<QuizQuestion>>,
    pub passing_score: Option<i32>,
    pub credit_reward: Option<i64>,
}

/// A published course with its topics and lessons, for learners.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub topics: Vec<TopicOutline>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicOutline {
    #[serde(flatten)]
    pub topic: Topic,
    pub lessons: Vec<Lesson>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Store,
}

impl CatalogService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    // ---------------------------------------------------------------- courses

    pub async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Course>> {
        Ok(self.store.courses.list_courses(filter, page).await?)
    }

    pub async fn get_course(&self, id: Uuid) -> ServiceResult<Course> {
        self.store
            .courses
            .get_course(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("course"))
    }

    pub async fn create_course(&self, input: CourseInput) -> ServiceResult<Course> {
        let title = required_text("title", input.title.as_deref())?;
        let slug = slug_for(&title)?;
        self.ensure_course_slug_free(&slug, None).await?;

        let status = match input.status.as_deref() {
            Some(s) => s.parse::<CourseStatus>()?,
            None => CourseStatus::default(),
        };

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title,
            slug,
            description: optional_text(input.description.as_deref()).unwrap_or_default(),
            status,
            position: input.position.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.store.courses.insert_course(&course).await?;
        info!(course_id = %course.id, slug = %course.slug, "course created");
        Ok(course)
    }

    pub async fn update_course(&self, id: Uuid, input: CourseInput) -> ServiceResult<Course> {
        let mut course = self.get_course(id).await?;

        if let Some(raw) = input.title.as_deref() {
            let title = required_text("title", Some(raw))?;
            if title != course.title {
                let slug = slug_for(&title)?;
                self.ensure_course_slug_free(&slug, Some(id)).await?;
                course.slug = slug;
                course.title = title;
            }
        }
        if let Some(description) = input.description {
            course.description = description.trim().to_string();
        }
        if let Some(status) = input.status.as_deref() {
            course.status = status.parse()?;
        }
        if let Some(position) = input.position {
            course.position = position;
        }
        course.updated_at = Utc::now();

        self.store.courses.update_course(&course).await?;
        info!(course_id = %id, "course updated");
        Ok(course)
    }

    /// Delete a course. Refused while it still has topics.
    pub async fn delete_course(&self, id: Uuid) -> ServiceResult<()> {
        self.get_course(id).await?;
        let topics = self.store.topics.count_topics(Some(id)).await?;
        if topics > 0 {
            return Err(ServiceError::conflict(format!(
                "cannot delete course: it still has {topics} topic(s)"
            )));
        }
        if !self.store.courses.delete_course(id).await? {
            return Err(ServiceError::not_found("course"));
        }
        info!(course_id = %id, "course deleted");
        Ok(())
    }

    async fn ensure_course_slug_free(&self, slug: &str, except: Option<Uuid>) -> ServiceResult<()> {
        match self.store.courses.find_course_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "a course with slug '{slug}' already exists"
            ))),
            _ => Ok(()),
        }
    }

    // ----------------------------------------------------------------- topics

    pub async fn list_topics(
        &self,
        filter: &TopicFilter,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Topic>> {
        Ok(self.store.topics.list_topics(filter, page).await?)
    }

    pub async fn get_topic(&self, id: Uuid) -> ServiceResult<Topic> {
        self.store
            .topics
            .get_topic(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("topic"))
    }

    pub async fn create_topic(&self, input: TopicInput) -> ServiceResult<Topic> {
        let course_id = parse_id(
            "courseId",
            input
                .course_id
                .as_deref()
                .ok_or_else(|| CoreError::MissingField("courseId".into()))?,
        )?;
        let title = required_text("title", input.title.as_deref())?;
        self.get_course(course_id).await?;

        let slug = slug_for(&title)?;
        self.ensure_topic_slug_free(course_id, &slug, None).await?;

        let now = Utc::now();
        let topic = Topic {
            id: Uuid::new_v4(),
            course_id,
            title,
            slug,
            description: optional_text(input.description.as_deref()).unwrap_or_default(),
            position: input.position.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.store.topics.insert_topic(&topic).await?;
        info!(topic_id = %topic.id, course_id = %course_id, "topic created");
        Ok(topic)
    }

    /// Update a topic. A topic stays in the course it was created in.
    pub async fn update_topic(&self, id: Uuid, input: TopicInput) -> ServiceResult<Topic> {
        let mut topic = self.get_topic(id).await?;

        if let Some(raw) = input.course_id.as_deref() {
            let course_id = parse_id("courseId", raw)?;
            if course_id != topic.course_id {
                return Err(ServiceError::validation(
                    "a topic cannot be moved to another course",
                ));
            }
        }
        if let Some(raw) = input.title.as_deref() {
            let title = required_text("title", Some(raw))?;
            if title != topic.title {
                let slug = slug_for(&title)?;
                self.ensure_topic_slug_free(topic.course_id, &slug, Some(id))
                    .await?;
                topic.slug = slug;
                topic.title = title;
            }
        }
        if let Some(description) = input.description {
            topic.description = description.trim().to_string();
        }
        if let Some(position) = input.position {
            topic.position = position;
        }
        topic.updated_at = Utc::now();

        self.store.topics.update_topic(&topic).await?;
        info!(topic_id = %id, "topic updated");
        Ok(topic)
    }

    /// Delete a topic. Refused while it still has lessons.
    pub async fn delete_topic(&self, id: Uuid) -> ServiceResult<()> {
        self.get_topic(id).await?;
        let lessons = self
            .store
            .lessons
            .count_lessons(&LessonFilter {
                topic_id: Some(id),
                ..Default::default()
            })
            .await?;
        if lessons > 0 {
            return Err(ServiceError::conflict(format!(
                "cannot delete topic: it still has {lessons} lesson(s)"
            )));
        }
        if !self.store.topics.delete_topic(id).await? {
            return Err(ServiceError::not_found("topic"));
        }
        info!(topic_id = %id, "topic deleted");
        Ok(())
    }

    async fn ensure_topic_slug_free(
        &self,
        course_id: Uuid,
        slug: &str,
        except: Option<Uuid>,
    ) -> ServiceResult<()> {
        match self.store.topics.find_topic_by_slug(course_id, slug).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "a topic with slug '{slug}' already exists in this course"
            ))),
            _ => Ok(()),
        }
    }

    // ---------------------------------------------------------------- lessons

    pub async fn list_lessons(
        &self,
        filter: &LessonFilter,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Lesson>> {
        Ok(self.store.lessons.list_lessons(filter, page).await?)
    }

    pub async fn get_lesson(&self, id: Uuid) -> ServiceResult<Lesson> {
        self.store
            .lessons
            .get_lesson(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("lesson"))
    }

    pub async fn create_lesson(&self, input: LessonInput) -> ServiceResult<Lesson> {
        let topic_id = parse_id(
            "topicId",
            input
                .topic_id
                .as_deref()
                .ok_or_else(|| CoreError::MissingField("topicId".into()))?,
        )?;
        let title = required_text("title", input.title.as_deref())?;
        let topic = self.get_topic(topic_id).await?;
        check_course_matches(input.course_id.as_deref(), &topic)?;

        let slug = slug_for(&title)?;
        self.ensure_lesson_slug_free(topic_id, &slug, None).await?;

        let quiz = input.quiz.unwrap_or_default();
        validate_quiz(&quiz)?;

        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id: topic.course_id,
            topic_id,
            title,
            slug,
            content: input.content.unwrap_or_default(),
            video_url: optional_text(input.video_url.as_deref()),
            duration_minutes: non_negative("durationMinutes", input.duration_minutes.unwrap_or(0))?,
            position: input.position.unwrap_or(0),
            quiz,
            passing_score: passing_score(input.passing_score.unwrap_or(Lesson::DEFAULT_PASSING_SCORE))?,
            credit_reward: credit_reward(input.credit_reward.unwrap_or(0))?,
            created_at: now,
            updated_at: now,
        };
        self.store.lessons.insert_lesson(&lesson).await?;
        info!(lesson_id = %lesson.id, topic_id = %topic_id, "lesson created");
        Ok(lesson)
    }

    /// Update a lesson. Moving it to another topic also moves it to that
    /// topic's course.
    pub async fn update_lesson(&self, id: Uuid, input: LessonInput) -> ServiceResult<Lesson> {
        let original = self.get_lesson(id).await?;
        let mut lesson = original.clone();

        if let Some(raw) = input.topic_id.as_deref() {
            let topic_id = parse_id("topicId", raw)?;
            if topic_id != lesson.topic_id {
                let topic = self.get_topic(topic_id).await?;
                lesson.topic_id = topic.id;
                lesson.course_id = topic.course_id;
            }
        }
        if let Some(raw) = input.course_id.as_deref() {
            let course_id = parse_id("courseId", raw)?;
            if course_id != lesson.course_id {
                return Err(ServiceError::validation(
                    "courseId does not match the lesson's topic",
                ));
            }
        }

        let title = match input.title.as_deref() {
            Some(raw) => required_text("title", Some(raw))?,
            None => lesson.title.clone(),
        };
        if title != original.title || lesson.topic_id != original.topic_id {
            let slug = if title != original.title {
                slug_for(&title)?
            } else {
                original.slug.clone()
            };
            self.ensure_lesson_slug_free(lesson.topic_id, &slug, Some(id))
                .await?;
            lesson.slug = slug;
            lesson.title = title;
        }

        if let Some(content) = input.content {
            lesson.content = content;
        }
        if let Some(video_url) = input.video_url {
            lesson.video_url = optional_text(Some(&video_url));
        }
        if let Some(duration) = input.duration_minutes {
            lesson.duration_minutes = non_negative("durationMinutes", duration)?;
        }
        if let Some(position) = input.position {
            lesson.position = position;
        }
        if let Some(quiz) = input.quiz {
            validate_quiz(&quiz)?;
            lesson.quiz = quiz;
        }
        if let Some(score) = input.passing_score {
            lesson.passing_score = passing_score(score)?;
        }
        if let Some(reward) = input.credit_reward {
            lesson.credit_reward = credit_reward(reward)?;
        }
        lesson.updated_at = Utc::now();

        self.store.lessons.update_lesson(&lesson).await?;
        info!(lesson_id = %id, "lesson updated");
        Ok(lesson)
    }

    /// Delete a lesson. Refused once any learner has progress on it.
    pub async fn delete_lesson(&self, id: Uuid) -> ServiceResult<()> {
        self.get_lesson(id).await?;
        let records = self
            .store
            .progress
            .count_progress(ProgressFilter {
                lesson_id: Some(id),
                ..Default::default()
            })
            .await?;
        if records > 0 {
            return Err(ServiceError::conflict(format!(
                "cannot delete lesson: {records} learner progress record(s) reference it"
            )));
        }
        if !self.store.lessons.delete_lesson(id).await? {
            return Err(ServiceError::not_found("lesson"));
        }
        info!(lesson_id = %id, "lesson deleted");
        Ok(())
    }

    async fn ensure_lesson_slug_free(
        &self,
        topic_id: Uuid,
        slug: &str,
        except: Option<Uuid>,
    ) -> ServiceResult<()> {
        match self.store.lessons.find_lesson_by_slug(topic_id, slug).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "a lesson with slug '{slug}' already exists in this topic"
            ))),
            _ => Ok(()),
        }
    }

    // ---------------------------------------------------------------- learner

    /// Published courses only.
    pub async fn list_published(
        &self,
        search: Option<SearchText>,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Course>> {
        let filter = CourseFilter {
            search,
            status: Some(CourseStatus::Published),
        };
        self.list_courses(&filter, page).await
    }

    /// A published course with topics and lessons in display order.
    pub async fn course_outline(&self, slug: &str) -> ServiceResult<CourseOutline> {
        let course = self
            .store
            .courses
            .find_course_by_slug(slug)
            .await?
            .filter(|c| c.status == CourseStatus::Published)
            .ok_or_else(|| ServiceError::not_found("course"))?;

        let topics = self.store.topics.topics_for_course(course.id).await?;
        let mut lessons = self.store.lessons.lessons_for_course(course.id).await?;

        let topics = topics
            .into_iter()
            .map(|topic| {
                let (mine, rest): (Vec<Lesson>, Vec<Lesson>) =
                    lessons.drain(..).partition(|l| l.topic_id == topic.id);
                lessons = rest;
                TopicOutline {
                    topic,
                    lessons: mine,
                }
            })
            .collect();

        Ok(CourseOutline { course, topics })
    }
}

fn slug_for(title: &str) -> Result<String, CoreError> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(CoreError::EmptySlug(title.to_string()));
    }
    Ok(slug)
}

fn check_course_matches(course_id: Option<&str>, topic: &Topic) -> ServiceResult<()> {
    if let Some(raw) = course_id {
        let course_id = parse_id("courseId", raw)?;
        if course_id != topic.course_id {
            return Err(ServiceError::validation(
                "courseId does not match the topic's course",
            ));
        }
    }
    Ok(())
}

fn validate_quiz(quiz: &[QuizQuestion]) -> Result<(), CoreError> {
    for (i, q) in quiz.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(CoreError::invalid(
                "quiz",
                format!("question {} has no text", i + 1),
            ));
        }
        if q.options.len() < 2 {
            return Err(CoreError::invalid(
                "quiz",
                format!("question {} needs at least two options", i + 1),
            ));
        }
        if q.correct_option as usize >= q.options.len() {
            return Err(CoreError::invalid(
                "quiz",
                format!("question {} has no option {}", i + 1, q.correct_option),
            ));
        }
    }
    Ok(())
}

fn passing_score(score: i32) -> Result<i32, CoreError> {
    if !(0..=100).contains(&score) {
        return Err(CoreError::invalid("passingScore", "must be between 0 and 100"));
    }
    Ok(score)
}

fn credit_reward(reward: i64) -> Result<i64, CoreError> {
    if reward < 0 {
        return Err(CoreError::invalid("creditReward", "must not be negative"));
    }
    Ok(reward)
}

fn non_negative(field: &str, value: i32) -> Result<i32, CoreError> {
    if value < 0 {
        return Err(CoreError::invalid(field, "must not be negative"));
    }
    Ok(value)
}
