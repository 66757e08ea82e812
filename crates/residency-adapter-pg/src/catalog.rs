//! Courses, topics and lessons.

use async_trait::async_trait;
use residency_core::{Course, CourseStatus, Lesson, PageRequest, Paginated, QuizQuestion, Topic};
use residency_runtime::{
    CourseFilter, CourseRepository, LessonFilter, LessonRepository, StoreError, TopicFilter,
    TopicRepository,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{Conditions, PgStore, count_from, map_err, parse_text};

const COURSE_COLUMNS: &str =
    "id, title, slug, description, status, position, created_at, updated_at";
const TOPIC_COLUMNS: &str =
    "id, course_id, title, slug, description, position, created_at, updated_at";
const LESSON_COLUMNS: &str = "id, course_id, topic_id, title, slug, content, video_url, \
     duration_minutes, position, quiz, passing_score, credit_reward, created_at, updated_at";

fn course_from_row(row: &PgRow) -> Result<Course, StoreError> {
    let status: String = row.try_get("status").map_err(map_err)?;
    Ok(Course {
        id: row.try_get("id").map_err(map_err)?,
        title: row.try_get("title").map_err(map_err)?,
        slug: row.try_get("slug").map_err(map_err)?,
        description: row.try_get("description").map_err(map_err)?,
        status: parse_text("status", &status)?,
        position: row.try_get("position").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

fn topic_from_row(row: &PgRow) -> Result<Topic, StoreError> {
    Ok(Topic {
        id: row.try_get("id").map_err(map_err)?,
        course_id: row.try_get("course_id").map_err(map_err)?,
        title: row.try_get("title").map_err(map_err)?,
        slug: row.try_get("slug").map_err(map_err)?,
        description: row.try_get("description").map_err(map_err)?,
        position: row.try_get("position").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

fn lesson_from_row(row: &PgRow) -> Result<Lesson, StoreError> {
    let Json(quiz): Json<Vec<QuizQuestion>> = row.try_get("quiz").map_err(map_err)?;
    Ok(Lesson {
        id: row.try_get("id").map_err(map_err)?,
        course_id: row.try_get("course_id").map_err(map_err)?,
        topic_id: row.try_get("topic_id").map_err(map_err)?,
        title: row.try_get("title").map_err(map_err)?,
        slug: row.try_get("slug").map_err(map_err)?,
        content: row.try_get("content").map_err(map_err)?,
        video_url: row.try_get("video_url").map_err(map_err)?,
        duration_minutes: row.try_get("duration_minutes").map_err(map_err)?,
        position: row.try_get("position").map_err(map_err)?,
        quiz,
        passing_score: row.try_get("passing_score").map_err(map_err)?,
        credit_reward: row.try_get("credit_reward").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

fn course_conditions(filter: &CourseFilter) -> Result<Conditions, StoreError> {
    let mut cond = Conditions::new();
    if let Some(status) = filter.status {
        cond.push("status = {}", status.as_str().to_string())?;
    }
    cond.search(filter.search.as_ref(), &["title", "description", "slug"])?;
    Ok(cond)
}

fn topic_conditions(filter: &TopicFilter) -> Result<Conditions, StoreError> {
    let mut cond = Conditions::new();
    if let Some(course_id) = filter.course_id {
        cond.push("course_id = {}", course_id)?;
    }
    cond.search(filter.search.as_ref(), &["title", "description"])?;
    Ok(cond)
}

fn lesson_conditions(filter: &LessonFilter) -> Result<Conditions, StoreError> {
    let mut cond = Conditions::new();
    if let Some(course_id) = filter.course_id {
        cond.push("course_id = {}", course_id)?;
    }
    if let Some(topic_id) = filter.topic_id {
        cond.push("topic_id = {}", topic_id)?;
    }
    cond.search(filter.search.as_ref(), &["title", "slug"])?;
    Ok(cond)
}

#[async_trait]
impl CourseRepository for PgStore {
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Paginated<Course>, StoreError> {
        let total = self.count_where("courses", course_conditions(filter)?).await?;
        let rows = self
            .select_page(
                "courses",
                COURSE_COLUMNS,
                "position ASC, created_at ASC",
                course_conditions(filter)?,
                page,
            )
            .await?;
        let items = rows.iter().map(course_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, total))
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn find_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StoreError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE slug = $1");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO courses
                (id, title, slug, description, status, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.description)
        .bind(course.status.as_str())
        .bind(course.position)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE courses
            SET title = $2, slug = $3, description = $4, status = $5, position = $6,
                updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.description)
        .bind(course.status.as_str())
        .bind(course.position)
        .bind(course.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_by_id("courses", id).await
    }

    async fn count_courses_by_status(&self) -> Result<Vec<(CourseStatus, u64)>, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM courses GROUP BY status")
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        let mut counts: Vec<(CourseStatus, u64)> =
            CourseStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for row in &rows {
            let status: String = row.try_get("status").map_err(map_err)?;
            let status: CourseStatus = parse_text("status", &status)?;
            let n: i64 = row.try_get("n").map_err(map_err)?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
                slot.1 = count_from(n);
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl TopicRepository for PgStore {
    async fn list_topics(
        &self,
        filter: &TopicFilter,
        page: PageRequest,
    ) -> Result<Paginated<Topic>, StoreError> {
        let total = self.count_where("topics", topic_conditions(filter)?).await?;
        let rows = self
            .select_page(
                "topics",
                TOPIC_COLUMNS,
                "position ASC, created_at ASC",
                topic_conditions(filter)?,
                page,
            )
            .await?;
        let items = rows.iter().map(topic_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, total))
    }

    async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>, StoreError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn find_topic_by_slug(
        &self,
        course_id: Uuid,
        slug: &str,
    ) -> Result<Option<Topic>, StoreError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE course_id = $1 AND slug = $2");
        let row = sqlx::query(&sql)
            .bind(course_id)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn topics_for_course(&self, course_id: Uuid) -> Result<Vec<Topic>, StoreError> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM topics WHERE course_id = $1 ORDER BY position ASC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(course_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO topics
                (id, course_id, title, slug, description, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(topic.id)
        .bind(topic.course_id)
        .bind(&topic.title)
        .bind(&topic.slug)
        .bind(&topic.description)
        .bind(topic.position)
        .bind(topic.created_at)
        .bind(topic.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE topics
            SET title = $2, slug = $3, description = $4, position = $5, updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(topic.id)
        .bind(&topic.title)
        .bind(&topic.slug)
        .bind(&topic.description)
        .bind(topic.position)
        .bind(topic.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_topic(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_by_id("topics", id).await
    }

    async fn count_topics(&self, course_id: Option<Uuid>) -> Result<u64, StoreError> {
        let mut cond = Conditions::new();
        if let Some(course_id) = course_id {
            cond.push("course_id = {}", course_id)?;
        }
        self.count_where("topics", cond).await
    }
}

#[async_trait]
impl LessonRepository for PgStore {
    async fn list_lessons(
        &self,
        filter: &LessonFilter,
        page: PageRequest,
    ) -> Result<Paginated<Lesson>, StoreError> {
        let total = self.count_where("lessons", lesson_conditions(filter)?).await?;
        let rows = self
            .select_page(
                "lessons",
                LESSON_COLUMNS,
                "position ASC, created_at ASC",
                lesson_conditions(filter)?,
                page,
            )
            .await?;
        let items = rows.iter().map(lesson_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, total))
    }

    async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>, StoreError> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(lesson_from_row).transpose()
    }

    async fn find_lesson_by_slug(
        &self,
        topic_id: Uuid,
        slug: &str,
    ) -> Result<Option<Lesson>, StoreError> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE topic_id = $1 AND slug = $2");
        let row = sqlx::query(&sql)
            .bind(topic_id)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(lesson_from_row).transpose()
    }

    async fn lessons_for_course(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError> {
        let columns = LESSON_COLUMNS
            .split(", ")
            .map(|c| format!("l.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r"
            SELECT {columns}
            FROM lessons l
            JOIN topics t ON t.id = l.topic_id
            WHERE l.course_id = $1
            ORDER BY t.position ASC, l.topic_id ASC, l.position ASC, l.created_at ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(course_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        rows.iter().map(lesson_from_row).collect()
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO lessons
                (id, course_id, topic_id, title, slug, content, video_url, duration_minutes,
                 position, quiz, passing_score, credit_reward, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(lesson.topic_id)
        .bind(&lesson.title)
        .bind(&lesson.slug)
        .bind(&lesson.content)
        .bind(&lesson.video_url)
        .bind(lesson.duration_minutes)
        .bind(lesson.position)
        .bind(Json(&lesson.quiz))
        .bind(lesson.passing_score)
        .bind(lesson.credit_reward)
        .bind(lesson.created_at)
        .bind(lesson.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE lessons
            SET course_id = $2, topic_id = $3, title = $4, slug = $5, content = $6,
                video_url = $7, duration_minutes = $8, position = $9, quiz = $10,
                passing_score = $11, credit_reward = $12, updated_at = $13
            WHERE id = $1
            ",
        )
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(lesson.topic_id)
        .bind(&lesson.title)
        .bind(&lesson.slug)
        .bind(&lesson.content)
        .bind(&lesson.video_url)
        .bind(lesson.duration_minutes)
        .bind(lesson.position)
        .bind(Json(&lesson.quiz))
        .bind(lesson.passing_score)
        .bind(lesson.credit_reward)
        .bind(lesson.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_by_id("lessons", id).await
    }

    async fn count_lessons(&self, filter: &LessonFilter) -> Result<u64, StoreError> {
        self.count_where("lessons", lesson_conditions(filter)?).await
    }
}
