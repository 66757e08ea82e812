use async_trait::async_trait;
use residency_core::{MentorApplication, MentorApplicationStatus, PageRequest, Paginated};
use residency_runtime::{MentorApplicationFilter, MentorApplicationRepository, StoreError};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::{Conditions, PgStore, count_from, map_err, parse_text};

const APPLICATION_COLUMNS: &str = "id, user_id, full_name, email, linkedin_url, expertise, \
     motivation, years_experience, status, reviewed_by, reviewed_at, review_note, created_at, \
     updated_at";

fn application_from_row(row: &PgRow) -> Result<MentorApplication, StoreError> {
    let status: String = row.try_get("status").map_err(map_err)?;
    Ok(MentorApplication {
        id: row.try_get("id").map_err(map_err)?,
        user_id: row.try_get("user_id").map_err(map_err)?,
        full_name: row.try_get("full_name").map_err(map_err)?,
        email: row.try_get("email").map_err(map_err)?,
        linkedin_url: row.try_get("linkedin_url").map_err(map_err)?,
        expertise: row.try_get("expertise").map_err(map_err)?,
        motivation: row.try_get("motivation").map_err(map_err)?,
        years_experience: row.try_get("years_experience").map_err(map_err)?,
        status: parse_text("status", &status)?,
        reviewed_by: row.try_get("reviewed_by").map_err(map_err)?,
        reviewed_at: row.try_get("reviewed_at").map_err(map_err)?,
        review_note: row.try_get("review_note").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

fn application_conditions(filter: &MentorApplicationFilter) -> Result<Conditions, StoreError> {
    let mut cond = Conditions::new();
    if let Some(status) = filter.status {
        cond.push("status = {}", status.as_str().to_string())?;
    }
    cond.search(filter.search.as_ref(), &["full_name", "email"])?;
    Ok(cond)
}

#[async_trait]
impl MentorApplicationRepository for PgStore {
    async fn list_applications(
        &self,
        filter: &MentorApplicationFilter,
        page: PageRequest,
    ) -> Result<Paginated<MentorApplication>, StoreError> {
        let total = self
            .count_where("mentor_applications", application_conditions(filter)?)
            .await?;
        let rows = self
            .select_page(
                "mentor_applications",
                APPLICATION_COLUMNS,
                "created_at DESC",
                application_conditions(filter)?,
                page,
            )
            .await?;
        let items = rows
            .iter()
            .map(application_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, total))
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<MentorApplication>, StoreError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM mentor_applications WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn find_pending_application(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MentorApplication>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM mentor_applications WHERE user_id = $1 AND status = $2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(MentorApplicationStatus::Pending.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn insert_application(
        &self,
        application: &MentorApplication,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO mentor_applications
                (id, user_id, full_name, email, linkedin_url, expertise, motivation,
                 years_experience, status, reviewed_by, reviewed_at, review_note, created_at,
                 updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(application.id)
        .bind(application.user_id)
        .bind(&application.full_name)
        .bind(&application.email)
        .bind(&application.linkedin_url)
        .bind(&application.expertise)
        .bind(&application.motivation)
        .bind(application.years_experience)
        .bind(application.status.as_str())
        .bind(application.reviewed_by)
        .bind(application.reviewed_at)
        .bind(&application.review_note)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_application(
        &self,
        application: &MentorApplication,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE mentor_applications
            SET full_name = $2, email = $3, linkedin_url = $4, expertise = $5, motivation = $6,
                years_experience = $7, status = $8, reviewed_by = $9, reviewed_at = $10,
                review_note = $11, updated_at = $12
            WHERE id = $1
            ",
        )
        .bind(application.id)
        .bind(&application.full_name)
        .bind(&application.email)
        .bind(&application.linkedin_url)
        .bind(&application.expertise)
        .bind(&application.motivation)
        .bind(application.years_experience)
        .bind(application.status.as_str())
        .bind(application.reviewed_by)
        .bind(application.reviewed_at)
        .bind(&application.review_note)
        .bind(application.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> Result<bool, StoreError> {
        self.delete_by_id("mentor_applications", id).await
    }

    async fn count_applications_by_status(
        &self,
    ) -> Result<Vec<(MentorApplicationStatus, u64)>, StoreError> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS n FROM mentor_applications GROUP BY status")
                .fetch_all(self.pool())
                .await
                .map_err(map_err)?;
        let mut counts: Vec<(MentorApplicationStatus, u64)> =
            MentorApplicationStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for row in &rows {
            let status: String = row.try_get("status").map_err(map_err)?;
            let status: MentorApplicationStatus = parse_text("status", &status)?;
            let n: i64 = row.try_get("n").map_err(map_err)?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
                slot.1 = count_from(n);
            }
        }
        Ok(counts)
    }
}
