use async_trait::async_trait;
use residency_core::{PageRequest, Paginated, Role, User};
use residency_runtime::{StoreError, UserFilter, UserRepository};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::{Conditions, PgStore, count_from, map_err, parse_text};

const USER_COLUMNS: &str =
    "id, firebase_uid, email, display_name, role, credits, bio, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role").map_err(map_err)?;
    Ok(User {
        id: row.try_get("id").map_err(map_err)?,
        firebase_uid: row.try_get("firebase_uid").map_err(map_err)?,
        email: row.try_get("email").map_err(map_err)?,
        display_name: row.try_get("display_name").map_err(map_err)?,
        role: parse_text("role", &role)?,
        credits: row.try_get("credits").map_err(map_err)?,
        bio: row.try_get("bio").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
        updated_at: row.try_get("updated_at").map_err(map_err)?,
    })
}

fn user_conditions(filter: &UserFilter) -> Result<Conditions, StoreError> {
    let mut cond = Conditions::new();
    if let Some(role) = filter.role {
        cond.push("role = {}", role.as_str().to_string())?;
    }
    cond.search(filter.search.as_ref(), &["email", "display_name"])?;
    Ok(cond)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Paginated<User>, StoreError> {
        let count = user_conditions(filter)?;
        let count_sql = format!("SELECT COUNT(*) FROM users {}", count.where_sql());
        let total: i64 = sqlx::query_scalar_with(&count_sql, count.into_args())
            .fetch_one(self.pool())
            .await
            .map_err(map_err)?;

        let mut cond = user_conditions(filter)?;
        let where_sql = cond.where_sql();
        let page_sql = cond.page_sql(page.limit, page.offset())?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {where_sql} ORDER BY created_at DESC, email ASC {page_sql}"
        );
        let rows = sqlx::query_with(&sql, cond.into_args())
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        let items = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, count_from(total)))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE firebase_uid = $1");
        let row = sqlx::query(&sql)
            .bind(uid)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(map_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, firebase_uid, email, display_name, role, credits, bio, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(user.id)
        .bind(&user.firebase_uid)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.credits.max(0))
        .bind(&user.bio)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET firebase_uid = $2, email = $3, display_name = $4, role = $5, bio = $6,
                updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(user.id)
        .bind(&user.firebase_uid)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(&user.bio)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, StoreError> {
        let rows = sqlx::query("SELECT role, COUNT(*) AS n FROM users GROUP BY role")
            .fetch_all(self.pool())
            .await
            .map_err(map_err)?;
        let mut counts: Vec<(Role, u64)> = Role::ALL.iter().map(|r| (*r, 0)).collect();
        for row in &rows {
            let role: String = row.try_get("role").map_err(map_err)?;
            let role: Role = parse_text("role", &role)?;
            let n: i64 = row.try_get("n").map_err(map_err)?;
            if let Some(slot) = counts.iter_mut().find(|(r, _)| *r == role) {
                slot.1 = count_from(n);
            }
        }
        Ok(counts)
    }

    async fn total_credits(&self) -> Result<i64, StoreError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT SUM(credits)::BIGINT FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_err)?;
        Ok(total.unwrap_or(0))
    }
}
