use async_trait::async_trait;
use residency_core::model::credit::clamp_balance;
use residency_core::{CreditTransaction, PageRequest, Paginated};
use residency_runtime::{CreditRepository, StoreError};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::{PgStore, count_from, map_err, parse_text};

fn transaction_from_row(row: &PgRow) -> Result<CreditTransaction, StoreError> {
    let kind: String = row.try_get("kind").map_err(map_err)?;
    Ok(CreditTransaction {
        id: row.try_get("id").map_err(map_err)?,
        user_id: row.try_get("user_id").map_err(map_err)?,
        amount: row.try_get("amount").map_err(map_err)?,
        kind: parse_text("kind", &kind)?,
        note: row.try_get("note").map_err(map_err)?,
        created_by: row.try_get("created_by").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
    })
}

#[async_trait]
impl CreditRepository for PgStore {
    async fn apply_credit(&self, entry: &CreditTransaction) -> Result<i64, StoreError> {
        let mut tx = self.pool().begin().await.map_err(map_err)?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM users WHERE id = $1 FOR UPDATE")
                .bind(entry.user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;
        let Some(current) = current else {
            return Err(StoreError::NotFound);
        };
        let balance = clamp_balance(current, entry.amount);

        sqlx::query("UPDATE users SET credits = $2, updated_at = $3 WHERE id = $1")
            .bind(entry.user_id)
            .bind(balance)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        sqlx::query(
            r"
            INSERT INTO credit_transactions (id, user_id, amount, kind, note, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.note)
        .bind(entry.created_by)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        Ok(balance)
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Paginated<CreditTransaction>, StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_err)?;
        let rows = sqlx::query(
            r"
            SELECT id, user_id, amount, kind, note, created_by, created_at
            FROM credit_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(map_err)?;
        let items = rows
            .iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, count_from(total)))
    }

    async fn ledger_balance(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount)::BIGINT FROM credit_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_err)?;
        Ok(sum.unwrap_or(0))
    }
}
