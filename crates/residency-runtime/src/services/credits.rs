//! Credit ledger.
//!
//! A user's balance is cached on the user row and every change is recorded
//! as an append-only ledger entry. Both writes happen in one repository call
//! ([`CreditRepository::apply_credit`](crate::store::CreditRepository::apply_credit)).

use residency_core::{CreditKind, CreditTransaction, PageRequest, Paginated};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// An admin's balance adjustment request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAdjustment {
    /// Signed delta; must be non-zero.
    pub amount: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditUpdate {
    pub user_id: Uuid,
    pub balance: i64,
    pub transaction: CreditTransaction,
}

#[derive(Clone)]
pub struct CreditService {
    store: Store,
}

impl CreditService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Apply an admin adjustment: balance becomes `max(0, current + delta)`
    /// and the raw delta is recorded with the note.
    pub async fn update_user_credits(
        &self,
        user_id: Uuid,
        adjustment: CreditAdjustment,
        actor: Option<Uuid>,
    ) -> ServiceResult<CreditUpdate> {
        let amount = match adjustment.amount {
            Some(0) => return Err(ServiceError::validation("amount must not be zero")),
            Some(amount) => amount,
            None => return Err(ServiceError::validation("amount is required")),
        };
        let note = adjustment
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::validation("note is required"))?;

        self.record(user_id, amount, CreditKind::AdminAdjustment, note, actor)
            .await
    }

    /// Append a ledger entry of any kind and move the balance with it.
    pub async fn record(
        &self,
        user_id: Uuid,
        amount: i64,
        kind: CreditKind,
        note: &str,
        actor: Option<Uuid>,
    ) -> ServiceResult<CreditUpdate> {
        let entry = CreditTransaction::new(user_id, amount, kind, note, actor);
        let balance = self
            .store
            .credits
            .apply_credit(&entry)
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::NotFound(_) => ServiceError::not_found("user"),
                other => other,
            })?;

        info!(
            user_id = %user_id,
            amount,
            kind = %kind,
            balance,
            "credits applied"
        );
        Ok(CreditUpdate {
            user_id,
            balance,
            transaction: entry,
        })
    }

    /// Ledger entries for an existing user, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Paginated<CreditTransaction>> {
        self.ensure_user(user_id).await?;
        Ok(self.store.credits.list_transactions(user_id, page).await?)
    }

    /// Sum of every ledger entry. Differs from the cached balance whenever a
    /// debit was clamped at zero.
    pub async fn ledger_balance(&self, user_id: Uuid) -> ServiceResult<i64> {
        self.ensure_user(user_id).await?;
        Ok(self.store.credits.ledger_balance(user_id).await?)
    }

    async fn ensure_user(&self, user_id: Uuid) -> ServiceResult<()> {
        match self.store.users.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("user")),
        }
    }
}
