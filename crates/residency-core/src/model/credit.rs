use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    AdminAdjustment,
    LessonCompletion,
    MentorReward,
    Other,
}

string_enum!(CreditKind {
    AdminAdjustment => "admin_adjustment",
    LessonCompletion => "lesson_completion",
    MentorReward => "mentor_reward",
    Other => "other",
});

/// Append-only credit ledger entry. `amount` is the raw signed delta, even
/// when the resulting balance was clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: CreditKind,
    pub note: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        kind: CreditKind,
        note: impl Into<String>,
        created_by: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            kind,
            note: note.into(),
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Balance after applying `delta`, floored at zero.
pub fn clamp_balance(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}
