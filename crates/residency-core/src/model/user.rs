use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role. Ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    User,
    #[serde(rename = "mentor")]
    Mentor,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "superAdmin")]
    SuperAdmin,
}

string_enum!(Role {
    User => "user",
    Mentor => "mentor",
    Admin => "admin",
    SuperAdmin => "superAdmin",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub firebase_uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// Cached balance; the credit ledger is the source of every change.
    pub credits: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_value(Role::SuperAdmin).unwrap(), "superAdmin");
        assert_eq!("mentor".parse::<Role>().unwrap(), Role::Mentor);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn role_privilege_order() {
        assert!(Role::SuperAdmin > Role::Admin);
        assert!(Role::Admin > Role::Mentor);
        assert!(Role::Admin.is_admin());
        assert!(!Role::Mentor.is_admin());
    }
}
