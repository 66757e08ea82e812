//! Platform accounts.

use chrono::Utc;
use residency_core::{CoreError, PageRequest, Paginated, Role, User};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{optional_text, required_text};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{ProgressFilter, Store, UserFilter};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub firebase_uid: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &UserFilter, page: PageRequest) -> ServiceResult<Paginated<User>> {
        Ok(self.store.users.list_users(filter, page).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<User> {
        self.store
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// The account linked to a verified identity, if any.
    pub async fn find_by_firebase_uid(&self, uid: &str) -> ServiceResult<Option<User>> {
        Ok(self.store.users.find_user_by_firebase_uid(uid).await?)
    }

    pub async fn create(&self, input: UserInput) -> ServiceResult<User> {
        let email = normalize_email(input.email.as_deref())?;
        let firebase_uid = required_text("firebaseUid", input.firebase_uid.as_deref())?;

        if self.store.users.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "a user with email '{email}' already exists"
            )));
        }
        if self
            .store
            .users
            .find_user_by_firebase_uid(&firebase_uid)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(
                "a user with this firebase uid already exists",
            ));
        }

        let role = match input.role.as_deref() {
            Some(r) => r.parse::<Role>()?,
            None => Role::User,
        };
        let display_name = optional_text(input.display_name.as_deref())
            .unwrap_or_else(|| default_display_name(&email));

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            firebase_uid,
            email,
            display_name,
            role,
            credits: 0,
            bio: optional_text(input.bio.as_deref()),
            created_at: now,
            updated_at: now,
        };
        self.store.users.insert_user(&user).await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Update profile fields. Credits are not editable here.
    pub async fn update(&self, id: Uuid, input: UserInput) -> ServiceResult<User> {
        let mut user = self.get(id).await?;

        if input.email.is_some() {
            let email = normalize_email(input.email.as_deref())?;
            if email != user.email {
                if let Some(other) = self.store.users.find_user_by_email(&email).await?
                    && other.id != id
                {
                    return Err(ServiceError::conflict(format!(
                        "a user with email '{email}' already exists"
                    )));
                }
                user.email = email;
            }
        }
        if let Some(raw) = input.firebase_uid.as_deref() {
            let uid = required_text("firebaseUid", Some(raw))?;
            if uid != user.firebase_uid {
                if let Some(other) = self.store.users.find_user_by_firebase_uid(&uid).await?
                    && other.id != id
                {
                    return Err(ServiceError::conflict(
                        "a user with this firebase uid already exists",
                    ));
                }
                user.firebase_uid = uid;
            }
        }
        if let Some(name) = input.display_name.as_deref() {
            user.display_name = required_text("displayName", Some(name))?;
        }
        if let Some(role) = input.role.as_deref() {
            user.role = role.parse()?;
        }
        if let Some(bio) = input.bio.as_deref() {
            user.bio = optional_text(Some(bio));
        }
        user.updated_at = Utc::now();

        self.store.users.update_user(&user).await?;
        // Re-read so the returned balance is the stored one.
        let stored = self.get(id).await?;
        info!(user_id = %id, "user updated");
        Ok(stored)
    }

    /// Delete a user. Refused while the user has any lesson progress.
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?;
        let records = self
            .store
            .progress
            .count_progress(ProgressFilter {
                user_id: Some(id),
                ..Default::default()
            })
            .await?;
        if records > 0 {
            return Err(ServiceError::conflict(format!(
                "cannot delete user: {records} progress record(s) exist"
            )));
        }
        if !self.store.users.delete_user(id).await? {
            return Err(ServiceError::not_found("user"));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Raise a user to at least `role`. Never lowers an existing role.
    pub async fn promote(&self, id: Uuid, role: Role) -> ServiceResult<User> {
        let mut user = self.get(id).await?;
        if user.role >= role {
            return Ok(user);
        }
        user.role = role;
        user.updated_at = Utc::now();
        self.store.users.update_user(&user).await?;
        info!(user_id = %id, role = %role, "user promoted");
        Ok(user)
    }
}

fn normalize_email(raw: Option<&str>) -> Result<String, CoreError> {
    let email = required_text("email", raw)?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(CoreError::invalid("email", format!("'{email}' is not an email address")));
    }
    Ok(email)
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use residency_core::{Progress, ProgressStatus};

    fn input(email: &str, uid: &str) -> UserInput {
        UserInput {
            email: Some(email.into()),
            firebase_uid: Some(uid.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_normalizes_email_and_defaults() {
        let svc = UserService::new(Store::in_memory());
        let user = svc.create(input("  Ada@Example.COM ", "uid-ada")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.display_name, "ada");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.credits, 0);
    }

    #[tokio::test]
    async fn create_requires_fields() {
        let svc = UserService::new(Store::in_memory());
        assert!(matches!(
            svc.create(UserInput::default()).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create(input("not-an-email", "uid")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create(UserInput {
                firebase_uid: None,
                ..input("a@b.co", "x")
            })
            .await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicates_conflict() {
        let svc = UserService::new(Store::in_memory());
        svc.create(input("a@example.com", "uid-a")).await.unwrap();
        assert!(matches!(
            svc.create(input("A@example.com", "uid-b")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.create(input("b@example.com", "uid-a")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn delete_blocked_by_progress() {
        let store = Store::in_memory();
        let svc = UserService::new(store.clone());
        let user = svc.create(input("p@example.com", "uid-p")).await.unwrap();
        let now = Utc::now();
        store
            .progress
            .save_progress(&Progress {
                id: Uuid::new_v4(),
                user_id: user.id,
                course_id: Uuid::new_v4(),
                topic_id: Uuid::new_v4(),
                lesson_id: Uuid::new_v4(),
                status: ProgressStatus::InProgress,
                time_spent_seconds: 0,
                quiz_score: None,
                quiz_passed: false,
                quiz_attempts: 0,
                answers: Vec::new(),
                last_attempt_at: None,
                started_at: Some(now),
                completed_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        assert!(matches!(
            svc.delete(user.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(svc.get(user.id).await.is_ok());
    }

    #[tokio::test]
    async fn promote_never_demotes() {
        let svc = UserService::new(Store::in_memory());
        let admin = svc
            .create(UserInput {
                role: Some("admin".into()),
                ..input("boss@example.com", "uid-boss")
            })
            .await
            .unwrap();
        let after = svc.promote(admin.id, Role::Mentor).await.unwrap();
        assert_eq!(after.role, Role::Admin);

        let learner = svc.create(input("l@example.com", "uid-l")).await.unwrap();
        let after = svc.promote(learner.id, Role::Mentor).await.unwrap();
        assert_eq!(after.role, Role::Mentor);
    }
}
