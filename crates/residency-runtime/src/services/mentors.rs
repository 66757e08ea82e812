//! Mentor applications: learner submission and admin review.

use chrono::Utc;
use residency_core::{
    CoreError, MentorApplication, MentorApplicationStatus, PageRequest, Paginated, Role, User,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::users::UserService;
use super::{optional_text, required_text};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{MentorApplicationFilter, Store};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorApplicationInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub motivation: Option<String>,
    pub years_experience: Option<i32>,
}

/// Admin decision on an application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorReview {
    pub status: Option<String>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct MentorService {
    store: Store,
    users: UserService,
}

impl MentorService {
    pub fn new(store: Store) -> Self {
        Self {
            users: UserService::new(store.clone()),
            store,
        }
    }

    pub async fn list(
        &self,
        filter: &MentorApplicationFilter,
        page: PageRequest,
    ) -> ServiceResult<Paginated<MentorApplication>> {
        Ok(self
            .store
            .mentor_applications
            .list_applications(filter, page)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<MentorApplication> {
        self.store
            .mentor_applications
            .get_application(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("mentor application"))
    }

    /// Submit an application on behalf of a signed-in user. A user may only
    /// have one pending application at a time.
    pub async fn submit(
        &self,
        applicant: &User,
        input: MentorApplicationInput,
    ) -> ServiceResult<MentorApplication> {
        let full_name = required_text("fullName", input.full_name.as_deref())?;
        let email = required_text("email", input.email.as_deref())?.to_lowercase();
        if !email.contains('@') {
            return Err(CoreError::invalid("email", format!("'{email}' is not an email address")).into());
        }
        let motivation = required_text("motivation", input.motivation.as_deref())?;
        let years_experience = input.years_experience.unwrap_or(0);
        if years_experience < 0 {
            return Err(CoreError::invalid("yearsExperience", "must not be negative").into());
        }

        if self
            .store
            .mentor_applications
            .find_pending_application(applicant.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(
                "you already have a pending mentor application",
            ));
        }

        let now = Utc::now();
        let application = MentorApplication {
            id: Uuid::new_v4(),
            user_id: Some(applicant.id),
            full_name,
            email,
            linkedin_url: optional_text(input.linkedin_url.as_deref()),
            expertise: input
                .expertise
                .iter()
                .filter_map(|e| optional_text(Some(e)))
                .collect(),
            motivation,
            years_experience,
            status: MentorApplicationStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            created_at: now,
            updated_at: now,
        };
        self.store
            .mentor_applications
            .insert_application(&application)
            .await?;
        info!(application_id = %application.id, user_id = %applicant.id, "mentor application submitted");
        Ok(application)
    }

    /// Approve or reject a pending application. Approval promotes the linked
    /// user to `mentor` unless they already hold a higher role.
    pub async fn review(
        &self,
        id: Uuid,
        reviewer: Option<Uuid>,
        review: MentorReview,
    ) -> ServiceResult<MentorApplication> {
        let status = match required_text("status", review.status.as_deref())?.as_str() {
            "approve" => MentorApplicationStatus::Approved,
            "reject" => MentorApplicationStatus::Rejected,
            other => other.parse()?,
        };
        if status == MentorApplicationStatus::Pending {
            return Err(ServiceError::validation(
                "status must be 'approved' or 'rejected'",
            ));
        }

        let mut application = self.get(id).await?;
        if application.status != MentorApplicationStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "application was already {}",
                application.status
            )));
        }

        let now = Utc::now();
        application.status = status;
        application.reviewed_by = reviewer;
        application.reviewed_at = Some(now);
        application.review_note = optional_text(review.note.as_deref());
        application.updated_at = now;
        self.store
            .mentor_applications
            .update_application(&application)
            .await?;

        if status == MentorApplicationStatus::Approved {
            self.promote_applicant(&application).await?;
        }

        info!(application_id = %id, status = %status, reviewer = ?reviewer, "mentor application reviewed");
        Ok(application)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.store.mentor_applications.delete_application(id).await? {
            return Err(ServiceError::not_found("mentor application"));
        }
        info!(application_id = %id, "mentor application deleted");
        Ok(())
    }

    async fn promote_applicant(&self, application: &MentorApplication) -> ServiceResult<()> {
        let Some(user_id) = application.user_id else {
            return Ok(());
        };
        match self.users.promote(user_id, Role::Mentor).await {
            Ok(_) => Ok(()),
            Err(ServiceError::NotFound(_)) => {
                warn!(application_id = %application.id, user_id = %user_id, "approved applicant no longer exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::users::UserInput;

    async fn setup() -> (MentorService, UserService, User) {
        let store = Store::in_memory();
        let users = UserService::new(store.clone());
        let applicant = users
            .create(UserInput {
                email: Some("founder@example.com".into()),
                firebase_uid: Some("uid-founder".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        (MentorService::new(store), users, applicant)
    }

    fn application() -> MentorApplicationInput {
        MentorApplicationInput {
            full_name: Some("Grace Founder".into()),
            email: Some("Founder@Example.com".into()),
            motivation: Some("Pay it forward".into()),
            expertise: vec!["fundraising".into(), "  ".into()],
            years_experience: Some(8),
            ..Default::default()
        }
    }

    fn decision(status: &str) -> MentorReview {
        MentorReview {
            status: Some(status.into()),
            note: Some("welcome aboard".into()),
        }
    }

    #[tokio::test]
    async fn one_pending_application_per_user() {
        let (svc, _, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        assert_eq!(app.email, "founder@example.com");
        assert_eq!(app.expertise, vec!["fundraising".to_string()]);

        assert!(matches!(
            svc.submit(&applicant, application()).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn approval_promotes_applicant() {
        let (svc, users, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        let reviewer = Uuid::new_v4();

        let reviewed = svc.review(app.id, Some(reviewer), decision("approved")).await.unwrap();
        assert_eq!(reviewed.status, MentorApplicationStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(reviewer));
        assert!(reviewed.reviewed_at.is_some());
        assert_eq!(reviewed.review_note.as_deref(), Some("welcome aboard"));

        assert_eq!(users.get(applicant.id).await.unwrap().role, Role::Mentor);

        // Approved, so a fresh application is allowed again.
        assert!(svc.submit(&applicant, application()).await.is_ok());
    }

    #[tokio::test]
    async fn approval_keeps_higher_role() {
        let (svc, users, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        users.promote(applicant.id, Role::Admin).await.unwrap();

        svc.review(app.id, None, decision("approve")).await.unwrap();
        assert_eq!(users.get(applicant.id).await.unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn approval_tolerates_deleted_applicant() {
        let (svc, users, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        users.delete(applicant.id).await.unwrap();

        let reviewed = svc.review(app.id, None, decision("approve")).await.unwrap();
        assert_eq!(reviewed.status, MentorApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn rejection_leaves_role_alone() {
        let (svc, users, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        svc.review(app.id, None, decision("reject"))
            .await
            .unwrap();
        assert_eq!(users.get(applicant.id).await.unwrap().role, Role::User);

        assert!(matches!(
            svc.review(app.id, None, decision("approved")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn review_status_must_be_final() {
        let (svc, _, applicant) = setup().await;
        let app = svc.submit(&applicant, application()).await.unwrap();
        for bad in ["pending", "maybe", ""] {
            assert!(matches!(
                svc.review(app.id, None, decision(bad)).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn submission_requires_motivation() {
        let (svc, _, applicant) = setup().await;
        let err = svc
            .submit(
                &applicant,
                MentorApplicationInput {
                    motivation: None,
                    ..application()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation("motivation is required".into()));
    }
}
