//! Domain services. Each service owns a [`Store`] handle and turns client
//! input into validated repository calls.

pub mod catalog;
pub mod credits;
pub mod dashboard;
pub mod mentors;
pub mod progress;
pub mod users;

pub use catalog::{CatalogService, CourseInput, CourseOutline, LessonInput, TopicInput, TopicOutline};
pub use credits::{CreditAdjustment, CreditService, CreditUpdate};
pub use dashboard::{AdminDashboard, CourseProgress, DashboardService, LearnerDashboard};
pub use mentors::{MentorApplicationInput, MentorReview, MentorService};
pub use progress::{ProgressOutcome, ProgressService};
pub use users::{UserInput, UserService};

use residency_core::{CoreError, parse_id};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::store::{SearchText, Store};

/// Every service, wired to one store.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub users: UserService,
    pub credits: CreditService,
    pub mentors: MentorService,
    pub progress: ProgressService,
    pub dashboard: DashboardService,
}

impl Services {
    pub fn new(store: Store) -> Self {
        let credits = CreditService::new(store.clone());
        Self {
            catalog: CatalogService::new(store.clone()),
            users: UserService::new(store.clone()),
            mentors: MentorService::new(store.clone()),
            progress: ProgressService::new(store.clone(), credits.clone()),
            dashboard: DashboardService::new(store),
            credits,
        }
    }
}

/// Parse optional search text from a query string.
pub fn search(raw: Option<&str>) -> ServiceResult<Option<SearchText>> {
    Ok(SearchText::new(raw.unwrap_or_default())?)
}

/// A trimmed, non-empty string or `MissingField`.
pub(crate) fn required_text(field: &str, value: Option<&str>) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::MissingField(field.to_string())),
    }
}

/// Trimmed text; blank collapses to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// An id carried in a loosely typed JSON body.
pub(crate) fn id_from_json(field: &str, value: Option<&Value>) -> Result<Uuid, CoreError> {
    match value {
        None | Some(Value::Null) => Err(CoreError::MissingField(field.to_string())),
        Some(Value::String(s)) => parse_id(field, s),
        Some(other) => Err(CoreError::InvalidId {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("title", Some("  Pitch  ")).unwrap(), "Pitch");
        assert!(required_text("title", Some("   ")).is_err());
        assert!(required_text("title", None).is_err());
    }

    #[test]
    fn id_from_json_shapes() {
        let id = Uuid::new_v4();
        assert_eq!(
            id_from_json("lessonId", Some(&json!(id.to_string()))).unwrap(),
            id
        );
        assert!(matches!(
            id_from_json("lessonId", Some(&Value::Null)),
            Err(CoreError::MissingField(_))
        ));
        assert!(matches!(
            id_from_json("lessonId", Some(&json!(12))),
            Err(CoreError::InvalidId { .. })
        ));
        assert!(matches!(
            id_from_json("lessonId", Some(&json!(""))),
            Err(CoreError::MissingField(_))
        ));
    }
}
