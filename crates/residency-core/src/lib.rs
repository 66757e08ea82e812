//! # residency-core
//!
//! Shared domain types for the Residency learning platform.
//!
//! This crate provides:
//! - Entity types (users, courses, topics, lessons, progress, credit ledger,
//!   mentor applications)
//! - Slug derivation for titles
//! - Lesson progress reconciliation (pure, storage-agnostic)
//! - Pagination primitives shared by every listing
//! - Configuration loading (`residency.yaml` + environment overrides)

pub mod config;
pub mod error;
pub mod model;
pub mod pagination;
pub mod progress;
pub mod slug;

pub use config::{
    AuthConfig, AuthMode, ConfigError, DatabaseConfig, DebugConfig, ResidencyConfig, ServerConfig,
    SessionConfig, StaticIdentity,
};
pub use error::CoreError;
pub use model::{
    Course, CourseStatus, CreditKind, CreditTransaction, Lesson, MentorApplication,
    MentorApplicationStatus, Progress, ProgressStatus, QuizAnswer, QuizQuestion, Role, Topic,
    User,
};
pub use pagination::{Page, PageRequest, Paginated};
pub use progress::{
    ProgressKey, ProgressSubmission, RawProgressSubmission, newly_completed, reconcile,
    resolve_status, sanitize_submission,
};
pub use slug::slugify;

use uuid::Uuid;

/// Parse an identifier supplied by a client.
///
/// `field` names the offending input in the error message.
pub fn parse_id(field: &str, raw: &str) -> Result<Uuid, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::MissingField(field.to_string()));
    }
    Uuid::parse_str(trimmed).map_err(|_| CoreError::InvalidId {
        field: field.to_string(),
        value: trimmed.to_string(),
    })
}
