//! # residency-runtime
//!
//! Storage seam and domain services for the Residency platform.
//!
//! - [`store`]: repository traits and the [`Store`] handle services share
//! - [`memory`]: an in-memory backend (tests, demos, local development)
//! - [`services`]: catalog, users, credits, mentors, progress, dashboards
//!
//! Backends are swapped by building a [`Store`] from any type implementing
//! every repository trait; the PostgreSQL backend lives in
//! `residency-adapter-pg`.

pub mod error;
pub mod memory;
pub mod services;
pub mod store;

pub use error::{ServiceError, ServiceResult, StoreError};
pub use memory::InMemoryStore;
pub use services::Services;
pub use store::{
    Backend, CourseFilter, CourseRepository, CreditRepository, LessonFilter, LessonRepository,
    MentorApplicationFilter, MentorApplicationRepository, ProgressFilter, ProgressRepository,
    SearchText, Store, TopicFilter, TopicRepository, UserFilter, UserRepository,
};
