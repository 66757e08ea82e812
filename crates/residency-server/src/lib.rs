//! # residency-server
//!
//! JSON API for the Residency platform.
//!
//! - `/api/admin/*`: course, topic, lesson, user, credit and mentor
//!   application management, gated on the `admin` / `superAdmin` role
//! - `/api/*`: the learner catalog, lesson progress, dashboard and mentor
//!   applications, for signed-in users with an account
//! - `/api/debug/*`: operator diagnostics behind a shared secret
//!
//! Every response is `{ success, data?, error?, pagination? }`.

pub mod auth;
pub mod cache;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mock;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{ApiServer, ServerError};
pub use state::AppState;
