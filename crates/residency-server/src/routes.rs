//! Route definitions.

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::debug::DEBUG_SECRET_HEADER;
use crate::handlers::{self, catalog, dashboard, debug, learner, mentors, session, users};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(handlers::healthz))
        // admin
        .route(
            "/api/admin/auth/session",
            post(session::create_session).delete(session::delete_session),
        )
        .route(
            "/api/admin/courses",
            get(catalog::list_courses).post(catalog::create_course),
        )
        .route(
            "/api/admin/courses/{id}",
            get(catalog::get_course)
                .put(catalog::update_course)
                .delete(catalog::delete_course),
        )
        .route(
            "/api/admin/topics",
            get(catalog::list_topics).post(catalog::create_topic),
        )
        .route(
            "/api/admin/topics/{id}",
            get(catalog::get_topic)
                .put(catalog::update_topic)
                .delete(catalog::delete_topic),
        )
        .route(
            "/api/admin/lessons",
            get(catalog::list_lessons).post(catalog::create_lesson),
        )
        .route(
            "/api/admin/lessons/{id}",
            get(catalog::get_lesson)
                .put(catalog::update_lesson)
                .delete(catalog::delete_lesson),
        )
        .route(
            "/api/admin/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/admin/users/{id}/credits",
            get(users::list_credits).post(users::update_credits),
        )
        .route(
            "/api/admin/mentor-applications",
            get(mentors::list_applications),
        )
        .route(
            "/api/admin/mentor-applications/{id}",
            get(mentors::get_application)
                .patch(mentors::review_application)
                .delete(mentors::delete_application),
        )
        .route("/api/admin/dashboard", get(dashboard::admin_dashboard))
        // learner
        .route(
            "/api/progress/lessons",
            get(learner::list_progress).post(learner::record_progress),
        )
        .route("/api/dashboard", get(dashboard::learner_dashboard))
        .route(
            "/api/mentor-applications",
            post(learner::submit_application),
        )
        .route("/api/courses", get(learner::list_courses))
        .route("/api/courses/{slug}", get(learner::course_outline))
        // operator
        .route("/api/debug/stats", get(debug::stats))
        .fallback(handlers::not_found);

    if let Some(cors) = cors_layer(&state.server_config().cors_origins) {
        router = router.layer(cors);
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; `None` when the list is empty.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([
                AUTHORIZATION,
                CONTENT_TYPE,
                HeaderName::from_static(DEBUG_SECRET_HEADER),
            ])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_skips_bad_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_none());
        assert!(cors_layer(&["https://admin.example.com".to_string()]).is_some());
    }
}
