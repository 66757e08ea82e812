//! End-to-end API tests over the in-memory store with static identities.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use residency_auth::{KeyPair, SessionIssuer, StaticIdentityVerifier};
use residency_core::config::auth::DEFAULT_SESSION_SECONDS;
use residency_core::{AuthMode, ResidencyConfig, Role, StaticIdentity};
use residency_runtime::services::CourseInput;
use residency_runtime::{InMemoryStore, Store};
use residency_server::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN: &str = "admin-token";
const LEARNER: &str = "learner-token";
const STAFF: &str = "staff-token";
const DEBUG_SECRET: &str = "let-me-in";

struct Harness {
    app: Router,
    state: AppState,
    memory: InMemoryStore,
}

fn identity(token: &str, uid: &str, role: Role) -> StaticIdentity {
    StaticIdentity {
        token: token.into(),
        uid: uid.into(),
        email: format!("{uid}@example.com"),
        name: None,
        role,
    }
}

fn config() -> ResidencyConfig {
    let mut config = ResidencyConfig::default();
    config.auth.mode = AuthMode::Static;
    config.auth.static_users = vec![
        identity(ADMIN, "uid-admin", Role::Admin),
        identity(LEARNER, "uid-learner", Role::User),
        identity(STAFF, "uid-staff", Role::User),
    ];
    config.debug.seed_secret = Some(DEBUG_SECRET.into());
    config
}

fn harness_with(config: ResidencyConfig) -> Harness {
    let memory = InMemoryStore::new();
    let store = Store::from_backend(memory.clone());
    let verifier = Arc::new(StaticIdentityVerifier::new(&config.auth.static_users));
    let sessions = SessionIssuer::new(KeyPair::generate().unwrap(), DEFAULT_SESSION_SECONDS);
    let state = AppState::new(&config, store, verifier, sessions);
    Harness {
        app: create_router(state.clone()),
        state,
        memory,
    }
}

fn harness() -> Harness {
    harness_with(config())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn get(&self, uri: &str, token: &str) -> Reply {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn create(&self, uri: &str, body: Value) -> Value {
        let reply = self.post(uri, ADMIN, body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["data"].clone()
    }

    /// Course, topic and lesson ids for a lesson worth `reward` credits.
    async fn lesson(&self, reward: i64) -> (String, String, String) {
        let course = self
            .create("/api/admin/courses", json!({ "title": "Founder Foundations", "status": "published" }))
            .await;
        let topic = self
            .create("/api/admin/topics", json!({ "title": "Customer Discovery", "courseId": course["id"] }))
            .await;
        let lesson = self
            .create(
                "/api/admin/lessons",
                json!({ "title": "The Mom Test", "topicId": topic["id"], "creditReward": reward }),
            )
            .await;
        (
            id(&course),
            id(&topic),
            id(&lesson),
        )
    }

    async fn register_learner(&self) -> Value {
        self.create(
            "/api/admin/users",
            json!({ "email": "learner@example.com", "firebaseUid": "uid-learner" }),
        )
        .await
    }
}

fn id(v: &Value) -> String {
    v["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn healthz_is_open() {
    let h = harness();
    let reply = h.call(Method::GET, "/healthz", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["ok"], true);
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let h = harness();
    let reply = h.call(Method::GET, "/api/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn admin_routes_need_admin_role() {
    let h = harness();

    let reply = h.call(Method::GET, "/api/admin/courses", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["success"], false);

    let reply = h.get("/api/admin/courses", "forged").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = h.get("/api/admin/courses", LEARNER).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
}

#[tokio::test]
async fn stored_role_counts_toward_access() {
    let h = harness();
    h.create(
        "/api/admin/users",
        json!({ "email": "staff@example.com", "firebaseUid": "uid-staff", "role": "superAdmin" }),
    )
    .await;

    let reply = h.get("/api/admin/dashboard", STAFF).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
}

#[tokio::test]
async fn course_crud_round_trip() {
    let h = harness();
    let course = h
        .create("/api/admin/courses", json!({ "title": "Fundraising 101!" }))
        .await;
    assert_eq!(course["slug"], "fundraising-101");
    assert_eq!(course["status"], "draft");
    let course_id = id(&course);

    let dup = h
        .post("/api/admin/courses", ADMIN, json!({ "title": "fundraising  101" }))
        .await;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);

    let missing = h.post("/api/admin/courses", ADMIN, json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert!(missing.body["error"].as_str().unwrap().contains("title"));

    let updated = h
        .call(
            Method::PUT,
            &format!("/api/admin/courses/{course_id}"),
            Some(ADMIN),
            Some(json!({ "title": "Raising a Seed Round" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["slug"], "raising-a-seed-round");

    let fetched = h.get(&format!("/api/admin/courses/{course_id}"), ADMIN).await;
    assert_eq!(fetched.body["data"]["title"], "Raising a Seed Round");

    let deleted = h
        .call(Method::DELETE, &format!("/api/admin/courses/{course_id}"), Some(ADMIN), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"]["id"], course_id.as_str());

    let gone = h.get(&format!("/api/admin/courses/{course_id}"), ADMIN).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_bad_requests() {
    let h = harness();
    let reply = h.get("/api/admin/courses/64b7f0c2e1", ADMIN).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/courses")
        .header(AUTHORIZATION, format!("Bearer {ADMIN}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = h.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], false);

    let reply = h
        .get("/api/admin/topics?courseId=not-an-id", ADMIN)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_is_blocked_by_dependents() {
    let h = harness();
    let (course_id, topic_id, _) = h.lesson(0).await;

    let reply = h
        .call(Method::DELETE, &format!("/api/admin/courses/{course_id}"), Some(ADMIN), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h
        .call(Method::DELETE, &format!("/api/admin/topics/{topic_id}"), Some(ADMIN), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let still_there = h.get(&format!("/api/admin/topics/{topic_id}"), ADMIN).await;
    assert_eq!(still_there.status, StatusCode::OK);
}

#[tokio::test]
async fn listing_paginates_and_filters() {
    let h = harness();
    for title in ["Alpha", "Beta", "Gamma"] {
        h.create("/api/admin/courses", json!({ "title": title, "status": "published" }))
            .await;
    }
    h.create("/api/admin/courses", json!({ "title": "Hidden" })).await;

    let reply = h.get("/api/admin/courses?page=2&limit=3", ADMIN).await;
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(
        reply.body["pagination"],
        json!({ "page": 2, "limit": 3, "total": 4, "totalPages": 2 })
    );

    let reply = h.get("/api/admin/courses?status=draft", ADMIN).await;
    assert_eq!(reply.body["pagination"]["total"], 1);

    let reply = h.get("/api/admin/courses?search=ALP", ADMIN).await;
    assert_eq!(reply.body["data"][0]["title"], "Alpha");

    let reply = h.get("/api/admin/courses?status=live", ADMIN).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_revalidate_cached_listings() {
    let h = harness();
    let first = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(first.body["pagination"]["total"], 0);

    // Written behind the API's back: the cached listing stays stale.
    h.state
        .services()
        .catalog
        .create_course(CourseInput {
            title: Some("Behind the scenes".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let cached = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(cached.body["pagination"]["total"], 0);

    h.create("/api/admin/courses", json!({ "title": "Through the API" }))
        .await;
    let fresh = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(fresh.body["pagination"]["total"], 2);
}

#[tokio::test]
async fn completion_reward_refreshes_cached_user_listing() {
    let h = harness();
    h.register_learner().await;
    let (course_id, topic_id, lesson_id) = h.lesson(25).await;

    let before = h.get("/api/admin/users", ADMIN).await;
    assert_eq!(before.body["data"][0]["credits"], 0);

    let reply = h
        .post(
            "/api/progress/lessons",
            LEARNER,
            json!({
                "courseId": course_id,
                "topicId": topic_id,
                "lessonId": lesson_id,
                "status": "completed"
            }),
        )
        .await;
    assert_eq!(reply.body["data"]["creditsAwarded"], 25);

    let after = h.get("/api/admin/users", ADMIN).await;
    assert_eq!(after.body["data"][0]["credits"], 25);
}

#[tokio::test]
async fn outage_serves_sample_listings() {
    let h = harness();
    h.memory.set_offline(true);

    let reply = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["pagination"]["fallback"], true);
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 3);

    let reply = h.get("/api/admin/users", ADMIN).await;
    assert_eq!(reply.body["pagination"]["fallback"], true);

    let reply = h.get("/api/admin/mentor-applications", ADMIN).await;
    assert_eq!(reply.body["pagination"]["fallback"], true);

    // No sample data for topics: a generic 500.
    let reply = h.get("/api/admin/topics", ADMIN).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["error"], "Internal server error");

    // Sample pages are not cached.
    h.memory.set_offline(false);
    let reply = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(reply.body["pagination"]["total"], 0);
    assert!(reply.body["pagination"].get("fallback").is_none());
}

#[tokio::test]
async fn outage_without_fallback_is_500() {
    let mut config = config();
    config.server.fallback_to_mock_data = false;
    let h = harness_with(config);
    h.memory.set_offline(true);

    let reply = h.get("/api/admin/courses", ADMIN).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn session_cookie_exchange() {
    let h = harness();

    let reply = h
        .call(Method::POST, "/api/admin/auth/session", None, Some(json!({ "idToken": ADMIN })))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["role"], "admin");
    let set_cookie = reply.headers[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("admin-session="));
    assert!(set_cookie.contains("Max-Age=432000"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Secure"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let reply = h.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(COOKIE, "admin-session=tampered")
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.send(request).await.status, StatusCode::UNAUTHORIZED);

    let reply = h
        .call(Method::DELETE, "/api/admin/auth/session", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn session_requires_admin_claim() {
    let h = harness();
    let session = "/api/admin/auth/session";

    let reply = h
        .call(Method::POST, session, None, Some(json!({ "idToken": LEARNER })))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.headers.get(SET_COOKIE).is_none());

    let reply = h
        .call(Method::POST, session, None, Some(json!({ "idToken": "forged" })))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = h.call(Method::POST, session, None, Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn secure_cookie_when_configured() {
    let mut config = config();
    config.auth.session.secure = true;
    let h = harness_with(config);
    let reply = h
        .call(Method::POST, "/api/admin/auth/session", None, Some(json!({ "idToken": ADMIN })))
        .await;
    assert!(reply.headers[SET_COOKIE].to_str().unwrap().ends_with("; Secure"));
}

#[tokio::test]
async fn learner_routes_need_an_account() {
    let h = harness();
    let reply = h.get("/api/dashboard", LEARNER).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    h.register_learner().await;
    let reply = h.get("/api/dashboard", LEARNER).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["credits"], 0);
}

#[tokio::test]
async fn completing_a_lesson_is_sticky_and_pays_once() {
    let h = harness();
    h.register_learner().await;
    let (course_id, topic_id, lesson_id) = h.lesson(25).await;
    let ids = json!({ "courseId": course_id, "topicId": topic_id, "lessonId": lesson_id });

    let mut submission = ids.clone();
    submission["quizScore"] = json!(140);
    submission["quizPassed"] = json!(true);
    submission["timeSpentSeconds"] = json!(90.7);
    submission["answers"] = json!([
        { "question": "Who should you ask?", "selectedOption": 1, "isCorrect": true },
        { "question": "", "selectedOption": 0, "isCorrect": true }
    ]);
    let reply = h.post("/api/progress/lessons", LEARNER, submission).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let data = &reply.body["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["quizScore"], 100.0);
    assert_eq!(data["quizAttempts"], 1);
    assert_eq!(data["timeSpentSeconds"], 90);
    assert_eq!(data["creditsAwarded"], 25);
    let completed_at = data["completedAt"].clone();

    let mut demote = ids.clone();
    demote["status"] = json!("in-progress");
    demote["timeSpentSeconds"] = json!(-50);
    let reply = h.post("/api/progress/lessons", LEARNER, demote).await;
    let data = &reply.body["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["completedAt"], completed_at);
    assert_eq!(data["quizAttempts"], 1);
    assert_eq!(data["timeSpentSeconds"], 90);
    assert!(data.get("creditsAwarded").is_none());

    let dashboard = h.get("/api/dashboard", LEARNER).await;
    assert_eq!(dashboard.body["data"]["credits"], 25);
    assert_eq!(dashboard.body["data"]["courses"][0]["percent"], 100);

    let listed = h
        .get(&format!("/api/progress/lessons?courseId={course_id}"), LEARNER)
        .await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn progress_rejects_bad_references() {
    let h = harness();
    h.register_learner().await;
    let (course_id, topic_id, lesson_id) = h.lesson(0).await;

    let reply = h
        .post("/api/progress/lessons", LEARNER, json!({ "courseId": course_id, "topicId": topic_id }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h
        .post(
            "/api/progress/lessons",
            LEARNER,
            json!({ "courseId": course_id, "topicId": topic_id, "lessonId": "abc" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h
        .post(
            "/api/progress/lessons",
            LEARNER,
            json!({ "courseId": course_id, "topicId": topic_id, "lessonId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = h
        .post(
            "/api/progress/lessons",
            LEARNER,
            json!({ "courseId": uuid::Uuid::new_v4(), "topicId": topic_id, "lessonId": lesson_id }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn credit_adjustments_clamp_and_record_raw_delta() {
    let h = harness();
    let user = h.register_learner().await;
    let uri = format!("/api/admin/users/{}/credits", id(&user));

    let reply = h
        .post(&uri, ADMIN, json!({ "amount": 20, "note": "welcome bonus" }))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["balance"], 20);

    let reply = h
        .post(&uri, ADMIN, json!({ "amount": -50, "note": "correction" }))
        .await;
    assert_eq!(reply.body["data"]["balance"], 0);
    assert_eq!(reply.body["data"]["transaction"]["amount"], -50);

    let history = h.get(&uri, ADMIN).await;
    assert_eq!(history.body["data"]["balance"], 0);
    assert_eq!(history.body["data"]["ledgerBalance"], -30);
    assert_eq!(history.body["data"]["transactions"][0]["note"], "correction");
    assert_eq!(history.body["pagination"]["total"], 2);

    for bad in [json!({ "amount": 0, "note": "x" }), json!({ "amount": 5, "note": "  " })] {
        let reply = h.post(&uri, ADMIN, bad).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    let reply = h
        .post(
            &format!("/api/admin/users/{}/credits", uuid::Uuid::new_v4()),
            ADMIN,
            json!({ "amount": 5, "note": "ghost" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_with_progress_cannot_be_deleted() {
    let h = harness();
    let user = h.register_learner().await;
    let (course_id, topic_id, lesson_id) = h.lesson(0).await;
    h.post(
        "/api/progress/lessons",
        LEARNER,
        json!({ "courseId": course_id, "topicId": topic_id, "lessonId": lesson_id }),
    )
    .await;

    let reply = h
        .call(Method::DELETE, &format!("/api/admin/users/{}", id(&user)), Some(ADMIN), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mentor_application_review_promotes_applicant() {
    let h = harness();
    let user = h.register_learner().await;
    let application = json!({
        "fullName": "Lee Learner",
        "email": "learner@example.com",
        "motivation": "I have shipped three products",
        "expertise": ["product"]
    });

    let reply = h
        .post("/api/mentor-applications", LEARNER, application.clone())
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let app_id = id(&reply.body["data"]);

    let again = h.post("/api/mentor-applications", LEARNER, application).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let pending = h
        .get("/api/admin/mentor-applications?status=pending", ADMIN)
        .await;
    assert_eq!(pending.body["pagination"]["total"], 1);

    let reply = h
        .call(
            Method::PATCH,
            &format!("/api/admin/mentor-applications/{app_id}"),
            Some(ADMIN),
            Some(json!({ "status": "approve", "note": "great fit" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["status"], "approved");
    assert_eq!(reply.body["data"]["reviewNote"], "great fit");

    let promoted = h.get(&format!("/api/admin/users/{}", id(&user)), ADMIN).await;
    assert_eq!(promoted.body["data"]["role"], "mentor");
}

#[tokio::test]
async fn learner_catalog_shows_published_courses() {
    let h = harness();
    h.register_learner().await;
    h.lesson(0).await;
    h.create("/api/admin/courses", json!({ "title": "Unreleased" })).await;

    let reply = h.get("/api/courses", LEARNER).await;
    assert_eq!(reply.body["pagination"]["total"], 1);
    assert_eq!(reply.body["data"][0]["slug"], "founder-foundations");

    let outline = h.get("/api/courses/founder-foundations", LEARNER).await;
    assert_eq!(outline.status, StatusCode::OK);
    assert_eq!(outline.body["data"]["topics"][0]["lessons"][0]["slug"], "the-mom-test");

    let hidden = h.get("/api/courses/unreleased", LEARNER).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_dashboard_counts() {
    let h = harness();
    h.register_learner().await;
    h.lesson(0).await;

    let reply = h.get("/api/admin/dashboard", ADMIN).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["lessons"], 1);
    assert_eq!(reply.body["data"]["users"]["total"], 1);
}

#[tokio::test]
async fn debug_stats_need_the_secret() {
    let h = harness();
    let reply = h.call(Method::GET, "/api/debug/stats", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/debug/stats")
        .header("x-debug-secret", DEBUG_SECRET)
        .body(Body::empty())
        .unwrap();
    let reply = h.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["topics"], 0);

    let mut config = config();
    config.debug.seed_secret = None;
    let h = harness_with(config);
    let request = Request::builder()
        .uri("/api/debug/stats")
        .header("x-debug-secret", DEBUG_SECRET)
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.send(request).await.status, StatusCode::NOT_FOUND);
}
