//! In-process stand-in for the LMS backend, served on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use coursebook_core::{ApiClient, SessionStore};

pub const VALID_TOKEN: &str = "t1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

pub struct FakeState {
    pub requests: Vec<RecordedRequest>,
    pub courses: Vec<Value>,
    pub profile: Value,
    pub last_body: Option<Value>,
    pub fail_save: Option<(StatusCode, String)>,
    pub fail_fetch_course: Option<(StatusCode, String)>,
    pub fail_delete: Option<(StatusCode, String)>,
    pub next_id: i64,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            courses: vec![
                json!({
                    "id": 5, "title": "Algebra", "description": "Intro to algebra",
                    "category": 2, "category_name": "Math", "instructor": 1,
                    "instructor_name": "Ada Lovelace", "duration_hours": "12.50",
                    "is_published": true, "enrollment_count": 3
                }),
                json!({
                    "id": 6, "title": "Rust", "description": "Ownership",
                    "category": 3, "category_name": "Programming", "instructor": 1,
                    "instructor_name": "Ada Lovelace", "duration_hours": 8,
                    "is_published": false, "enrollment_count": 0
                }),
            ],
            profile: json!({"id": 1, "role": "instructor", "username": "ada"}),
            last_body: None,
            fail_save: None,
            fail_fetch_course: None,
            fail_delete: None,
            next_id: 100,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend state poisoned")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Start serving and return the base URL (including the `/api` prefix).
    pub async fn spawn(&self) -> String {
        let app = router(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend crashed");
        });
        format!("http://{}/api", addr)
    }
}

/// Start a fake backend and a client with an empty in-memory session.
pub async fn setup() -> (FakeBackend, ApiClient) {
    let backend = FakeBackend::default();
    let base_url = backend.spawn().await;
    let client = ApiClient::new(&base_url, SessionStore::in_memory()).expect("build client");
    (backend, client)
}

/// Like `setup`, but already signed in as the instructor `ada`.
pub async fn setup_signed_in() -> (FakeBackend, ApiClient) {
    let (backend, client) = setup().await;
    client.login("ada", "x").await.expect("login");
    backend.state().requests.clear();
    (backend, client)
}

fn router(backend: FakeBackend) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/profile/", get(get_profile).put(put_profile))
        .route("/api/auth/forgot-password/", post(forgot_password))
        .route("/api/auth/reset-password/", post(reset_password))
        .route("/api/lms/categories/", get(categories))
        .route("/api/lms/courses/", post(create_course))
        .route("/api/lms/courses/my_courses/", get(my_courses))
        .route(
            "/api/lms/courses/:id/",
            get(get_course).put(update_course).delete(delete_course),
        )
        .layer(middleware::from_fn_with_state(backend.clone(), record_request))
        .with_state(backend)
}

async fn record_request(State(backend): State<FakeBackend>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.state().requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization,
    });
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", VALID_TOKEN).as_str())
}

fn failure(fail: &(StatusCode, String)) -> Response {
    (fail.0, fail.1.clone()).into_response()
}

/// Like a JWT backend, a bad bearer is rejected before the view runs, even
/// on public endpoints.
fn has_bad_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key(header::AUTHORIZATION) && !is_authorized(headers)
}

async fn login(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if has_bad_credentials(&headers) {
        return unauthorized();
    }
    if body["username"] == "ada" && body["password"] == "x" {
        Json(json!({
            "access": "t1",
            "refresh": "r1",
            "user": {"id": 1, "role": "instructor"}
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "access": VALID_TOKEN,
            "refresh": "r-new",
            "user": {"id": 2, "role": "student", "username": body["username"], "email": body["email"]}
        })),
    )
        .into_response()
}

async fn get_profile(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    Json(backend.state().profile.clone()).into_response()
}

async fn put_profile(State(backend): State<FakeBackend>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    if let (Some(profile), Some(changes)) = (state.profile.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            profile.insert(key.clone(), value.clone());
        }
    }
    Json(state.profile.clone()).into_response()
}

async fn forgot_password() -> StatusCode {
    StatusCode::OK
}

async fn reset_password(Json(body): Json<Value>) -> Response {
    if body["token"] == "good" {
        Json(json!({"message": "Password has been reset."})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid or expired token."})),
        )
            .into_response()
    }
}

async fn categories() -> Json<Value> {
    Json(json!({
        "count": 2, "next": null, "previous": null,
        "results": [{"id": 2, "name": "Math"}, {"id": 3, "name": "Programming"}]
    }))
}

async fn my_courses(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    Json(Value::Array(backend.state().courses.clone())).into_response()
}

async fn get_course(State(backend): State<FakeBackend>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    if let Some(ref fail) = backend.state().fail_fetch_course {
        return failure(fail);
    }
    if id == 5 {
        return Json(json!({
            "id": 5, "title": "Algebra", "description": "Intro to algebra",
            "category": {"id": 2, "name": "Math"}, "duration_hours": "12.50",
            "is_published": false
        }))
        .into_response();
    }
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

fn saved_course(state: &mut FakeState, id: i64, body: &Value) -> Value {
    let mut course = body.clone();
    course["id"] = json!(id);
    course["category_name"] = json!("Math");
    course["instructor_name"] = json!("Ada Lovelace");
    course["enrollment_count"] = json!(0);
    state.last_body = Some(body.clone());
    course
}

async fn create_course(State(backend): State<FakeBackend>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    if let Some(ref fail) = state.fail_save {
        return failure(fail);
    }
    let id = state.next_id;
    state.next_id += 1;
    let course = saved_course(&mut state, id, &body);
    state.courses.push(course.clone());
    (StatusCode::CREATED, Json(course)).into_response()
}

async fn update_course(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    if let Some(ref fail) = state.fail_save {
        return failure(fail);
    }
    Json(saved_course(&mut state, id, &body)).into_response()
}

async fn delete_course(State(backend): State<FakeBackend>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    if let Some(ref fail) = state.fail_delete {
        return failure(fail);
    }
    state.courses.retain(|c| c["id"] != json!(id));
    StatusCode::NO_CONTENT.into_response()
}
