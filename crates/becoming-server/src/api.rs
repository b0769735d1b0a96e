//! REST surface: the axum router, request handlers, and the HTTP server.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Path, State,
    },
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use becoming_shared::analytics::{AnalyticsReport, DayReport};
use becoming_shared::constants::API_PREFIX;
use becoming_shared::identity::{self, IdentityOption};
use becoming_store::{CompletionEvent, IdentitySelection, Reflection, User};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::auth::{Caller, Sessions};
use crate::engine::accounts::{LoginInput, ProfileUpdate, ProfileView, RegisterInput, SelectIdentity};
use crate::engine::analytics::Overview;
use crate::engine::boosts::{ReceivedBoost, SendBoost, SentBoost};
use crate::engine::habits::{CompletionOutcome, CompletionStatus, DayInput, HabitPatch, HabitView, NewHabit};
use crate::engine::reflections::{NewReflection, ReflectionSummary};
use crate::engine::Engine;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub sessions: Sessions,
    pub rate_limiter: RateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me).patch(update_me))
        .route("/identity", get(identity_catalog))
        .route("/identity/select", post(select_identity))
        .route("/identity/user", get(user_identity))
        .route("/habits", get(list_habits).post(create_habit))
        .route("/habits/analytics", get(habit_analytics))
        .route(
            "/habits/:id",
            get(get_habit).patch(update_habit).delete(delete_habit),
        )
        .route("/habits/:id/complete", post(complete_habit))
        .route("/habits/:id/uncomplete", post(uncomplete_habit))
        .route("/habits/:id/history", get(habit_history))
        .route("/habits/:id/completions/:date", get(completion_status))
        .route("/boost/send", post(send_boost))
        .route("/boost/me", get(received_boosts))
        .route("/report/weekly", get(weekly_report))
        .route("/report/overview", get(overview))
        .route("/reflection", get(list_reflections).post(add_reflection))
        .route("/reflection/summary", get(reflection_summary));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, ServerError>;

/// Parse an optional JSON body; an empty body yields the default.
fn optional_json<T>(body: &Bytes) -> Result<T, ServerError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ServerError::Validation(format!("Invalid body: {e}")))
}

// ─── Health ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Auth ───

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
}

fn authenticated(state: &AppState, user: User) -> AuthResponse {
    let session = state.sessions.issue(user.id, Utc::now());
    AuthResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(input) = payload?;
    let user = state.engine.register(input, Utc::now()).await?;
    Ok(Json(authenticated(&state, user)))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(input) = payload?;
    let user = state.engine.login(input).await?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(authenticated(&state, user)))
}

async fn me(caller: Caller, State(state): State<AppState>) -> ApiResult<ProfileView> {
    Ok(Json(state.engine.profile(caller, Utc::now()).await?))
}

async fn update_me(
    caller: Caller,
    State(state): State<AppState>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let Json(update) = payload?;
    Ok(Json(state.engine.update_profile(caller, update).await?))
}

// ─── Identity ───

async fn identity_catalog(_caller: Caller) -> Json<&'static [IdentityOption]> {
    Json(identity::catalog())
}

async fn select_identity(
    caller: Caller,
    State(state): State<AppState>,
    payload: Result<Json<SelectIdentity>, JsonRejection>,
) -> ApiResult<IdentitySelection> {
    let Json(input) = payload?;
    Ok(Json(
        state.engine.select_identity(caller, input, Utc::now()).await?,
    ))
}

async fn user_identity(caller: Caller, State(state): State<AppState>) -> ApiResult<IdentitySelection> {
    Ok(Json(state.engine.identity_selection(caller).await?))
}

// ─── Habits ───

async fn list_habits(caller: Caller, State(state): State<AppState>) -> ApiResult<Vec<HabitView>> {
    Ok(Json(state.engine.list_habits(caller, Utc::now()).await?))
}

async fn create_habit(
    caller: Caller,
    State(state): State<AppState>,
    payload: Result<Json<NewHabit>, JsonRejection>,
) -> ApiResult<HabitView> {
    let Json(input) = payload?;
    Ok(Json(state.engine.create_habit(caller, input, Utc::now()).await?))
}

async fn get_habit(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<HabitView> {
    let Path(id) = path?;
    Ok(Json(state.engine.get_habit(caller, id, Utc::now()).await?))
}

async fn update_habit(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<HabitPatch>, JsonRejection>,
) -> ApiResult<HabitView> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    Ok(Json(
        state.engine.update_habit(caller, id, patch, Utc::now()).await?,
    ))
}

async fn delete_habit(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<serde_json::Value> {
    let Path(id) = path?;
    state.engine.delete_habit(caller, id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn complete_habit(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> ApiResult<CompletionOutcome> {
    let Path(id) = path?;
    let input: DayInput = optional_json(&body)?;
    Ok(Json(state.engine.complete(caller, id, input, Utc::now()).await?))
}

async fn uncomplete_habit(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> ApiResult<CompletionOutcome> {
    let Path(id) = path?;
    let input: DayInput = optional_json(&body)?;
    Ok(Json(
        state.engine.uncomplete(caller, id, input, Utc::now()).await?,
    ))
}

async fn habit_history(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<CompletionEvent>> {
    let Path(id) = path?;
    Ok(Json(state.engine.habit_history(caller, id).await?))
}

async fn completion_status(
    caller: Caller,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, NaiveDate)>, PathRejection>,
) -> ApiResult<CompletionStatus> {
    let Path((id, date)) = path?;
    Ok(Json(state.engine.is_completed(caller, id, date).await?))
}

async fn habit_analytics(caller: Caller, State(state): State<AppState>) -> ApiResult<AnalyticsReport> {
    Ok(Json(state.engine.analytics(caller, Utc::now()).await?))
}

// ─── Boosts ───

async fn send_boost(
    caller: Caller,
    State(state): State<AppState>,
    payload: Result<Json<SendBoost>, JsonRejection>,
) -> ApiResult<SentBoost> {
    let Json(input) = payload?;
    Ok(Json(state.engine.send_boost(caller, input, Utc::now()).await?))
}

async fn received_boosts(caller: Caller, State(state): State<AppState>) -> ApiResult<Vec<ReceivedBoost>> {
    Ok(Json(state.engine.received_boosts(caller, Utc::now()).await?))
}

// ─── Reports ───

async fn weekly_report(caller: Caller, State(state): State<AppState>) -> ApiResult<Vec<DayReport>> {
    Ok(Json(state.engine.weekly_report(caller, Utc::now()).await?))
}

async fn overview(caller: Caller, State(state): State<AppState>) -> ApiResult<Overview> {
    Ok(Json(state.engine.overview(caller, Utc::now()).await?))
}

// ─── Reflections ───

async fn add_reflection(
    caller: Caller,
    State(state): State<AppState>,
    payload: Result<Json<NewReflection>, JsonRejection>,
) -> ApiResult<Reflection> {
    let Json(input) = payload?;
    Ok(Json(
        state.engine.add_reflection(caller, input, Utc::now()).await?,
    ))
}

async fn list_reflections(caller: Caller, State(state): State<AppState>) -> ApiResult<Vec<Reflection>> {
    Ok(Json(state.engine.reflections(caller).await?))
}

async fn reflection_summary(
    caller: Caller,
    State(state): State<AppState>,
) -> ApiResult<ReflectionSummary> {
    Ok(Json(state.engine.reflection_summary(caller).await?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::store::Store;
    use std::sync::Arc;
    use crate::summarizer::Summarizer;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use becoming_shared::session::SessionSigner;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _dir: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::default();
        let store = Store::open(&dir.path().join("api.db")).unwrap();
        let summarizer = Summarizer::from_config(&config).unwrap();
        let state = AppState {
            engine: Engine::new(store, Arc::new(summarizer)),
            sessions: Sessions::new(SessionSigner::generate(), config.session_ttl),
            rate_limiter: RateLimiter::new(1000.0, 1000.0),
        };
        TestApp {
            router: build_router(state),
            _dir: dir,
        }
    }

    async fn call(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = app.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register_token(app: &TestApp, email: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(serde_json::json!({
                "name": "Tester",
                "email": email,
                "password": "password123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["user"].get("passwordHash").is_none());
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/habits", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = call(&app, Method::GET, "/api/habits", Some("forged"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_habit_lifecycle() {
        let app = test_app();
        let token = register_token(&app, "life@example.com").await;

        let (status, created) = call(
            &app,
            Method::POST,
            "/api/habits",
            Some(&token),
            Some(serde_json::json!({
                "name": "Read",
                "identity": "Learner",
                "difficulty": "easy",
                "reminderTime": "07:30",
                "weeklySchedule": [true, true, true, true, true, true, true]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{created}");
        assert_eq!(created["dueToday"], true);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, done) = call(
            &app,
            Method::POST,
            &format!("/api/habits/{id}/complete"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{done}");
        assert_eq!(done["streak"], 1);

        let (_, listed) = call(&app, Method::GET, "/api/habits", Some(&token), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["completedToday"], true);

        let (status, analytics) =
            call(&app, Method::GET, "/api/habits/analytics", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{analytics}");
        assert_eq!(analytics["totalCompleted"], 1);

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/habits/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/habits/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Habit not found");
    }

    #[tokio::test]
    async fn test_wrong_schedule_length_is_rejected() {
        let app = test_app();
        let token = register_token(&app, "bad@example.com").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/habits",
            Some(&token),
            Some(serde_json::json!({
                "name": "Read",
                "identity": "Learner",
                "weeklySchedule": [true, false, true]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_malformed_habit_id_is_rejected() {
        let app = test_app();
        let token = register_token(&app, "id@example.com").await;
        let (status, body) =
            call(&app, Method::GET, "/api/habits/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_boost_without_recipient_conflicts() {
        let app = test_app();
        let token = register_token(&app, "solo@example.com").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/boost/send",
            Some(&token),
            Some(serde_json::json!({ "identityId": "learner" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "no_eligible_recipient");
        assert!(body["message"].as_str().unwrap().contains("another identity"));
    }

    #[tokio::test]
    async fn test_login_and_profile() {
        let app = test_app();
        register_token(&app, "who@example.com").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": "who@example.com", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "who@example.com");
        assert_eq!(me["currentStreak"], 0);

        let (status, catalog) = call(&app, Method::GET, "/api/identity", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!catalog.as_array().unwrap().is_empty());
    }
}
