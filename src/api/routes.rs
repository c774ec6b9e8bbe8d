use crate::api::get_embedded_asset;
use crate::config::Config;
use crate::db::{FilmRow, PickedFilm};
use crate::error::TrackerError;
use crate::tracker;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

const MAX_PICK_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub shutdown: Arc<Notify>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/picks", get(picks))
        .route("/api/v1/watched", post(watched))
        .route("/api/v1/counts", get(counts))
        .route("/api/v1/films", get(films))
        .route("/api/v1/schedules", get(schedules))
        .route("/api/v1/shutdown", post(shutdown))
        .fallback(get(static_assets))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ScheduleQuery {
    schedule: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PicksQuery {
    schedule: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct WatchedRequest {
    label: Option<String>,
    title: Option<String>,
    schedule: Option<String>,
}

#[derive(Debug, Serialize)]
struct PicksPayload {
    schedule: String,
    films: Vec<PickedFilm>,
}

#[derive(Debug, Serialize)]
struct WatchedPayload {
    status: &'static str,
    schedule: String,
    title: String,
    updated: usize,
}

#[derive(Debug, Serialize)]
struct CountsPayload {
    schedule: String,
    total: i64,
    unwatched: i64,
}

#[derive(Debug, Serialize)]
struct FilmsPayload {
    schedule: String,
    count: usize,
    films: Vec<FilmRow>,
}

#[derive(Debug, Serialize)]
struct SchedulesPayload {
    active: String,
    schedules: Vec<String>,
}

impl ApiState {
    fn schedule(&self, requested: Option<String>) -> String {
        requested
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.config.active_schedule.clone())
    }
}

async fn picks(
    State(state): State<ApiState>,
    Query(query): Query<PicksQuery>,
) -> ApiResult<Json<PicksPayload>> {
    let schedule = state.schedule(query.schedule);
    let limit = query
        .limit
        .unwrap_or(state.config.pick_limit)
        .min(MAX_PICK_LIMIT);

    let films = tracker::pick(&state.config.db_path, &schedule, limit)?;
    Ok(Json(PicksPayload { schedule, films }))
}

async fn watched(
    State(state): State<ApiState>,
    Json(request): Json<WatchedRequest>,
) -> ApiResult<Json<WatchedPayload>> {
    let schedule = state.schedule(request.schedule);
    let title = match (request.title, request.label) {
        (Some(title), _) => title.trim().to_string(),
        (None, Some(label)) => title_from_label(&label).to_string(),
        (None, None) => String::new(),
    };

    let updated = tracker::mark_watched(&state.config.db_path, &schedule, &title)?;

    Ok(Json(WatchedPayload {
        status: "success",
        schedule,
        title,
        updated,
    }))
}

async fn counts(
    State(state): State<ApiState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<CountsPayload>> {
    let schedule = state.schedule(query.schedule);
    let counts = tracker::counts(&state.config.db_path, &schedule)?;

    Ok(Json(CountsPayload {
        schedule,
        total: counts.total,
        unwatched: counts.unwatched,
    }))
}

async fn films(
    State(state): State<ApiState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<FilmsPayload>> {
    let schedule = state.schedule(query.schedule);
    let films = tracker::films(&state.config.db_path, &schedule)?;

    Ok(Json(FilmsPayload {
        schedule,
        count: films.len(),
        films,
    }))
}

async fn schedules(State(state): State<ApiState>) -> ApiResult<Json<SchedulesPayload>> {
    let schedules = tracker::schedule_names(&state.config.db_path)?;

    Ok(Json(SchedulesPayload {
        active: state.config.active_schedule.clone(),
        schedules,
    }))
}

async fn shutdown(State(state): State<ApiState>) -> impl IntoResponse {
    info!("shutdown requested over HTTP");
    state.shutdown.notify_one();
    "Server shutting down..."
}

async fn static_assets(uri: Uri) -> ApiResult<Response> {
    match get_embedded_asset(uri.path()) {
        Some((bytes, mime)) => {
            let mut response = Response::new(bytes.into_response().into_body());
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_str(&mime)?);
            Ok(response)
        }
        None => Err(ApiError::NotFound("Static asset not found".to_string())),
    }
}

/// Page labels read `"<title>: <appearances>"`; the title is everything
/// before the last colon.
pub fn title_from_label(label: &str) -> &str {
    label
        .rsplit_once(':')
        .map_or(label, |(title, _)| title)
        .trim()
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<TrackerError> for ApiError {
    fn from(value: TrackerError) -> Self {
        match value {
            TrackerError::InvalidArgument(_) => Self::BadRequest(value.to_string()),
            TrackerError::NotFound { .. } => Self::NotFound(value.to_string()),
            TrackerError::Storage(_) | TrackerError::Io(_) | TrackerError::Csv(_) => {
                Self::Internal(value.into())
            }
        }
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiState, router, title_from_label};
    use crate::config::Config;
    use crate::schedule::Schedule;
    use crate::tracker::sync::sync_schedules;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            db_path: dir.path().join("schedule.db"),
            active_schedule: "Test".to_string(),
            ..Config::default()
        };
        sync_schedules(&config.db_path, &[Schedule::new("Test", ["A", "B", "C"])])
            .expect("sync");

        let state = ApiState {
            config: Arc::new(config),
            shutdown: Arc::new(Notify::new()),
        };
        (dir, router(state))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn label_parsing_keeps_colons_inside_titles() {
        assert_eq!(title_from_label("Three Colours: Blue: 2"), "Three Colours: Blue");
        assert_eq!(title_from_label("  Ikiru : 0 "), "Ikiru");
        assert_eq!(title_from_label("Yi Yi"), "Yi Yi");
    }

    #[tokio::test]
    async fn pick_then_mark_watched_round() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/picks?limit=3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["films"].as_array().map(Vec::len), Some(3));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/watched",
            Some(json!({ "label": "B: 1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "B");
        assert_eq!(body["updated"], 1);

        let (status, body) = send(&app, Method::GET, "/api/v1/counts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["unwatched"], 2);
    }

    #[tokio::test]
    async fn empty_title_is_bad_request() {
        let (_dir, app) = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/watched",
            Some(json!({ "label": ": 3" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_schedule_is_not_found() {
        let (_dir, app) = test_app();

        let (status, _) = send(&app, Method::GET, "/api/v1/counts?schedule=Missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/api/v1/picks?schedule=Missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_schedules_and_films() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/schedules", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schedules"], json!(["Test"]));

        let (status, body) = send(&app, Method::GET, "/api/v1/films", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }
}
