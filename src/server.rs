//! HTTP server.
//!
//! Exposes the question pipeline and catalog browsing as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Database and generator reachability, catalog size |
//! | `POST` | `/ask` | Answer a question; body `{"question": "..."}` |
//! | `GET`  | `/phones` | Paginated catalog (`limit` 1..=100, `offset` >= 0) |
//! | `GET`  | `/phones/{name}` | One phone, exact or fuzzy name |
//! | `POST` | `/refresh` | Reload the catalog index from the database |
//!
//! `POST /ask` always returns the pipeline envelope. Its HTTP status follows
//! the failure: `404` for `NO_MATCH`, `400` for `MULTIPLE_MATCHES` and
//! `INCOMPLETE_DATA`, `500` for `PROCESSING_ERROR`, `200` otherwise
//! (including generation failures, which carry `fallback_data`).
//!
//! Other errors use the body
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! `POST /refresh` requires the `x-admin-key` header when
//! `[server].admin_key` is configured. CORS permits all origins.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use phone_advisor_core::catalog::CatalogIndex;
use phone_advisor_core::models::Phone;
use phone_advisor_core::store::PhoneStore;

use crate::config::Config;
use crate::db;
use crate::orchestrator::{Pipeline, PipelineEnvelope};
use crate::phones::{find_phone, list_page, MAX_PAGE_SIZE};
use crate::sqlite_store::SqliteStore;

const DEFAULT_PAGE_SIZE: i64 = 20;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PhoneStore>,
    pub catalog: Arc<CatalogIndex>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Load the catalog index from the store and wire the pipeline.
    pub async fn build(config: Config, store: Arc<dyn PhoneStore>) -> anyhow::Result<Self> {
        let catalog = Arc::new(CatalogIndex::default());
        let count = catalog.refresh(store.as_ref()).await?;
        tracing::info!(phones = count, "catalog index loaded");
        let pipeline = Pipeline::from_config(&config, store.clone(), catalog.clone())?;
        Ok(Self {
            config: Arc::new(config),
            store,
            catalog,
            pipeline: Arc::new(pipeline),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ask", post(handle_ask))
        .route("/phones", get(handle_list_phones))
        .route("/phones/{name}", get(handle_get_phone))
        .route("/refresh", post(handle_refresh))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`. Runs until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    let store: Arc<dyn PhoneStore> = Arc::new(SqliteStore::new(pool));
    let state = AppState::build(config.clone(), store).await?;
    let model = state.pipeline.model_name().to_string();

    let app = router(state);

    println!("Phone Advisor listening on http://{} (model: {})", bind_addr, model);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorInfo {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
    }
}

/// HTTP status for an `/ask` envelope.
pub fn envelope_status(envelope: &PipelineEnvelope) -> StatusCode {
    match envelope.error_type() {
        Some("NO_MATCH") => StatusCode::NOT_FOUND,
        Some("MULTIPLE_MATCHES") | Some("INCOMPLETE_DATA") => StatusCode::BAD_REQUEST,
        Some("PROCESSING_ERROR") => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// `healthy`, or `unhealthy` when the database cannot be queried.
    status: &'static str,
    version: String,
    /// `connected` or `error`.
    database: &'static str,
    /// `connected`, `disconnected`, or `disabled`.
    generator: &'static str,
    model: String,
    phones_in_db: u64,
    phones_indexed: usize,
    timestamp: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (database, phones_in_db) = match state.store.count_phones().await {
        Ok(count) => ("connected", count),
        Err(e) => {
            tracing::error!(error = %e, "health check: database unavailable");
            ("error", 0)
        }
    };

    let generator = if !state.config.generation.is_enabled() {
        "disabled"
    } else {
        match state.pipeline.generator_health().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "health check: generator unreachable");
                "disconnected"
            }
        }
    };

    Json(HealthResponse {
        status: if database == "connected" { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        generator,
        model: state.pipeline.model_name().to_string(),
        phones_in_db,
        phones_indexed: state.catalog.snapshot().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ============ POST /ask ============

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Response, AppError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let envelope = state.pipeline.answer(question).await;
    Ok((envelope_status(&envelope), Json(envelope)).into_response())
}

// ============ GET /phones ============

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn handle_list_phones(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Response, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);
    if !(1..=i64::from(MAX_PAGE_SIZE)).contains(&limit) {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    let offset = u32::try_from(offset).map_err(|_| bad_request("offset must be >= 0"))?;

    let page = list_page(state.store.as_ref(), limit as u32, offset)
        .await
        .map_err(internal)?;
    Ok(Json(page).into_response())
}

// ============ GET /phones/{name} ============

async fn handle_get_phone(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Phone>, AppError> {
    let catalog = state.catalog.snapshot();
    find_phone(
        state.store.as_ref(),
        &catalog,
        &name,
        state.config.retrieval.fuzzy_threshold,
    )
    .await
    .map_err(internal)?
    .map(Json)
    .ok_or_else(|| not_found(format!("phone not found: {}", name)))
}

// ============ POST /refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    phones: usize,
}

async fn handle_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AppError> {
    if let Some(expected) = &state.config.server.admin_key {
        let given = headers.get("x-admin-key").and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            return Err(unauthorized("missing or invalid x-admin-key"));
        }
    }

    let phones = state
        .catalog
        .refresh(state.store.as_ref())
        .await
        .map_err(internal)?;
    tracing::info!(phones, "catalog index refreshed");
    Ok(Json(RefreshResponse { phones }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, GenerationConfig, RetrievalConfig, ServerConfig};
    use phone_advisor_core::store::memory::InMemoryStore;

    fn config(admin_key: Option<&str>) -> Config {
        Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig {
                admin_key: admin_key.map(String::from),
                ..ServerConfig::default()
            },
        }
    }

    fn s23() -> Phone {
        Phone {
            display_size_inches: Some(6.1),
            battery_mah: Some(3900),
            main_camera_mp: Some(50.0),
            price_usd: Some(799.0),
            ..Phone::named("Galaxy S23")
        }
    }

    async fn state(admin_key: Option<&str>) -> AppState {
        let store: Arc<dyn PhoneStore> = Arc::new(InMemoryStore::with_phones(vec![s23()]));
        AppState::build(config(admin_key), store).await.unwrap()
    }

    fn ask(question: &str) -> Json<AskRequest> {
        Json(AskRequest {
            question: question.to_string(),
        })
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let result = handle_ask(State(state(None).await), ask("   ")).await;
        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ask_no_match_is_404() {
        let response = handle_ask(State(state(None).await), ask("specs of Nonexistent Phone 99"))
            .await
            .ok()
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ask_generation_failure_is_200() {
        // provider is disabled, so generation fails and the fallback is served
        let response = handle_ask(State(state(None).await), ask("specs of Galaxy S23"))
            .await
            .ok()
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_phones_validates_params() {
        let st = state(None).await;
        let bad_limit = handle_list_phones(
            State(st.clone()),
            Query(PageParams {
                limit: Some(0),
                offset: None,
            }),
        )
        .await;
        assert_eq!(
            bad_limit.err().unwrap().into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let bad_offset = handle_list_phones(
            State(st.clone()),
            Query(PageParams {
                limit: Some(10),
                offset: Some(-1),
            }),
        )
        .await;
        assert_eq!(
            bad_offset.err().unwrap().into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let ok = handle_list_phones(State(st), Query(PageParams::default())).await;
        assert_eq!(ok.ok().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_phone_fuzzy_and_missing() {
        let st = state(None).await;
        let Json(phone) = handle_get_phone(State(st.clone()), Path("galaxy s23".into()))
            .await
            .ok()
            .unwrap();
        assert_eq!(phone.model_name, "Galaxy S23");

        let missing = handle_get_phone(State(st), Path("Pixel 8".into())).await;
        assert_eq!(
            missing.err().unwrap().into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_refresh_requires_admin_key() {
        let st = state(Some("secret")).await;
        let denied = handle_refresh(State(st.clone()), HeaderMap::new()).await;
        assert_eq!(
            denied.err().unwrap().into_response().status(),
            StatusCode::UNAUTHORIZED
        );

        st.store.upsert_phone(&Phone::named("Galaxy A54")).await.unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", "secret".parse().unwrap());
        let Json(refreshed) = handle_refresh(State(st.clone()), headers).await.ok().unwrap();
        assert_eq!(refreshed.phones, 2);
        assert_eq!(st.catalog.snapshot().len(), 2);
    }

    /// Serves reads but cannot count rows.
    struct CountFailingStore(InMemoryStore);

    #[async_trait::async_trait]
    impl PhoneStore for CountFailingStore {
        async fn upsert_phone(&self, phone: &Phone) -> anyhow::Result<()> {
            self.0.upsert_phone(phone).await
        }
        async fn list_model_names(&self) -> anyhow::Result<Vec<String>> {
            self.0.list_model_names().await
        }
        async fn get_phone(&self, model_name: &str) -> anyhow::Result<Option<Phone>> {
            self.0.get_phone(model_name).await
        }
        async fn list_phones(&self, limit: u32, offset: u32) -> anyhow::Result<Vec<Phone>> {
            self.0.list_phones(limit, offset).await
        }
        async fn count_phones(&self) -> anyhow::Result<u64> {
            anyhow::bail!("database is locked")
        }
        async fn fetch(
            &self,
            request: &phone_advisor_core::query::RetrievalRequest,
        ) -> anyhow::Result<Vec<Phone>> {
            self.0.fetch(request).await
        }
    }

    #[tokio::test]
    async fn test_health_reports_database_and_catalog() {
        let Json(health) = handle_health(State(state(None).await)).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.database, "connected");
        assert_eq!(health.generator, "disabled");
        assert_eq!(health.phones_in_db, 1);
        assert_eq!(health.phones_indexed, 1);
        assert_eq!(health.model, "disabled");
        assert!(chrono::DateTime::parse_from_rfc3339(&health.timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_health_unhealthy_when_database_fails() {
        let store: Arc<dyn PhoneStore> =
            Arc::new(CountFailingStore(InMemoryStore::with_phones(vec![s23()])));
        let st = AppState::build(config(None), store).await.unwrap();

        let Json(health) = handle_health(State(st)).await;
        assert_eq!(health.status, "unhealthy");
        assert_eq!(health.database, "error");
        assert_eq!(health.phones_in_db, 0);
        assert_eq!(health.phones_indexed, 1);
    }
}
