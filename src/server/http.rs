use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::entity::{EntitySource, PropertyRanking, WikibaseClient};
use crate::error::{Result, SimilarError};
use crate::service::{find_similar, SimilarityRequest};
use crate::sparql::{QueryRunner, SparqlQueryRunner};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    entities: Arc<dyn EntitySource>,
    ranking: Arc<dyn PropertyRanking>,
    runner: Arc<dyn QueryRunner>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(
        entities: Arc<dyn EntitySource>,
        ranking: Arc<dyn PropertyRanking>,
        runner: Arc<dyn QueryRunner>,
        config: Config,
    ) -> Self {
        Self {
            entities,
            ranking,
            runner,
            config: Arc::new(config),
        }
    }

    /// State backed by the configured Wikibase and SPARQL endpoints.
    pub fn from_config(config: Config) -> Result<Self> {
        let wikibase = Arc::new(WikibaseClient::new(&config.endpoints)?);
        let runner = Arc::new(SparqlQueryRunner::new(&config.endpoints)?);
        Ok(Self::new(wikibase.clone(), wikibase, runner, config))
    }
}

/// Query string of `GET /similar`
#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    #[serde(rename = "entityId")]
    pub entity_id: Option<String>,
    pub limit: Option<String>,
}

/// Build the axum router
pub fn create_router(state: AppState) -> Router {
    let allowed_origins = &state.config.http_server.allowed_origins;

    // Empty list: local use, allow any origin
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
    };

    Router::new()
        .route("/similar", get(handle_similar))
        .route("/health", get(handle_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Run the HTTP server until it fails
pub async fn run(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        SimilarError::Config(format!(
            "Failed to bind to {}: {}. Set http_server.port in config.toml to use another port.",
            addr, e
        ))
    })?;

    log::info!("Similar entity finder listening on http://{}/similar", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_similar(
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Response {
    let Some(entity_id) = params.entity_id.filter(|id| !id.trim().is_empty()) else {
        return error_response(SimilarError::InvalidInput("entityId is required".to_string()));
    };

    let search = &state.config.search;
    // Unparsable limits behave like 0 and clamp to 1
    let limit = params
        .limit
        .map(|raw| raw.trim().parse::<i64>().unwrap_or(0))
        .unwrap_or(search.default_limit as i64);

    let request = match SimilarityRequest::new(&entity_id, limit, search.max_limit) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    match find_similar(
        &request,
        state.entities.as_ref(),
        state.ranking.as_ref(),
        state.runner.as_ref(),
        search,
    )
    .await
    {
        Ok(report) => (StatusCode::OK, Json(report.entities)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "similar-entities",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

fn status_for(error: &SimilarError) -> StatusCode {
    match error {
        SimilarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SimilarError::NoConditions(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SimilarError::EntityData(_)
        | SimilarError::QueryExecution(_)
        | SimilarError::Http(_) => StatusCode::BAD_GATEWAY,
        SimilarError::QuerySize(_) | SimilarError::Config(_) | SimilarError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: SimilarError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        log::error!("Similar entity lookup failed: {}", error);
    } else {
        log::debug!("Rejected request: {}", error);
    }
    (status, Json(serde_json::json!({ "error": error.to_string() }))).into_response()
}
