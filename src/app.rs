use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::{Config, SwaggerUi};

use crate::{
    config::{ConfigError, Environment, Settings, OPENAPI_PATH},
    models::{HealthResponse, RootResponse},
};

const DESCRIPTION: &str = "CRM App for managing customers and their interactions";

#[derive(OpenApi)]
#[openapi(
    paths(root, health),
    components(schemas(RootResponse, HealthResponse, Environment)),
    tags((name = "meta", description = "Service information and liveness"))
)]
struct ApiDoc;

pub type SharedSettings = Arc<Settings>;

/// Router with both endpoints, docs pages, request tracing and CORS.
///
/// Settings are validated again here, so routes that would overlap come back
/// as a `ConfigError` instead of a panic inside axum. An allowed origin that
/// cannot be sent back as a header value is rejected too.
pub fn build_app(settings: Settings) -> Result<Router, ConfigError> {
    settings.validate()?;
    let cors = cors_layer(&settings.allow_origins)?;

    let mut docs = Router::new();
    for (i, mount) in settings.docs_mounts().into_iter().enumerate() {
        let ui = SwaggerUi::new(mount);
        // the first mount serves the document, the others point at it
        let ui = if i == 0 {
            ui.url(OPENAPI_PATH, openapi(&settings))
        } else {
            ui.config(Config::from(OPENAPI_PATH))
        };
        docs = docs.merge(ui);
    }

    let redoc_url = settings.redoc_url.clone();
    let health_path = settings.health_path();

    let mut routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(&redoc_url, get(redoc));
    // "/" as prefix collapses the prefixed health path onto /health
    if health_path != "/health" {
        routes = routes.route(&health_path, get(health));
    }

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .into_inner();

    Ok(routes
        .with_state(Arc::new(settings))
        .merge(docs)
        .layer(middleware))
}

/// Explicit origin allow-list with credentials. Methods and headers are
/// mirrored from the preflight, since wildcards are not allowed alongside
/// credentials. A `*` origin mirrors the caller's origin.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        tracing::warn!("ALLOW_ORIGINS contains '*', every origin will be accepted with credentials");
        AllowOrigin::mirror_request()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                    var: "ALLOW_ORIGINS",
                    value: origin.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    // TODO: narrow methods and headers once the first authenticated routes land
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

fn openapi(settings: &Settings) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = settings.app_name.clone();
    doc.info.version = settings.app_version.clone();
    doc.info.description = Some(DESCRIPTION.to_string());
    doc
}

/// Service information
#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses((status = 200, description = "Welcome message and entry points", body = RootResponse))
)]
pub async fn root(State(settings): State<SharedSettings>) -> impl IntoResponse {
    let resp = RootResponse {
        message: format!("Welcome to {}", settings.app_name),
        version: settings.app_version.clone(),
        environment: settings.environment(),
        docs: settings.docs_path(),
        health: settings.health_path(),
    };
    (StatusCode::OK, Json(resp))
}

/// Healthcheck
#[utoipa::path(
    get,
    path = "/health",
    tag = "meta",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(settings): State<SharedSettings>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        service: settings.app_name.clone(),
        version: settings.app_version.clone(),
        environment: settings.environment(),
        debug: settings.debug,
    };
    (StatusCode::OK, Json(resp))
}

async fn redoc(State(settings): State<SharedSettings>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title} - ReDoc</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
  </head>
  <body>
    <redoc spec-url="{spec}"></redoc>
    <script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
  </body>
</html>
"#,
        title = settings.app_name,
        spec = OPENAPI_PATH,
    ))
}
