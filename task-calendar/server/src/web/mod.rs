use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::store::Store;
use crate::task::api::TaskState;

pub mod api;

/// JSON response for the liveness check.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = TcpListener::bind(&server_address).await?;
    tracing::info!("Web server listening on http://{}", server_address);
    run_web_server(listener, config).await
}

/// Serves on an already bound listener while the store is prepared in the background.
///
/// Health checks are answered right away. Task routes answer 503 until the store is
/// ready. A store that cannot be prepared stops the server and is returned as the error.
pub async fn run_web_server(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let task_state = Arc::new(TaskState::pending());
    let app = create_app(task_state.clone(), &config.cors_origins);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    tokio::select! {
        prepared = prepare_store(&config) => match prepared {
            Ok(store) => {
                task_state.set_ready(store.into_connection());
                tracing::info!("Server running on port {}", config.port);
            }
            Err(err) => {
                tracing::error!("Failed to start server: {}", err);
                server.abort();
                return Err(err.into());
            }
        },
        // Shutdown requested before the store was ready.
        finished = &mut server => {
            finished??;
            return Ok(());
        }
    }

    server.await??;
    Ok(())
}

async fn prepare_store(config: &Config) -> Result<Store, crate::store::StoreError> {
    let store = Store::connect(&config.store_config()).await?;
    store.wait_until_ready(config.db_connect_attempts).await?;
    store.ensure_schema().await?;
    Ok(store)
}

/// Assembles the full application router: JSON API, health check, API docs,
/// plus CORS and request tracing.
pub fn create_app(task_state: Arc<TaskState>, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(api::create_api_router(task_state))
        .route("/health", axum::routing::get(health_check_handler))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Reports liveness; does not touch the store.
#[tracing::instrument]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Backend is running".to_string(),
    })
}
