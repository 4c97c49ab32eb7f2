//! HTTP surface: submit, list and fetch reports
//!
//! [`build_state`] is the composition root. It constructs the store,
//! attachment storage and pipeline once and hands them to the handlers
//! through [`AppState`].

pub mod error;
pub mod routes;

pub use error::ApiError;

use crate::ai::AnalysisInvoker;
use crate::attachments::AttachmentStore;
use crate::config::{ConfigError, ScoutConfig};
use crate::pipeline::{ContextCollector, PromptAssembler, ReportPipeline};
use crate::report::ReportStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared across handlers
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub attachments: Option<Arc<dyn AttachmentStore>>,
    pub pipeline: Arc<ReportPipeline>,
    pub max_upload_bytes: usize,
}

/// Wires the process-wide handles from configuration
pub async fn build_state(config: &ScoutConfig) -> Result<Arc<AppState>, ConfigError> {
    let store = config.create_report_store().await?;
    let attachments: Option<Arc<dyn AttachmentStore>> = config
        .create_attachment_store()
        .map(|s| s as Arc<dyn AttachmentStore>);

    let invoker = config.create_backend().map(|backend| {
        let invoker = AnalysisInvoker::new(backend);
        match &attachments {
            Some(store) => invoker.with_attachments(Arc::clone(store)),
            None => invoker,
        }
    });

    let missing = config.missing_runtime_settings();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "Required settings are unset; submitted reports will fail until they are configured"
        );
    }

    let pipeline = ReportPipeline::new(
        Arc::clone(&store),
        ContextCollector::with_git(),
        PromptAssembler::new(&config.prompt_template),
        invoker,
    )
    .with_missing_settings(missing);

    info!(store = store.name(), "Application state ready");
    Ok(Arc::new(AppState {
        store,
        attachments,
        pipeline: Arc::new(pipeline),
        max_upload_bytes: config.max_upload_bytes,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/reports",
            get(routes::list_reports).post(routes::submit_report),
        )
        .route("/reports/:id", get(routes::get_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C
pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
