//! Voice gateway entry point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use voice_gateway_config::{load_settings, PersonaSet, Settings};
use voice_gateway_rag::{Embedder, HttpEmbedder, Retriever};
use voice_gateway_server::{create_router, init_metrics, AppState};
use voice_gateway_tools::{create_registry, BackendClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/default.yaml > built-in defaults.
    let settings = load_settings(Some(Path::new("config/default.yaml")))?;

    init_tracing(&settings);

    tracing::info!("Starting voice gateway v{}", env!("CARGO_PKG_VERSION"));
    settings.validate()?;

    // Personas fail fast: a gateway with a broken persona must not accept
    // sessions.
    let personas = PersonaSet::from_file(Path::new(&settings.server.personas_path))?;
    tracing::info!(
        general = %personas.general.role_id,
        account = %personas.account.role_id,
        "Loaded personas"
    );

    let metrics_handle = init_metrics()?;
    tracing::info!("Initialized Prometheus metrics at /metrics");

    // Embedder is optional: without one the retriever runs keyword-only.
    let embedder: Option<Arc<dyn Embedder>> = if settings.embedding.endpoint.is_empty() {
        tracing::warn!("EMBEDDING_ENDPOINT not set, retrieval uses keyword fallback");
        None
    } else {
        Some(Arc::new(HttpEmbedder::new(settings.embedding.clone())?))
    };

    let retriever = Arc::new(Retriever::initialize(settings.retrieval.clone(), embedder).await?);
    tracing::info!(
        sections = retriever.section_count(),
        vector_store = retriever.vector_ready(),
        "Retrieval service ready"
    );

    let backend = Arc::new(BackendClient::new(&settings.backend)?);
    let tools = create_registry(retriever.clone(), backend, settings.retrieval.default_top_k);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let state = AppState::new(settings, personas, retriever, tools).with_metrics(metrics_handle);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Initialize tracing with EnvFilter and optional JSON output.
fn init_tracing(settings: &Settings) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "voice_gateway={},tower_http=info",
            settings.observability.log_level
        )
        .into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
