//! VoiceGate HTTP Server
//!
//! Main entry point for the HTTP API server.

use std::{future::IntoFuture, sync::Arc, time::Duration};

use anyhow::Context;
use application::{
    ArtifactStore, AudioConversionPort, HealthService, OrchestratorDeps, ReasoningPort,
    RequestOrchestrator, ScratchRoot, SynthesisPort, VoiceResolver,
};
use infrastructure::{
    AppConfig, AudioConversionAdapter, FileArtifactStore, ReasoningAdapter, SynthesisAdapter,
    TelemetryConfig, init_telemetry, load_voice_catalog,
};
use presentation_http::{
    routes, set_expose_internal_errors, shutdown::run_until_drained, state::AppState,
    tasks::spawn_cache_eviction_task,
};
use tokio::{net::TcpListener, signal, sync::Notify};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let telemetry = TelemetryConfig::with_format_name(&config.server.log_format)?;
    init_telemetry(&telemetry)?;

    info!("🎙️ VoiceGate v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        reasoning = %config.inference.base_url,
        worker = %config.speech.base_url,
        "Configuration loaded"
    );

    set_expose_internal_errors(config.server.expose_internal_errors);
    if config.server.expose_internal_errors {
        warn!("Internal error details are exposed in responses");
    }

    let reasoning: Arc<dyn ReasoningPort> = Arc::new(
        ReasoningAdapter::new(config.inference.clone())
            .context("Failed to initialize reasoning client")?,
    );
    let synthesis: Arc<dyn SynthesisPort> = Arc::new(
        SynthesisAdapter::new(config.speech.clone())
            .context("Failed to initialize synthesis worker client")?,
    );

    let converter = AudioConversionAdapter::new(config.speech_input.ffmpeg_path.as_deref());
    if !converter.is_available().await {
        warn!("FFmpeg not found; only WAV speech input will be accepted");
    }
    let converter: Arc<dyn AudioConversionPort> = Arc::new(converter);

    let store: Arc<dyn ArtifactStore> = Arc::new(
        FileArtifactStore::new(&config.cache.artifact_dir)
            .context("Failed to open artifact directory")?,
    );

    tokio::fs::create_dir_all(&config.scratch.root)
        .await
        .with_context(|| format!("Failed to create scratch root {}", config.scratch.root.display()))?;
    let scratch_root = ScratchRoot::new(&config.scratch.root);

    let catalog = Arc::new(load_voice_catalog(&config.voices).context("Failed to load voices")?);
    info!(presets = catalog.len(), default_voice = catalog.default_voice(), "Voice catalog loaded");

    let voices = VoiceResolver::new(Arc::clone(&catalog), &config.scratch.root)
        .with_fallback_to_default(config.voices.fallback_to_default);

    let orchestrator = RequestOrchestrator::new(OrchestratorDeps {
        reasoning: Arc::clone(&reasoning),
        synthesis: Arc::clone(&synthesis),
        store,
        converter,
        voices,
        scratch_root,
        max_rounds: config.router.max_rounds,
    });

    let eviction = spawn_cache_eviction_task(
        Arc::clone(&synthesis),
        Duration::from_secs(config.speech.eviction_interval_secs),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        health: Arc::new(HealthService::new(reasoning, synthesis)),
        voices: catalog,
    };

    let app = routes::create_router(state, &config.server)
        .layer(cors_layer(&config.server.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🚀 Server listening on http://{}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let shutdown_started = Arc::new(Notify::new());
    let notifier = Arc::clone(&shutdown_started);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_timeout).await;
            notifier.notify_one();
        })
        .into_future();
    run_until_drained(server, shutdown_started, shutdown_timeout).await?;

    if let Some(handle) = eviction {
        handle.abort();
    }

    info!("👋 Server shutdown complete");

    Ok(())
}

/// Permissive CORS unless origins are configured
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    use axum::http::{HeaderValue, Method};
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("📥 Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("📥 Received SIGTERM, initiating graceful shutdown...");
        }
    }

    info!("⏳ Waiting up to {:?} for in-flight requests to finish...", timeout);
}
