//! # Forced Alignment Service - Main Application Entry Point
//!
//! HTTP front end for an external forced-alignment engine. A client posts a
//! WAV recording together with its transcript and gets back word-level time
//! boundaries in an ELG annotations envelope.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML file + environment variables)
//! - **state**: Shared application state and metrics
//! - **health**: Health and metrics endpoints
//! - **middleware**: Per-endpoint metrics
//! - **handlers**: HTTP request handlers
//! - **error**: HTTP-level error type rendered as ELG failures
//! - **elg**: Request/response envelope types
//! - **audio**: WAV container inspection
//! - **alignment**: Validation, staging, engine invocation and orchestration
//!
//! ## Request flow:
//! ```text
//! POST /process/{lang} -> handlers::process -> AlignmentService
//!     validate -> stage files -> run engine -> read CTM -> cleanup
//! ```

mod alignment;
mod audio;
mod config;
mod elg;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use alignment::AlignmentService;
use anyhow::{Context, Result};
use config::AppConfig;
use state::AppState;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Sets up logging** and loads configuration
/// 2. **Creates the staging directories** the engine reads from
/// 3. **Configures the HTTP server** with middleware and routes
/// 4. **Handles graceful shutdown** on SIGINT/SIGTERM, letting in-flight
///    alignments finish
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate()?;

    info!("Starting forced-align-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let service = AlignmentService::from_config(&config);
    service
        .stager()
        .prepare()
        .context("failed to create staging directories")?;
    info!(
        audio_dir = %config.staging.audio_dir.display(),
        transcript_dir = %config.staging.transcript_dir.display(),
        output_dir = %config.staging.output_dir.display(),
        "staging directories ready"
    );
    if !config.engine.script.is_file() {
        error!(
            script = %config.engine.script.display(),
            "alignment script not found; jobs will fail until it exists"
        );
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let workers = config.server.workers;
    let app_state = AppState::new(config, service);

    info!("Starting HTTP server on {}", bind_addr);

    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::MetricsMiddleware)
            .wrap(cors)
            .wrap(TracingLogger::default())
            .route("/process/{lang_code}", web::post().to(handlers::process_alignment))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config)),
            )
            .route("/health", web::get().to(health::health_check))
            .default_service(web::to(handlers::not_found))
    })
    // actix installs its own signal handling otherwise
    .disable_signals();

    if workers > 0 {
        server = server.workers(workers);
    }

    let server = server.bind(&bind_addr)?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Without signal handlers the server simply runs until it exits on its own.
    let shutdown = async {
        if let Err(e) = shutdown_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize structured logging.
///
/// `RUST_LOG` controls what gets logged; without it the default is
/// `forced_align_service=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forced_align_service=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolve on the first SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C");
    Ok(())
}
