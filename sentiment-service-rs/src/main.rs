// sentiment-service-rs/src/main.rs
// Sentiment service - HTTP entry point
// Port 8000 by default (SENTIMENT_SERVICE_ADDR / SENTIMENT_SERVICE_PORT)

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use error_handling_rs::{init_logging, Error, ErrorKind, LoggingConfig, Severity};
use sentiment_service::{
    router, AppState, AuditConfig, AuditLog, EnhancementSelector, LexiconModel, MetricsCollector,
    PredictionService, SentimentModel,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config_rs::load().context("invalid service configuration")?;

    // Held until exit so buffered log lines reach the file
    let _log_guard = init_logging(&LoggingConfig {
        level: config.logging.level.clone(),
        service_name: config.service_name.clone(),
        json_format: config.logging.json,
        log_dir: Some(config.logging.dir.clone()),
    })?;

    let prometheus = if config.prometheus_enabled {
        install_prometheus()
    } else {
        None
    };

    let audit = Arc::new(
        AuditLog::open(&AuditConfig::from(&config.logging))
            .with_context(|| format!("cannot open audit log in {}", config.logging.dir.display()))?,
    );
    audit.log_lifecycle("Starting application - Loading model...");

    let model: Arc<dyn SentimentModel> = Arc::new(LexiconModel::from_config(&config.model));
    match model.load().await {
        Ok(()) => audit.log_lifecycle(&format!("Model {} loaded successfully", model.name())),
        Err(e) => {
            // serve anyway; predictions answer 503 until a restart
            let err = Error::new(ErrorKind::Initialization, format!("Model load failed: {}", e))
                .severity(Severity::Critical)
                .context("model", model.name());
            audit.log_error("startup", &err);
            warn!("Continuing without a loaded model");
        }
    }

    let selector = Arc::new(EnhancementSelector::from_config(&config));
    let metrics = Arc::new(MetricsCollector::new());
    let service = Arc::new(PredictionService::new(
        model.clone(),
        selector,
        metrics,
        audit.clone(),
    ));

    let app = router(AppState::new(service, prometheus));

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Sentiment service listening on {}", config.bind_address);
    audit.log_lifecycle(&format!("Serving on {}", config.bind_address));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    audit.log_lifecycle("Shutting down application");
    model.unload().await;
    audit.log_lifecycle("Model unloaded");
    audit.flush();

    Ok(())
}

fn install_prometheus() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Received shutdown signal, stopping server...");
}
