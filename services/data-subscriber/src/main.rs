use anyhow::{Context, Result};
use data_subscriber::{
    run_consumer, Config, MqttSubscriber, ObjectKeyBuilder, S3Uploader, SynopProcessor,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        country_id = %config.service.country_id,
        centre_id = %config.service.centre_id,
        "Starting data subscriber"
    );

    if let Some(port) = config.service.metrics_port {
        init_metrics(port)?;
    }

    // Object store
    let uploader = S3Uploader::new(&config.s3).await;
    uploader
        .check_bucket(&config.s3.bucket)
        .await
        .context("Failed to reach object store")?;

    // Message bus
    let mut subscriber = MqttSubscriber::new(&config.mqtt, &config.mqtt_client_id())
        .context("Failed to configure MQTT subscriber")?;
    subscriber
        .connect()
        .await
        .context("Failed to connect to MQTT broker")?;

    let processor = Arc::new(SynopProcessor::new(
        ObjectKeyBuilder::from_config(&config.service, &config.s3),
        Arc::new(uploader),
    ));

    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(config.mqtt.channel_capacity);

    let subscriber_handle = subscriber.spawn(tx, shutdown.clone());
    let consumer_handle = tokio::spawn(run_consumer(processor, rx, shutdown.clone()));

    info!("Data subscriber started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down data subscriber");
    shutdown.cancel();

    let _ = subscriber_handle.await;
    let _ = consumer_handle.await;

    info!("Data subscriber stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
