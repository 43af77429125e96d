//! ActiveMQ scaler binary - polls a queue and logs the scaling metric

use activemq_scaler::{ActiveMqScaler, Config, Scaler};
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Initialize logging
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    info!("Starting ActiveMQ scaler");
    info!("  Trigger file: {}", config.trigger_file.display());
    info!("  Poll interval: {}s", config.poll_interval().as_secs());
    info!("  Once: {}", config.once);

    let trigger = config.load_trigger_config()?;
    let scaler = ActiveMqScaler::new(&trigger)
        .context("Failed to create ActiveMQ scaler")?
        .with_span(info_span!(
            "trigger",
            file = %config.trigger_file.display(),
            scaler_index = trigger.scaler_index,
        ));

    for spec in scaler.metric_spec_for_scaling() {
        info!(
            metric_name = %spec.external.metric.name,
            target = ?spec.external.target,
            "Registered external metric"
        );
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown.cancel();
        }
    });

    let result = run(&config, &scaler, &cancel).await;
    scaler.close().await?;
    result
}

/// Poll until cancelled, or once when `--once` is set
async fn run<S: Scaler>(
    config: &Config,
    scaler: &S,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let specs = scaler.metric_spec_for_scaling();
    let metric_name = specs
        .first()
        .map(|spec| spec.external.metric.name.clone())
        .unwrap_or_default();

    if config.once {
        return poll(scaler, &metric_name, cancel).await;
    }

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = poll(scaler, &metric_name, cancel).await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    warn!(error = %e, "Poll failed");
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    info!("ActiveMQ scaler stopped");
    Ok(())
}

async fn poll<S: Scaler>(
    scaler: &S,
    metric_name: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let active = scaler.is_active(cancel).await?;
    let values = scaler.metrics(metric_name, cancel).await.map_err(|e| {
        error!(error = %e, "Failed to read metric value");
        e
    })?;

    for value in values {
        info!(
            metric_name = %value.metric_name,
            value = value.value,
            timestamp = %value.timestamp,
            active,
            "Current metric value"
        );
    }
    Ok(())
}
