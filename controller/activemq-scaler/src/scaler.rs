//! Scaler trait and the ActiveMQ implementation
//!
//! The host controller calls [`Scaler::is_active`] and [`Scaler::metrics`]
//! on its own schedule. Each call performs exactly one HTTP round trip and
//! aborts as soon as the supplied cancellation token fires.

use crate::error::ScalerError;
use crate::metadata::{ScalerMetadata, TriggerConfig};
use crate::monitoring::{
    monitoring_endpoint, HttpMonitoringClient, MonitoringClient, DEFAULT_REST_API_TEMPLATE,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};

/// Kind of metric source, always external for broker-backed scalers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricSourceType {
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricTargetType {
    AverageValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIdentifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTarget {
    #[serde(rename = "type")]
    pub target_type: MetricTargetType,
    pub average_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMetricSource {
    pub metric: MetricIdentifier,
    pub target: MetricTarget,
}

/// Metric the host autoscaler should track for this trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    #[serde(rename = "type")]
    pub source_type: MetricSourceType,
    pub external: ExternalMetricSource,
}

/// Current value of an external metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetricValue {
    pub metric_name: String,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

/// Operations the host autoscaling controller invokes on a scaler
#[async_trait]
pub trait Scaler: Send + Sync {
    /// Whether there is work to do
    async fn is_active(&self, cancel: &CancellationToken) -> Result<bool, ScalerError>;

    /// Metric specs to register with the autoscaler. No I/O.
    fn metric_spec_for_scaling(&self) -> Vec<MetricSpec>;

    /// Current value of the named metric
    async fn metrics(
        &self,
        metric_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExternalMetricValue>, ScalerError>;

    async fn close(&self) -> Result<(), ScalerError>;
}

/// Scales on the depth of one ActiveMQ queue
pub struct ActiveMqScaler<C: MonitoringClient = HttpMonitoringClient> {
    metadata: ScalerMetadata,
    client: C,
    span: Span,
}

impl ActiveMqScaler<HttpMonitoringClient> {
    /// Validate the trigger configuration and build a scaler with its own HTTP client
    pub fn new(config: &TriggerConfig) -> Result<Self, ScalerError> {
        let metadata = ScalerMetadata::parse(config)
            .map_err(|e| e.context("error parsing ActiveMQ metadata"))?;
        let client = HttpMonitoringClient::new(config.http_timeout())?;
        Self::with_client(metadata, client)
    }
}

impl<C: MonitoringClient> ActiveMqScaler<C> {
    pub fn with_client(metadata: ScalerMetadata, client: C) -> Result<Self, ScalerError> {
        let span = info_span!(
            "activemq_scaler",
            scaler_index = metadata.scaler_index,
            metric_name = %metadata.metric_name,
            management_endpoint = %metadata.management_endpoint,
        );

        if metadata.rest_api_template != DEFAULT_REST_API_TEMPLATE {
            let request_url = monitoring_endpoint(&metadata)?;
            if request_url != metadata.rest_api_template {
                span.in_scope(|| {
                    warn!(
                        rest_api_template = %metadata.rest_api_template,
                        request_url = %request_url,
                        "restAPITemplate only supplies the broker identity; polling the default Jolokia endpoint"
                    )
                });
            }
        }

        Ok(Self {
            metadata,
            client,
            span,
        })
    }

    /// Replace the span that carries this scaler's log context
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn metadata(&self) -> &ScalerMetadata {
        &self.metadata
    }

    async fn queue_message_count(&self, cancel: &CancellationToken) -> Result<i64, ScalerError> {
        let url = monitoring_endpoint(&self.metadata)?;
        let fetch = self
            .client
            .fetch(&url, &self.metadata.username, &self.metadata.password);

        let sample = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScalerError::Cancelled),
            result = fetch => result?,
        };

        debug!(
            queue_size = sample.message_count,
            target_queue_size = self.metadata.target_queue_size,
            "Providing metrics based on current queue size"
        );

        Ok(sample.message_count)
    }
}

#[async_trait]
impl<C: MonitoringClient> Scaler for ActiveMqScaler<C> {
    async fn is_active(&self, cancel: &CancellationToken) -> Result<bool, ScalerError> {
        let span = self.span.clone();
        async {
            match self.queue_message_count(cancel).await {
                Ok(queue_size) => Ok(queue_size > 0),
                Err(e) => {
                    error!(
                        error = %e,
                        management_endpoint = %self.metadata.management_endpoint,
                        "Unable to access ActiveMQ management endpoint"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn metric_spec_for_scaling(&self) -> Vec<MetricSpec> {
        vec![MetricSpec {
            source_type: MetricSourceType::External,
            external: ExternalMetricSource {
                metric: MetricIdentifier {
                    name: self.metadata.metric_name.clone(),
                },
                target: MetricTarget {
                    target_type: MetricTargetType::AverageValue,
                    average_value: self.metadata.target_queue_size,
                },
            },
        }]
    }

    async fn metrics(
        &self,
        metric_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExternalMetricValue>, ScalerError> {
        let queue_size = self
            .queue_message_count(cancel)
            .instrument(self.span.clone())
            .await
            .map_err(|e| e.context("error inspecting ActiveMQ queue size"))?;

        Ok(vec![ExternalMetricValue {
            metric_name: metric_name.to_string(),
            value: queue_size,
            timestamp: Utc::now(),
        }])
    }

    async fn close(&self) -> Result<(), ScalerError> {
        Ok(())
    }
}
