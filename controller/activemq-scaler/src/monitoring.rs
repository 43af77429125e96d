//! Jolokia monitoring endpoint: URL rendering and the HTTP poll

use crate::error::ScalerError;
use crate::metadata::ScalerMetadata;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Jolokia read of the queue's `QueueSize` attribute
pub const DEFAULT_REST_API_TEMPLATE: &str = "http://{{.ManagementEndpoint}}/api/jolokia/read/org.apache.activemq:type=Broker,brokerName={{.BrokerName}},destinationType=Queue,destinationName={{.DestinationName}}/QueueSize";

const HTTP_OK: u16 = 200;

/// Render the default monitoring template for the given metadata.
///
/// A user-supplied `restAPITemplate` only contributes the identity fields;
/// the request always goes to the default Jolokia path.
pub fn monitoring_endpoint(metadata: &ScalerMetadata) -> Result<String, ScalerError> {
    render_template(
        DEFAULT_REST_API_TEMPLATE,
        &[
            ("ManagementEndpoint", metadata.management_endpoint.as_str()),
            ("BrokerName", metadata.broker_name.as_str()),
            ("DestinationName", metadata.destination_name.as_str()),
        ],
    )
}

/// Substitute `{{.Name}}` placeholders. Values are inserted verbatim.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> Result<String, ScalerError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| ScalerError::Render {
            placeholder: after.to_string(),
        })?;
        let name = after[..end].trim();
        let key = name.strip_prefix('.').unwrap_or(name);
        let value = values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| ScalerError::Render {
                placeholder: name.to_string(),
            })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Jolokia read response envelope
#[derive(Debug, Deserialize)]
struct JolokiaResponse {
    #[serde(default)]
    value: i64,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    timestamp: i64,
}

/// One successful poll of the management endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringSample {
    pub message_count: i64,
    pub http_status: u16,
    pub payload_status: i64,
    /// Broker-side time of the read, seconds since the epoch
    pub timestamp: i64,
}

/// Fetches a monitoring sample from a rendered endpoint URL
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<MonitoringSample, ScalerError>;
}

/// reqwest-backed client. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpMonitoringClient {
    client: reqwest::Client,
}

impl HttpMonitoringClient {
    /// Create a client with its own connection pool and request timeout
    pub fn new(timeout: Duration) -> Result<Self, ScalerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ScalerError::Transport { source })?;

        Ok(Self { client })
    }

    /// Reuse a client owned by the host
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MonitoringClient for HttpMonitoringClient {
    async fn fetch(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<MonitoringSample, ScalerError> {
        let response = self
            .client
            .get(url)
            .basic_auth(username, Some(password))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| ScalerError::Transport { source })?;

        let http_status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| ScalerError::Transport { source })?;

        let payload: JolokiaResponse =
            serde_json::from_slice(&body).map_err(|e| ScalerError::Decode {
                http_status,
                message: e.to_string(),
            })?;

        if http_status != HTTP_OK || payload.status != i64::from(HTTP_OK) {
            return Err(ScalerError::StatusMismatch {
                http_status,
                payload_status: payload.status,
            });
        }

        debug!(
            http_status,
            message_count = payload.value,
            broker_timestamp = payload.timestamp,
            "Read ActiveMQ queue size"
        );

        Ok(MonitoringSample {
            message_count: payload.value,
            http_status,
            payload_status: payload.status,
            timestamp: payload.timestamp,
        })
    }
}
