//! Trigger configuration and validated scaler metadata

use crate::endpoint::EndpointSource;
use crate::error::ScalerError;
use crate::monitoring::DEFAULT_REST_API_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TARGET_QUEUE_SIZE: i64 = 10;

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 3000;

/// Raw trigger configuration handed over by the host controller
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    /// Key/value pairs from the trigger definition
    #[serde(default)]
    pub trigger_metadata: HashMap<String, String>,

    /// Values from the trigger's authentication reference
    #[serde(default)]
    pub auth_params: HashMap<String, String>,

    /// Environment of the scaled workload, already resolved
    #[serde(default)]
    pub resolved_env: HashMap<String, String>,

    /// Position of this trigger among the triggers of one scaled workload
    #[serde(default)]
    pub scaler_index: usize,

    #[serde(default = "default_http_timeout_ms")]
    pub global_http_timeout_ms: u64,
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            trigger_metadata: HashMap::new(),
            auth_params: HashMap::new(),
            resolved_env: HashMap::new(),
            scaler_index: 0,
            global_http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

/// Auth params and resolved env values may hold credentials; only keys are printed
impl fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut auth_keys: Vec<&String> = self.auth_params.keys().collect();
        auth_keys.sort();
        let mut env_keys: Vec<&String> = self.resolved_env.keys().collect();
        env_keys.sort();
        f.debug_struct("TriggerConfig")
            .field("trigger_metadata", &self.trigger_metadata)
            .field("auth_params", &auth_keys)
            .field("resolved_env", &env_keys)
            .field("scaler_index", &self.scaler_index)
            .field("global_http_timeout_ms", &self.global_http_timeout_ms)
            .finish()
    }
}

impl TriggerConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.global_http_timeout_ms)
    }

    fn metadata_value(&self, key: &str) -> Option<&str> {
        self.trigger_metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Which endpoint source is authoritative for this trigger
    pub fn endpoint_source(&self) -> EndpointSource {
        match self.metadata_value("restAPITemplate") {
            Some(template) => EndpointSource::Templated {
                template: template.to_string(),
            },
            None => {
                let field = |key: &str| self.metadata_value(key).unwrap_or_default().to_string();
                EndpointSource::Explicit {
                    management_endpoint: field("managementEndpoint"),
                    broker_name: field("brokerName"),
                    destination_name: field("destinationName"),
                }
            }
        }
    }

    /// Auth params win; otherwise the trigger metadata value, looked up once
    /// in the resolved environment.
    fn credential(&self, key: &str) -> Option<String> {
        if let Some(value) = self.auth_params.get(key).filter(|v| !v.is_empty()) {
            return Some(value.clone());
        }
        let literal = self.metadata_value(key)?;
        let value = self
            .resolved_env
            .get(literal)
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .unwrap_or(literal);
        Some(value.to_string())
    }
}

/// Validated scaler metadata, read-only after construction
#[derive(Clone, PartialEq, Eq)]
pub struct ScalerMetadata {
    pub management_endpoint: String,
    pub broker_name: String,
    pub destination_name: String,
    pub username: String,
    pub password: String,
    pub target_queue_size: i64,
    pub rest_api_template: String,
    pub metric_name: String,
    pub scaler_index: usize,
}

impl fmt::Debug for ScalerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalerMetadata")
            .field("management_endpoint", &self.management_endpoint)
            .field("broker_name", &self.broker_name)
            .field("destination_name", &self.destination_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("target_queue_size", &self.target_queue_size)
            .field("rest_api_template", &self.rest_api_template)
            .field("metric_name", &self.metric_name)
            .field("scaler_index", &self.scaler_index)
            .finish()
    }
}

impl ScalerMetadata {
    /// Validate a trigger configuration into scaler metadata
    pub fn parse(config: &TriggerConfig) -> Result<Self, ScalerError> {
        let source = config.endpoint_source();
        let endpoint = source.resolve()?;
        let rest_api_template = match source {
            EndpointSource::Templated { template } => template,
            EndpointSource::Explicit { .. } => DEFAULT_REST_API_TEMPLATE.to_string(),
        };

        let target_queue_size = match config.trigger_metadata.get("targetQueueSize") {
            Some(raw) => parse_target_queue_size(raw)?,
            None => DEFAULT_TARGET_QUEUE_SIZE,
        };

        let username = config
            .credential("username")
            .ok_or(ScalerError::EmptyUsername)?;
        let password = config
            .credential("password")
            .ok_or(ScalerError::EmptyPassword)?;

        let metric_name = metric_name_with_index(
            config.scaler_index,
            &normalize_string(&format!("activemq-{}", endpoint.destination_name)),
        );

        Ok(Self {
            management_endpoint: endpoint.management_endpoint,
            broker_name: endpoint.broker_name,
            destination_name: endpoint.destination_name,
            username,
            password,
            target_queue_size,
            rest_api_template,
            metric_name,
            scaler_index: config.scaler_index,
        })
    }
}

fn parse_target_queue_size(raw: &str) -> Result<i64, ScalerError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| ScalerError::InvalidTargetQueueSize {
            value: raw.to_string(),
        })?;
    if value < 0 {
        return Err(ScalerError::NegativeTargetQueueSize { value });
    }
    Ok(value)
}

/// Make a string safe for use as an external metric name
pub fn normalize_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '.' | ':' | '%' => '-',
            other => other,
        })
        .collect()
}

/// Prefix a metric name with the scaler index so identical triggers on one
/// workload stay distinguishable
pub fn metric_name_with_index(scaler_index: usize, metric_name: &str) -> String {
    format!("s{}-{}", scaler_index, metric_name)
}
