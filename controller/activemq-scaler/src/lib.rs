//! ActiveMQ scaler - reports the depth of an ActiveMQ queue as an external
//! scaling metric
//!
//! Trigger configuration is validated once into [`ScalerMetadata`]. Each poll
//! reads the queue's `QueueSize` through the broker's Jolokia management API
//! and hands the result to the host autoscaler as an activity flag or a
//! metric value.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod metadata;
pub mod monitoring;
pub mod scaler;

pub use config::Config;
pub use endpoint::{parse_rest_api_template, EndpointDescriptor, EndpointSource};
pub use error::{ErrorKind, ScalerError, TemplateError};
pub use metadata::{ScalerMetadata, TriggerConfig};
pub use monitoring::{HttpMonitoringClient, MonitoringClient, MonitoringSample};
pub use scaler::{ActiveMqScaler, ExternalMetricValue, MetricSpec, Scaler};
