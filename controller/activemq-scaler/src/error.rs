//! Error types for the ActiveMQ scaler

use thiserror::Error;

/// Failures while decomposing a user-supplied `restAPITemplate`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unable to parse ActiveMQ restAPITemplate: {message}")]
    InvalidUri { message: String },

    #[error("restAPITemplate has no host: {template}")]
    MissingHost { template: String },

    #[error("restAPITemplate path has no broker descriptor after ':': {template}")]
    MissingDescriptor { template: String },

    #[error("malformed descriptor pair '{pair}', expected key=value")]
    MalformedPair { pair: String },

    #[error("no {key} given: {template}")]
    MissingKey { key: &'static str, template: String },
}

/// Broad classification of a [`ScalerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal at construction, never retried
    ConfigValidation,
    /// Network failure, timeout or cancellation
    Transport,
    /// Undecodable payload or status mismatch
    Protocol,
}

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("no management endpoint given")]
    MissingManagementEndpoint,

    #[error("no destination name given")]
    MissingDestinationName,

    #[error("no broker name given")]
    MissingBrokerName,

    #[error("invalid targetQueueSize - must be an integer")]
    InvalidTargetQueueSize { value: String },

    #[error("invalid targetQueueSize - must not be negative, got {value}")]
    NegativeTargetQueueSize { value: i64 },

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("can't parse restAPITemplate: {source}")]
    InvalidRestApiTemplate {
        #[source]
        source: TemplateError,
    },

    #[error("error rendering monitoring endpoint: unknown placeholder '{placeholder}'")]
    Render { placeholder: String },

    #[error("ActiveMQ management endpoint request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    #[error("ActiveMQ management endpoint request cancelled")]
    Cancelled,

    #[error("unable to decode ActiveMQ management endpoint response: HTTP status {http_status}, payload status unavailable: {message}")]
    Decode { http_status: u16, message: String },

    #[error("ActiveMQ management endpoint response error code : {http_status} {payload_status}")]
    StatusMismatch { http_status: u16, payload_status: i64 },

    #[error("{operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<ScalerError>,
    },
}

impl ScalerError {
    /// Wrap this error with the name of the operation that produced it
    pub fn context(self, operation: &'static str) -> Self {
        ScalerError::Operation {
            operation,
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScalerError::MissingManagementEndpoint
            | ScalerError::MissingDestinationName
            | ScalerError::MissingBrokerName
            | ScalerError::InvalidTargetQueueSize { .. }
            | ScalerError::NegativeTargetQueueSize { .. }
            | ScalerError::EmptyUsername
            | ScalerError::EmptyPassword
            | ScalerError::InvalidRestApiTemplate { .. }
            | ScalerError::Render { .. } => ErrorKind::ConfigValidation,
            ScalerError::Transport { .. } | ScalerError::Cancelled => ErrorKind::Transport,
            ScalerError::Decode { .. } | ScalerError::StatusMismatch { .. } => {
                ErrorKind::Protocol
            }
            ScalerError::Operation { source, .. } => source.kind(),
        }
    }

    /// The innermost error, skipping operation context
    pub fn root(&self) -> &ScalerError {
        match self {
            ScalerError::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}
