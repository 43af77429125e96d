//! Broker endpoint identity
//!
//! The management endpoint, broker name and destination name either come
//! straight from trigger metadata or are recovered from a user-supplied
//! `restAPITemplate`. Jolokia addresses embed the broker identity inside a
//! comma-separated `key=value` descriptor in the URL path, e.g.
//!
//! ```text
//! http://host:8161/api/jolokia/read/org.apache.activemq:type=Broker,brokerName=b,destinationType=Queue,destinationName=q/QueueSize
//! ```
//!
//! The descriptor is validated pair by pair before being decoded with query
//! string rules (commas read as `&`).

use crate::error::{ScalerError, TemplateError};
use url::{form_urlencoded, Url};

/// Identity of the queue being measured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub management_endpoint: String,
    pub broker_name: String,
    pub destination_name: String,
}

/// Where the endpoint identity comes from. Exactly one source is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSource {
    Explicit {
        management_endpoint: String,
        broker_name: String,
        destination_name: String,
    },
    Templated {
        template: String,
    },
}

impl EndpointSource {
    /// Resolve the source into a descriptor, validating required fields
    pub fn resolve(&self) -> Result<EndpointDescriptor, ScalerError> {
        match self {
            EndpointSource::Templated { template } => parse_rest_api_template(template)
                .map_err(|source| ScalerError::InvalidRestApiTemplate { source }),
            EndpointSource::Explicit {
                management_endpoint,
                broker_name,
                destination_name,
            } => {
                if management_endpoint.is_empty() {
                    return Err(ScalerError::MissingManagementEndpoint);
                }
                if destination_name.is_empty() {
                    return Err(ScalerError::MissingDestinationName);
                }
                if broker_name.is_empty() {
                    return Err(ScalerError::MissingBrokerName);
                }
                Ok(EndpointDescriptor {
                    management_endpoint: management_endpoint.clone(),
                    broker_name: broker_name.clone(),
                    destination_name: destination_name.clone(),
                })
            }
        }
    }
}

/// Parse a `restAPITemplate` into its management endpoint and queue identity
pub fn parse_rest_api_template(template: &str) -> Result<EndpointDescriptor, TemplateError> {
    let url = Url::parse(template).map_err(|e| TemplateError::InvalidUri {
        message: e.to_string(),
    })?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TemplateError::MissingHost {
            template: template.to_string(),
        })?;
    // Url drops a port equal to the scheme default; keep it when it was written
    let port = if has_explicit_port(template) {
        url.port_or_known_default()
    } else {
        url.port()
    };
    let management_endpoint = match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let descriptor = descriptor_segment(url.path()).ok_or_else(|| {
        TemplateError::MissingDescriptor {
            template: template.to_string(),
        }
    })?;

    for pair in descriptor.split(',') {
        match pair.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => {
                return Err(TemplateError::MalformedPair {
                    pair: pair.to_string(),
                })
            }
        }
    }

    let query = descriptor.replace(',', "&");
    let lookup = |key: &'static str| -> Result<String, TemplateError> {
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TemplateError::MissingKey {
                key,
                template: template.to_string(),
            })
    };

    let destination_name = lookup("destinationName")?;
    let broker_name = lookup("brokerName")?;

    Ok(EndpointDescriptor {
        management_endpoint,
        broker_name,
        destination_name,
    })
}

/// Whether the authority of `template` ends in `:<digits>`
fn has_explicit_port(template: &str) -> bool {
    let after_scheme = template
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(template);
    let authority = after_scheme
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map(|(_, hp)| hp)
        .unwrap_or(authority);
    host_port
        .rsplit_once(':')
        .map(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// The text between the first ':' of the path and the following '/'
fn descriptor_segment(path: &str) -> Option<&str> {
    let (_, rest) = path.split_once(':')?;
    let segment = rest.split('/').next().unwrap_or_default();
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}
