//! Configuration validation.
//!
//! # Responsibilities
//! - Validate value ranges (timeouts > 0, connection cap > 0)
//! - Reject greetings that would break the line-based handshake
//! - Check the metrics address when metrics are enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReceiverConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::ReceiverConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("protocol.version must be a non-empty single line")]
    InvalidVersion,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &ReceiverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.accept_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("listener.accept_timeout_ms"));
    }
    if config.listener.read_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("listener.read_timeout_ms"));
    }
    if config.listener.max_connections == Some(0) {
        errors.push(ValidationError::ZeroValue("listener.max_connections"));
    }

    let version = &config.protocol.version;
    if version.is_empty() || version.contains(['\n', '\r']) {
        errors.push(ValidationError::InvalidVersion);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
