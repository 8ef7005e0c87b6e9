//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate upstream address, path prefix and value ranges
//! - Validate the static identity when one is configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::http::forward::{is_valid_path_prefix, is_valid_upstream};
use crate::security::identity::{is_valid_email, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("upstream.url {0:?} must be an http or https URL")]
    UpstreamUrl(String),

    #[error("upstream.path_prefix {0:?} must start with '/' and not contain '..'")]
    PathPrefix(String),

    #[error("upstream.request_timeout_ms must be greater than zero")]
    Timeout,

    #[error("security.max_body_size must be greater than zero")]
    BodyLimit,

    #[error("identity.email {0:?} is not a valid email")]
    IdentityEmail(String),

    #[error("identity.role {0:?} must be one of Admin, Editor, Viewer")]
    IdentityRole(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if !is_valid_upstream(&config.upstream.url) {
        errors.push(ValidationError::UpstreamUrl(config.upstream.url.clone()));
    }
    if !is_valid_path_prefix(&config.upstream.path_prefix) {
        errors.push(ValidationError::PathPrefix(config.upstream.path_prefix.clone()));
    }
    if config.upstream.request_timeout_ms == 0 {
        errors.push(ValidationError::Timeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }
    if let Some(identity) = &config.identity {
        if !is_valid_email(&identity.email) {
            errors.push(ValidationError::IdentityEmail(identity.email.clone()));
        }
        if identity.role.parse::<Role>().is_err() {
            errors.push(ValidationError::IdentityRole(identity.role.clone()));
        }
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Identity;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.upstream.url = "not a url".into();
        config.upstream.path_prefix = "api".into();
        config.upstream.request_timeout_ms = 0;
        config.identity = Some(Identity::new("nobody", "Root"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Timeout));
        assert!(errors.contains(&ValidationError::IdentityRole("Root".into())));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("nowhere".into())]
        );
    }
}
