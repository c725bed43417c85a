//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check that TLS settings are complete when TLS is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HistoryServerConfig → Result<(), Vec<ValidationError>>
//! - Archive locations are resolved later, at server construction, because
//!   resolving them needs the storage backend registry

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::HistoryServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("web.ssl.enabled is set but {field} is missing")]
    IncompleteTls { field: &'static str },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("observability.log_format '{0}' is not one of: pretty, json")]
    LogFormat(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &HistoryServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.web.address.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "web.address" });
    }
    if config.web.refresh_interval_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "web.refresh_interval_ms",
        });
    }
    if config.archive.refresh_interval_ms == 0 {
        errors.push(ValidationError::NotPositive {
            field: "archive.refresh_interval_ms",
        });
    }
    if let Some(dir) = &config.web.tmp_dir {
        if dir.as_os_str().is_empty() {
            errors.push(ValidationError::Empty { field: "web.tmp_dir" });
        }
    }

    if config.web.ssl.enabled {
        if config.web.ssl.cert_path.is_none() {
            errors.push(ValidationError::IncompleteTls {
                field: "web.ssl.cert_path",
            });
        }
        if config.web.ssl.key_path.is_none() {
            errors.push(ValidationError::IncompleteTls {
                field: "web.ssl.key_path",
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
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
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&HistoryServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = HistoryServerConfig::default();
        config.web.refresh_interval_ms = 0;
        config.archive.refresh_interval_ms = 0;
        config.web.tmp_dir = Some(PathBuf::new());
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::NotPositive {
            field: "web.refresh_interval_ms"
        }));
        assert!(errors.contains(&ValidationError::NotPositive {
            field: "archive.refresh_interval_ms"
        }));
        assert!(errors.contains(&ValidationError::Empty { field: "web.tmp_dir" }));
        assert!(errors.contains(&ValidationError::LogFormat("xml".into())));
    }

    #[test]
    fn test_tls_requires_cert_and_key() {
        let mut config = HistoryServerConfig::default();
        config.web.ssl.enabled = true;
        config.web.ssl.cert_path = Some("cert.pem".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::IncompleteTls {
                field: "web.ssl.key_path"
            }]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = HistoryServerConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
