// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the forum security services.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Consistent environment variable naming (`FORUM_SERVER_*`)
//! - Redacted handling of key material via [`Secret`]
//!
//! # Usage
//!
//! ```ignore
//! use forum_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("audit retention: {} days", config.audit.retention_days);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use env::load_secret_env;
pub use error::{ConfigError, ConfigResult};
pub use layer::ServerConfigLayer;
pub use secret::{Secret, SecretString, REDACTED};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub audit: AuditConfig,
	pub csrf: CsrfConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`FORUM_SERVER_*`)
/// 2. Config file (`/etc/forum/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> ConfigResult<ServerConfig> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> ConfigResult<ServerConfig> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> ConfigResult<ServerConfig> {
	load_from_sources(vec![Box::new(EnvSource)])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> ConfigResult<ServerConfig> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> ConfigResult<ServerConfig> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let audit = layer.audit.unwrap_or_default().finalize();
	let csrf = layer.csrf.unwrap_or_default().finalize();

	validate_config(&database, &audit, &csrf)?;

	info!(
		database = %database.url,
		audit_enabled = audit.enabled,
		audit_retention_days = audit.retention_days,
		csrf_token_ttl_secs = csrf.token_ttl_secs,
		csrf_extra_exempt_paths = csrf.exempt_paths.len(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		audit,
		csrf,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	database: &DatabaseConfig,
	audit: &AuditConfig,
	csrf: &CsrfConfig,
) -> ConfigResult<()> {
	if database.max_connections == 0 {
		return Err(ConfigError::Validation(
			"database max_connections must be greater than zero".to_string(),
		));
	}

	if !(1..=MAX_RETENTION_DAYS).contains(&audit.retention_days) {
		return Err(ConfigError::Validation(format!(
			"audit retention_days must be between 1 and {MAX_RETENTION_DAYS}, got {}",
			audit.retention_days
		)));
	}

	if audit.cleanup_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"audit cleanup_interval_secs must be greater than zero".to_string(),
		));
	}

	if csrf.token_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"csrf token_ttl_secs must be greater than zero".to_string(),
		));
	}

	if let Some(path) = csrf.exempt_paths.iter().find(|p| !p.starts_with('/')) {
		return Err(ConfigError::Validation(format!(
			"csrf exempt path '{path}' must start with '/'"
		)));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_defaults_are_valid() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert!(config.audit.enabled);
		assert_eq!(config.audit.retention_days, 90);
		assert_eq!(config.csrf.token_ttl_secs, 3600);
	}

	#[test]
	fn test_zero_retention_is_rejected() {
		let layer = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_oversized_retention_is_rejected() {
		let layer = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(200_000_000),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));

		let layer = ServerConfigLayer {
			audit: Some(AuditConfigLayer {
				retention_days: Some(MAX_RETENTION_DAYS),
				..Default::default()
			}),
			..Default::default()
		};
		assert_eq!(finalize(layer).unwrap().audit.retention_days, MAX_RETENTION_DAYS);
	}

	#[test]
	fn test_zero_pool_size_is_rejected() {
		let layer = ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				max_connections: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_relative_exempt_path_is_rejected() {
		let layer = ServerConfigLayer {
			csrf: Some(CsrfConfigLayer {
				exempt_paths: Some(vec!["api/webhooks".to_string()]),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_file_values_are_loaded() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[audit]
retention_days = 120

[csrf]
secret = "file-secret"
"#
		)
		.unwrap();

		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		])
		.unwrap();

		assert_eq!(config.audit.retention_days, 120);
		assert_eq!(config.csrf.secret.expose(), "file-secret");
	}
}
