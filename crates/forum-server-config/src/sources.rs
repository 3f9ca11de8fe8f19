// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::{env_bool, env_list, env_parse, env_var, load_secret_env};
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{AuditConfigLayer, CsrfConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/forum/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: FORUM_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()?),
			logging: Some(LoggingConfigLayer {
				level: env_var("FORUM_SERVER_LOG_LEVEL"),
			}),
			audit: Some(load_audit_from_env()?),
			csrf: Some(load_csrf_from_env()?),
		})
	}
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("FORUM_SERVER_DATABASE_URL"),
		max_connections: env_parse("FORUM_SERVER_DATABASE_MAX_CONNECTIONS")?,
		busy_timeout_secs: env_parse("FORUM_SERVER_DATABASE_BUSY_TIMEOUT_SECS")?,
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	Ok(AuditConfigLayer {
		enabled: env_bool("FORUM_SERVER_AUDIT_ENABLED"),
		retention_days: env_parse("FORUM_SERVER_AUDIT_RETENTION_DAYS")?,
		cleanup_interval_secs: env_parse("FORUM_SERVER_AUDIT_CLEANUP_INTERVAL_SECS")?,
	})
}

fn load_csrf_from_env() -> Result<CsrfConfigLayer, ConfigError> {
	Ok(CsrfConfigLayer {
		secret: load_secret_env("FORUM_SERVER_CSRF_SECRET")?,
		token_ttl_secs: env_parse("FORUM_SERVER_CSRF_TOKEN_TTL_SECS")?,
		exempt_paths: env_list("FORUM_SERVER_CSRF_EXEMPT_PATHS"),
	})
}
