// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CSRF protection configuration section.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::secret::SecretString;

const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;
const GENERATED_SECRET_BYTES: usize = 32;

fn default_token_ttl_secs() -> u64 {
	DEFAULT_TOKEN_TTL_SECS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CsrfConfigLayer {
	/// HMAC key for double-submit tokens.
	pub secret: Option<SecretString>,
	pub token_ttl_secs: Option<u64>,
	/// Path prefixes exempt from CSRF checks in addition to the built-in ones.
	pub exempt_paths: Option<Vec<String>>,
}

impl CsrfConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.secret.is_some() {
			self.secret = other.secret;
		}
		if other.token_ttl_secs.is_some() {
			self.token_ttl_secs = other.token_ttl_secs;
		}
		if other.exempt_paths.is_some() {
			self.exempt_paths = other.exempt_paths;
		}
	}

	pub fn finalize(self) -> CsrfConfig {
		let secret = match self.secret {
			Some(secret) if !secret.expose().is_empty() => secret,
			_ => {
				warn!(
					"no CSRF secret configured, generating an ephemeral key; \
					 double-submit tokens will not survive a restart"
				);
				SecretString::random_hex(GENERATED_SECRET_BYTES)
			}
		};

		CsrfConfig {
			secret,
			token_ttl_secs: self.token_ttl_secs.unwrap_or_else(default_token_ttl_secs),
			exempt_paths: self.exempt_paths.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CsrfConfig {
	pub secret: SecretString,
	pub token_ttl_secs: u64,
	pub exempt_paths: Vec<String>,
}

impl Default for CsrfConfig {
	fn default() -> Self {
		CsrfConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_secret_is_generated() {
		let config = CsrfConfigLayer::default().finalize();
		assert_eq!(config.secret.expose().len(), 64);
		assert_eq!(config.token_ttl_secs, 3600);
		assert!(config.exempt_paths.is_empty());
	}

	#[test]
	fn test_empty_secret_is_replaced() {
		let config = CsrfConfigLayer {
			secret: Some(SecretString::new(String::new())),
			..Default::default()
		}
		.finalize();
		assert!(!config.secret.expose().is_empty());
	}

	#[test]
	fn test_configured_secret_is_kept() {
		let config = CsrfConfigLayer {
			secret: Some(SecretString::new("configured".to_string())),
			token_ttl_secs: Some(900),
			exempt_paths: Some(vec!["/api/webhooks/".to_string()]),
		}
		.finalize();
		assert_eq!(config.secret.expose(), "configured");
		assert_eq!(config.token_ttl_secs, 900);
		assert_eq!(config.exempt_paths, vec!["/api/webhooks/".to_string()]);
	}

	#[test]
	fn test_serialized_config_hides_secret() {
		let config = CsrfConfigLayer {
			secret: Some(SecretString::new("configured".to_string())),
			..Default::default()
		}
		.finalize();
		let json = serde_json::to_string(&config).unwrap();
		assert!(!json.contains("configured"));
		assert!(json.contains("[REDACTED]"));
	}
}
