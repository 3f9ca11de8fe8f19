// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_RETENTION_DAYS: i64 = 90;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Upper bound on configured retention (100 years).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

fn default_retention_days() -> i64 {
	DEFAULT_RETENTION_DAYS
}

fn default_cleanup_interval_secs() -> u64 {
	DEFAULT_CLEANUP_INTERVAL_SECS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub retention_days: Option<i64>,
	pub cleanup_interval_secs: Option<u64>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.retention_days.is_some() {
			self.retention_days = other.retention_days;
		}
		if other.cleanup_interval_secs.is_some() {
			self.cleanup_interval_secs = other.cleanup_interval_secs;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			retention_days: self.retention_days.unwrap_or_else(default_retention_days),
			cleanup_interval_secs: self
				.cleanup_interval_secs
				.unwrap_or_else(default_cleanup_interval_secs),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	/// When false, `log` and `submit` drop events without touching the store.
	pub enabled: bool,
	pub retention_days: i64,
	/// Period of the background retention task.
	pub cleanup_interval_secs: u64,
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			retention_days: default_retention_days(),
			cleanup_interval_secs: default_cleanup_interval_secs(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = AuditConfigLayer::default().finalize();
		assert!(config.enabled);
		assert_eq!(config.retention_days, 90);
		assert_eq!(config.cleanup_interval_secs, 86_400);
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = AuditConfigLayer {
			enabled: Some(true),
			retention_days: Some(30),
			cleanup_interval_secs: None,
		};
		base.merge(AuditConfigLayer {
			enabled: Some(false),
			retention_days: None,
			cleanup_interval_secs: Some(600),
		});

		let config = base.finalize();
		assert!(!config.enabled);
		assert_eq!(config.retention_days, 30);
		assert_eq!(config.cleanup_interval_secs, 600);
	}

	#[test]
	fn test_deserialize_layer() {
		let layer: AuditConfigLayer = toml::from_str(
			r#"
retention_days = 365
enabled = false
"#,
		)
		.unwrap();
		assert_eq!(layer.retention_days, Some(365));
		assert_eq!(layer.enabled, Some(false));
		assert!(layer.cleanup_interval_secs.is_none());
	}
}
