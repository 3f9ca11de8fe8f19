// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
	#[error("store '{store}' error: {source}")]
	StoreError {
		store: String,
		#[source]
		source: AuditStoreError,
	},

	#[error("escalation hook '{hook}' failed: {message}")]
	EscalationError { hook: String, message: String },

	#[error("invalid timeframe '{0}', expected one of: hour, day, week, month")]
	InvalidTimeframe(String),

	#[error("configuration error: {0}")]
	ConfigError(String),
}

#[derive(Error, Debug)]
pub enum AuditStoreError {
	#[error("transient error: {0}")]
	Transient(String),

	#[error("permanent error: {0}")]
	Permanent(String),
}

impl AuditStoreError {
	/// Whether retrying the same operation later may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, AuditStoreError::Transient(_))
	}
}
