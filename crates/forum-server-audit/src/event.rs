// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for security auditing.
//!
//! - [`AuditAction`]: open vocabulary of auditable actions
//! - [`AuditSeverity`]: four-level risk classification
//! - [`NewAuditEvent`]: a caller-built event, before enrichment
//! - [`AuditEvent`]: a fully resolved record as persisted
//! - [`AuditEventBuilder`]: fluent API for constructing new events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default retention period for audit events in days.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

/// Placeholder recorded when the request origin or client is unknown.
pub const UNKNOWN: &str = "unknown";

/// An auditable action.
///
/// The named variants are the vocabulary the forum emits and the classifier
/// knows about. Anything else round-trips through [`AuditAction::Custom`].
/// On the wire every action is its SCREAMING_SNAKE string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
	// Authentication
	LoginSuccess,
	LoginFailed,
	Logout,
	Register,
	PasswordChange,
	PasswordResetRequested,
	EmailChange,
	EmailVerified,

	// Content
	ThreadCreate,
	ThreadDelete,
	PostCreate,
	PostUpdate,
	PostDelete,
	ProfileUpdate,
	DataModification,

	// Administration
	AdminAccess,
	UserRoleChange,
	SystemConfigChange,
	UserBan,

	// Security
	RateLimitExceeded,
	CsrfViolation,
	XssAttempt,
	UnauthorizedAccess,

	Custom(String),
}

impl AuditAction {
	pub fn as_str(&self) -> &str {
		match self {
			AuditAction::LoginSuccess => "LOGIN_SUCCESS",
			AuditAction::LoginFailed => "LOGIN_FAILED",
			AuditAction::Logout => "LOGOUT",
			AuditAction::Register => "REGISTER",
			AuditAction::PasswordChange => "PASSWORD_CHANGE",
			AuditAction::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
			AuditAction::EmailChange => "EMAIL_CHANGE",
			AuditAction::EmailVerified => "EMAIL_VERIFIED",
			AuditAction::ThreadCreate => "THREAD_CREATE",
			AuditAction::ThreadDelete => "THREAD_DELETE",
			AuditAction::PostCreate => "POST_CREATE",
			AuditAction::PostUpdate => "POST_UPDATE",
			AuditAction::PostDelete => "POST_DELETE",
			AuditAction::ProfileUpdate => "PROFILE_UPDATE",
			AuditAction::DataModification => "DATA_MODIFICATION",
			AuditAction::AdminAccess => "ADMIN_ACCESS",
			AuditAction::UserRoleChange => "USER_ROLE_CHANGE",
			AuditAction::SystemConfigChange => "SYSTEM_CONFIG_CHANGE",
			AuditAction::UserBan => "USER_BAN",
			AuditAction::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
			AuditAction::CsrfViolation => "CSRF_VIOLATION",
			AuditAction::XssAttempt => "XSS_ATTEMPT",
			AuditAction::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
			AuditAction::Custom(s) => s,
		}
	}

	/// Every named action, in declaration order.
	pub fn known() -> &'static [AuditAction] {
		&[
			AuditAction::LoginSuccess,
			AuditAction::LoginFailed,
			AuditAction::Logout,
			AuditAction::Register,
			AuditAction::PasswordChange,
			AuditAction::PasswordResetRequested,
			AuditAction::EmailChange,
			AuditAction::EmailVerified,
			AuditAction::ThreadCreate,
			AuditAction::ThreadDelete,
			AuditAction::PostCreate,
			AuditAction::PostUpdate,
			AuditAction::PostDelete,
			AuditAction::ProfileUpdate,
			AuditAction::DataModification,
			AuditAction::AdminAccess,
			AuditAction::UserRoleChange,
			AuditAction::SystemConfigChange,
			AuditAction::UserBan,
			AuditAction::RateLimitExceeded,
			AuditAction::CsrfViolation,
			AuditAction::XssAttempt,
			AuditAction::UnauthorizedAccess,
		]
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<String> for AuditAction {
	fn from(s: String) -> Self {
		AuditAction::known()
			.iter()
			.find(|a| a.as_str() == s)
			.cloned()
			.unwrap_or(AuditAction::Custom(s))
	}
}

impl From<&str> for AuditAction {
	fn from(s: &str) -> Self {
		AuditAction::from(s.to_string())
	}
}

impl From<AuditAction> for String {
	fn from(action: AuditAction) -> Self {
		match action {
			AuditAction::Custom(s) => s,
			other => other.as_str().to_string(),
		}
	}
}

/// Risk classification of an audit event.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
	#[default]
	Low,
	Medium,
	High,
	Critical,
}

impl AuditSeverity {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSeverity::Low => "low",
			AuditSeverity::Medium => "medium",
			AuditSeverity::High => "high",
			AuditSeverity::Critical => "critical",
		}
	}

	/// Returns all severity levels from most to least severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Critical,
			AuditSeverity::High,
			AuditSeverity::Medium,
			AuditSeverity::Low,
		]
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditSeverity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"low" => Ok(AuditSeverity::Low),
			"medium" => Ok(AuditSeverity::Medium),
			"high" => Ok(AuditSeverity::High),
			"critical" => Ok(AuditSeverity::Critical),
			other => Err(format!("unknown severity '{other}'")),
		}
	}
}

/// An event as submitted by a caller.
///
/// `event_id`, `timestamp` and `severity` are resolved during enrichment
/// when left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
	pub event_id: Option<Uuid>,
	pub user_id: Option<String>,
	pub session_id: Option<String>,
	pub action: AuditAction,
	pub resource: String,
	pub resource_id: Option<String>,
	pub ip: String,
	pub user_agent: String,
	pub success: bool,
	pub timestamp: Option<DateTime<Utc>>,
	pub details: serde_json::Value,
	pub severity: Option<AuditSeverity>,
	pub method: Option<String>,
	pub endpoint: Option<String>,
	pub status_code: Option<u16>,
	pub duration_ms: Option<u64>,
}

impl NewAuditEvent {
	/// Create a new builder for the given action on a resource.
	pub fn builder(action: impl Into<AuditAction>, resource: impl Into<String>) -> AuditEventBuilder {
		AuditEventBuilder::new(action, resource)
	}
}

/// A security-relevant event with every derived field resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
	/// Unique identifier, never reused.
	pub event_id: Uuid,
	/// The acting user, if authenticated.
	pub user_id: Option<String>,
	pub session_id: Option<String>,
	pub action: AuditAction,
	/// The kind of resource affected (e.g. "thread", "auth", "admin").
	pub resource: String,
	pub resource_id: Option<String>,
	/// Client IP address, or [`UNKNOWN`].
	pub ip: String,
	pub user_agent: String,
	pub success: bool,
	pub timestamp: DateTime<Utc>,
	/// Opaque, event-specific details.
	pub details: serde_json::Value,
	pub severity: AuditSeverity,
	pub method: Option<String>,
	pub endpoint: Option<String>,
	pub status_code: Option<u16>,
	pub duration_ms: Option<u64>,
	/// Correlation key for repeated events of the same shape.
	pub fingerprint: String,
}

/// Builder for [`NewAuditEvent`].
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
	event: NewAuditEvent,
}

impl AuditEventBuilder {
	pub fn new(action: impl Into<AuditAction>, resource: impl Into<String>) -> Self {
		Self {
			event: NewAuditEvent {
				event_id: None,
				user_id: None,
				session_id: None,
				action: action.into(),
				resource: resource.into(),
				resource_id: None,
				ip: UNKNOWN.to_string(),
				user_agent: UNKNOWN.to_string(),
				success: true,
				timestamp: None,
				details: serde_json::Value::Null,
				severity: None,
				method: None,
				endpoint: None,
				status_code: None,
				duration_ms: None,
			},
		}
	}

	/// Use a caller-supplied id instead of a fresh one.
	pub fn event_id(mut self, id: Uuid) -> Self {
		self.event.event_id = Some(id);
		self
	}

	pub fn user(mut self, user_id: impl Into<String>) -> Self {
		self.event.user_id = Some(user_id.into());
		self
	}

	pub fn session(mut self, session_id: impl Into<String>) -> Self {
		self.event.session_id = Some(session_id.into());
		self
	}

	pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
		self.event.resource_id = Some(resource_id.into());
		self
	}

	pub fn ip(mut self, ip: impl Into<String>) -> Self {
		self.event.ip = ip.into();
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.event.user_agent = ua.into();
		self
	}

	pub fn success(mut self, success: bool) -> Self {
		self.event.success = success;
		self
	}

	/// Shorthand for `success(false)`.
	pub fn failed(self) -> Self {
		self.success(false)
	}

	/// Set the event time. Defaults to the enrichment time.
	pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.event.timestamp = Some(timestamp);
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.event.details = details;
		self
	}

	/// Override the classifier's severity.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.event.severity = Some(severity);
		self
	}

	/// Record the HTTP method and endpoint of the originating request.
	pub fn http(mut self, method: impl Into<String>, endpoint: impl Into<String>) -> Self {
		self.event.method = Some(method.into());
		self.event.endpoint = Some(endpoint.into());
		self
	}

	pub fn status_code(mut self, status: u16) -> Self {
		self.event.status_code = Some(status);
		self
	}

	pub fn duration_ms(mut self, duration_ms: u64) -> Self {
		self.event.duration_ms = Some(duration_ms);
		self
	}

	pub fn build(self) -> NewAuditEvent {
		self.event
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod audit_action {
		use super::*;

		#[test]
		fn test_known_actions_round_trip_through_strings() {
			for action in AuditAction::known() {
				let s: String = action.clone().into();
				assert_eq!(AuditAction::from(s), *action);
			}
		}

		#[test]
		fn test_unknown_string_becomes_custom() {
			let action = AuditAction::from("THREAD_PIN");
			assert_eq!(action, AuditAction::Custom("THREAD_PIN".to_string()));
			assert_eq!(action.to_string(), "THREAD_PIN");
		}

		#[test]
		fn test_custom_with_known_name_normalizes() {
			let action = AuditAction::from("LOGIN_FAILED".to_string());
			assert_eq!(action, AuditAction::LoginFailed);
		}

		#[test]
		fn test_matching_is_case_sensitive() {
			assert_eq!(
				AuditAction::from("login_failed"),
				AuditAction::Custom("login_failed".to_string())
			);
		}

		#[test]
		fn test_serializes_as_plain_string() {
			let json = serde_json::to_string(&AuditAction::CsrfViolation).unwrap();
			assert_eq!(json, "\"CSRF_VIOLATION\"");

			let parsed: AuditAction = serde_json::from_str("\"POST_CREATE\"").unwrap();
			assert_eq!(parsed, AuditAction::PostCreate);
		}
	}

	mod audit_severity {
		use super::*;

		#[test]
		fn test_ordering_higher_severity_is_greater() {
			assert!(AuditSeverity::Critical > AuditSeverity::High);
			assert!(AuditSeverity::High > AuditSeverity::Medium);
			assert!(AuditSeverity::Medium > AuditSeverity::Low);
		}

		#[test]
		fn test_parses_case_insensitively() {
			assert_eq!("HIGH".parse::<AuditSeverity>(), Ok(AuditSeverity::High));
			assert!("severe".parse::<AuditSeverity>().is_err());
		}

		#[test]
		fn test_serializes_lowercase() {
			let json = serde_json::to_string(&AuditSeverity::Critical).unwrap();
			assert_eq!(json, "\"critical\"");
		}
	}

	mod builder {
		use super::*;

		#[test]
		fn test_defaults_are_unresolved() {
			let event = NewAuditEvent::builder(AuditAction::PostCreate, "post").build();
			assert!(event.event_id.is_none());
			assert!(event.timestamp.is_none());
			assert!(event.severity.is_none());
			assert!(event.success);
			assert_eq!(event.ip, UNKNOWN);
			assert_eq!(event.user_agent, UNKNOWN);
			assert_eq!(event.details, serde_json::Value::Null);
		}

		#[test]
		fn test_sets_all_fields() {
			let id = Uuid::new_v4();
			let ts = Utc::now();
			let event = NewAuditEvent::builder(AuditAction::LoginFailed, "auth")
				.event_id(id)
				.user("user-1")
				.session("sess-1")
				.resource_id("login")
				.ip("10.0.0.1")
				.user_agent("curl/8")
				.failed()
				.timestamp(ts)
				.details(serde_json::json!({"reason": "bad password"}))
				.severity(AuditSeverity::Critical)
				.http("POST", "/api/auth/login")
				.status_code(401)
				.duration_ms(12)
				.build();

			assert_eq!(event.event_id, Some(id));
			assert_eq!(event.user_id.as_deref(), Some("user-1"));
			assert_eq!(event.session_id.as_deref(), Some("sess-1"));
			assert_eq!(event.resource_id.as_deref(), Some("login"));
			assert_eq!(event.ip, "10.0.0.1");
			assert!(!event.success);
			assert_eq!(event.timestamp, Some(ts));
			assert_eq!(event.severity, Some(AuditSeverity::Critical));
			assert_eq!(event.method.as_deref(), Some("POST"));
			assert_eq!(event.endpoint.as_deref(), Some("/api/auth/login"));
			assert_eq!(event.status_code, Some(401));
			assert_eq!(event.duration_ms, Some(12));
		}
	}
}
