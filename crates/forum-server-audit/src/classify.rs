// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure severity classification and fingerprinting.

use sha2::{Digest, Sha256};

use crate::event::{AuditSeverity, NewAuditEvent};

/// Number of hex characters kept from the fingerprint digest.
pub const FINGERPRINT_LEN: usize = 16;

pub const HIGH_RISK_ACTIONS: &[&str] = &[
	"LOGIN_FAILED",
	"RATE_LIMIT_EXCEEDED",
	"CSRF_VIOLATION",
	"XSS_ATTEMPT",
	"UNAUTHORIZED_ACCESS",
];

pub const CRITICAL_ACTIONS: &[&str] = &[
	"ADMIN_ACCESS",
	"USER_ROLE_CHANGE",
	"SYSTEM_CONFIG_CHANGE",
	"PASSWORD_CHANGE",
];

pub const MEDIUM_RISK_ACTIONS: &[&str] = &["LOGIN_SUCCESS", "DATA_MODIFICATION", "EMAIL_CHANGE"];

/// Ordered action rules. The first set containing the action wins, so the
/// high-risk set shadows the critical set for any action listed in both.
pub const SEVERITY_RULES: &[(&[&str], AuditSeverity)] = &[
	(HIGH_RISK_ACTIONS, AuditSeverity::High),
	(CRITICAL_ACTIONS, AuditSeverity::Critical),
	(MEDIUM_RISK_ACTIONS, AuditSeverity::Medium),
];

/// Resolve the severity of an event.
///
/// An explicit severity is returned verbatim; otherwise the action is matched
/// against [`SEVERITY_RULES`] in order, falling back to `Low`.
pub fn classify(event: &NewAuditEvent) -> AuditSeverity {
	match event.severity {
		Some(severity) => severity,
		None => classify_action(event.action.as_str(), SEVERITY_RULES),
	}
}

fn classify_action(action: &str, rules: &[(&[&str], AuditSeverity)]) -> AuditSeverity {
	rules
		.iter()
		.find(|(actions, _)| actions.contains(&action))
		.map(|(_, severity)| *severity)
		.unwrap_or(AuditSeverity::Low)
}

/// Correlation key over `action|resource|user|ip`.
///
/// Timestamp and details do not participate, so repeats of the same event
/// shape from the same origin collide.
pub fn fingerprint(event: &NewAuditEvent) -> String {
	compute_fingerprint(
		event.action.as_str(),
		&event.resource,
		event.user_id.as_deref(),
		&event.ip,
	)
}

pub fn compute_fingerprint(action: &str, resource: &str, user_id: Option<&str>, ip: &str) -> String {
	let material = format!(
		"{}|{}|{}|{}",
		action,
		resource,
		user_id.unwrap_or("anonymous"),
		ip
	);
	let digest = Sha256::digest(material.as_bytes());
	let mut hex = hex::encode(digest);
	hex.truncate(FINGERPRINT_LEN);
	hex
}
