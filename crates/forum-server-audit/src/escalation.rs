// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Escalation of events that need operator attention.
//!
//! Delivery integrations (paging, chat, webhooks) plug in behind
//! [`EscalationHook`]. The default hook only emits a structured warning.

use async_trait::async_trait;
use tracing::warn;

use crate::error::AuditResult;
use crate::event::{AuditEvent, AuditSeverity};

/// Actions escalated regardless of their resolved severity.
pub const ESCALATED_ACTIONS: &[&str] = &["CSRF_VIOLATION", "XSS_ATTEMPT", "UNAUTHORIZED_ACCESS"];

/// Whether an enriched event must be handed to the escalation hook.
pub fn requires_escalation(event: &AuditEvent) -> bool {
	event.severity == AuditSeverity::Critical || ESCALATED_ACTIONS.contains(&event.action.as_str())
}

#[async_trait]
pub trait EscalationHook: Send + Sync {
	fn name(&self) -> &str;

	async fn escalate(&self, event: &AuditEvent) -> AuditResult<()>;
}

/// Emits escalations as `warn!` events on the `forum_audit` target.
#[derive(Debug, Clone, Default)]
pub struct TracingEscalationHook;

impl TracingEscalationHook {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl EscalationHook for TracingEscalationHook {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn escalate(&self, event: &AuditEvent) -> AuditResult<()> {
		warn!(
			target: "forum_audit",
			event_id = %event.event_id,
			action = %event.action,
			severity = %event.severity,
			resource = %event.resource,
			user_id = event.user_id.as_deref().unwrap_or("anonymous"),
			ip = %event.ip,
			success = event.success,
			fingerprint = %event.fingerprint,
			endpoint = event.endpoint.as_deref(),
			"security event escalated"
		);
		Ok(())
	}
}
