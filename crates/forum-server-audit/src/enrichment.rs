// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::classify::{classify, fingerprint};
use crate::event::{AuditEvent, NewAuditEvent};

/// Resolve every derived field of a submitted event.
///
/// Keeps a caller-supplied id and timestamp; otherwise assigns a fresh v4 id
/// and `now`.
pub fn enrich(event: NewAuditEvent, now: DateTime<Utc>) -> AuditEvent {
	let severity = classify(&event);
	let fingerprint = fingerprint(&event);

	AuditEvent {
		event_id: event.event_id.unwrap_or_else(Uuid::new_v4),
		user_id: event.user_id,
		session_id: event.session_id,
		action: event.action,
		resource: event.resource,
		resource_id: event.resource_id,
		ip: event.ip,
		user_agent: event.user_agent,
		success: event.success,
		timestamp: event.timestamp.unwrap_or(now),
		details: event.details,
		severity,
		method: event.method,
		endpoint: event.endpoint,
		status_code: event.status_code,
		duration_ms: event.duration_ms,
		fingerprint,
	}
}
