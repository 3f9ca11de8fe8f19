// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Axum middleware enforcing the CSRF policy.
//!
//! Every protected request leaves an audit record: a low-severity
//! `CSRF_VERIFIED` event when the token checks out, a `CSRF_VIOLATION`
//! (403) when it does not. Safe and exempt requests are not recorded.
//!
//! ```ignore
//! let state = CsrfState::new(service, guard, identity, audit_logger);
//! let app = Router::new()
//!     .route("/api/posts", post(create_post))
//!     .layer(axum::middleware::from_fn_with_state(state, csrf_middleware));
//! ```

use std::sync::Arc;

use axum::{
	extract::{Request, State},
	http::{HeaderMap, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
};
use tracing::warn;

use forum_server_audit::{AuditAction, AuditLogger, AuditSeverity, NewAuditEvent};

use crate::guard::CsrfGuard;
use crate::request::IdentityProvider;
use crate::token::CsrfTokenService;

#[derive(Clone)]
pub struct CsrfState {
	pub service: Arc<CsrfTokenService>,
	pub guard: Arc<CsrfGuard>,
	pub identity: Arc<dyn IdentityProvider>,
	pub audit: AuditLogger,
}

impl CsrfState {
	pub fn new(
		service: CsrfTokenService,
		guard: CsrfGuard,
		identity: Arc<dyn IdentityProvider>,
		audit: AuditLogger,
	) -> Self {
		Self {
			service: Arc::new(service),
			guard: Arc::new(guard),
			identity,
			audit,
		}
	}
}

/// Best-effort client address: first `x-forwarded-for` hop, then
/// `x-real-ip`, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
	headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.or_else(|| {
			headers
				.get("x-real-ip")
				.and_then(|v| v.to_str().ok())
				.map(str::trim)
				.filter(|v| !v.is_empty())
		})
		.unwrap_or(forum_server_audit::event::UNKNOWN)
		.to_string()
}

/// Action recorded for a protected request whose token verified.
pub const CSRF_VERIFIED: &str = "CSRF_VERIFIED";

fn verification_event(request: &Request, passed: bool) -> NewAuditEvent {
	let headers = request.headers();
	let path = request.uri().path();
	let user_agent = headers
		.get(http::header::USER_AGENT)
		.and_then(|v| v.to_str().ok())
		.unwrap_or(forum_server_audit::event::UNKNOWN);

	let action = if passed {
		AuditAction::from(CSRF_VERIFIED)
	} else {
		AuditAction::CsrfViolation
	};

	let builder = NewAuditEvent::builder(action, "csrf")
		.resource_id(path)
		.ip(client_ip(headers))
		.user_agent(user_agent)
		.http(request.method().as_str(), path);

	if passed {
		builder.severity(AuditSeverity::Low).build()
	} else {
		builder
			.failed()
			.status_code(StatusCode::FORBIDDEN.as_u16())
			.details(serde_json::json!({ "reason": "missing or invalid csrf token" }))
			.build()
	}
}

pub async fn csrf_middleware(
	State(state): State<CsrfState>,
	request: Request,
	next: Next,
) -> Response {
	let protected = state
		.guard
		.requires_protection(request.method().as_str(), request.uri().path());
	if !protected {
		return next.run(request).await;
	}

	let verification = state
		.service
		.verify_request(&request, state.identity.as_ref());
	if verification.await {
		state.audit.submit(verification_event(&request, true));
		return next.run(request).await;
	}

	warn!(
		method = %request.method(),
		path = request.uri().path(),
		"CSRF verification failed"
	);
	state.audit.submit(verification_event(&request, false));

	(StatusCode::FORBIDDEN, "CSRF token missing or invalid").into_response()
}
