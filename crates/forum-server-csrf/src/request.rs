// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;

use async_trait::async_trait;
use http::{HeaderMap, Request};
use thiserror::Error;
use tracing::{debug, warn};

use crate::token::CsrfTokenService;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_QUERY_PARAM: &str = "csrf_token";

/// The authenticated caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub user_id: String,
	pub session_id: Option<String>,
	/// Token issued to this session, if any.
	pub csrf_token: Option<String>,
}

#[derive(Error, Debug)]
pub enum IdentityError {
	#[error("identity provider unavailable: {0}")]
	Unavailable(String),

	#[error("invalid session: {0}")]
	InvalidSession(String),
}

/// Resolves the caller's identity from request headers (cookies, bearer
/// tokens). Implemented by the session layer.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
	async fn identity(&self, headers: &HeaderMap) -> Result<Option<Identity>, IdentityError>;
}

fn non_empty(value: &str) -> Option<String> {
	let value = value.trim();
	(!value.is_empty()).then(|| value.to_string())
}

impl CsrfTokenService {
	/// The presented token: the `x-csrf-token` header, else the
	/// `csrf_token` query parameter.
	pub fn extract_token_from_request<B>(&self, req: &Request<B>) -> Option<String> {
		if let Some(token) = req
			.headers()
			.get(CSRF_HEADER)
			.and_then(|v| v.to_str().ok())
			.and_then(non_empty)
		{
			return Some(token);
		}

		let query = req.uri().query()?;
		url::form_urlencoded::parse(query.as_bytes())
			.find(|(key, _)| key == CSRF_QUERY_PARAM)
			.and_then(|(_, value)| non_empty(&value))
	}

	/// Check the presented token against the one issued to the caller's
	/// session. Any missing piece or lookup failure yields `false`.
	///
	/// Everything needed from `req` is read before the returned future is
	/// created, so the future does not borrow the request.
	pub fn verify_request<'a, B>(
		&'a self,
		req: &Request<B>,
		identity: &'a dyn IdentityProvider,
	) -> impl Future<Output = bool> + Send + 'a {
		let presented = self.extract_token_from_request(req);
		let headers = req.headers().clone();

		async move {
			let identity = match identity.identity(&headers).await {
				Ok(Some(identity)) => identity,
				Ok(None) => {
					debug!("csrf verification failed: no authenticated identity");
					return false;
				}
				Err(e) => {
					warn!(error = %e, "csrf verification failed: identity lookup error");
					return false;
				}
			};

			let Some(stored) = identity.csrf_token else {
				debug!(user_id = %identity.user_id, "csrf verification failed: no token issued");
				return false;
			};

			let Some(presented) = presented else {
				debug!(user_id = %identity.user_id, "csrf verification failed: no token presented");
				return false;
			};

			self.verify_token(&stored, &presented)
		}
	}
}
