// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use forum_server_config::CsrfConfig;

/// Methods that change state and therefore need a token.
pub const PROTECTED_METHODS: &[&str] = &["POST", "PUT", "DELETE", "PATCH"];

/// Path prefixes that never need a token: identity-provider callbacks,
/// health probes and the public API.
pub const DEFAULT_EXEMPT_PREFIXES: &[&str] = &["/api/auth/", "/api/health", "/api/public/"];

pub fn requires_csrf_protection(method: &str) -> bool {
	PROTECTED_METHODS
		.iter()
		.any(|m| m.eq_ignore_ascii_case(method))
}

/// Plain prefix match, so `/api/health` also covers `/api/healthz`.
pub fn is_csrf_exempt(pathname: &str) -> bool {
	DEFAULT_EXEMPT_PREFIXES
		.iter()
		.any(|prefix| pathname.starts_with(prefix))
}

/// The request policy with additional deployment-specific exemptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfGuard {
	extra_exempt_prefixes: Vec<String>,
}

impl CsrfGuard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_exempt_prefixes<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			extra_exempt_prefixes: prefixes.into_iter().map(Into::into).collect(),
		}
	}

	pub fn from_config(config: &CsrfConfig) -> Self {
		Self::with_exempt_prefixes(config.exempt_paths.iter().cloned())
	}

	pub fn is_exempt(&self, pathname: &str) -> bool {
		is_csrf_exempt(pathname)
			|| self
				.extra_exempt_prefixes
				.iter()
				.any(|prefix| pathname.starts_with(prefix.as_str()))
	}

	/// Whether a request with this method and path must carry a valid token.
	pub fn requires_protection(&self, method: &str, pathname: &str) -> bool {
		requires_csrf_protection(method) && !self.is_exempt(pathname)
	}
}
