// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CSRF protection for the forum.
//!
//! Two token schemes are supported:
//! - session-bound tokens ([`CsrfTokenService::generate_token`]) checked
//!   against the token stored with the caller's session;
//! - stateless double-submit tokens
//!   ([`CsrfTokenService::generate_double_submit_token`]) signed with the
//!   configured secret.
//!
//! [`CsrfGuard`] decides which requests need a token and
//! [`middleware::csrf_middleware`] enforces it in an axum router.

pub mod double_submit;
pub mod guard;
pub mod middleware;
pub mod request;
pub mod token;

pub use double_submit::DoubleSubmitToken;
pub use guard::{is_csrf_exempt, requires_csrf_protection, CsrfGuard};
pub use middleware::{csrf_middleware, CsrfState};
pub use request::{Identity, IdentityError, IdentityProvider, CSRF_HEADER, CSRF_QUERY_PARAM};
pub use token::{constant_time_hex_eq, CsrfTokenData, CsrfTokenService};
