// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stateful CSRF tokens bound to a session.
//!
//! A token is 32 random bytes, hex encoded, issued alongside a session and
//! presented back by the client on every state-changing request. Every
//! verification returns `bool` and fails closed: malformed input, length
//! mismatches and expired tokens all yield `false`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;

use forum_server_config::{CsrfConfig, SecretString};

/// Random bytes in a session-bound token.
pub const CSRF_TOKEN_BYTES: usize = 32;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfTokenData {
	/// 64 lowercase hex characters.
	pub token: String,
	pub issued_at: DateTime<Utc>,
	pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CsrfTokenService {
	pub(crate) secret: SecretString,
	ttl: Duration,
}

impl CsrfTokenService {
	pub fn new(secret: SecretString, ttl: Duration) -> Self {
		Self { secret, ttl }
	}

	pub fn from_config(config: &CsrfConfig) -> Self {
		Self::new(
			config.secret.clone(),
			Duration::from_secs(config.token_ttl_secs),
		)
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Issue a fresh token, optionally bound to a session.
	pub fn generate_token(&self, session_id: Option<&str>) -> CsrfTokenData {
		CsrfTokenData {
			token: Self::generate_secure_token(CSRF_TOKEN_BYTES),
			issued_at: Utc::now(),
			session_id: session_id.map(str::to_string),
		}
	}

	/// Hex encoding of `bytes` bytes from the OS RNG.
	pub fn generate_secure_token(bytes: usize) -> String {
		let mut buf = vec![0u8; bytes];
		rand::rngs::OsRng.fill_bytes(&mut buf);
		hex::encode(buf)
	}

	/// Constant-time comparison of two hex tokens.
	pub fn verify_token(&self, stored: &str, presented: &str) -> bool {
		constant_time_hex_eq(stored, presented)
	}

	/// Verify a presented token against issued token data, enforcing the TTL.
	pub fn verify_token_data(&self, data: &CsrfTokenData, presented: &str) -> bool {
		self.verify_token_data_at(data, presented, Utc::now())
	}

	/// [`CsrfTokenService::verify_token_data`] evaluated at `now`.
	pub fn verify_token_data_at(
		&self,
		data: &CsrfTokenData,
		presented: &str,
		now: DateTime<Utc>,
	) -> bool {
		if self.is_expired(data.issued_at, now) {
			debug!(issued_at = %data.issued_at, "csrf token expired");
			return false;
		}
		self.verify_token(&data.token, presented)
	}

	fn is_expired(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
		// A negative age (issued in the future) does not convert and is not expired.
		match (now - issued_at).to_std() {
			Ok(age) => age > self.ttl,
			Err(_) => false,
		}
	}
}

/// Decode both sides as hex and compare in constant time.
///
/// Returns `false` for empty input, malformed hex or differing lengths.
pub fn constant_time_hex_eq(a: &str, b: &str) -> bool {
	if a.is_empty() || b.is_empty() {
		return false;
	}

	let (Ok(a), Ok(b)) = (hex::decode(a), hex::decode(b)) else {
		return false;
	};

	if a.len() != b.len() {
		return false;
	}

	a.ct_eq(&b).into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration as ChronoDuration;
	use proptest::prelude::*;

	fn service() -> CsrfTokenService {
		CsrfTokenService::new(
			SecretString::new("test-secret".to_string()),
			DEFAULT_TOKEN_TTL,
		)
	}

	#[test]
	fn test_generated_token_shape() {
		let data = service().generate_token(Some("sess-1"));
		assert_eq!(data.token.len(), 64);
		assert!(data.token.chars().all(|c| c.is_ascii_hexdigit()));
		assert_eq!(data.session_id.as_deref(), Some("sess-1"));
	}

	#[test]
	fn test_generated_tokens_differ() {
		let svc = service();
		assert_ne!(svc.generate_token(None).token, svc.generate_token(None).token);
	}

	#[test]
	fn test_secure_token_length_follows_bytes() {
		assert_eq!(CsrfTokenService::generate_secure_token(16).len(), 32);
		assert_eq!(CsrfTokenService::generate_secure_token(0), "");
	}

	#[test]
	fn test_verify_token_accepts_identical() {
		let svc = service();
		let data = svc.generate_token(None);
		assert!(svc.verify_token(&data.token, &data.token));
	}

	#[test]
	fn test_verify_token_is_case_insensitive_hex() {
		let svc = service();
		let data = svc.generate_token(None);
		assert!(svc.verify_token(&data.token, &data.token.to_uppercase()));
	}

	#[test]
	fn test_verify_token_rejects_malformed() {
		let svc = service();
		let data = svc.generate_token(None);
		assert!(!svc.verify_token(&data.token, "not-hex"));
		assert!(!svc.verify_token(&data.token, &data.token[..63]));
		assert!(!svc.verify_token(&data.token, &data.token[..62]));
		assert!(!svc.verify_token(&data.token, ""));
		assert!(!svc.verify_token("", ""));
	}

	#[test]
	fn test_verify_token_rejects_single_bit_flip() {
		let svc = service();
		let data = svc.generate_token(None);
		let mut bytes = hex::decode(&data.token).unwrap();
		bytes[31] ^= 0x01;
		assert!(!svc.verify_token(&data.token, &hex::encode(bytes)));
	}

	#[test]
	fn test_ttl_boundary() {
		let svc = service();
		let now = Utc::now();
		let mut data = svc.generate_token(None);

		data.issued_at = now - ChronoDuration::seconds(3600) + ChronoDuration::milliseconds(1);
		assert!(svc.verify_token_data_at(&data, &data.token.clone(), now));

		data.issued_at = now - ChronoDuration::seconds(3600);
		assert!(svc.verify_token_data_at(&data, &data.token.clone(), now));

		data.issued_at = now - ChronoDuration::seconds(3600) - ChronoDuration::milliseconds(1);
		assert!(!svc.verify_token_data_at(&data, &data.token.clone(), now));
	}

	#[test]
	fn test_expired_token_rejected_before_compare() {
		let svc = service();
		let mut data = svc.generate_token(None);
		data.issued_at = Utc::now() - ChronoDuration::hours(2);
		let token = data.token.clone();
		assert!(!svc.verify_token_data(&data, &token));
	}

	#[test]
	fn test_fresh_token_data_verifies() {
		let svc = service();
		let data = svc.generate_token(Some("sess"));
		assert!(svc.verify_token_data(&data, &data.token));
		assert!(!svc.verify_token_data(&data, &svc.generate_token(None).token));
	}

	#[test]
	fn test_ttl_comes_from_config() {
		let config = CsrfConfig {
			secret: SecretString::new("k".to_string()),
			token_ttl_secs: 60,
			exempt_paths: Vec::new(),
		};
		assert_eq!(
			CsrfTokenService::from_config(&config).ttl(),
			Duration::from_secs(60)
		);
	}

	proptest! {
		#[test]
		fn test_compare_matches_equality(a in proptest::collection::vec(any::<u8>(), 1..48),
			b in proptest::collection::vec(any::<u8>(), 1..48)) {
			let (ha, hb) = (hex::encode(&a), hex::encode(&b));
			prop_assert_eq!(constant_time_hex_eq(&ha, &hb), a == b);
			prop_assert!(constant_time_hex_eq(&ha, &ha));
		}

		#[test]
		fn test_compare_never_panics(a in ".{0,80}", b in ".{0,80}") {
			let _ = constant_time_hex_eq(&a, &b);
		}
	}
}
