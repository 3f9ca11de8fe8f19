// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stateless double-submit tokens.
//!
//! The cookie carries a random token and the form carries
//! `hex(HMAC-SHA256(secret, cookie_token))`. Verification recomputes the MAC,
//! so no server-side state is needed.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::token::{CsrfTokenService, CSRF_TOKEN_BYTES};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleSubmitToken {
	pub cookie_token: String,
	pub form_token: String,
}

fn sign(secret: &[u8], cookie_token: &str) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(cookie_token.as_bytes());
	hex::encode(mac.finalize().into_bytes())
}

impl CsrfTokenService {
	pub fn generate_double_submit_token(&self) -> DoubleSubmitToken {
		let cookie_token = Self::generate_secure_token(CSRF_TOKEN_BYTES);
		let form_token = sign(self.secret.expose().as_bytes(), &cookie_token);
		DoubleSubmitToken {
			cookie_token,
			form_token,
		}
	}

	/// Recompute the MAC over `cookie_token` and compare it with `form_token`
	/// in constant time.
	pub fn verify_double_submit_token(&self, cookie_token: &str, form_token: &str) -> bool {
		if cookie_token.is_empty() || form_token.is_empty() {
			return false;
		}

		let Ok(presented) = hex::decode(form_token) else {
			return false;
		};

		let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.expose().as_bytes()) else {
			return false;
		};
		mac.update(cookie_token.as_bytes());
		mac.verify_slice(&presented).is_ok()
	}
}
