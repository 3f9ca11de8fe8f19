// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::error::AuditStoreError;
use crate::event::{AuditEvent, AuditSeverity};

pub mod memory;

#[cfg(feature = "store-sqlite")]
pub mod sqlite;

pub const DEFAULT_QUERY_LIMIT: u32 = 50;
pub const MAX_QUERY_LIMIT: u32 = 1000;
pub const TOP_ACTIONS_LIMIT: usize = 10;

/// Append-only persistence for audit events.
///
/// Events are never updated. The only removal path is
/// [`AuditStore::delete_older_than`].
#[async_trait]
pub trait AuditStore: Send + Sync {
	/// Unique name for this store (used in logs).
	fn name(&self) -> &str;

	async fn persist(&self, event: &AuditEvent) -> Result<(), AuditStoreError>;

	/// Insert several events. Not atomic: events written before a failure
	/// stay written.
	async fn persist_many(&self, events: &[AuditEvent]) -> Result<(), AuditStoreError>;

	/// Matching events, newest first, plus the total match count.
	async fn query(&self, query: &AuditQuery) -> Result<AuditPage, AuditStoreError>;

	/// Counts over every event at or after `since`.
	async fn aggregate_counts(&self, since: DateTime<Utc>)
		-> Result<AuditCounts, AuditStoreError>;

	/// Delete every event strictly older than `cutoff`, whatever its
	/// severity or outcome. Returns the number removed.
	async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditStoreError>;
}

/// Search filters. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
	/// Exact match.
	pub user_id: Option<String>,
	/// Case-insensitive substring match.
	pub action: Option<String>,
	/// Exact match.
	pub resource: Option<String>,
	pub severity: Option<AuditSeverity>,
	/// Inclusive lower bound.
	pub from: Option<DateTime<Utc>>,
	/// Inclusive upper bound.
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
}

impl AuditQuery {
	pub fn effective_limit(&self) -> u32 {
		self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT)
	}

	pub fn effective_offset(&self) -> u32 {
		self.offset.unwrap_or(0)
	}

	/// Whether `event` satisfies every filter, ignoring paging.
	pub fn matches(&self, event: &AuditEvent) -> bool {
		if let Some(user_id) = &self.user_id {
			if event.user_id.as_deref() != Some(user_id.as_str()) {
				return false;
			}
		}
		if let Some(action) = &self.action {
			if !event
				.action
				.as_str()
				.to_lowercase()
				.contains(&action.to_lowercase())
			{
				return false;
			}
		}
		if let Some(resource) = &self.resource {
			if &event.resource != resource {
				return false;
			}
		}
		if let Some(severity) = self.severity {
			if event.severity != severity {
				return false;
			}
		}
		if let Some(from) = self.from {
			if event.timestamp < from {
				return false;
			}
		}
		if let Some(to) = self.to {
			if event.timestamp > to {
				return false;
			}
		}
		true
	}
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
	pub events: Vec<AuditEvent>,
	/// Number of matching events across all pages.
	pub total: u64,
	pub limit: u32,
	pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
	pub action: String,
	pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
	pub total: u64,
	pub failed: u64,
	/// Always carries every severity, zero when absent.
	pub by_severity: BTreeMap<AuditSeverity, u64>,
	/// Most frequent actions, count descending then name ascending.
	pub top_actions: Vec<ActionCount>,
}

impl Default for AuditCounts {
	fn default() -> Self {
		Self {
			total: 0,
			failed: 0,
			by_severity: AuditSeverity::all().iter().map(|s| (*s, 0)).collect(),
			top_actions: Vec::new(),
		}
	}
}

/// Order action counts by frequency and keep the top entries.
pub(crate) fn rank_actions(counts: impl IntoIterator<Item = (String, u64)>) -> Vec<ActionCount> {
	let mut ranked: Vec<ActionCount> = counts
		.into_iter()
		.map(|(action, count)| ActionCount { action, count })
		.collect();
	ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action.cmp(&b.action)));
	ranked.truncate(TOP_ACTIONS_LIMIT);
	ranked
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::enrichment::enrich;
	use crate::event::{AuditAction, NewAuditEvent};
	use chrono::Duration;

	fn sample() -> AuditEvent {
		enrich(
			NewAuditEvent::builder(AuditAction::RateLimitExceeded, "api")
				.user("user-1")
				.build(),
			Utc::now(),
		)
	}

	#[test]
	fn test_limit_defaults_and_caps() {
		assert_eq!(AuditQuery::default().effective_limit(), 50);
		let q = AuditQuery {
			limit: Some(5000),
			..Default::default()
		};
		assert_eq!(q.effective_limit(), 1000);
	}

	#[test]
	fn test_action_filter_is_case_insensitive_substring() {
		let event = sample();
		let q = AuditQuery {
			action: Some("rate_limit".to_string()),
			..Default::default()
		};
		assert!(q.matches(&event));

		let q = AuditQuery {
			action: Some("LOGIN".to_string()),
			..Default::default()
		};
		assert!(!q.matches(&event));
	}

	#[test]
	fn test_time_range_is_inclusive() {
		let event = sample();
		let q = AuditQuery {
			from: Some(event.timestamp),
			to: Some(event.timestamp),
			..Default::default()
		};
		assert!(q.matches(&event));

		let q = AuditQuery {
			from: Some(event.timestamp + Duration::milliseconds(1)),
			..Default::default()
		};
		assert!(!q.matches(&event));
	}

	#[test]
	fn test_user_and_severity_are_exact() {
		let event = sample();
		let q = AuditQuery {
			user_id: Some("user".to_string()),
			..Default::default()
		};
		assert!(!q.matches(&event));

		let q = AuditQuery {
			user_id: Some("user-1".to_string()),
			severity: Some(AuditSeverity::High),
			..Default::default()
		};
		assert!(q.matches(&event));
	}

	#[test]
	fn test_rank_actions_orders_and_truncates() {
		let counts = (0..15).map(|i| (format!("A{i:02}"), (i % 4) as u64));
		let ranked = rank_actions(counts);
		assert_eq!(ranked.len(), TOP_ACTIONS_LIMIT);
		assert_eq!(ranked[0].count, 3);
		assert_eq!(ranked[0].action, "A03");
		assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
	}

	#[test]
	fn test_default_counts_include_every_severity() {
		let counts = AuditCounts::default();
		assert_eq!(counts.by_severity.len(), 4);
		assert!(counts.by_severity.values().all(|v| *v == 0));
	}
}
