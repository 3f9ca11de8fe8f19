// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{rank_actions, AuditCounts, AuditPage, AuditQuery, AuditStore, AuditStoreError};
use crate::event::AuditEvent;

/// In-process store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
	events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.events.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.events.read().await.is_empty()
	}

	/// Snapshot of every stored event in insertion order.
	pub async fn events(&self) -> Vec<AuditEvent> {
		self.events.read().await.clone()
	}
}

fn insert(events: &mut Vec<AuditEvent>, event: &AuditEvent) -> Result<(), AuditStoreError> {
	if events.iter().any(|e| e.event_id == event.event_id) {
		return Err(AuditStoreError::Permanent(format!(
			"duplicate event_id {}",
			event.event_id
		)));
	}
	events.push(event.clone());
	Ok(())
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
	fn name(&self) -> &str {
		"memory"
	}

	async fn persist(&self, event: &AuditEvent) -> Result<(), AuditStoreError> {
		insert(&mut *self.events.write().await, event)
	}

	async fn persist_many(&self, events: &[AuditEvent]) -> Result<(), AuditStoreError> {
		let mut stored = self.events.write().await;
		for event in events {
			insert(&mut stored, event)?;
		}
		Ok(())
	}

	async fn query(&self, query: &AuditQuery) -> Result<AuditPage, AuditStoreError> {
		let limit = query.effective_limit();
		let offset = query.effective_offset();

		let mut matching: Vec<AuditEvent> = self
			.events
			.read()
			.await
			.iter()
			.filter(|e| query.matches(e))
			.cloned()
			.collect();
		matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

		let total = matching.len() as u64;
		let events = matching
			.into_iter()
			.skip(offset as usize)
			.take(limit as usize)
			.collect();

		Ok(AuditPage {
			events,
			total,
			limit,
			offset,
		})
	}

	async fn aggregate_counts(
		&self,
		since: DateTime<Utc>,
	) -> Result<AuditCounts, AuditStoreError> {
		let events = self.events.read().await;
		let mut counts = AuditCounts::default();
		let mut actions: HashMap<String, u64> = HashMap::new();

		for event in events.iter().filter(|e| e.timestamp >= since) {
			counts.total += 1;
			if !event.success {
				counts.failed += 1;
			}
			*counts.by_severity.entry(event.severity).or_insert(0) += 1;
			*actions.entry(event.action.to_string()).or_insert(0) += 1;
		}

		counts.top_actions = rank_actions(actions);
		Ok(counts)
	}

	async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditStoreError> {
		let mut events = self.events.write().await;
		let before = events.len();
		events.retain(|e| e.timestamp >= cutoff);
		Ok((before - events.len()) as u64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::enrichment::enrich;
	use crate::event::{AuditAction, AuditSeverity, NewAuditEvent};
	use chrono::Duration;

	fn at(action: AuditAction, ts: DateTime<Utc>) -> AuditEvent {
		enrich(
			NewAuditEvent::builder(action, "test").timestamp(ts).build(),
			Utc::now(),
		)
	}

	#[tokio::test]
	async fn test_rejects_duplicate_ids() {
		let store = MemoryAuditStore::new();
		let event = at(AuditAction::Logout, Utc::now());
		store.persist(&event).await.unwrap();
		let err = store.persist(&event).await.unwrap_err();
		assert!(!err.is_transient());
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn test_persist_many_is_not_atomic() {
		let store = MemoryAuditStore::new();
		let first = at(AuditAction::Logout, Utc::now());
		let second = at(AuditAction::Register, Utc::now());

		let result = store
			.persist_many(&[first.clone(), second.clone(), first.clone()])
			.await;

		assert!(result.is_err());
		assert_eq!(store.len().await, 2);
	}

	#[tokio::test]
	async fn test_query_returns_newest_first_with_total() {
		let store = MemoryAuditStore::new();
		let now = Utc::now();
		for i in 0..5 {
			store
				.persist(&at(AuditAction::PostCreate, now - Duration::minutes(i)))
				.await
				.unwrap();
		}

		let page = store
			.query(&AuditQuery {
				limit: Some(2),
				offset: Some(1),
				..Default::default()
			})
			.await
			.unwrap();

		assert_eq!(page.total, 5);
		assert_eq!(page.events.len(), 2);
		assert_eq!(page.events[0].timestamp, now - Duration::minutes(1));
		assert_eq!(page.events[1].timestamp, now - Duration::minutes(2));
	}

	#[tokio::test]
	async fn test_aggregate_counts_since() {
		let store = MemoryAuditStore::new();
		let now = Utc::now();
		store
			.persist(&at(AuditAction::LoginFailed, now - Duration::days(2)))
			.await
			.unwrap();
		let mut failed = at(AuditAction::LoginFailed, now);
		failed.success = false;
		store.persist(&failed).await.unwrap();
		store
			.persist(&at(AuditAction::LoginSuccess, now))
			.await
			.unwrap();

		let counts = store
			.aggregate_counts(now - Duration::hours(1))
			.await
			.unwrap();

		assert_eq!(counts.total, 2);
		assert_eq!(counts.failed, 1);
		assert_eq!(counts.by_severity[&AuditSeverity::High], 1);
		assert_eq!(counts.by_severity[&AuditSeverity::Medium], 1);
		assert_eq!(counts.by_severity[&AuditSeverity::Critical], 0);
		assert_eq!(counts.top_actions.len(), 2);
	}

	#[tokio::test]
	async fn test_delete_older_than_ignores_severity() {
		let store = MemoryAuditStore::new();
		let now = Utc::now();
		let mut expired = at(AuditAction::AdminAccess, now - Duration::days(95));
		expired.success = false;
		store.persist(&expired).await.unwrap();
		store
			.persist(&at(AuditAction::PostCreate, now - Duration::days(10)))
			.await
			.unwrap();

		let deleted = store
			.delete_older_than(now - Duration::days(90))
			.await
			.unwrap();

		assert_eq!(deleted, 1);
		let remaining = store.events().await;
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].action, AuditAction::PostCreate);
	}
}
