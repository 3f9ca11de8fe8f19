// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The audit logging facade used by request handlers.
//!
//! [`AuditLogger`] is constructed once at startup and cloned into every
//! handler that records events. Recording never fails from the caller's
//! point of view: storage and escalation errors are reported through
//! `tracing` and dropped. Administrative operations ([`AuditLogger::search`],
//! [`AuditLogger::get_stats`], [`AuditLogger::cleanup`]) do surface errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use forum_server_config::AuditConfig;

use crate::enrichment::enrich;
use crate::error::{AuditError, AuditResult};
use crate::escalation::{requires_escalation, EscalationHook, TracingEscalationHook};
use crate::event::{AuditEvent, AuditSeverity, NewAuditEvent, DEFAULT_AUDIT_RETENTION_DAYS};
use crate::store::{ActionCount, AuditPage, AuditQuery, AuditStore};

/// Statistics window for [`AuditLogger::get_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
	Hour,
	#[default]
	Day,
	Week,
	/// Thirty days.
	Month,
}

impl Timeframe {
	pub fn duration(&self) -> Duration {
		match self {
			Timeframe::Hour => Duration::hours(1),
			Timeframe::Day => Duration::days(1),
			Timeframe::Week => Duration::weeks(1),
			Timeframe::Month => Duration::days(30),
		}
	}
}

impl fmt::Display for Timeframe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Timeframe::Hour => "hour",
			Timeframe::Day => "day",
			Timeframe::Week => "week",
			Timeframe::Month => "month",
		};
		f.write_str(s)
	}
}

impl FromStr for Timeframe {
	type Err = AuditError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"hour" => Ok(Timeframe::Hour),
			"day" => Ok(Timeframe::Day),
			"week" => Ok(Timeframe::Week),
			"month" => Ok(Timeframe::Month),
			_ => Err(AuditError::InvalidTimeframe(s.to_string())),
		}
	}
}

/// Aggregate view over one [`Timeframe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
	pub timeframe: Timeframe,
	pub since: DateTime<Utc>,
	pub total: u64,
	pub failed: u64,
	/// Percentage of successful events, two decimals. Zero when `total` is zero.
	pub success_rate: f64,
	pub by_severity: BTreeMap<AuditSeverity, u64>,
	pub top_actions: Vec<ActionCount>,
}

fn success_rate(total: u64, failed: u64) -> f64 {
	if total == 0 {
		return 0.0;
	}
	let succeeded = total.saturating_sub(failed) as f64;
	(succeeded / total as f64 * 10_000.0).round() / 100.0
}

#[derive(Clone)]
pub struct AuditLogger {
	store: Arc<dyn AuditStore>,
	escalation: Arc<dyn EscalationHook>,
	enabled: bool,
	retention_days: i64,
}

impl AuditLogger {
	/// Enabled logger with the default tracing escalation hook.
	pub fn new(store: Arc<dyn AuditStore>) -> Self {
		Self {
			store,
			escalation: Arc::new(TracingEscalationHook::new()),
			enabled: true,
			retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
		}
	}

	pub fn from_config(store: Arc<dyn AuditStore>, config: &AuditConfig) -> Self {
		Self {
			enabled: config.enabled,
			retention_days: config.retention_days,
			..Self::new(store)
		}
	}

	pub fn with_escalation(mut self, hook: Arc<dyn EscalationHook>) -> Self {
		self.escalation = hook;
		self
	}

	pub fn store(&self) -> &Arc<dyn AuditStore> {
		&self.store
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn retention_days(&self) -> i64 {
		self.retention_days
	}

	/// Record one event. Never fails.
	#[instrument(skip(self, event), fields(action = %event.action))]
	pub async fn log(&self, event: NewAuditEvent) {
		if !self.enabled {
			debug!("audit logging disabled, dropping event");
			return;
		}

		let event = enrich(event, Utc::now());

		if let Err(e) = self.store.persist(&event).await {
			error!(
				store = self.store.name(),
				event_id = %event.event_id,
				action = %event.action,
				severity = %event.severity,
				transient = e.is_transient(),
				error = %e,
				"failed to persist audit event"
			);
		}

		self.escalate_if_required(&event).await;
	}

	/// Record an event in the background. The caller never observes the
	/// outcome.
	pub fn submit(&self, event: NewAuditEvent) {
		if !self.enabled {
			return;
		}

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				let logger = self.clone();
				handle.spawn(async move {
					logger.log(event).await;
				});
			}
			Err(_) => {
				warn!(action = %event.action, "no tokio runtime available, dropping audit event");
			}
		}
	}

	/// Record several events with one bulk write.
	///
	/// Unlike [`AuditLogger::log`] a storage failure is returned. The write
	/// is not atomic and is not retried; escalation runs only after a
	/// successful write.
	#[instrument(skip(self, events), fields(count = events.len()))]
	pub async fn log_batch(&self, events: Vec<NewAuditEvent>) -> AuditResult<usize> {
		if !self.enabled || events.is_empty() {
			return Ok(0);
		}

		let now = Utc::now();
		let enriched: Vec<AuditEvent> = events.into_iter().map(|e| enrich(e, now)).collect();

		self.store
			.persist_many(&enriched)
			.await
			.map_err(|source| AuditError::StoreError {
				store: self.store.name().to_string(),
				source,
			})?;

		for event in &enriched {
			self.escalate_if_required(event).await;
		}

		Ok(enriched.len())
	}

	#[instrument(skip(self))]
	pub async fn search(&self, query: &AuditQuery) -> AuditResult<AuditPage> {
		self.store
			.query(query)
			.await
			.map_err(|source| self.store_error(source))
	}

	#[instrument(skip(self))]
	pub async fn get_stats(&self, timeframe: Timeframe) -> AuditResult<AuditStats> {
		let since = Utc::now() - timeframe.duration();
		let counts = self
			.store
			.aggregate_counts(since)
			.await
			.map_err(|source| self.store_error(source))?;

		Ok(AuditStats {
			timeframe,
			since,
			total: counts.total,
			failed: counts.failed,
			success_rate: success_rate(counts.total, counts.failed),
			by_severity: counts.by_severity,
			top_actions: counts.top_actions,
		})
	}

	/// Delete every event older than `retention_days`, regardless of
	/// severity. Returns the number deleted.
	#[instrument(skip(self))]
	pub async fn cleanup(&self, retention_days: i64) -> AuditResult<u64> {
		if retention_days < 0 {
			return Err(AuditError::ConfigError(format!(
				"retention_days must not be negative, got {retention_days}"
			)));
		}

		let cutoff = Duration::try_days(retention_days)
			.and_then(|retention| Utc::now().checked_sub_signed(retention))
			.ok_or_else(|| {
				AuditError::ConfigError(format!(
					"retention_days {retention_days} reaches before the earliest representable time"
				))
			})?;
		let deleted = self
			.store
			.delete_older_than(cutoff)
			.await
			.map_err(|source| self.store_error(source))?;

		if deleted > 0 {
			info!(
				deleted,
				retention_days,
				cutoff = %cutoff,
				"cleaned up expired audit events"
			);
		} else {
			debug!(retention_days, "no expired audit events to clean up");
		}

		Ok(deleted)
	}

	/// [`AuditLogger::cleanup`] with the configured retention period.
	pub async fn cleanup_expired(&self) -> AuditResult<u64> {
		self.cleanup(self.retention_days).await
	}

	async fn escalate_if_required(&self, event: &AuditEvent) {
		if !requires_escalation(event) {
			return;
		}

		if let Err(e) = self.escalation.escalate(event).await {
			warn!(
				hook = self.escalation.name(),
				event_id = %event.event_id,
				error = %e,
				"audit escalation failed"
			);
		}
	}

	fn store_error(&self, source: crate::error::AuditStoreError) -> AuditError {
		AuditError::StoreError {
			store: self.store.name().to_string(),
			source,
		}
	}
}
