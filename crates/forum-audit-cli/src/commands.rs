// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use forum_server_audit::{
	AuditAction, AuditLogger, AuditQuery, NewAuditEvent, RetentionTask, Timeframe,
};
use forum_server_config::AuditConfig;

use crate::cli::RecordArgs;

pub async fn search(logger: &AuditLogger, query: AuditQuery) -> Result<Value> {
	let page = logger.search(&query).await.context("audit search failed")?;
	Ok(serde_json::to_value(page)?)
}

pub async fn stats(logger: &AuditLogger, timeframe: Timeframe) -> Result<Value> {
	let stats = logger
		.get_stats(timeframe)
		.await
		.context("audit stats failed")?;
	Ok(serde_json::to_value(stats)?)
}

pub async fn cleanup(logger: &AuditLogger, retention_days: Option<i64>) -> Result<Value> {
	let retention_days = retention_days.unwrap_or(logger.retention_days());
	let deleted = logger
		.cleanup(retention_days)
		.await
		.context("audit cleanup failed")?;
	Ok(json!({ "deleted": deleted, "retention_days": retention_days }))
}

pub async fn record(logger: &AuditLogger, args: RecordArgs) -> Result<Value> {
	let mut builder = NewAuditEvent::builder(AuditAction::from(args.action), args.resource)
		.success(!args.failed);
	if let Some(resource_id) = args.resource_id {
		builder = builder.resource_id(resource_id);
	}
	if let Some(user_id) = args.user_id {
		builder = builder.user(user_id);
	}
	if let Some(ip) = args.ip {
		builder = builder.ip(ip);
	}
	if let Some(severity) = args.severity {
		builder = builder.severity(severity);
	}
	if let Some(details) = args.details {
		let details: Value =
			serde_json::from_str(&details).context("--details must be valid JSON")?;
		builder = builder.details(details);
	}

	let written = logger
		.log_batch(vec![builder.build()])
		.await
		.context("failed to record audit event")?;
	Ok(json!({ "recorded": written }))
}

/// Periodic cleanup until Ctrl-C.
pub async fn retention(logger: AuditLogger, config: &AuditConfig) -> Result<()> {
	let cancel = CancellationToken::new();
	let handle = RetentionTask::from_config(logger, config).spawn(cancel.clone());

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for shutdown signal")?;
	info!("shutdown signal received, stopping retention task");

	cancel.cancel();
	handle.await.context("retention task panicked")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, Utc};
	use forum_server_audit::{AuditSeverity, MemoryAuditStore};
	use std::sync::Arc;

	fn logger() -> (Arc<MemoryAuditStore>, AuditLogger) {
		let store = Arc::new(MemoryAuditStore::new());
		(store.clone(), AuditLogger::new(store))
	}

	fn record_args(action: &str) -> RecordArgs {
		RecordArgs {
			action: action.to_string(),
			resource: "user".to_string(),
			resource_id: Some("42".to_string()),
			user_id: Some("admin-1".to_string()),
			ip: None,
			failed: false,
			severity: None,
			details: Some(r#"{"reason":"spam"}"#.to_string()),
		}
	}

	#[tokio::test]
	async fn test_record_then_search() {
		let (_, logger) = logger();
		let out = record(&logger, record_args("USER_BAN")).await.unwrap();
		assert_eq!(out["recorded"], 1);

		let out = search(
			&logger,
			AuditQuery {
				action: Some("ban".to_string()),
				..Default::default()
			},
		)
		.await
		.unwrap();
		assert_eq!(out["total"], 1);
		assert_eq!(out["events"][0]["action"], "USER_BAN");
		assert_eq!(out["events"][0]["severity"], "low");
		assert_eq!(out["events"][0]["details"]["reason"], "spam");
	}

	#[tokio::test]
	async fn test_record_rejects_bad_details() {
		let (store, logger) = logger();
		let mut args = record_args("USER_BAN");
		args.details = Some("not json".to_string());
		assert!(record(&logger, args).await.is_err());
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn test_record_honours_severity_override() {
		let (store, logger) = logger();
		let mut args = record_args("THREAD_LOCK");
		args.severity = Some(AuditSeverity::Critical);
		args.failed = true;
		record(&logger, args).await.unwrap();

		let events = store.events().await;
		assert_eq!(events[0].severity, AuditSeverity::Critical);
		assert!(!events[0].success);
	}

	#[tokio::test]
	async fn test_stats_reports_empty_store() {
		let (_, logger) = logger();
		let out = stats(&logger, Timeframe::Week).await.unwrap();
		assert_eq!(out["total"], 0);
		assert_eq!(out["success_rate"], 0.0);
		assert_eq!(out["timeframe"], "week");
	}

	#[tokio::test]
	async fn test_cleanup_uses_configured_default() {
		let (store, logger) = logger();
		logger
			.log(
				NewAuditEvent::builder(AuditAction::Logout, "auth")
					.timestamp(Utc::now() - Duration::days(120))
					.build(),
			)
			.await;

		let out = cleanup(&logger, None).await.unwrap();
		assert_eq!(out["deleted"], 1);
		assert_eq!(out["retention_days"], 90);
		assert!(store.is_empty().await);
	}
}
