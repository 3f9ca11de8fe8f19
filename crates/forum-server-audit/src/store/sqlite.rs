// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
	SqliteSynchronous,
};
use sqlx::Row;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{rank_actions, AuditCounts, AuditPage, AuditQuery, AuditStore, AuditStoreError};
use crate::event::{AuditAction, AuditEvent, AuditSeverity};
use forum_server_config::DatabaseConfig;

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS audit_events (
		event_id TEXT PRIMARY KEY NOT NULL,
		user_id TEXT,
		session_id TEXT,
		action TEXT NOT NULL,
		resource TEXT NOT NULL,
		resource_id TEXT,
		ip TEXT NOT NULL,
		user_agent TEXT NOT NULL,
		success INTEGER NOT NULL,
		timestamp TEXT NOT NULL,
		details TEXT,
		severity TEXT NOT NULL,
		method TEXT,
		endpoint TEXT,
		status_code INTEGER,
		duration_ms INTEGER,
		fingerprint TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events (timestamp DESC)",
	"CREATE INDEX IF NOT EXISTS idx_audit_events_action_timestamp ON audit_events (action, timestamp)",
	"CREATE INDEX IF NOT EXISTS idx_audit_events_user_timestamp ON audit_events (user_id, timestamp)",
	"CREATE INDEX IF NOT EXISTS idx_audit_events_severity_timestamp ON audit_events (severity, timestamp)",
];

const SELECT_COLUMNS: &str = "event_id, user_id, session_id, action, resource, resource_id, ip, \
	 user_agent, success, timestamp, details, severity, method, endpoint, status_code, \
	 duration_ms, fingerprint";

pub struct SqliteAuditStore {
	pool: SqlitePool,
}

impl SqliteAuditStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Open a WAL-mode pool for `config.url` (e.g. "sqlite:./forum-audit.db"),
	/// sized and timed by the rest of `config`.
	#[instrument(skip(config), fields(max_connections = config.max_connections))]
	pub async fn from_config(config: &DatabaseConfig) -> Result<Self, AuditStoreError> {
		let options = connect_options(config)?;

		let pool = SqlitePoolOptions::new()
			.max_connections(config.max_connections)
			.connect_with(options)
			.await?;

		debug!("audit database pool created");
		Ok(Self::new(pool))
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Create the `audit_events` table and its indexes. Idempotent.
	#[instrument(skip(self))]
	pub async fn migrate(&self) -> Result<(), AuditStoreError> {
		for statement in SCHEMA {
			sqlx::query(statement).execute(&self.pool).await?;
		}
		debug!("audit_events schema ready");
		Ok(())
	}
}

/// Fixed-width UTC form so lexical order is time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn escape_like(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for c in value.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

async fn insert_event(pool: &SqlitePool, event: &AuditEvent) -> Result<(), AuditStoreError> {
	let details_json = serde_json::to_string(&event.details)
		.map_err(|e| AuditStoreError::Permanent(format!("failed to serialize details: {e}")))?;

	sqlx::query(
		r#"
		INSERT INTO audit_events (
			event_id, user_id, session_id, action, resource, resource_id, ip,
			user_agent, success, timestamp, details, severity, method, endpoint,
			status_code, duration_ms, fingerprint
		) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(event.event_id.to_string())
	.bind(&event.user_id)
	.bind(&event.session_id)
	.bind(event.action.as_str())
	.bind(&event.resource)
	.bind(&event.resource_id)
	.bind(&event.ip)
	.bind(&event.user_agent)
	.bind(event.success)
	.bind(format_timestamp(event.timestamp))
	.bind(details_json)
	.bind(event.severity.as_str())
	.bind(&event.method)
	.bind(&event.endpoint)
	.bind(event.status_code.map(i64::from))
	.bind(
		event
			.duration_ms
			.map(|d| i64::try_from(d).unwrap_or(i64::MAX)),
	)
	.bind(&event.fingerprint)
	.execute(pool)
	.await?;

	Ok(())
}

fn parse_row(row: &SqliteRow) -> Option<AuditEvent> {
	let id_str: String = row.try_get("event_id").ok()?;
	let event_id = Uuid::parse_str(&id_str).ok()?;

	let ts_str: String = row.try_get("timestamp").ok()?;
	let timestamp = DateTime::parse_from_rfc3339(&ts_str)
		.ok()?
		.with_timezone(&Utc);

	let severity_str: String = row.try_get("severity").ok()?;
	let severity = AuditSeverity::from_str(&severity_str).ok()?;

	let action: String = row.try_get("action").ok()?;
	let details_str: Option<String> = row.try_get("details").ok()?;
	let status_code: Option<i64> = row.try_get("status_code").ok()?;
	let duration_ms: Option<i64> = row.try_get("duration_ms").ok()?;

	Some(AuditEvent {
		event_id,
		user_id: row.try_get("user_id").ok()?,
		session_id: row.try_get("session_id").ok()?,
		action: AuditAction::from(action),
		resource: row.try_get("resource").ok()?,
		resource_id: row.try_get("resource_id").ok()?,
		ip: row.try_get("ip").ok()?,
		user_agent: row.try_get("user_agent").ok()?,
		success: row.try_get("success").ok()?,
		timestamp,
		details: details_str
			.and_then(|s| serde_json::from_str(&s).ok())
			.unwrap_or(serde_json::Value::Null),
		severity,
		method: row.try_get("method").ok()?,
		endpoint: row.try_get("endpoint").ok()?,
		status_code: status_code.and_then(|c| u16::try_from(c).ok()),
		duration_ms: duration_ms.and_then(|d| u64::try_from(d).ok()),
		fingerprint: row.try_get("fingerprint").ok()?,
	})
}

fn where_clause(query: &AuditQuery) -> (String, Vec<String>) {
	let mut conditions = vec!["1=1".to_string()];
	let mut binds = Vec::new();

	if let Some(v) = &query.user_id {
		conditions.push("user_id = ?".to_string());
		binds.push(v.clone());
	}
	if let Some(v) = &query.action {
		conditions.push("LOWER(action) LIKE ? ESCAPE '\\'".to_string());
		binds.push(format!("%{}%", escape_like(&v.to_lowercase())));
	}
	if let Some(v) = &query.resource {
		conditions.push("resource = ?".to_string());
		binds.push(v.clone());
	}
	if let Some(v) = query.severity {
		conditions.push("severity = ?".to_string());
		binds.push(v.as_str().to_string());
	}
	if let Some(v) = query.from {
		conditions.push("timestamp >= ?".to_string());
		binds.push(format_timestamp(v));
	}
	if let Some(v) = query.to {
		conditions.push("timestamp <= ?".to_string());
		binds.push(format_timestamp(v));
	}

	(conditions.join(" AND "), binds)
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
	fn name(&self) -> &str {
		"sqlite"
	}

	#[instrument(skip(self, event), fields(event_id = %event.event_id))]
	async fn persist(&self, event: &AuditEvent) -> Result<(), AuditStoreError> {
		insert_event(&self.pool, event).await
	}

	#[instrument(skip(self, events), fields(count = events.len()))]
	async fn persist_many(&self, events: &[AuditEvent]) -> Result<(), AuditStoreError> {
		for event in events {
			insert_event(&self.pool, event).await?;
		}
		Ok(())
	}

	#[instrument(skip(self))]
	async fn query(&self, query: &AuditQuery) -> Result<AuditPage, AuditStoreError> {
		let limit = query.effective_limit();
		let offset = query.effective_offset();
		let (where_clause, binds) = where_clause(query);

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM audit_events WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for v in &binds {
			count_query = count_query.bind(v);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("cnt")?;

		let data_sql = format!(
			"SELECT {SELECT_COLUMNS} FROM audit_events WHERE {where_clause} \
			 ORDER BY timestamp DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for v in &binds {
			data_query = data_query.bind(v);
		}
		data_query = data_query.bind(i64::from(limit)).bind(i64::from(offset));

		let rows = data_query.fetch_all(&self.pool).await?;
		let events = rows
			.iter()
			.filter_map(|row| {
				let parsed = parse_row(row);
				if parsed.is_none() {
					warn!("skipping unreadable audit_events row");
				}
				parsed
			})
			.collect();

		Ok(AuditPage {
			events,
			total: total.max(0) as u64,
			limit,
			offset,
		})
	}

	#[instrument(skip(self))]
	async fn aggregate_counts(
		&self,
		since: DateTime<Utc>,
	) -> Result<AuditCounts, AuditStoreError> {
		let since = format_timestamp(since);
		let mut counts = AuditCounts::default();

		let row = sqlx::query(
			"SELECT COUNT(*) AS total, \
			 COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0) AS failed \
			 FROM audit_events WHERE timestamp >= ?",
		)
		.bind(&since)
		.fetch_one(&self.pool)
		.await?;
		counts.total = row.try_get::<i64, _>("total")?.max(0) as u64;
		counts.failed = row.try_get::<i64, _>("failed")?.max(0) as u64;

		let rows = sqlx::query(
			"SELECT severity, COUNT(*) AS cnt FROM audit_events \
			 WHERE timestamp >= ? GROUP BY severity",
		)
		.bind(&since)
		.fetch_all(&self.pool)
		.await?;
		for row in rows {
			let severity: String = row.try_get("severity")?;
			let cnt: i64 = row.try_get("cnt")?;
			match AuditSeverity::from_str(&severity) {
				Ok(s) => {
					counts.by_severity.insert(s, cnt.max(0) as u64);
				}
				Err(e) => warn!(error = %e, "ignoring unknown severity in audit_events"),
			}
		}

		let rows = sqlx::query(
			"SELECT action, COUNT(*) AS cnt FROM audit_events \
			 WHERE timestamp >= ? GROUP BY action ORDER BY cnt DESC, action ASC LIMIT ?",
		)
		.bind(&since)
		.bind(super::TOP_ACTIONS_LIMIT as i64)
		.fetch_all(&self.pool)
		.await?;
		let mut actions = Vec::with_capacity(rows.len());
		for row in rows {
			let action: String = row.try_get("action")?;
			let cnt: i64 = row.try_get("cnt")?;
			actions.push((action, cnt.max(0) as u64));
		}
		counts.top_actions = rank_actions(actions);

		Ok(counts)
	}

	#[instrument(skip(self))]
	async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditStoreError> {
		let result = sqlx::query("DELETE FROM audit_events WHERE timestamp < ?")
			.bind(format_timestamp(cutoff))
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected())
	}
}

impl From<sqlx::Error> for AuditStoreError {
	fn from(e: sqlx::Error) -> Self {
		if is_transient_error(&e) {
			AuditStoreError::Transient(format!("database error: {e}"))
		} else {
			AuditStoreError::Permanent(format!("database error: {e}"))
		}
	}
}

fn connect_options(config: &DatabaseConfig) -> Result<SqliteConnectOptions, AuditStoreError> {
	Ok(SqliteConnectOptions::from_str(&config.url)
		.map_err(|e| AuditStoreError::Permanent(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(config.busy_timeout())
		.create_if_missing(true))
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}
