// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Security audit pipeline for the forum.
//!
//! Handlers build a [`NewAuditEvent`] and hand it to an [`AuditLogger`],
//! which classifies and fingerprints it, writes it to an [`AuditStore`] and
//! escalates critical events through an [`EscalationHook`].

pub mod classify;
pub mod enrichment;
pub mod error;
pub mod escalation;
pub mod event;
pub mod logger;
pub mod retention;
pub mod store;

pub use classify::{classify, fingerprint};
pub use enrichment::enrich;
pub use error::{AuditError, AuditResult, AuditStoreError};
pub use escalation::{requires_escalation, EscalationHook, TracingEscalationHook};
pub use event::{
	AuditAction, AuditEvent, AuditEventBuilder, AuditSeverity, NewAuditEvent,
	DEFAULT_AUDIT_RETENTION_DAYS,
};
pub use logger::{AuditLogger, AuditStats, Timeframe};
pub use retention::RetentionTask;
pub use store::memory::MemoryAuditStore;
pub use store::{ActionCount, AuditCounts, AuditPage, AuditQuery, AuditStore};

pub use forum_server_config::AuditConfig;

#[cfg(feature = "store-sqlite")]
pub use store::sqlite::SqliteAuditStore;
