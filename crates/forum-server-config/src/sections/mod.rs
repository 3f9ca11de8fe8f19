// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod audit;
pub mod csrf;
pub mod database;
pub mod logging;

pub use audit::{AuditConfig, AuditConfigLayer, MAX_RETENTION_DAYS};
pub use csrf::{CsrfConfig, CsrfConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
