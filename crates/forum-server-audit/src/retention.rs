// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic retention cleanup.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use forum_server_config::AuditConfig;

use crate::error::AuditResult;
use crate::logger::AuditLogger;

/// Runs [`AuditLogger::cleanup`] on a fixed interval until cancelled.
///
/// The first run happens immediately. A failed run is logged and the loop
/// keeps going.
pub struct RetentionTask {
	logger: AuditLogger,
	retention_days: i64,
	interval: Duration,
}

impl RetentionTask {
	pub fn new(logger: AuditLogger, retention_days: i64, interval: Duration) -> Self {
		Self {
			logger,
			retention_days,
			interval,
		}
	}

	pub fn from_config(logger: AuditLogger, config: &AuditConfig) -> Self {
		Self::new(
			logger,
			config.retention_days,
			Duration::from_secs(config.cleanup_interval_secs),
		)
	}

	#[instrument(skip(self), fields(retention_days = self.retention_days))]
	pub async fn run_once(&self) -> AuditResult<u64> {
		self.logger.cleanup(self.retention_days).await
	}

	pub async fn run(self, cancel: CancellationToken) {
		info!(
			retention_days = self.retention_days,
			interval_secs = self.interval.as_secs(),
			"audit retention task started"
		);

		let mut ticker = tokio::time::interval(self.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {
					if let Err(e) = self.run_once().await {
						error!(error = %e, "audit retention cleanup failed");
					}
				}
			}
		}

		info!("audit retention task stopped");
	}

	pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
		tokio::spawn(self.run(cancel))
	}
}
