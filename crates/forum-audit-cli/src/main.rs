// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! forum-audit: administrative CLI for the security audit log.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_server_audit::{AuditLogger, SqliteAuditStore};

mod cli;
mod commands;
mod version;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => forum_server_config::load_config_with_file(path),
		None => forum_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	// Logs go to stderr so command output on stdout stays machine-readable.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let store = SqliteAuditStore::from_config(&config.database)
		.await
		.with_context(|| format!("failed to open audit database {}", config.database.url))?;
	store
		.migrate()
		.await
		.context("failed to migrate audit schema")?;

	let logger = AuditLogger::from_config(Arc::new(store), &config.audit);

	let output = match args.command {
		Command::Migrate => {
			tracing::info!(database = %config.database.url, "audit schema ready");
			return Ok(());
		}
		Command::Search(search) => commands::search(&logger, search.into()).await?,
		Command::Stats { timeframe } => commands::stats(&logger, timeframe).await?,
		Command::Cleanup { retention_days } => commands::cleanup(&logger, retention_days).await?,
		Command::Record(record) => commands::record(&logger, record).await?,
		Command::Retention => {
			commands::retention(logger, &config.audit).await?;
			return Ok(());
		}
		Command::Version => {
			println!("{}", version::format_version_info());
			return Ok(());
		}
	};

	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
