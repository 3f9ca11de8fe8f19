// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};

use forum_server_audit::{AuditQuery, AuditSeverity, Timeframe};

/// forum-audit - administer the forum security audit log.
#[derive(Parser, Debug)]
#[command(
	name = "forum-audit",
	about = "Administer the forum security audit log",
	version
)]
pub struct Args {
	/// Config file (overrides /etc/forum/server.toml)
	#[arg(long, global = true, env = "FORUM_SERVER_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Create the audit_events table and indexes
	Migrate,

	/// Search audit events, newest first
	Search(SearchArgs),

	/// Aggregate statistics over a timeframe
	Stats {
		/// hour, day, week or month (30 days)
		#[arg(long, default_value = "day")]
		timeframe: Timeframe,
	},

	/// Delete events older than the retention period
	Cleanup {
		/// Defaults to the configured retention period
		#[arg(long)]
		retention_days: Option<i64>,
	},

	/// Run periodic cleanup until interrupted
	Retention,

	/// Record a single audit event
	Record(RecordArgs),

	/// Show version and build information
	Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct SearchArgs {
	#[arg(long)]
	pub user_id: Option<String>,

	/// Case-insensitive substring of the action
	#[arg(long)]
	pub action: Option<String>,

	#[arg(long)]
	pub resource: Option<String>,

	#[arg(long)]
	pub severity: Option<AuditSeverity>,

	/// RFC 3339 lower bound (inclusive)
	#[arg(long)]
	pub from: Option<DateTime<Utc>>,

	/// RFC 3339 upper bound (inclusive)
	#[arg(long)]
	pub to: Option<DateTime<Utc>>,

	#[arg(long)]
	pub limit: Option<u32>,

	#[arg(long)]
	pub offset: Option<u32>,
}

impl From<SearchArgs> for AuditQuery {
	fn from(args: SearchArgs) -> Self {
		AuditQuery {
			user_id: args.user_id,
			action: args.action,
			resource: args.resource,
			severity: args.severity,
			from: args.from,
			to: args.to,
			limit: args.limit,
			offset: args.offset,
		}
	}
}

#[derive(ClapArgs, Debug)]
pub struct RecordArgs {
	/// Action name, e.g. USER_BAN
	#[arg(long)]
	pub action: String,

	#[arg(long)]
	pub resource: String,

	#[arg(long)]
	pub resource_id: Option<String>,

	#[arg(long)]
	pub user_id: Option<String>,

	#[arg(long)]
	pub ip: Option<String>,

	/// Record the event as a failure
	#[arg(long)]
	pub failed: bool,

	/// Override the classified severity
	#[arg(long)]
	pub severity: Option<AuditSeverity>,

	/// JSON object stored as event details
	#[arg(long)]
	pub details: Option<String>,
}
