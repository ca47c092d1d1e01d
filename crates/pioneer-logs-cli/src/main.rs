// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `pioneer-log` - ship log entries to the CloudPioneer collector and query it.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use pioneer_logs::config::{
	load_layer, ConfigSource, DefaultsSource, EnvSource, OverrideSource, TomlSource,
};
use pioneer_logs::{
	LogCategory, LogLevel, LogService, LogServiceConfig, LogsConfigLayer, Metadata, SecretString,
};

mod logging;
mod params;

use logging::LogFormat;

/// CloudPioneer log shipper.
#[derive(Parser, Debug)]
#[command(name = "pioneer-log", version, about, long_about = None)]
struct Args {
	/// Path to a TOML configuration file
	#[arg(short, long, env = "CLOUDPIONEER_CONFIG")]
	config: Option<PathBuf>,

	/// Collector base URL (overrides config)
	#[arg(long)]
	collector_url: Option<String>,

	/// Tenant stamped on shipped entries (overrides config)
	#[arg(long)]
	tenant: Option<String>,

	/// Bearer token for the collector (overrides config)
	#[arg(long)]
	token: Option<String>,

	/// Level of this tool's own diagnostics
	#[arg(long, env = "CLOUDPIONEER_LOG_LEVEL", default_value = "info")]
	log_level: String,

	/// Format of this tool's own diagnostics
	#[arg(long, value_enum, default_value_t = LogFormat::Compact)]
	log_format: LogFormat,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Ship one entry per message, then flush
	Send {
		/// Severity of the entries
		#[arg(short, long, default_value = "info")]
		level: LogLevel,

		/// Category of the entries
		#[arg(short = 'C', long, default_value = "system")]
		category: LogCategory,

		/// Correlation id for request tracing
		#[arg(long)]
		correlation_id: Option<String>,

		/// Page or route the entries refer to
		#[arg(long)]
		location: Option<String>,

		/// Metadata pair (repeatable)
		#[arg(short, long = "meta", value_name = "KEY=VALUE", value_parser = params::parse_pair)]
		meta: Vec<(String, Value)>,

		/// Messages to ship
		#[arg(required = true)]
		messages: Vec<String>,
	},
	/// Run a collector-side analysis
	Analyze {
		/// Analysis parameters as a JSON object
		#[arg(long)]
		json: String,
	},
	/// Search shipped logs
	Search {
		/// Query parameter (repeatable)
		#[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = params::parse_pair)]
		params: Vec<(String, Value)>,
	},
	/// Show log statistics
	Stats {
		/// Query parameter (repeatable)
		#[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = params::parse_pair)]
		params: Vec<(String, Value)>,
	},
	/// Export logs to a file
	Export {
		/// Export parameter (repeatable)
		#[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = params::parse_pair)]
		params: Vec<(String, Value)>,

		/// Destination file
		#[arg(short, long)]
		out: PathBuf,
	},
}

fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("cloudpioneer").join("config.toml"))
}

fn resolve_config(args: &Args) -> Result<LogServiceConfig> {
	let overrides = OverrideSource(LogsConfigLayer {
		collector_url: args.collector_url.clone(),
		tenant: args.tenant.clone(),
		auth_token: args.token.clone().map(SecretString::new),
		..Default::default()
	});

	let toml = args
		.config
		.clone()
		.or_else(default_config_path)
		.map(TomlSource::new);

	let mut sources: Vec<&dyn ConfigSource> = vec![&DefaultsSource, &EnvSource, &overrides];
	if let Some(toml) = &toml {
		debug!(path = %toml.path().display(), "using config file");
		sources.push(toml);
	}

	let config = load_layer(&sources)?.finalize()?;
	Ok(config)
}

async fn send(
	config: LogServiceConfig,
	level: LogLevel,
	category: LogCategory,
	correlation_id: Option<String>,
	location: Option<String>,
	meta: Vec<(String, Value)>,
	messages: Vec<String>,
) -> Result<()> {
	let logs = LogService::builder().config(config).build()?;

	if let Some(id) = correlation_id {
		logs.set_correlation_id(id);
	}
	if let Some(location) = location {
		logs.set_location(location);
	}

	let metadata: Metadata = meta.into_iter().collect();
	let count = messages.len();
	for message in messages {
		logs.log(level, message, category, metadata.clone());
	}
	logs.close().await;

	let undelivered = logs.buffer_len();
	if undelivered > 0 {
		bail!("{undelivered} of {count} entries could not be delivered");
	}
	info!(count, %level, %category, "entries delivered");
	Ok(())
}

fn print_json(value: &Value) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

async fn run(args: Args) -> Result<()> {
	let config = resolve_config(&args)?;
	debug!(?config, "resolved configuration");

	match args.command {
		Command::Send {
			level,
			category,
			correlation_id,
			location,
			meta,
			messages,
		} => send(config, level, category, correlation_id, location, meta, messages).await,
		Command::Analyze { json } => {
			let params: Value =
				serde_json::from_str(&json).context("--json must be a valid JSON document")?;
			let logs = LogService::builder().config(config).build()?;
			print_json(&logs.analyze(&params).await?)
		}
		Command::Search { params: pairs } => {
			let logs = LogService::builder().config(config).build()?;
			print_json(&logs.search(&params::to_object(&pairs)).await?)
		}
		Command::Stats { params: pairs } => {
			let logs = LogService::builder().config(config).build()?;
			print_json(&logs.statistics(&params::to_object(&pairs)).await?)
		}
		Command::Export { params: pairs, out } => {
			let logs = LogService::builder().config(config).build()?;
			let bytes = logs.export(&params::to_object(&pairs)).await?;
			tokio::fs::write(&out, &bytes)
				.await
				.with_context(|| format!("failed to write {}", out.display()))?;
			info!(path = %out.display(), bytes = bytes.len(), "export written");
			Ok(())
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	logging::init_tracing(&args.log_level, args.log_format);
	run(args).await
}
