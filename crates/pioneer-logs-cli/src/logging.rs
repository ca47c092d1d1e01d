// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local diagnostics for the CLI itself.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
	#[default]
	Compact,
	Pretty,
	Json,
}

/// Builds the default filter directive for `level`.
///
/// Only our own crates are raised to `level`; dependencies stay at `warn`.
pub fn default_directive(level: &str) -> String {
	format!("warn,pioneer_logs={level},pioneer_log={level}")
}

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str, format: LogFormat) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

	let registry = tracing_subscriber::registry().with(filter);
	match format {
		LogFormat::Json => registry
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Compact => registry
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init(),
		LogFormat::Pretty => registry
			.with(fmt::layer().pretty().with_writer(std::io::stderr))
			.init(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_directive_parses() {
		let directive = default_directive("debug");
		assert!(directive.contains("pioneer_logs=debug"));
		assert!(EnvFilter::try_new(directive).is_ok());
	}
}
