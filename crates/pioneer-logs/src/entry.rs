// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Structured log entries and their classification enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
	Critical,
}

impl LogLevel {
	pub const ALL: [LogLevel; 5] = [
		LogLevel::Debug,
		LogLevel::Info,
		LogLevel::Warn,
		LogLevel::Error,
		LogLevel::Critical,
	];

	/// Wire name of the level.
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
			LogLevel::Critical => "critical",
		}
	}

	/// High-severity entries do not wait for the next timer tick.
	pub fn requires_immediate_flush(&self) -> bool {
		matches!(self, LogLevel::Error | LogLevel::Critical)
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LogLevel {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		LogLevel::ALL
			.into_iter()
			.find(|level| level.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| format!("unknown log level '{s}'"))
	}
}

/// Free classification of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
	#[default]
	System,
	Security,
	Performance,
	UserActivity,
	Optimization,
	Billing,
	Integration,
}

impl LogCategory {
	pub const ALL: [LogCategory; 7] = [
		LogCategory::System,
		LogCategory::Security,
		LogCategory::Performance,
		LogCategory::UserActivity,
		LogCategory::Optimization,
		LogCategory::Billing,
		LogCategory::Integration,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			LogCategory::System => "system",
			LogCategory::Security => "security",
			LogCategory::Performance => "performance",
			LogCategory::UserActivity => "user_activity",
			LogCategory::Optimization => "optimization",
			LogCategory::Billing => "billing",
			LogCategory::Integration => "integration",
		}
	}
}

impl fmt::Display for LogCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LogCategory {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.replace('-', "_");
		LogCategory::ALL
			.into_iter()
			.find(|category| category.as_str().eq_ignore_ascii_case(&normalized))
			.ok_or_else(|| format!("unknown log category '{s}'"))
	}
}

/// A single structured log entry as shipped to the collector.
///
/// `tenant` and `correlation_id` are captured when the entry is created and
/// never rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
	pub timestamp: DateTime<Utc>,
	pub level: LogLevel,
	pub category: LogCategory,
	pub message: String,
	pub tenant: Option<String>,
	pub correlation_id: Option<String>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	/// Position in the buffer's enqueue order. Not sent on the wire.
	#[serde(skip)]
	pub(crate) seq: u64,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_level_ordering_matches_severity() {
		assert!(LogLevel::Debug < LogLevel::Info);
		assert!(LogLevel::Warn < LogLevel::Error);
		assert!(LogLevel::Error < LogLevel::Critical);
	}

	#[test]
	fn test_only_error_and_critical_flush_immediately() {
		let immediate: Vec<_> = LogLevel::ALL
			.into_iter()
			.filter(LogLevel::requires_immediate_flush)
			.collect();
		assert_eq!(immediate, vec![LogLevel::Error, LogLevel::Critical]);
	}

	#[test]
	fn test_level_parse_is_case_insensitive() {
		assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
		assert!("fatal".parse::<LogLevel>().is_err());
	}

	#[test]
	fn test_category_parse_accepts_dashes() {
		assert_eq!(
			"user-activity".parse::<LogCategory>().unwrap(),
			LogCategory::UserActivity
		);
		assert_eq!(LogCategory::default(), LogCategory::System);
	}

	#[test]
	fn test_entry_wire_format() {
		let entry = LogEntry {
			timestamp: "2025-03-01T12:00:00Z".parse().unwrap(),
			level: LogLevel::Critical,
			category: LogCategory::UserActivity,
			message: "login".to_string(),
			tenant: Some("acme".to_string()),
			correlation_id: None,
			metadata: Map::new(),
			seq: 42,
		};

		let value = serde_json::to_value(&entry).unwrap();
		assert_eq!(
			value,
			json!({
				"timestamp": "2025-03-01T12:00:00Z",
				"level": "critical",
				"category": "user_activity",
				"message": "login",
				"tenant": "acme",
				"correlationId": null,
				"metadata": {}
			})
		);
	}
}
