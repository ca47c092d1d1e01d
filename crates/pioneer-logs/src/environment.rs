// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment context stamped into every entry's metadata.

use serde_json::{Map, Value};

/// Environment variable naming the runtime environment (e.g. `production`).
pub const ENVIRONMENT_VAR: &str = "CLOUDPIONEER_ENV";

pub(crate) const ENVIRONMENT_KEY: &str = "environment";
pub(crate) const CLIENT_IDENTITY_KEY: &str = "userAgent";
pub(crate) const LOCATION_KEY: &str = "url";

/// Source of the runtime context recorded alongside each entry.
///
/// Implementations are consulted every time an entry is created.
pub trait EnvironmentSource: Send + Sync {
	/// Name of the runtime environment, if known.
	fn environment(&self) -> Option<String>;

	/// Identity string of this client.
	fn client_identity(&self) -> String;
}

/// Reads the environment name from the process environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
	fn environment(&self) -> Option<String> {
		std::env::var(ENVIRONMENT_VAR).ok().filter(|s| !s.is_empty())
	}

	fn client_identity(&self) -> String {
		pioneer_common_http::user_agent()
	}
}

/// Fixed environment values, mostly useful in tests and embedded callers.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
	pub environment: Option<String>,
	pub client_identity: String,
}

impl EnvironmentSource for StaticEnvironment {
	fn environment(&self) -> Option<String> {
		self.environment.clone()
	}

	fn client_identity(&self) -> String {
		self.client_identity.clone()
	}
}

/// Adds the environment keys to `metadata`, overwriting caller values.
pub(crate) fn stamp(
	metadata: &mut Map<String, Value>,
	source: &dyn EnvironmentSource,
	location: Option<String>,
) {
	metadata.insert(
		ENVIRONMENT_KEY.to_string(),
		source.environment().map_or(Value::Null, Value::String),
	);
	metadata.insert(
		CLIENT_IDENTITY_KEY.to_string(),
		Value::String(source.client_identity()),
	);
	metadata.insert(
		LOCATION_KEY.to_string(),
		location.map_or(Value::Null, Value::String),
	);
}
