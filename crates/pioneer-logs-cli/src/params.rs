// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `KEY=VALUE` argument parsing.

use serde_json::{Map, Value};

/// Parses one `KEY=VALUE` pair.
///
/// Values that are valid JSON scalars (numbers, booleans, null) keep their
/// type; anything else becomes a string.
pub fn parse_pair(raw: &str) -> Result<(String, Value), String> {
	let (key, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
	let key = key.trim();
	if key.is_empty() {
		return Err(format!("empty key in '{raw}'"));
	}

	let value = match serde_json::from_str::<Value>(value) {
		Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
		_ => Value::String(value.to_string()),
	};
	Ok((key.to_string(), value))
}

/// Collects pairs into a JSON object; later keys win.
pub fn to_object(pairs: &[(String, Value)]) -> Value {
	let map: Map<String, Value> = pairs.iter().cloned().collect();
	Value::Object(map)
}
