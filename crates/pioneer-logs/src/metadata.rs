// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller-supplied key/value pairs attached to a log entry.

use serde_json::{Map, Value};

/// A builder for log entry metadata.
///
/// # Example
///
/// ```
/// use pioneer_logs::Metadata;
///
/// let meta = Metadata::new()
///     .insert("resource_id", "i-0abc123")
///     .insert("savings_usd", 412.5)
///     .insert("applied", true);
/// assert_eq!(meta.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
	inner: Map<String, Value>,
}

impl Metadata {
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts a key-value pair, replacing any earlier value for the key.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Merges `other` into this metadata; `other` wins on duplicate keys.
	pub fn merge(mut self, other: Metadata) -> Self {
		self.inner.extend(other.inner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}
}

impl From<Value> for Metadata {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(map) => Self { inner: map },
			_ => Self::new(),
		}
	}
}

impl From<Map<String, Value>> for Metadata {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		iter
			.into_iter()
			.fold(Metadata::new(), |meta, (k, v)| meta.insert(k, v))
	}
}
