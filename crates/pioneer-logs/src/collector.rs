// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport to the remote log collector.

use std::time::Duration;

use bytes::Bytes;
use pioneer_common_secret::SecretString;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::entry::LogEntry;
use crate::error::{ConfigError, LogServiceError, Result};

/// Default collector base URL.
pub const DEFAULT_COLLECTOR_URL: &str = "https://api.cloudpioneer.com/v1";

/// Receives batched entries and answers log queries.
///
/// Only [`Collector::send_batch`] is required; query operations default to
/// [`LogServiceError::Unsupported`].
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
	/// Delivers one batch. Any error means the batch was not accepted.
	async fn send_batch(&self, entries: &[LogEntry]) -> Result<()>;

	async fn analyze(&self, _params: &Value) -> Result<Value> {
		Err(LogServiceError::Unsupported("analyze"))
	}

	async fn search(&self, _params: &Value) -> Result<Value> {
		Err(LogServiceError::Unsupported("search"))
	}

	async fn export(&self, _params: &Value) -> Result<Bytes> {
		Err(LogServiceError::Unsupported("export"))
	}

	async fn statistics(&self, _params: &Value) -> Result<Value> {
		Err(LogServiceError::Unsupported("statistics"))
	}
}

#[derive(Serialize)]
struct BatchRequest<'a> {
	logs: &'a [LogEntry],
}

/// HTTP implementation of [`Collector`].
#[derive(Debug)]
pub struct HttpCollector {
	http_client: Client,
	base_url: String,
	auth_token: Option<SecretString>,
}

impl HttpCollector {
	/// Creates a collector client for `base_url`.
	///
	/// `request_timeout` bounds every request made by this collector.
	pub fn new(
		base_url: &str,
		auth_token: Option<SecretString>,
		request_timeout: Duration,
	) -> Result<Self> {
		let base_url = normalize_base_url(base_url)?;
		let http_client = pioneer_common_http::builder()
			.timeout(request_timeout)
			.build()
			.map_err(LogServiceError::RequestFailed)?;

		Ok(Self {
			http_client,
			base_url,
			auth_token,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.auth_token {
			Some(token) => request.bearer_auth(token.expose()),
			None => request,
		}
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response> {
		let response = self
			.authorize(request)
			.send()
			.await
			.map_err(LogServiceError::RequestFailed)?;
		check_status(response).await
	}

	async fn json(&self, request: RequestBuilder) -> Result<Value> {
		let response = self.send(request).await?;
		let body = response.bytes().await?;
		if body.is_empty() {
			return Ok(Value::Null);
		}
		serde_json::from_slice(&body).map_err(|e| LogServiceError::Serialization(e.to_string()))
	}
}

#[async_trait::async_trait]
impl Collector for HttpCollector {
	async fn send_batch(&self, entries: &[LogEntry]) -> Result<()> {
		let url = self.url("/logs/batch");
		debug!(url = %url, count = entries.len(), "Sending log batch");

		let request = self
			.http_client
			.post(&url)
			.json(&BatchRequest { logs: entries });
		self.send(request).await?;
		Ok(())
	}

	async fn analyze(&self, params: &Value) -> Result<Value> {
		let request = self.http_client.post(self.url("/logs/analyze")).json(params);
		self.json(request).await
	}

	async fn search(&self, params: &Value) -> Result<Value> {
		let request = self.http_client.get(self.url("/logs/search"));
		self.json(with_query(request, params)).await
	}

	async fn export(&self, params: &Value) -> Result<Bytes> {
		let request = self.http_client.post(self.url("/logs/export")).json(params);
		let response = self.send(request).await?;
		Ok(response.bytes().await?)
	}

	async fn statistics(&self, params: &Value) -> Result<Value> {
		let request = self.http_client.get(self.url("/logs/statistics"));
		self.json(with_query(request, params)).await
	}
}

/// Validates `url` and strips any trailing slash.
pub(crate) fn normalize_base_url(url: &str) -> std::result::Result<String, ConfigError> {
	let trimmed = url.trim().trim_end_matches('/');
	match Url::parse(trimmed) {
		Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
		_ => Err(ConfigError::InvalidCollectorUrl(url.to_string())),
	}
}

/// Encodes the top-level fields of a JSON object as query parameters.
///
/// Strings are sent verbatim, nulls are skipped and everything else uses its
/// JSON text.
fn with_query(request: RequestBuilder, params: &Value) -> RequestBuilder {
	let Value::Object(map) = params else {
		return request;
	};

	let pairs: Vec<(&str, String)> = map
		.iter()
		.filter_map(|(key, value)| match value {
			Value::Null => None,
			Value::String(s) => Some((key.as_str(), s.clone())),
			other => Some((key.as_str(), other.to_string())),
		})
		.collect();
	request.query(&pairs)
}

async fn check_status(response: Response) -> Result<Response> {
	let status = response.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after = response
			.headers()
			.get(reqwest::header::RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.parse().ok());
		return Err(LogServiceError::RateLimited {
			retry_after_secs: retry_after,
		});
	}

	if !status.is_success() {
		return Err(LogServiceError::ServerError {
			status: status.as_u16(),
			message: response.text().await.unwrap_or_default(),
		});
	}

	Ok(response)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_normalize_strips_trailing_slash() {
		assert_eq!(
			normalize_base_url("https://api.cloudpioneer.com/v1/").unwrap(),
			"https://api.cloudpioneer.com/v1"
		);
	}

	#[test]
	fn test_normalize_rejects_garbage() {
		assert!(matches!(
			normalize_base_url("not a url"),
			Err(ConfigError::InvalidCollectorUrl(_))
		));
		assert!(matches!(
			normalize_base_url("ftp://example.com"),
			Err(ConfigError::InvalidCollectorUrl(_))
		));
	}

	#[test]
	fn test_debug_redacts_token() {
		let collector = HttpCollector::new(
			DEFAULT_COLLECTOR_URL,
			Some(SecretString::from("secret-token")),
			Duration::from_secs(5),
		)
		.unwrap();
		let rendered = format!("{collector:?}");
		assert!(!rendered.contains("secret-token"));
		assert!(rendered.contains("[REDACTED]"));
	}

	#[test]
	fn test_query_encoding_skips_nulls() {
		let client = Client::new();
		let params = serde_json::json!({"q": "timeout", "limit": 50, "tenant": null});
		let request = with_query(client.get("http://localhost/logs/search"), &params)
			.build()
			.unwrap();

		let query = request.url().query().unwrap();
		assert!(query.contains("q=timeout"));
		assert!(query.contains("limit=50"));
		assert!(!query.contains("tenant"));
	}
}
