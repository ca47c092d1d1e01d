// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests of the log service against a mock HTTP collector.

use std::time::Duration;

use pioneer_logs::{
	Collector, FlushOutcome, HttpCollector, InitOptions, LogCategory, LogService, LogServiceError,
	Metadata,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> LogService {
	LogService::builder()
		.collector_url(server.uri())
		.auth_token("test-token")
		.flush_interval(Duration::from_secs(3600))
		.request_timeout(Duration::from_secs(2))
		.build()
		.unwrap()
}

async fn batch_bodies(server: &MockServer) -> Vec<Value> {
	server
		.received_requests()
		.await
		.unwrap_or_default()
		.into_iter()
		.filter(|r| r.url.path() == "/logs/batch")
		.map(|r| r.body_json::<Value>().unwrap())
		.collect()
}

#[tokio::test]
async fn full_buffer_posts_one_batch() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/logs/batch"))
		.and(header("authorization", "Bearer test-token"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let logs = service_for(&server);
	logs.initialize(
		"tenant-1",
		InitOptions {
			buffer_size: Some(2),
			..Default::default()
		},
	)
	.unwrap();

	logs.info("a", LogCategory::System, Metadata::new());
	logs.activity("b", Metadata::new().insert("button", "export"));
	logs.settle().await;

	let bodies = batch_bodies(&server).await;
	assert_eq!(bodies.len(), 1);

	let batch = bodies[0]["logs"].as_array().unwrap();
	assert_eq!(batch.len(), 2);
	assert_eq!(batch[0]["message"], "a");
	assert_eq!(batch[0]["level"], "info");
	assert_eq!(batch[0]["category"], "system");
	assert_eq!(batch[0]["tenant"], "tenant-1");
	assert_eq!(batch[0]["correlationId"], Value::Null);
	assert_eq!(batch[1]["category"], "user_activity");
	assert_eq!(batch[1]["metadata"]["button"], "export");
	assert!(batch[1]["metadata"]["userAgent"]
		.as_str()
		.unwrap()
		.starts_with("cloudpioneer/"));
	assert!(batch[0]["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn server_error_keeps_entries_for_next_flush() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/logs/batch"))
		.respond_with(ResponseTemplate::new(500).set_body_string("collector down"))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path("/logs/batch"))
		.respond_with(ResponseTemplate::new(202))
		.mount(&server)
		.await;

	let logs = service_for(&server);
	logs.error("disk full", LogCategory::System, Metadata::new());
	logs.settle().await;
	assert_eq!(logs.buffer_len(), 1);

	logs.warn("retrying", LogCategory::System, Metadata::new());
	assert_eq!(logs.flush().await, FlushOutcome::Delivered(2));

	let bodies = batch_bodies(&server).await;
	assert_eq!(bodies.len(), 2);
	let messages: Vec<_> = bodies[1]["logs"]
		.as_array()
		.unwrap()
		.iter()
		.map(|e| e["message"].as_str().unwrap().to_string())
		.collect();
	assert_eq!(messages, vec!["disk full", "retrying"]);
}

#[tokio::test]
async fn slow_collector_times_out_and_requeues() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/logs/batch"))
		.respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
		.mount(&server)
		.await;

	let logs = LogService::builder()
		.collector_url(server.uri())
		.flush_interval(Duration::from_secs(3600))
		.request_timeout(Duration::from_millis(200))
		.build()
		.unwrap();

	logs.info("slow", LogCategory::System, Metadata::new());
	assert_eq!(logs.flush().await, FlushOutcome::Requeued(1));
	assert_eq!(logs.buffer_len(), 1);
}

#[tokio::test]
async fn unreachable_collector_never_breaks_logging() {
	let logs = LogService::builder()
		.collector_url("http://127.0.0.1:9")
		.flush_interval(Duration::from_secs(3600))
		.request_timeout(Duration::from_millis(500))
		.build()
		.unwrap();

	logs.critical("cannot ship", LogCategory::Integration, Metadata::new());
	logs.settle().await;
	logs.close().await;

	assert_eq!(logs.buffer_len(), 1);
}

#[tokio::test]
async fn rate_limit_maps_retry_after() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/logs/batch"))
		.respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
		.mount(&server)
		.await;

	let collector = HttpCollector::new(&server.uri(), None, Duration::from_secs(2)).unwrap();
	let result = collector.send_batch(&[]).await;

	assert!(matches!(
		result,
		Err(LogServiceError::RateLimited {
			retry_after_secs: Some(30)
		})
	));
}

#[tokio::test]
async fn search_sends_query_parameters() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/logs/search"))
		.and(query_param("q", "timeout"))
		.and(query_param("limit", "25"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1, "logs": []})))
		.expect(1)
		.mount(&server)
		.await;

	let logs = service_for(&server);
	let result = logs
		.search(&json!({"q": "timeout", "limit": 25}))
		.await
		.unwrap();

	assert_eq!(result["total"], 1);
}

#[tokio::test]
async fn analyze_posts_parameters_as_json() {
	let server = MockServer::start().await;
	let params = json!({"window": "24h", "categories": ["billing"]});
	Mock::given(method("POST"))
		.and(path("/logs/analyze"))
		.and(body_json(&params))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"anomalies": 2})))
		.expect(1)
		.mount(&server)
		.await;

	let logs = service_for(&server);
	let result = logs.analyze(&params).await.unwrap();

	assert_eq!(result["anomalies"], 2);
}

#[tokio::test]
async fn export_returns_raw_bytes() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/logs/export"))
		.respond_with(ResponseTemplate::new(200).set_body_bytes(b"timestamp,level\n".to_vec()))
		.mount(&server)
		.await;

	let logs = service_for(&server);
	let bytes = logs.export(&json!({"format": "csv"})).await.unwrap();

	assert_eq!(&bytes[..], b"timestamp,level\n");
}

#[tokio::test]
async fn statistics_failure_reaches_caller() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/logs/statistics"))
		.respond_with(ResponseTemplate::new(404).set_body_string("no such tenant"))
		.mount(&server)
		.await;

	let logs = service_for(&server);
	let result = logs.statistics(&json!({"tenant": "ghost"})).await;

	match result {
		Err(LogServiceError::ServerError { status, message }) => {
			assert_eq!(status, 404);
			assert_eq!(message, "no such tenant");
		}
		other => panic!("expected server error, got {other:?}"),
	}
}
