// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::ClientBuilder;

const PRODUCT: &str = "cloudpioneer";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a new HTTP client builder with the standard CloudPioneer User-Agent.
///
/// # Example
/// ```ignore
/// let client = pioneer_common_http::builder()
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	reqwest::Client::builder().user_agent(user_agent())
}

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub fn platform() -> String {
	format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Returns the standard CloudPioneer User-Agent string.
///
/// Format: `cloudpioneer/{version} ({platform})`
pub fn user_agent() -> String {
	format!("{PRODUCT}/{VERSION} ({})", platform())
}
