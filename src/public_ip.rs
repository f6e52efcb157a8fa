// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public IP discovery.
//!
//! The bare domain's `A` record points at whatever address the cluster is
//! reachable on from the outside. [`IcanhazipSource`] asks an echo service
//! such as `https://icanhazip.com` for it.

use crate::dns_errors::IpDiscoveryError;
use crate::retry::retry_http_call;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Source of the externally visible IP address.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Look up the current public address, rendered as a string.
    async fn discover(&self) -> Result<String, IpDiscoveryError>;
}

/// IP discovery through a plain-text echo service.
#[derive(Clone, Debug)]
pub struct IcanhazipSource {
    http: HttpClient,
    url: String,
    retry_max_elapsed: Duration,
}

impl IcanhazipSource {
    /// Create a source querying `url`.
    #[must_use]
    pub fn new(http: HttpClient, url: &str, retry_max_elapsed: Duration) -> Self {
        Self {
            http,
            url: url.to_string(),
            retry_max_elapsed,
        }
    }

    async fn discover_once(&self) -> Result<String, IpDiscoveryError> {
        let response = self.http.get(&self.url).send().await.map_err(|e| {
            IpDiscoveryError::HttpConnectionFailed {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IpDiscoveryError::UnexpectedHttpStatus {
                endpoint: self.url.clone(),
                status_code: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| IpDiscoveryError::HttpConnectionFailed {
                endpoint: self.url.clone(),
                reason: format!("failed to read response body: {e}"),
            })?;

        parse_address(&self.url, &body)
    }
}

/// Trim `body` and check that it is an IPv4 or IPv6 literal.
fn parse_address(endpoint: &str, body: &str) -> Result<String, IpDiscoveryError> {
    let trimmed = body.trim();

    trimmed
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| IpDiscoveryError::InvalidAddress {
            endpoint: endpoint.to_string(),
            body: trimmed.to_string(),
        })
}

#[async_trait]
impl PublicIpSource for IcanhazipSource {
    async fn discover(&self) -> Result<String, IpDiscoveryError> {
        let ip = retry_http_call(
            || self.discover_once(),
            "public_ip_discovery",
            self.retry_max_elapsed,
        )
        .await?;

        debug!(endpoint = %self.url, ip = %ip, "Discovered public IP");
        Ok(ip)
    }
}

#[cfg(test)]
#[path = "public_ip_tests.rs"]
mod public_ip_tests;
