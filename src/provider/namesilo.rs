// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Namesilo implementation of [`DnsProvider`].
//!
//! Every operation is a GET against `{api_url}/{operation}` with the API key,
//! domain, protocol version, and response type as query parameters. Responses
//! are XML documents whose `reply/detail` is `success` on success; anything
//! else, including a document of the wrong shape, is a [`ProviderError`].
//!
//! Namesilo lists hosts fully qualified but expects them relative to the zone
//! apex on add and update (the apex itself is the empty string).
//!
//! Listing and updating by id can be repeated safely, so any transport
//! failure is retried. Adds and deletes are only resent when the request
//! never reached Namesilo: a resent add after a timeout creates a duplicate.

use super::DnsProvider;
use crate::constants::{NAMESILO_API_VERSION, NAMESILO_RESPONSE_TYPE, NAMESILO_SUCCESS_DETAIL};
use crate::dns_errors::ProviderError;
use crate::record::{Record, RecordType};
use crate::retry::retry_http_call_when;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const OP_LIST: &str = "dnsListRecords";
const OP_ADD: &str = "dnsAddRecord";
const OP_UPDATE: &str = "dnsUpdateRecord";
const OP_DELETE: &str = "dnsDeleteRecord";

#[derive(Debug, Deserialize)]
struct NamesiloResponse {
    reply: Reply,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    detail: String,
    #[serde(default, rename = "resource_record")]
    resource_records: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    record_id: String,
    #[serde(rename = "type")]
    record_type: String,
    host: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    distance: u32,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        Record {
            id: wire.record_id,
            record_type: RecordType::from(wire.record_type.as_str()),
            host: wire.host,
            value: wire.value,
            ttl: wire.ttl,
            distance: wire.distance,
        }
    }
}

/// Client for the Namesilo DNS API, bound to one domain.
#[derive(Clone)]
pub struct NamesiloClient {
    http: HttpClient,
    api_url: String,
    domain: String,
    api_key: String,
    retry_max_elapsed: Duration,
}

impl std::fmt::Debug for NamesiloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamesiloClient")
            .field("api_url", &self.api_url)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl NamesiloClient {
    /// Create a client for `domain`.
    ///
    /// # Arguments
    /// * `http` - Shared HTTP client (timeouts are configured on it)
    /// * `api_url` - API prefix, e.g. `https://www.namesilo.com/api`
    /// * `domain` - The zone every operation addresses
    /// * `api_key` - Namesilo API key
    /// * `retry_max_elapsed` - Budget for retrying transport failures (zero disables)
    #[must_use]
    pub fn new(
        http: HttpClient,
        api_url: &str,
        domain: &str,
        api_key: &str,
        retry_max_elapsed: Duration,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
            api_key: api_key.to_string(),
            retry_max_elapsed,
        }
    }

    /// The zone this client manages.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Host as Namesilo expects it on add and update.
    ///
    /// The apex becomes the empty string and the `.domain` suffix is trimmed
    /// from subdomains. Hosts outside the zone are passed through.
    #[must_use]
    pub fn relative_host(&self, host: &str) -> String {
        if host == self.domain {
            return String::new();
        }

        host.strip_suffix(&format!(".{}", self.domain))
            .unwrap_or(host)
            .to_string()
    }

    fn operation_url(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<Url, ProviderError> {
        let mut query: Vec<(&str, &str)> =
            params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("version", NAMESILO_API_VERSION));
        query.push(("type", NAMESILO_RESPONSE_TYPE));
        query.push(("key", self.api_key.as_str()));
        query.push(("domain", self.domain.as_str()));

        Url::parse_with_params(&format!("{}/{operation}", self.api_url), &query).map_err(|e| {
            ProviderError::InvalidResponse {
                operation: operation.to_string(),
                reason: format!("invalid API URL: {e}"),
            }
        })
    }

    fn record_params(&self, record: &Record) -> Vec<(&'static str, String)> {
        vec![
            ("rrtype", record.record_type.to_string()),
            ("rrhost", self.relative_host(&record.host)),
            ("rrvalue", record.value.clone()),
            ("rrttl", record.ttl.to_string()),
            ("rrdistance", record.distance.to_string()),
        ]
    }

    async fn request(
        &self,
        operation: &str,
        params: &[(&str, String)],
        should_retry: fn(&ProviderError) -> bool,
    ) -> Result<Reply, ProviderError> {
        let url = self.operation_url(operation, params)?;

        retry_http_call_when(
            || self.request_once(operation, url.clone()),
            operation,
            self.retry_max_elapsed,
            should_retry,
        )
        .await
    }

    async fn request_once(&self, operation: &str, url: Url) -> Result<Reply, ProviderError> {
        debug!(operation = operation, domain = %self.domain, "Namesilo API request");

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_connect() {
                ProviderError::HttpConnectionFailed {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            } else {
                ProviderError::RequestInterrupted {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedHttpStatus {
                operation: operation.to_string(),
                status_code: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestInterrupted {
                operation: operation.to_string(),
                reason: format!("failed to read response body: {e}"),
            })?;

        let parsed: NamesiloResponse =
            quick_xml::de::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if parsed.reply.detail != NAMESILO_SUCCESS_DETAIL {
            return Err(ProviderError::ApiRejected {
                operation: operation.to_string(),
                detail: parsed.reply.detail,
            });
        }

        Ok(parsed.reply)
    }
}

fn require_id(operation: &str, record: &Record) -> Result<(), ProviderError> {
    if record.has_id() {
        Ok(())
    } else {
        Err(ProviderError::MissingId {
            operation: operation.to_string(),
            record_type: record.record_type.to_string(),
            host: record.host.clone(),
        })
    }
}

#[async_trait]
impl DnsProvider for NamesiloClient {
    async fn list_records(&self) -> Result<Vec<Record>, ProviderError> {
        let reply = self
            .request(OP_LIST, &[], ProviderError::is_transient)
            .await?;
        Ok(reply.resource_records.into_iter().map(Record::from).collect())
    }

    async fn add_record(&self, record: &Record) -> Result<(), ProviderError> {
        self.request(
            OP_ADD,
            &self.record_params(record),
            ProviderError::is_safe_to_resend,
        )
        .await?;
        Ok(())
    }

    async fn update_record(&self, record: &Record) -> Result<(), ProviderError> {
        require_id("update", record)?;

        let mut params = vec![("rrid", record.id.clone())];
        params.extend(self.record_params(record));

        self.request(OP_UPDATE, &params, ProviderError::is_transient)
            .await?;
        Ok(())
    }

    async fn delete_record(&self, record: &Record) -> Result<(), ProviderError> {
        require_id("delete", record)?;

        self.request(
            OP_DELETE,
            &[("rrid", record.id.clone())],
            ProviderError::is_safe_to_resend,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "namesilo_tests.rs"]
mod namesilo_tests;
