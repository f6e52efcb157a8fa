// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider client contract.
//!
//! A [`DnsProvider`] lists and mutates the records of exactly one zone, chosen
//! when the provider is constructed. Records cross this boundary with fully
//! qualified hosts; implementations translate them to whatever their wire
//! format needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_namesilo_dns::provider::{DnsProvider, namesilo::NamesiloClient};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = NamesiloClient::new(
//!     reqwest::Client::new(),
//!     "https://www.namesilo.com/api",
//!     "example.com",
//!     "api-key",
//!     Duration::from_secs(120),
//! );
//! let records = client.list_records().await?;
//! # Ok(())
//! # }
//! ```

pub mod namesilo;

use crate::dns_errors::ProviderError;
use crate::record::Record;
use async_trait::async_trait;

/// List/add/update/delete over the records of one DNS zone.
///
/// Implementations must be usable from several tasks at once. They may retry
/// transport failures, but never decide whether a mutation is needed.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Every record currently in the zone.
    async fn list_records(&self) -> Result<Vec<Record>, ProviderError>;

    /// Create `record`. Its id is ignored.
    async fn add_record(&self, record: &Record) -> Result<(), ProviderError>;

    /// Replace the record with `record.id` by `record`.
    ///
    /// Fails with [`ProviderError::MissingId`] when the id is empty.
    async fn update_record(&self, record: &Record) -> Result<(), ProviderError>;

    /// Delete the record with `record.id`.
    ///
    /// Fails with [`ProviderError::MissingId`] when the id is empty.
    async fn delete_record(&self, record: &Record) -> Result<(), ProviderError>;
}
