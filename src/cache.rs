// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process-local view of provider state.
//!
//! The cache holds the provider's record list and the public IP as one
//! [`CacheSnapshot`]. A refresh takes the write lock for its whole duration,
//! covering both network calls, and replaces the snapshot only when both
//! succeeded. Readers therefore never see records from one refresh paired
//! with an IP from another, and a failed refresh leaves the previous snapshot
//! intact.
//!
//! Every refresh, whether from the periodic timer or after a mutation, goes
//! through the same lock.

use crate::dns_errors::RefreshError;
use crate::provider::DnsProvider;
use crate::public_ip::PublicIpSource;
use crate::record::Record;
use tokio::sync::RwLock;

/// Provider records and public IP captured by one refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Every record in the zone, as of the last successful list
    pub records: Vec<Record>,
    /// Last successfully discovered public IP; empty before the first refresh
    pub public_ip: String,
}

/// Lock-guarded [`CacheSnapshot`].
#[derive(Debug, Default)]
pub struct StateCache {
    inner: RwLock<CacheSnapshot>,
}

impl StateCache {
    /// An empty cache. Nothing is reconciled correctly until the first refresh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot.
    pub async fn snapshot(&self) -> CacheSnapshot {
        self.inner.read().await.clone()
    }

    /// Number of cached provider records.
    pub async fn record_count(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Replace the snapshot with fresh provider records and public IP.
    ///
    /// Records are listed first, then the IP is discovered.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] if either call fails; the previous snapshot is
    /// kept in that case.
    pub async fn refresh(
        &self,
        provider: &dyn DnsProvider,
        ip_source: &dyn PublicIpSource,
    ) -> Result<usize, RefreshError> {
        let mut guard = self.inner.write().await;

        let records = provider.list_records().await?;
        let public_ip = ip_source.discover().await?;

        let count = records.len();
        *guard = CacheSnapshot { records, public_ip };

        Ok(count)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
