// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress-driven DNS manager.
//!
//! [`DnsManager`] owns the [`StateCache`] and turns ingress lifecycle events
//! into provider calls:
//!
//! - **Exists**: derive the desired record, classify it against the cache,
//!   then add, update, or do nothing.
//! - **Deleted**: find the cached record with the same identity and delete it
//!   by id. A missing record is an error, never a silent success.
//!
//! Ingresses whose class annotation differs from the configured class are
//! ignored. Provider failures are returned unchanged; the manager never
//! retries. After a successful mutation the cache is optionally refreshed, and
//! a failure of that refresh is only logged since the periodic refresh will
//! catch up.

use crate::cache::{CacheSnapshot, StateCache};
use crate::derive::{ingress_class, ingress_ref, record_from_ingress};
use crate::dns_errors::{DnsError, RefreshError};
use crate::metrics;
use crate::provider::DnsProvider;
use crate::public_ip::PublicIpSource;
use crate::reconcile::{classify, find_identity_match, reconcile, Classification};
use crate::record::Record;
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What caused a cache refresh. Used as a metric label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// Initial population before any event is handled
    Startup,
    /// The fixed-interval timer
    Periodic,
    /// A successful add, update, or delete
    Mutation,
    /// The start of a bulk sync pass
    Sync,
}

impl RefreshTrigger {
    /// Label value for this trigger.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Periodic => "periodic",
            Self::Mutation => "mutation",
            Self::Sync => "sync",
        }
    }
}

/// How one ingress event was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngressOutcome {
    /// The ingress belongs to another class
    Skipped,
    /// The provider already holds the desired record
    NoOp,
    /// A record was created
    Added,
    /// An existing record was updated in place
    Updated,
    /// The ingress's record was deleted
    Deleted,
}

impl IngressOutcome {
    /// Label value for this outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::NoOp => "noop",
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Counts from one bulk sync pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Records created
    pub added: usize,
    /// Records updated in place
    pub updated: usize,
    /// Records already up to date
    pub no_op: usize,
    /// Matching ingresses that could not be turned into a record
    pub malformed: usize,
}

/// Reconciles ingresses of one class against one DNS zone.
pub struct DnsManager {
    bare_domain: String,
    ingress_class: String,
    provider: Arc<dyn DnsProvider>,
    ip_source: Arc<dyn PublicIpSource>,
    cache: StateCache,
    refreshes_cache_on_update: bool,
}

impl std::fmt::Debug for DnsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsManager")
            .field("bare_domain", &self.bare_domain)
            .field("ingress_class", &self.ingress_class)
            .field("refreshes_cache_on_update", &self.refreshes_cache_on_update)
            .finish_non_exhaustive()
    }
}

impl DnsManager {
    /// Create a manager with an empty cache and post-mutation refresh disabled.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] when `bare_domain` or
    /// `ingress_class` is empty.
    pub fn new(
        bare_domain: &str,
        ingress_class: &str,
        provider: Arc<dyn DnsProvider>,
        ip_source: Arc<dyn PublicIpSource>,
    ) -> Result<Self, DnsError> {
        if bare_domain.is_empty() {
            return Err(DnsError::Configuration(
                "must provide a domain name to target DNS record updates".to_string(),
            ));
        }

        if ingress_class.is_empty() {
            return Err(DnsError::Configuration(
                "must provide an ingress class to generate DNS records".to_string(),
            ));
        }

        Ok(Self {
            bare_domain: bare_domain.to_string(),
            ingress_class: ingress_class.to_string(),
            provider,
            ip_source,
            cache: StateCache::new(),
            refreshes_cache_on_update: false,
        })
    }

    /// Refresh the cache after every successful mutation.
    #[must_use]
    pub fn with_refresh_on_mutation(mut self, enabled: bool) -> Self {
        self.refreshes_cache_on_update = enabled;
        self
    }

    /// The zone apex this manager writes records for.
    #[must_use]
    pub fn bare_domain(&self) -> &str {
        &self.bare_domain
    }

    /// The ingress class this manager acts on.
    #[must_use]
    pub fn ingress_class(&self) -> &str {
        &self.ingress_class
    }

    /// Copy of the current cache snapshot.
    pub async fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot().await
    }

    /// Whether `ingress` carries this manager's class annotation.
    #[must_use]
    pub fn should_process_ingress(&self, ingress: &Ingress) -> bool {
        ingress_class(ingress) == Some(self.ingress_class.as_str())
    }

    /// Replace the cache with the provider's records and the current public IP.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] if listing records or discovering the IP
    /// fails. The previous snapshot is kept.
    pub async fn refresh_cache(&self, trigger: RefreshTrigger) -> Result<(), RefreshError> {
        let start = Instant::now();

        match self
            .cache
            .refresh(self.provider.as_ref(), self.ip_source.as_ref())
            .await
        {
            Ok(count) => {
                metrics::record_cache_refresh_success(trigger.as_str(), count, start.elapsed());
                debug!(
                    trigger = trigger.as_str(),
                    records = count,
                    "Refreshed DNS state cache"
                );
                Ok(())
            }
            Err(e) => {
                metrics::record_cache_refresh_error(trigger.as_str(), start.elapsed());
                Err(e)
            }
        }
    }

    /// Make the provider hold the record derived from `ingress`.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::MalformedIngress`] when no record can be derived,
    /// or [`DnsError::Provider`] when the add or update call fails.
    pub async fn handle_ingress_exists(&self, ingress: &Ingress) -> Result<IngressOutcome, DnsError> {
        if !self.should_process_ingress(ingress) {
            debug!(ingress = %ingress_ref(ingress), "Ignoring ingress of another class");
            return Ok(IngressOutcome::Skipped);
        }

        let snapshot = self.cache.snapshot().await;
        let desired = record_from_ingress(ingress, &self.bare_domain, &snapshot.public_ip)?;

        let outcome = match classify(&snapshot.records, &desired) {
            Classification::NoOp => {
                debug!(
                    record_type = %desired.record_type,
                    host = %desired.host,
                    "Record already up to date"
                );
                return Ok(IngressOutcome::NoOp);
            }
            Classification::Add(record) => {
                self.add(&record).await?;
                IngressOutcome::Added
            }
            Classification::Update(record) => {
                self.update(&record).await?;
                IngressOutcome::Updated
            }
        };

        self.refresh_after_mutation().await;
        Ok(outcome)
    }

    /// Delete the provider record belonging to `ingress`.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::RecordNotFound`] when the cache holds no record with
    /// the derived type and host, [`DnsError::MalformedIngress`] when no
    /// record can be derived, or [`DnsError::Provider`] when the delete fails.
    pub async fn handle_ingress_deleted(&self, ingress: &Ingress) -> Result<IngressOutcome, DnsError> {
        if !self.should_process_ingress(ingress) {
            debug!(ingress = %ingress_ref(ingress), "Ignoring ingress of another class");
            return Ok(IngressOutcome::Skipped);
        }

        let snapshot = self.cache.snapshot().await;
        // Identity is type + host, so a stale IP cannot make the lookup miss.
        let desired = record_from_ingress(ingress, &self.bare_domain, &snapshot.public_ip)?;

        let existing = find_identity_match(&snapshot.records, &desired).ok_or_else(|| {
            DnsError::RecordNotFound {
                record_type: desired.record_type.to_string(),
                host: desired.host.clone(),
            }
        })?;

        info!(
            record_id = %existing.id,
            record_type = %existing.record_type,
            host = %existing.host,
            "Deleting DNS record"
        );
        self.provider.delete_record(existing).await?;
        metrics::record_dns_record_deleted(existing.record_type.as_str());

        self.refresh_after_mutation().await;
        Ok(IngressOutcome::Deleted)
    }

    /// Bring the provider in line with every matching ingress in one pass.
    ///
    /// The cache is refreshed first. Adds and updates are applied, no-ops are
    /// logged, and nothing is ever deleted. Ingresses that yield no record are
    /// logged and left out; when several ingresses yield the same type and
    /// host only the first is used.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Refresh`] if the initial refresh fails, or the
    /// first [`DnsError::Provider`] error, which aborts the pass.
    pub async fn sync_ingresses(&self, ingresses: &[Ingress]) -> Result<SyncSummary, DnsError> {
        self.refresh_cache(RefreshTrigger::Sync).await?;
        let snapshot = self.cache.snapshot().await;

        let mut summary = SyncSummary::default();
        let mut seen = HashSet::new();
        let mut desired: Vec<Record> = Vec::new();

        for ingress in ingresses.iter().filter(|i| self.should_process_ingress(i)) {
            match record_from_ingress(ingress, &self.bare_domain, &snapshot.public_ip) {
                Ok(record) => {
                    if seen.insert(record.key()) {
                        desired.push(record);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Skipping ingress during sync");
                    metrics::record_error(e.error_type());
                    summary.malformed += 1;
                }
            }
        }

        let plan = reconcile(&snapshot.records, &desired);

        for record in &plan.no_op {
            info!(
                record_type = %record.record_type,
                host = %record.host,
                "Skipping record because it is already up to date"
            );
        }
        summary.no_op = plan.no_op.len();

        for record in &plan.add {
            self.add(record).await?;
            summary.added += 1;
        }

        for record in &plan.update {
            self.update(record).await?;
            summary.updated += 1;
        }

        if !plan.is_empty() {
            self.refresh_after_mutation().await;
        }

        Ok(summary)
    }

    async fn add(&self, record: &Record) -> Result<(), DnsError> {
        info!(
            record_type = %record.record_type,
            host = %record.host,
            value = %record.value,
            "Creating DNS record"
        );
        self.provider.add_record(record).await?;
        metrics::record_dns_record_added(record.record_type.as_str());
        Ok(())
    }

    async fn update(&self, record: &Record) -> Result<(), DnsError> {
        info!(
            record_id = %record.id,
            record_type = %record.record_type,
            host = %record.host,
            value = %record.value,
            "Updating DNS record"
        );
        self.provider.update_record(record).await?;
        metrics::record_dns_record_updated(record.record_type.as_str());
        Ok(())
    }

    async fn refresh_after_mutation(&self) {
        if !self.refreshes_cache_on_update {
            return;
        }

        if let Err(e) = self.refresh_cache(RefreshTrigger::Mutation).await {
            metrics::record_error("RefreshError");
            warn!(error = %e, "Cache refresh after mutation failed; keeping stale cache until next refresh");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
