// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! Every flag can also be set through an `NSDNS_*` environment variable. The
//! Namesilo API key is read from `NAMESILO_API_KEY` only, and leader election
//! takes the pod's identity from `POD_NAMESPACE` and `POD_NAME`.
//!
//! Parsing is left to `clap`; the checks that produce operator-facing errors
//! (empty domain, empty class, missing credentials) happen in
//! [`CommonArgs::validate`] and [`WatchArgs::lease_settings`] so that the
//! messages are the same whether a value came from a flag or the environment.

use crate::constants::{
    DEFAULT_HTTP_RETRY_MAX_SECS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LEASE_DURATION_SECS,
    DEFAULT_LEASE_GRACE_SECS, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
    NAMESILO_API_KEY_ENV,
    NAMESILO_API_URL, POD_NAMESPACE_ENV, POD_NAME_ENV, PUBLIC_IP_URL,
};
use crate::dns_errors::DnsError;
use crate::manager::DnsManager;
use crate::provider::namesilo::NamesiloClient;
use crate::public_ip::IcanhazipSource;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "nsdns",
    about = "Pull ingress resources, and set DNS according to the host's external IP",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch ingress objects, and create DNS records
    Watch(WatchArgs),
    /// Reconcile every matching ingress once, then exit
    Update(UpdateArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Bare domain name whose records are managed
    #[arg(short = 'd', long, env = "NSDNS_DOMAIN", default_value = "")]
    pub domain: String,

    /// Ingress class to generate DNS records for
    #[arg(short = 'i', long, env = "NSDNS_INGRESS_CLASS", default_value = "")]
    pub ingress_class: String,

    /// Timeout for each outbound HTTP request, in seconds
    #[arg(long, env = "NSDNS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Time budget for retrying transient HTTP failures, in seconds (0 disables)
    #[arg(long, env = "NSDNS_HTTP_RETRY_MAX_SECS", default_value_t = DEFAULT_HTTP_RETRY_MAX_SECS)]
    pub http_retry_max_secs: u64,

    /// Namesilo API prefix
    #[arg(long, env = "NSDNS_NAMESILO_API_URL", default_value = NAMESILO_API_URL)]
    pub namesilo_api_url: String,

    /// Service answering with the caller's public IP as plain text
    #[arg(long, env = "NSDNS_PUBLIC_IP_URL", default_value = PUBLIC_IP_URL)]
    pub public_ip_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Name of the Lease used for leader election; runs unguarded when unset
    #[arg(short = 'l', long = "with-lease", env = "NSDNS_LEASE_NAME")]
    pub lease_name: Option<String>,

    /// Seconds between forced full cache refreshes
    #[arg(long, env = "NSDNS_REFRESH_INTERVAL_SECS", default_value_t = DEFAULT_REFRESH_INTERVAL_SECS)]
    pub refresh_interval_secs: u64,

    /// Seconds between replays of every known ingress through the manager
    #[arg(long, env = "NSDNS_RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_interval_secs: u64,

    /// Refresh the cache after every successful mutation
    #[arg(
        long,
        env = "NSDNS_REFRESH_ON_MUTATION",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub refresh_on_mutation: bool,

    /// Serve /metrics and /healthz on this address
    #[arg(long, env = "NSDNS_METRICS_BIND_ADDRESS")]
    pub metrics_bind_address: Option<SocketAddr>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only consider ingresses in this namespace
    #[arg(short = 'n', long, env = "NSDNS_NAMESPACE")]
    pub namespace: Option<String>,
}

/// Validated settings for talking to Namesilo and the IP echo service.
#[derive(Clone)]
pub struct Config {
    /// Bare domain (zone apex) whose records are managed
    pub domain: String,
    /// Ingress class whose objects get records
    pub ingress_class: String,
    /// Namesilo API key; never printed
    pub api_key: String,
    /// Namesilo API prefix
    pub namesilo_api_url: String,
    /// Public IP echo service URL
    pub public_ip_url: String,
    /// Timeout applied to each HTTP request
    pub http_timeout: Duration,
    /// Retry budget for transient HTTP failures (zero disables retries)
    pub http_retry_max: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("ingress_class", &self.ingress_class)
            .field("namesilo_api_url", &self.namesilo_api_url)
            .field("public_ip_url", &self.public_ip_url)
            .field("http_timeout", &self.http_timeout)
            .field("http_retry_max", &self.http_retry_max)
            .finish_non_exhaustive()
    }
}

/// Leader election settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseSettings {
    /// Lease object name
    pub name: String,
    /// Namespace the Lease lives in (the pod's own)
    pub namespace: String,
    /// Holder identity (the pod's name)
    pub identity: String,
    /// Lease duration in seconds
    pub duration_secs: u64,
    /// Seconds before expiry at which the holder renews
    pub grace_secs: u64,
}

/// Environment value, with empty treated as unset.
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.is_empty())
}

impl CommonArgs {
    /// Check the shared options and pick up the API key.
    ///
    /// `lookup` reads an environment variable; pass `|k| std::env::var(k).ok()`.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] for an empty domain or ingress
    /// class, or a missing `NAMESILO_API_KEY`.
    pub fn validate<F>(&self, lookup: F) -> Result<Config, DnsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.domain.is_empty() {
            return Err(DnsError::Configuration(
                "must provide a domain name to target DNS record updates".to_string(),
            ));
        }

        if self.ingress_class.is_empty() {
            return Err(DnsError::Configuration(
                "must provide an ingress class to generate DNS records".to_string(),
            ));
        }

        let api_key = non_empty(&lookup, NAMESILO_API_KEY_ENV).ok_or_else(|| {
            DnsError::Configuration(format!(
                "failed to find {NAMESILO_API_KEY_ENV} in environment; cannot proceed"
            ))
        })?;

        Ok(Config {
            domain: self.domain.clone(),
            ingress_class: self.ingress_class.clone(),
            api_key,
            namesilo_api_url: self.namesilo_api_url.clone(),
            public_ip_url: self.public_ip_url.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            http_retry_max: Duration::from_secs(self.http_retry_max_secs),
        })
    }
}

impl WatchArgs {
    /// Leader election settings, or `None` when no lease was requested.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] when a lease is requested but
    /// `POD_NAMESPACE` or `POD_NAME` is missing.
    pub fn lease_settings<F>(&self, lookup: F) -> Result<Option<LeaseSettings>, DnsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(name) = self.lease_name.as_ref().filter(|name| !name.is_empty()) else {
            return Ok(None);
        };

        let namespace = non_empty(&lookup, POD_NAMESPACE_ENV).ok_or_else(|| {
            DnsError::Configuration(format!("must provide {POD_NAMESPACE_ENV} to use leases"))
        })?;

        let identity = non_empty(&lookup, POD_NAME_ENV).ok_or_else(|| {
            DnsError::Configuration(format!("must provide {POD_NAME_ENV} to use leases"))
        })?;

        Ok(Some(LeaseSettings {
            name: name.clone(),
            namespace,
            identity,
            duration_secs: DEFAULT_LEASE_DURATION_SECS,
            grace_secs: DEFAULT_LEASE_GRACE_SECS,
        }))
    }

    /// Interval between forced refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] when the interval is zero.
    pub fn refresh_interval(&self) -> Result<Duration, DnsError> {
        if self.refresh_interval_secs == 0 {
            return Err(DnsError::Configuration(
                "refresh interval must be at least one second".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.refresh_interval_secs))
    }

    /// Interval between replays of every known ingress.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] when the interval is zero.
    pub fn resync_interval(&self) -> Result<Duration, DnsError> {
        if self.resync_interval_secs == 0 {
            return Err(DnsError::Configuration(
                "resync interval must be at least one second".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.resync_interval_secs))
    }
}

impl Config {
    /// HTTP client shared by the Namesilo and IP discovery clients.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] if the client cannot be built.
    pub fn http_client(&self) -> Result<reqwest::Client, DnsError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| DnsError::Configuration(format!("failed to build HTTP client: {e}")))
    }

    /// Manager wired to Namesilo and the configured IP echo service.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Configuration`] if the HTTP client cannot be built.
    pub fn dns_manager(&self, refresh_on_mutation: bool) -> Result<DnsManager, DnsError> {
        let http = self.http_client()?;

        let provider = NamesiloClient::new(
            http.clone(),
            &self.namesilo_api_url,
            &self.domain,
            &self.api_key,
            self.http_retry_max,
        );
        let ip_source = IcanhazipSource::new(http, &self.public_ip_url, self.http_retry_max);

        Ok(DnsManager::new(
            &self.domain,
            &self.ingress_class,
            Arc::new(provider),
            Arc::new(ip_source),
        )?
        .with_refresh_on_mutation(refresh_on_mutation))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
