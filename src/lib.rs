// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kube-namesilo-dns - Ingress-driven DNS for Namesilo
//!
//! Keeps a Namesilo DNS zone in line with the `Ingress` objects of a
//! Kubernetes cluster. Every ingress of the configured class gets one record:
//! an `A` record pointing at the cluster's public IP for the bare domain, and
//! a `CNAME` to the bare domain for every other hostname.
//!
//! ## Overview
//!
//! - Ingress events arrive from a watch and are handled one at a time
//! - The desired record is classified against a cached copy of the zone
//! - Only the calls needed to close the gap are made (add, update, delete)
//! - The cache is refreshed after mutations and on a fixed interval
//! - Known ingresses are replayed every minute so records follow IP changes
//! - Optional leader election keeps a single replica writing
//!
//! ## Modules
//!
//! - [`record`] - DNS record model and its identity/equality rules
//! - [`derive`] - Desired record from an `Ingress`
//! - [`reconcile`] - Classification of desired vs. existing records
//! - [`cache`] - Lock-guarded snapshot of provider records and public IP
//! - [`manager`] - Ingress event handling and bulk sync
//! - [`watch`] - Watch driver, event loop, periodic refresh
//! - [`leader`] - Lease-based leader election gate
//! - [`provider`] - DNS provider contract and the Namesilo client
//! - [`public_ip`] - Public IP discovery
//!
//! ## Example
//!
//! ```rust
//! use kube_namesilo_dns::derive::derive_record;
//! use kube_namesilo_dns::reconcile::{classify, Classification};
//!
//! let desired = derive_record("app.example.com", "example.com", "203.0.113.7");
//! assert!(matches!(classify(&[], &desired), Classification::Add(_)));
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod derive;
pub mod dns_errors;
pub mod leader;
pub mod manager;
pub mod metrics;
pub mod provider;
pub mod public_ip;
pub mod reconcile;
pub mod record;
pub mod retry;
pub mod watch;

#[cfg(test)]
mod test_support;
