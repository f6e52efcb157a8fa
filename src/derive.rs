// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Derivation of the desired DNS record from an `Ingress`.
//!
//! The bare domain gets an `A` record pointing at the public IP; every other
//! hostname gets a `CNAME` pointing at the bare domain. Hosts are kept fully
//! qualified here, stripping them relative to the zone apex is a wire-level
//! concern of the provider client.

use crate::constants::{INGRESS_CLASS_ANNOTATION, MANAGED_RECORD_DISTANCE, MANAGED_RECORD_TTL_SECS};
use crate::dns_errors::DnsError;
use crate::record::{Record, RecordType};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;

/// Build the desired record for `hostname` in the zone `bare_domain`.
///
/// The returned record never carries an id; reconciliation copies one in from
/// an identity match when an update is needed.
#[must_use]
pub fn derive_record(hostname: &str, bare_domain: &str, public_ip: &str) -> Record {
    let (record_type, value) = if hostname == bare_domain {
        (RecordType::A, public_ip)
    } else {
        (RecordType::CNAME, bare_domain)
    };

    Record {
        id: String::new(),
        record_type,
        host: hostname.to_string(),
        value: value.to_string(),
        ttl: MANAGED_RECORD_TTL_SECS,
        distance: MANAGED_RECORD_DISTANCE,
    }
}

/// Derive the desired record from the first rule of `ingress`.
///
/// # Errors
///
/// Returns [`DnsError::MalformedIngress`] when the ingress has no rules or the
/// first rule has no hostname.
pub fn record_from_ingress(
    ingress: &Ingress,
    bare_domain: &str,
    public_ip: &str,
) -> Result<Record, DnsError> {
    let hostname = primary_hostname(ingress)?;
    Ok(derive_record(hostname, bare_domain, public_ip))
}

/// Hostname of the first rule of `ingress`. Later rules are ignored.
///
/// # Errors
///
/// Returns [`DnsError::MalformedIngress`] when there is no rule or the host is empty.
pub fn primary_hostname(ingress: &Ingress) -> Result<&str, DnsError> {
    let rule = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .and_then(|rules| rules.first())
        .ok_or_else(|| DnsError::MalformedIngress {
            ingress: ingress_ref(ingress),
            reason: "ingress defines no rules".to_string(),
        })?;

    match rule.host.as_deref() {
        Some(host) if !host.is_empty() => Ok(host),
        _ => Err(DnsError::MalformedIngress {
            ingress: ingress_ref(ingress),
            reason: "first rule has no hostname".to_string(),
        }),
    }
}

/// Value of the ingress class annotation, if set.
#[must_use]
pub fn ingress_class(ingress: &Ingress) -> Option<&str> {
    ingress
        .annotations()
        .get(INGRESS_CLASS_ANNOTATION)
        .map(String::as_str)
}

/// `namespace/name` of an ingress, for logs and errors.
#[must_use]
pub fn ingress_ref(ingress: &Ingress) -> String {
    format!(
        "{}/{}",
        ingress.namespace().unwrap_or_default(),
        ingress.name_any()
    )
}

#[cfg(test)]
#[path = "derive_tests.rs"]
mod derive_tests;
