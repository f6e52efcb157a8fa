// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS resource record model and its identity/equality rules.
//!
//! Two notions of sameness are used throughout the controller:
//!
//! - **Identity** ([`Record::same_identity`]): the records describe the same
//!   logical DNS entry, i.e. their `record_type` and `host` match.
//! - **Value equality** ([`Record::equals`]): no reconciliation is needed
//!   between the two records. Type, host, value, TTL, and distance must match;
//!   ids are compared only when both sides carry one, so a freshly derived
//!   (id-less) record still matches the provider's copy.
//!
//! The derived [`PartialEq`] is plain structural equality and is not used for
//! reconciliation decisions.

use std::fmt;

/// DNS record type.
///
/// Only `A` and `CNAME` are ever synthesized; every other type coming back
/// from the provider is carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 (or, for the apex, whatever the public address is) record
    A,
    /// Canonical name record
    CNAME,
    /// Any type this controller does not manage (MX, TXT, ...)
    Other(String),
}

impl RecordType {
    /// Get the record type as the provider spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::CNAME => "CNAME",
            RecordType::Other(other) => other,
        }
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value {
            "A" => RecordType::A,
            "CNAME" => RecordType::CNAME,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DNS resource record in the managed zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Provider-assigned identifier; empty means "not yet created"
    pub id: String,
    /// Record type
    pub record_type: RecordType,
    /// Fully-qualified hostname the record answers for
    pub host: String,
    /// IP literal for `A`, domain name for `CNAME`
    pub value: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Priority field, meaningful only for MX-like types
    pub distance: u32,
}

impl Record {
    /// Whether the provider has assigned this record an id.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Whether both records describe the same logical DNS entry.
    #[must_use]
    pub fn same_identity(&self, other: &Record) -> bool {
        self.record_type == other.record_type && self.host == other.host
    }

    /// Whether the two records are equal for reconciliation purposes.
    ///
    /// If exactly one side carries an id the id is ignored; if both do, they
    /// must match.
    #[must_use]
    pub fn equals(&self, other: &Record) -> bool {
        let ids_match = !(self.has_id() && other.has_id()) || self.id == other.id;

        ids_match
            && self.record_type == other.record_type
            && self.host == other.host
            && self.value == other.value
            && self.ttl == other.ttl
            && self.distance == other.distance
    }

    /// Identity key as rendered in logs and errors (`TYPE:host`).
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.record_type, self.host)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
