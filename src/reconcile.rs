// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation engine: desired record vs. cached provider state.
//!
//! [`classify`] handles one desired record at a time and is what the
//! event-driven path uses. [`reconcile`] handles a whole set of desired
//! records for full-sync passes. Both match existing records by
//! `type + host` and take the first match; duplicate provider records are
//! neither deduplicated nor reported.
//!
//! Deletion is never computed here. The delete path looks up an identity
//! match with [`find_identity_match`] and refuses to act without one.

use crate::record::{Record, RecordType};
use std::collections::HashMap;

/// Outcome of classifying one desired record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Provider already holds a value-equal record
    NoOp,
    /// No record with this identity exists
    Add(Record),
    /// A record with this identity exists with a different value; the
    /// carried record has the existing record's id
    Update(Record),
}

/// Result of a bulk reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordReconciliation {
    /// Records to create
    pub add: Vec<Record>,
    /// Records to update, each carrying the id of the record it replaces
    pub update: Vec<Record>,
    /// Records already up to date
    pub no_op: Vec<Record>,
}

impl RecordReconciliation {
    /// Whether applying this reconciliation would call the provider at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty()
    }
}

/// First record in `existing` with the same identity as `desired`.
#[must_use]
pub fn find_identity_match<'a>(existing: &'a [Record], desired: &Record) -> Option<&'a Record> {
    existing.iter().find(|record| record.same_identity(desired))
}

/// Classify `desired` against the provider's `existing` records.
#[must_use]
pub fn classify(existing: &[Record], desired: &Record) -> Classification {
    match find_identity_match(existing, desired) {
        None => Classification::Add(desired.clone()),
        Some(found) => decide(found, desired),
    }
}

/// Classify every record in `desired` against `existing`.
///
/// Existing records are indexed once by `type + host`; when the provider
/// holds several records with the same identity the first one wins, the same
/// as [`classify`].
#[must_use]
pub fn reconcile(existing: &[Record], desired: &[Record]) -> RecordReconciliation {
    let mut index: HashMap<(&RecordType, &str), &Record> = HashMap::with_capacity(existing.len());
    for record in existing {
        index
            .entry((&record.record_type, record.host.as_str()))
            .or_insert(record);
    }

    let mut result = RecordReconciliation::default();
    for record in desired {
        let found = index.get(&(&record.record_type, record.host.as_str()));
        match found.map_or_else(|| Classification::Add(record.clone()), |f| decide(f, record)) {
            Classification::NoOp => result.no_op.push(record.clone()),
            Classification::Add(r) => result.add.push(r),
            Classification::Update(r) => result.update.push(r),
        }
    }

    result
}

fn decide(found: &Record, desired: &Record) -> Classification {
    if found.equals(desired) {
        Classification::NoOp
    } else {
        Classification::Update(Record {
            id: found.id.clone(),
            ..desired.clone()
        })
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod reconcile_tests;
