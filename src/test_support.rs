// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared builders and in-memory doubles for unit tests.

use crate::constants::INGRESS_CLASS_ANNOTATION;
use crate::dns_errors::{IpDiscoveryError, ProviderError};
use crate::provider::DnsProvider;
use crate::public_ip::PublicIpSource;
use crate::record::{Record, RecordType};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Ingress in namespace `default` with a single rule for `host`.
pub fn test_ingress(name: &str, class: Option<&str>, host: &str) -> Ingress {
    ingress_with_rules(
        name,
        class,
        vec![IngressRule {
            host: Some(host.to_string()),
            ..Default::default()
        }],
    )
}

/// Ingress in namespace `default` with the given rules.
pub fn ingress_with_rules(name: &str, class: Option<&str>, rules: Vec<IngressRule>) -> Ingress {
    let annotations = class.map(|class| {
        BTreeMap::from([(INGRESS_CLASS_ANNOTATION.to_string(), class.to_string())])
    });

    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            annotations,
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(rules),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Record with the managed TTL and distance.
pub fn record(id: &str, record_type: RecordType, host: &str, value: &str) -> Record {
    Record {
        id: id.to_string(),
        record_type,
        host: host.to_string(),
        value: value.to_string(),
        ttl: 7207,
        distance: 0,
    }
}

/// A call observed by [`FakeProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    List,
    Add(Record),
    Update(Record),
    Delete(Record),
}

/// In-memory zone that records every call made against it.
///
/// Adds are assigned sequential ids starting at `100`, updates and deletes
/// address records by id, so a refresh after a mutation sees its effect.
#[derive(Debug, Default)]
pub struct FakeProvider {
    records: Mutex<Vec<Record>>,
    calls: Mutex<Vec<ProviderCall>>,
    list_error: Mutex<Option<ProviderError>>,
    mutation_error: Mutex<Option<ProviderError>>,
    stalled: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeProvider {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            next_id: AtomicUsize::new(100),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_records(&self, records: Vec<Record>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than `List`.
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|call| *call != ProviderCall::List)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_list_with(&self, error: Option<ProviderError>) {
        *self.list_error.lock().unwrap() = error;
    }

    pub fn fail_mutations_with(&self, error: Option<ProviderError>) {
        *self.mutation_error.lock().unwrap() = error;
    }

    /// Make every later mutation hang after it has been recorded.
    pub fn stall_mutations(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    fn record_call(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn mutation_result(&self) -> Result<(), ProviderError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        match self.mutation_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DnsProvider for FakeProvider {
    async fn list_records(&self) -> Result<Vec<Record>, ProviderError> {
        self.record_call(ProviderCall::List);
        let list_error = self.list_error.lock().unwrap().clone();
        if let Some(err) = list_error {
            return Err(err);
        }
        Ok(self.records())
    }

    async fn add_record(&self, record: &Record) -> Result<(), ProviderError> {
        self.record_call(ProviderCall::Add(record.clone()));
        self.mutation_result().await?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(Record {
            id: id.to_string(),
            ..record.clone()
        });
        Ok(())
    }

    async fn update_record(&self, record: &Record) -> Result<(), ProviderError> {
        self.record_call(ProviderCall::Update(record.clone()));
        self.mutation_result().await?;

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn delete_record(&self, record: &Record) -> Result<(), ProviderError> {
        self.record_call(ProviderCall::Delete(record.clone()));
        self.mutation_result().await?;

        self.records.lock().unwrap().retain(|r| r.id != record.id);
        Ok(())
    }
}

/// Public IP source returning a configurable answer.
#[derive(Debug)]
pub struct FakeIpSource {
    answer: Mutex<Result<String, IpDiscoveryError>>,
    calls: AtomicUsize,
}

impl FakeIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            answer: Mutex::new(Ok(ip.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_ip(&self, ip: &str) {
        *self.answer.lock().unwrap() = Ok(ip.to_string());
    }

    pub fn fail_with(&self, error: IpDiscoveryError) {
        *self.answer.lock().unwrap() = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublicIpSource for FakeIpSource {
    async fn discover(&self) -> Result<String, IpDiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.lock().unwrap().clone()
    }
}

pub fn unreachable_ip() -> IpDiscoveryError {
    IpDiscoveryError::HttpConnectionFailed {
        endpoint: "https://icanhazip.com".to_string(),
        reason: "connection refused".to_string(),
    }
}

pub fn rejected(operation: &str) -> ProviderError {
    ProviderError::ApiRejected {
        operation: operation.to_string(),
        detail: "Invalid API Key".to_string(),
    }
}
