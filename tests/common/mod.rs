// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_namesilo_dns::constants::INGRESS_CLASS_ANNOTATION;
use kube_namesilo_dns::manager::DnsManager;
use kube_namesilo_dns::provider::namesilo::NamesiloClient;
use kube_namesilo_dns::public_ip::IcanhazipSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const DOMAIN: &str = "example.com";
pub const CLASS: &str = "public";
pub const API_KEY: &str = "integration-key";

/// Build an ingress in namespace `default` with one rule for `host`
pub fn ingress(name: &str, class: &str, host: &str) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            annotations: Some(BTreeMap::from([(
                INGRESS_CLASS_ANNOTATION.to_string(),
                class.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `dnsListRecords` reply holding `(id, type, host, value)` records
pub fn list_reply(records: &[(&str, &str, &str, &str)]) -> String {
    let body: String = records
        .iter()
        .map(|(id, rtype, host, value)| {
            format!(
                "<resource_record><record_id>{id}</record_id><type>{rtype}</type>\
                 <host>{host}</host><value>{value}</value><ttl>7207</ttl>\
                 <distance>0</distance></resource_record>"
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\"?><namesilo><request><operation>dnsListRecords</operation>\
         </request><reply><code>300</code><detail>success</detail>{body}</reply></namesilo>"
    )
}

/// Reply for a mutating operation
pub fn ok_reply() -> String {
    "<namesilo><request><operation>op</operation></request>\
     <reply><code>300</code><detail>success</detail></reply></namesilo>"
        .to_string()
}

/// Manager wired to the mock Namesilo API and mock IP echo service
pub fn manager(namesilo: &MockServer, ip_echo: &MockServer, refresh_on_mutation: bool) -> DnsManager {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let provider = NamesiloClient::new(http.clone(), &namesilo.uri(), DOMAIN, API_KEY, Duration::ZERO);
    let ip_source = IcanhazipSource::new(http, &ip_echo.uri(), Duration::ZERO);

    DnsManager::new(DOMAIN, CLASS, Arc::new(provider), Arc::new(ip_source))
        .unwrap()
        .with_refresh_on_mutation(refresh_on_mutation)
}
