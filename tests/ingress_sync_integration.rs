// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests of the DNS manager against mock Namesilo and IP echo services.
//!
//! These exercise the real HTTP clients, so they cover the wire format and the
//! manager's decisions together. No Kubernetes cluster is required.

mod common;

use common::{ingress, list_reply, manager, ok_reply, API_KEY, CLASS, DOMAIN};
use kube_namesilo_dns::manager::{IngressOutcome, RefreshTrigger, SyncSummary};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PUBLIC_IP: &str = "203.0.113.7";

async fn ip_echo() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{PUBLIC_IP}\n")))
        .mount(&server)
        .await;
    server
}

async fn mount_zone(server: &MockServer, records: &[(&str, &str, &str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/dnsListRecords"))
        .and(query_param("key", API_KEY))
        .and(query_param("domain", DOMAIN))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_reply(records)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sync_updates_stale_apex_and_adds_missing_cname() {
    let namesilo = MockServer::start().await;
    let echo = ip_echo().await;
    mount_zone(&namesilo, &[("1", "A", DOMAIN, "1.1.1.1")]).await;

    Mock::given(method("GET"))
        .and(path("/dnsUpdateRecord"))
        .and(query_param("rrid", "1"))
        .and(query_param("rrhost", ""))
        .and(query_param("rrvalue", PUBLIC_IP))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_reply()))
        .expect(1)
        .mount(&namesilo)
        .await;
    Mock::given(method("GET"))
        .and(path("/dnsAddRecord"))
        .and(query_param("rrtype", "CNAME"))
        .and(query_param("rrhost", "app"))
        .and(query_param("rrvalue", DOMAIN))
        .and(query_param("rrttl", "7207"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_reply()))
        .expect(1)
        .mount(&namesilo)
        .await;

    let manager = manager(&namesilo, &echo, false);
    let summary = manager
        .sync_ingresses(&[
            ingress("apex", CLASS, DOMAIN),
            ingress("app", CLASS, "app.example.com"),
            ingress("internal", "private", "internal.example.com"),
        ])
        .await
        .unwrap();

    assert_eq!(
        summary,
        SyncSummary {
            added: 1,
            updated: 1,
            no_op: 0,
            malformed: 0,
        }
    );
    assert_eq!(manager.snapshot().await.public_ip, PUBLIC_IP);
}

#[tokio::test]
async fn test_existing_record_needs_no_calls() {
    let namesilo = MockServer::start().await;
    let echo = ip_echo().await;
    mount_zone(&namesilo, &[("42", "CNAME", "app.example.com", DOMAIN)]).await;

    Mock::given(method("GET"))
        .and(path("/dnsAddRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_reply()))
        .expect(0)
        .mount(&namesilo)
        .await;

    let manager = manager(&namesilo, &echo, false);
    manager.refresh_cache(RefreshTrigger::Startup).await.unwrap();

    let outcome = manager
        .handle_ingress_exists(&ingress("app", CLASS, "app.example.com"))
        .await
        .unwrap();

    assert_eq!(outcome, IngressOutcome::NoOp);
}

#[tokio::test]
async fn test_deleted_ingress_removes_record_by_id() {
    let namesilo = MockServer::start().await;
    let echo = ip_echo().await;
    mount_zone(
        &namesilo,
        &[
            ("1", "A", DOMAIN, PUBLIC_IP),
            ("42", "CNAME", "app.example.com", DOMAIN),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/dnsDeleteRecord"))
        .and(query_param("rrid", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_reply()))
        .expect(1)
        .mount(&namesilo)
        .await;

    let manager = manager(&namesilo, &echo, true);
    manager.refresh_cache(RefreshTrigger::Startup).await.unwrap();

    let outcome = manager
        .handle_ingress_deleted(&ingress("app", CLASS, "app.example.com"))
        .await
        .unwrap();

    assert_eq!(outcome, IngressOutcome::Deleted);
}

#[tokio::test]
async fn test_rejected_call_surfaces_provider_detail() {
    let namesilo = MockServer::start().await;
    let echo = ip_echo().await;
    mount_zone(&namesilo, &[]).await;

    Mock::given(method("GET"))
        .and(path("/dnsAddRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<namesilo><request><operation>dnsAddRecord</operation></request>\
             <reply><code>280</code><detail>Invalid host</detail></reply></namesilo>",
        ))
        .expect(1)
        .mount(&namesilo)
        .await;

    let manager = manager(&namesilo, &echo, false);
    manager.refresh_cache(RefreshTrigger::Startup).await.unwrap();

    let err = manager
        .handle_ingress_exists(&ingress("app", CLASS, "app.example.com"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Invalid host"));
}
