// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `public_ip.rs`

#[cfg(test)]
mod tests {
    use super::super::{parse_address, IcanhazipSource, PublicIpSource};
    use crate::dns_errors::IpDiscoveryError;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_address_trims_whitespace() {
        assert_eq!(
            parse_address("https://icanhazip.com", "203.0.113.7\n").unwrap(),
            "203.0.113.7"
        );
        assert_eq!(
            parse_address("https://icanhazip.com", "  2001:db8::1 \r\n").unwrap(),
            "2001:db8::1"
        );
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        let err = parse_address("https://icanhazip.com", "<html>rate limited</html>\n").unwrap_err();

        assert_eq!(
            err,
            IpDiscoveryError::InvalidAddress {
                endpoint: "https://icanhazip.com".to_string(),
                body: "<html>rate limited</html>".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_discover() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("198.51.100.4\n"))
            .expect(1)
            .mount(&server)
            .await;

        let source = IcanhazipSource::new(reqwest::Client::new(), &server.uri(), Duration::ZERO);

        assert_eq!(source.discover().await.unwrap(), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_discover_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let source = IcanhazipSource::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));
        let err = source.discover().await.unwrap_err();

        assert!(matches!(
            err,
            IpDiscoveryError::UnexpectedHttpStatus { status_code: 404, .. }
        ));
    }

    #[tokio::test]
    async fn test_discover_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("192.0.2.1"))
            .expect(1)
            .mount(&server)
            .await;

        let source = IcanhazipSource::new(reqwest::Client::new(), &server.uri(), Duration::from_secs(5));

        assert_eq!(source.discover().await.unwrap(), "192.0.2.1");
    }
}
