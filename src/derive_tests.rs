// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `derive.rs`

#[cfg(test)]
mod tests {
    use crate::derive::{derive_record, ingress_class, ingress_ref, record_from_ingress};
    use crate::dns_errors::DnsError;
    use crate::record::RecordType;
    use crate::test_support::{ingress_with_rules, test_ingress};
    use k8s_openapi::api::networking::v1::IngressRule;

    #[test]
    fn test_apex_hostname_yields_a_record() {
        let record = derive_record("example.com", "example.com", "1.1.1.1");

        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.host, "example.com");
        assert_eq!(record.value, "1.1.1.1");
        assert_eq!(record.ttl, 7207);
        assert_eq!(record.distance, 0);
        assert!(record.id.is_empty());
    }

    #[test]
    fn test_subdomain_yields_cname_independent_of_ip() {
        for ip in ["1.1.1.1", "2001:db8::1", ""] {
            let record = derive_record("app.example.com", "example.com", ip);

            assert_eq!(record.record_type, RecordType::CNAME);
            assert_eq!(record.host, "app.example.com");
            assert_eq!(record.value, "example.com");
            assert_eq!(record.ttl, 7207);
            assert!(record.id.is_empty());
        }
    }

    #[test]
    fn test_record_from_ingress_uses_first_rule() {
        let ingress = ingress_with_rules(
            "web",
            Some("public"),
            vec![
                IngressRule {
                    host: Some("app.example.com".to_string()),
                    ..Default::default()
                },
                IngressRule {
                    host: Some("example.com".to_string()),
                    ..Default::default()
                },
            ],
        );

        let record = record_from_ingress(&ingress, "example.com", "1.1.1.1").unwrap();
        assert_eq!(record.record_type, RecordType::CNAME);
        assert_eq!(record.host, "app.example.com");
    }

    #[test]
    fn test_record_from_ingress_without_rules_is_malformed() {
        let ingress = ingress_with_rules("empty", Some("public"), vec![]);

        let err = record_from_ingress(&ingress, "example.com", "1.1.1.1").unwrap_err();
        assert!(matches!(err, DnsError::MalformedIngress { .. }));
        assert!(err.to_string().contains("default/empty"));
    }

    #[test]
    fn test_record_from_ingress_without_spec_is_malformed() {
        let mut ingress = test_ingress("nospec", Some("public"), "example.com");
        ingress.spec = None;

        let err = record_from_ingress(&ingress, "example.com", "1.1.1.1").unwrap_err();
        assert!(matches!(err, DnsError::MalformedIngress { .. }));
    }

    #[test]
    fn test_record_from_ingress_with_empty_host_is_malformed() {
        let ingress = test_ingress("blank", Some("public"), "");

        let err = record_from_ingress(&ingress, "example.com", "1.1.1.1").unwrap_err();
        assert!(matches!(err, DnsError::MalformedIngress { .. }));
    }

    #[test]
    fn test_ingress_class_annotation() {
        let ingress = test_ingress("web", Some("public"), "example.com");
        assert_eq!(ingress_class(&ingress), Some("public"));

        let ingress = test_ingress("web", None, "example.com");
        assert_eq!(ingress_class(&ingress), None);
    }

    #[test]
    fn test_ingress_ref() {
        let ingress = test_ingress("web", None, "example.com");
        assert_eq!(ingress_ref(&ingress), "default/web");
    }
}
