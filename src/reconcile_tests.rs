// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reconcile.rs`

#[cfg(test)]
mod tests {
    use crate::derive::derive_record;
    use crate::reconcile::{classify, find_identity_match, reconcile, Classification};
    use crate::record::{Record, RecordType};

    fn existing(id: &str, record_type: RecordType, host: &str, value: &str) -> Record {
        Record {
            id: id.to_string(),
            record_type,
            host: host.to_string(),
            value: value.to_string(),
            ttl: 7207,
            distance: 0,
        }
    }

    #[test]
    fn test_empty_cache_classifies_as_add() {
        let desired = derive_record("app.example.com", "example.com", "1.1.1.1");

        assert_eq!(
            classify(&[], &desired),
            Classification::Add(Record {
                id: String::new(),
                record_type: RecordType::CNAME,
                host: "app.example.com".to_string(),
                value: "example.com".to_string(),
                ttl: 7207,
                distance: 0,
            })
        );
    }

    #[test]
    fn test_changed_public_ip_classifies_as_update_with_id() {
        let cache = vec![existing("9", RecordType::A, "example.com", "1.1.1.1")];
        let desired = derive_record("example.com", "example.com", "2.2.2.2");

        assert_eq!(
            classify(&cache, &desired),
            Classification::Update(existing("9", RecordType::A, "example.com", "2.2.2.2"))
        );
    }

    #[test]
    fn test_unchanged_cname_classifies_as_noop() {
        let cache = vec![existing(
            "5",
            RecordType::CNAME,
            "app.example.com",
            "example.com",
        )];
        let desired = derive_record("app.example.com", "example.com", "1.1.1.1");

        assert_eq!(classify(&cache, &desired), Classification::NoOp);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let cache = vec![
            existing("1", RecordType::A, "example.com", "1.1.1.1"),
            existing("2", RecordType::CNAME, "www.example.com", "example.com"),
        ];
        let desired = derive_record("example.com", "example.com", "1.1.1.1");

        for _ in 0..3 {
            assert_eq!(classify(&cache, &desired), Classification::NoOp);
        }
    }

    #[test]
    fn test_update_never_loses_the_id() {
        let cache = vec![existing("X", RecordType::CNAME, "app.example.com", "old.example.com")];
        let desired = derive_record("app.example.com", "example.com", "1.1.1.1");

        match classify(&cache, &desired) {
            Classification::Update(record) => {
                assert_eq!(record.id, "X");
                assert_eq!(record.value, "example.com");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_first_identity_match_wins() {
        let cache = vec![
            existing("first", RecordType::A, "example.com", "1.1.1.2"),
            existing("second", RecordType::A, "example.com", "1.1.1.1"),
        ];
        let desired = derive_record("example.com", "example.com", "1.1.1.1");

        match classify(&cache, &desired) {
            Classification::Update(record) => assert_eq!(record.id, "first"),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_other_type_on_same_host_is_not_an_identity_match() {
        let cache = vec![existing("7", RecordType::Other("MX".to_string()), "example.com", "mail.example.com")];
        let desired = derive_record("example.com", "example.com", "1.1.1.1");

        assert!(find_identity_match(&cache, &desired).is_none());
        assert!(matches!(classify(&cache, &desired), Classification::Add(_)));
    }

    #[test]
    fn test_bulk_reconcile_partitions_desired_records() {
        let cache = vec![
            existing("1", RecordType::A, "example.com", "1.1.1.1"),
            existing("2", RecordType::CNAME, "www.example.com", "example.com"),
            existing("3", RecordType::CNAME, "old.example.com", "elsewhere.net"),
        ];
        let desired = vec![
            derive_record("example.com", "example.com", "2.2.2.2"),
            derive_record("www.example.com", "example.com", "2.2.2.2"),
            derive_record("old.example.com", "example.com", "2.2.2.2"),
            derive_record("new.example.com", "example.com", "2.2.2.2"),
        ];

        let result = reconcile(&cache, &desired);

        assert_eq!(result.no_op.len(), 1);
        assert_eq!(result.no_op[0].host, "www.example.com");

        assert_eq!(result.update.len(), 2);
        assert_eq!(result.update[0].id, "1");
        assert_eq!(result.update[0].value, "2.2.2.2");
        assert_eq!(result.update[1].id, "3");
        assert_eq!(result.update[1].value, "example.com");

        assert_eq!(result.add.len(), 1);
        assert_eq!(result.add[0].host, "new.example.com");
        assert!(result.add[0].id.is_empty());
        assert!(!result.is_empty());
    }

    #[test]
    fn test_bulk_reconcile_matches_on_type_and_host() {
        // A TXT record on the apex must not be mistaken for the apex A record.
        let cache = vec![existing(
            "9",
            RecordType::Other("TXT".to_string()),
            "example.com",
            "v=spf1 -all",
        )];
        let desired = vec![derive_record("example.com", "example.com", "1.1.1.1")];

        let result = reconcile(&cache, &desired);

        assert_eq!(result.add.len(), 1);
        assert!(result.update.is_empty());
    }

    #[test]
    fn test_bulk_reconcile_agrees_with_classify() {
        let cache = vec![
            existing("1", RecordType::A, "example.com", "1.1.1.1"),
            existing("2", RecordType::A, "example.com", "9.9.9.9"),
        ];
        let desired = vec![derive_record("example.com", "example.com", "9.9.9.9")];

        let bulk = reconcile(&cache, &desired);
        let single = classify(&cache, &desired[0]);

        assert_eq!(single, Classification::Update(bulk.update[0].clone()));
    }

    #[test]
    fn test_bulk_reconcile_of_nothing_is_empty() {
        let result = reconcile(&[existing("1", RecordType::A, "example.com", "1.1.1.1")], &[]);
        assert!(result.is_empty());
        assert!(result.no_op.is_empty());
    }
}
