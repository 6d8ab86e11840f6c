//! Property-based tests: any set of unique keys, inserted in any order,
//! scans back complete and strictly ascending.

use proptest::prelude::*;
use tempfile::tempdir;
use tinytable::{Error, Row, Table};

fn row(id: u32) -> Row {
    Row::new(id, &format!("user{id}"), &format!("user{id}@example.com")).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scan_is_sorted_and_complete(
        keys in prop::collection::btree_set(1u32..100_000, 1..200)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("prop.db")).unwrap();

        for &key in &keys {
            table.insert(&row(key)).unwrap();
        }

        let mut expected = keys.clone();
        expected.sort_unstable();

        let mut scanned = Vec::with_capacity(keys.len());
        for item in table.select_all().unwrap() {
            let got = item.unwrap();
            prop_assert_eq!(got.username(), format!("user{}", got.id()));
            scanned.push(got.id());
        }
        prop_assert_eq!(scanned, expected);
    }

    #[test]
    fn reinserting_any_key_is_rejected(
        keys in prop::collection::btree_set(1u32..100_000, 1..50)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("prop.db")).unwrap();

        for &key in &keys {
            table.insert(&row(key)).unwrap();
        }

        let dup = keys[0];
        match table.insert(&row(dup)) {
            Err(Error::DuplicateKey(key)) => prop_assert_eq!(key, dup),
            other => prop_assert!(false, "expected DuplicateKey, got {:?}", other),
        }
        prop_assert_eq!(table.select_all().unwrap().count(), keys.len());
    }
}
