//! End-to-end scenarios against the public `Table` API.

use tempfile::tempdir;
use tinytable::{Error, Result, Row, Table};

fn open(path: &std::path::Path) -> Table {
    let _ = env_logger::builder().is_test(true).try_init();
    Table::open(path).unwrap()
}

fn row(id: u32) -> Row {
    Row::new(id, &format!("user{id}"), &format!("user{id}@example.com")).unwrap()
}

fn collect_ids(table: &mut Table) -> Vec<u32> {
    table
        .select_all()
        .unwrap()
        .map(|row| row.unwrap().id())
        .collect()
}

#[test]
fn test_rows_come_back_sorted_with_fields_intact() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    for id in [3, 1, 2] {
        table.insert(&row(id)).unwrap();
    }

    let rows: Vec<Row> = table.select_all().unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(rows.len(), 3);
    for (i, got) in rows.iter().enumerate() {
        let id = i as u32 + 1;
        assert_eq!(got.id(), id);
        assert_eq!(got.username(), format!("user{id}"));
        assert_eq!(got.email(), format!("user{id}@example.com"));
    }
}

#[test]
fn test_duplicate_insert_leaves_table_unchanged() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    table.insert(&row(1)).unwrap();
    table.insert(&row(2)).unwrap();

    let before = table.dump_tree().unwrap();
    match table.insert(&row(1)) {
        Err(Error::DuplicateKey(1)) => {}
        other => panic!("expected DuplicateKey, got {:?}", other),
    }
    assert_eq!(table.dump_tree().unwrap(), before);
    assert_eq!(collect_ids(&mut table), vec![1, 2]);
}

#[test]
fn test_first_split_promotes_internal_root() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    // One past the leaf capacity forces the first split.
    let count = table.layout().leaf_node_max_cells as u32 + 1;
    for id in 1..=count {
        table.insert(&row(id)).unwrap();
    }

    let rendered = table.dump_tree().unwrap();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "- internal (size 1)");
    assert_eq!(lines[1], "  - leaf (size 7)");
    assert!(rendered.contains("  - key 7\n"));
    assert_eq!(
        rendered.matches("- leaf").count(),
        2,
        "expected exactly two leaves:\n{rendered}"
    );

    assert_eq!(collect_ids(&mut table), (1..=count).collect::<Vec<_>>());
}

#[test]
fn test_reverse_order_inserts_scan_sorted() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    for id in (1..=50).rev() {
        table.insert(&row(id)).unwrap();
    }
    assert_eq!(collect_ids(&mut table), (1..=50).collect::<Vec<_>>());
}

#[test]
fn test_multiple_splits_keep_order() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    // A full residue cycle inserts 1..=96 in a scrambled order.
    let ids: Vec<u32> = (1..=96).map(|i| (i * 53) % 97).collect();
    for &id in &ids {
        table.insert(&row(id)).unwrap();
    }

    let rendered = table.dump_tree().unwrap();
    assert!(
        rendered.matches("- leaf").count() >= 3,
        "expected several leaves:\n{rendered}"
    );
    assert_eq!(collect_ids(&mut table), (1..=96).collect::<Vec<_>>());
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let shape = {
        let mut table = open(&path);
        for id in 1..=40 {
            table.insert(&row(id)).unwrap();
        }
        let shape = table.dump_tree().unwrap();
        table.close().unwrap();
        shape
    };

    let mut table = open(&path);
    assert_eq!(table.dump_tree().unwrap(), shape);
    assert_eq!(collect_ids(&mut table), (1..=40).collect::<Vec<_>>());

    // The reopened table accepts further inserts.
    table.insert(&row(41)).unwrap();
    assert_eq!(collect_ids(&mut table).len(), 41);
}

#[test]
fn test_table_full_reported_before_any_damage() {
    let dir = tempdir().unwrap();
    let mut table = open(&dir.path().join("test.db"));

    // Ascending inserts: the first leaf split uses two fresh pages, every
    // later one a single page, so the 100-page budget pins the exact
    // capacity: 98 seven-cell leaves plus one full 13-cell leaf.
    let mut inserted = 0u32;
    let failed_at = loop {
        let id = inserted + 1;
        match table.insert(&row(id)) {
            Ok(()) => inserted += 1,
            Err(Error::TableFull) => break id,
            Err(other) => panic!("unexpected error at id {id}: {other:?}"),
        }
    };

    assert_eq!(inserted, 98 * 7 + 13);
    assert_eq!(failed_at, inserted + 1);

    // The failed insert left the table intact and readable.
    assert_eq!(collect_ids(&mut table), (1..=inserted).collect::<Vec<_>>());

    // Still full on retry.
    match table.insert(&row(failed_at)) {
        Err(Error::TableFull) => {}
        other => panic!("expected TableFull, got {:?}", other),
    }
}
