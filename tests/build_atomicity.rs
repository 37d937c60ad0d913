//! A failing build must never leave a half-built generation visible.

use anyhow::{Result, anyhow};
use authdex::AuthorSearch;
use authdex::index::{
    BuildError, IndexHandle, IndexStore, MemoryStore, NameCatalog, ReadinessFlags, Table,
    TableName, TableRows,
};
use authdex::utils::EngineConfig;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
struct DiskFull(TableName);

impl fmt::Display for DiskFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "disk full while writing {}", self.0)
    }
}

impl std::error::Error for DiskFull {}

/// Memory store whose writes to selected tables fail
struct FailingStore {
    inner: MemoryStore,
    fail_dense: AtomicBool,
    fail_inverted: AtomicBool,
    flag_calls: Mutex<Vec<&'static str>>,
}

impl FailingStore {
    fn new(fail_dense: bool, fail_inverted: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_dense: AtomicBool::new(fail_dense),
            fail_inverted: AtomicBool::new(fail_inverted),
            flag_calls: Mutex::new(Vec::new()),
        }
    }

    fn heal(&self) {
        self.fail_dense.store(false, Ordering::SeqCst);
        self.fail_inverted.store(false, Ordering::SeqCst);
    }

    fn flag_calls(&self) -> Vec<&'static str> {
        self.flag_calls.lock().unwrap().clone()
    }
}

impl Table for FailingStore {
    fn bulk_insert(&self, table: TableName, rows: TableRows, truncate_first: bool) -> Result<()> {
        let failing = match table {
            TableName::DenseIndex => self.fail_dense.load(Ordering::SeqCst),
            TableName::InvertedLists => self.fail_inverted.load(Ordering::SeqCst),
        };
        if failing {
            return Err(DiskFull(table).into());
        }
        self.inner.bulk_insert(table, rows, truncate_first)
    }
}

impl ReadinessFlags for FailingStore {
    fn set_inverted_ready(&self) -> Result<()> {
        self.flag_calls.lock().unwrap().push("inverted");
        self.inner.set_inverted_ready()
    }

    fn set_dense_ready(&self) -> Result<()> {
        self.flag_calls.lock().unwrap().push("dense");
        self.inner.set_dense_ready()
    }

    fn is_operating(&self) -> bool {
        self.inner.is_operating()
    }
}

impl IndexStore for FailingStore {
    fn current(&self) -> Option<IndexHandle> {
        self.inner.current()
    }
}

/// Flags that refuse to be raised
struct StuckFlags(MemoryStore);

impl Table for StuckFlags {
    fn bulk_insert(&self, table: TableName, rows: TableRows, truncate_first: bool) -> Result<()> {
        self.0.bulk_insert(table, rows, truncate_first)
    }
}

impl ReadinessFlags for StuckFlags {
    fn set_inverted_ready(&self) -> Result<()> {
        Err(anyhow!("flag store unavailable"))
    }

    fn set_dense_ready(&self) -> Result<()> {
        self.0.set_dense_ready()
    }

    fn is_operating(&self) -> bool {
        self.0.is_operating()
    }
}

impl IndexStore for StuckFlags {
    fn current(&self) -> Option<IndexHandle> {
        self.0.current()
    }
}

fn catalog() -> NameCatalog {
    let mut catalog = NameCatalog::new();
    catalog.add_signature(10, "Ellis, J");
    catalog.add_signature(10, "Ellis, John");
    catalog.add_signature(20, "Smith, J");
    catalog
}

fn assert_disk_full(err: &BuildError, table: TableName) {
    let cause = err.cause().downcast_ref::<DiskFull>().unwrap();
    assert_eq!(cause.0, table);
}

#[test]
fn dense_failure_is_reraised() {
    let engine = AuthorSearch::new(FailingStore::new(true, false), EngineConfig::default());
    let err = engine.build_index(&catalog()).unwrap_err();

    assert!(matches!(err, BuildError::DenseIndex(_)));
    assert_disk_full(&err, TableName::DenseIndex);
    assert!(engine.store().flag_calls().is_empty());
    assert_eq!(engine.find_author_ids("J Ellis").unwrap(), None);
}

#[test]
fn inverted_failure_is_reraised() {
    let engine = AuthorSearch::new(FailingStore::new(false, true), EngineConfig::default());
    let err = engine.build_index(&catalog()).unwrap_err();

    assert!(matches!(err, BuildError::InvertedLists(_)));
    assert_disk_full(&err, TableName::InvertedLists);
    assert!(engine.store().flag_calls().is_empty());
    assert!(!engine.store().is_operating());
}

#[test]
fn dense_failure_wins_when_both_fail() {
    let engine = AuthorSearch::new(FailingStore::new(true, true), EngineConfig::default());
    for _ in 0..5 {
        let err = engine.build_index(&catalog()).unwrap_err();
        assert!(matches!(err, BuildError::DenseIndex(_)));
    }
    assert!(engine.store().flag_calls().is_empty());
}

#[test]
fn retry_after_failure_succeeds() {
    let engine = AuthorSearch::new(FailingStore::new(false, true), EngineConfig::default());
    assert!(engine.build_index(&catalog()).is_err());

    engine.store().heal();
    engine.build_index(&catalog()).unwrap();

    assert_eq!(engine.store().flag_calls(), vec!["inverted", "dense"]);
    assert_eq!(engine.find_author_ids("J Ellis").unwrap(), Some(vec![10]));
}

#[test]
fn failed_rebuild_keeps_previous_generation() {
    let engine = AuthorSearch::new(FailingStore::new(false, false), EngineConfig::default());
    engine.build_index(&catalog()).unwrap();
    let before = engine.handle().unwrap().generation();

    engine.store().fail_inverted.store(true, Ordering::SeqCst);
    let mut bigger = catalog();
    bigger.add_signature(40, "Jones, Mary");
    assert!(engine.build_index(&bigger).is_err());

    assert_eq!(engine.handle().unwrap().generation(), before);
    assert_eq!(engine.find_author_ids("J Ellis").unwrap(), Some(vec![10]));
    assert_eq!(engine.find_author_ids("Mary Jones").unwrap(), Some(vec![]));
}

#[test]
fn readiness_failure_is_reported() {
    let engine = AuthorSearch::new(StuckFlags(MemoryStore::new()), EngineConfig::default());
    let err = engine.build_index(&catalog()).unwrap_err();

    assert!(matches!(err, BuildError::Readiness(_)));
    assert_eq!(err.cause().to_string(), "flag store unavailable");
    assert_eq!(engine.find_author_ids("J Ellis").unwrap(), None);
}
