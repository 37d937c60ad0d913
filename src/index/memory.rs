//! In-memory storage backend.
//!
//! Rows written during a build land in a pending generation. Once both
//! readiness flags are set the pending tables are frozen into an
//! [`Arc<MemorySnapshot>`] and swapped in as the published generation, so
//! readers holding the previous snapshot are never disturbed.

use crate::index::store::{IndexHandle, IndexReader, IndexStore, ReadinessFlags, Table};
use crate::index::types::{
    AuthorId, DenseRow, Generation, IndexedString, InvertedRow, QGram, StringId, TableName,
    TableRows,
};
use anyhow::{Result, anyhow};
use log::info;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Name row of the dense index
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NameEntry {
    pub text: String,
    pub authors: Vec<u8>,
    pub surname: String,
}

/// Inverted-list row keyed by its q-gram
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GramEntry {
    pub ids: Vec<u8>,
    pub cardinality: usize,
}

/// One immutable index generation
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    pub(crate) generation: Generation,
    pub(crate) names: BTreeMap<StringId, NameEntry>,
    pub(crate) variants: FxHashMap<AuthorId, Vec<(String, u64)>>,
    pub(crate) grams: FxHashMap<QGram, GramEntry>,
}

impl MemorySnapshot {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn string_count(&self) -> usize {
        self.names.len()
    }

    pub fn qgram_count(&self) -> usize {
        self.grams.len()
    }

    pub fn author_count(&self) -> usize {
        self.variants.len()
    }

    /// The `n` most common q-grams with their cardinality
    pub fn largest_lists(&self, n: usize) -> Vec<(&str, usize)> {
        let mut lists: Vec<(&str, usize)> = self
            .grams
            .iter()
            .map(|(qgram, entry)| (qgram.as_str(), entry.cardinality))
            .collect();
        lists.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        lists.truncate(n);
        lists
    }

    fn insert_dense(&mut self, rows: Vec<DenseRow>) {
        for row in rows {
            match row {
                DenseRow::Name {
                    id,
                    text,
                    authors,
                    surname,
                } => {
                    self.names.insert(
                        id,
                        NameEntry {
                            text,
                            authors,
                            surname,
                        },
                    );
                }
                DenseRow::Variants { author, variants } => {
                    self.variants.insert(author, variants);
                }
            }
        }
    }

    fn insert_inverted(&mut self, rows: Vec<InvertedRow>) {
        for row in rows {
            self.grams.insert(
                row.qgram,
                GramEntry {
                    ids: row.ids,
                    cardinality: row.cardinality,
                },
            );
        }
    }
}

impl IndexReader for MemorySnapshot {
    fn strings_by_id(&self, ids: &RoaringBitmap) -> Result<Vec<IndexedString>> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.names.get(&id).map(|entry| IndexedString {
                    id,
                    text: entry.text.clone(),
                    surname: entry.surname.clone(),
                })
            })
            .collect())
    }

    fn author_sets_by_string_id(&self, ids: &RoaringBitmap) -> Result<Vec<Vec<u8>>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.names.get(&id).map(|entry| entry.authors.clone()))
            .collect())
    }

    fn variants_by_author(
        &self,
        authors: &RoaringBitmap,
    ) -> Result<FxHashMap<AuthorId, Vec<(String, u64)>>> {
        Ok(authors
            .iter()
            .filter_map(|author| {
                self.variants
                    .get(&author)
                    .map(|variants| (author, variants.clone()))
            })
            .collect())
    }

    fn inverted_lists(&self, qgrams: &[QGram]) -> Result<Vec<InvertedRow>> {
        Ok(qgrams
            .iter()
            .filter_map(|qgram| {
                self.grams.get(qgram).map(|entry| InvertedRow {
                    qgram: qgram.clone(),
                    ids: entry.ids.clone(),
                    cardinality: entry.cardinality,
                })
            })
            .collect())
    }
}

/// Generation under construction
#[derive(Debug, Default)]
struct Pending {
    tables: MemorySnapshot,
    inverted_ready: bool,
    dense_ready: bool,
}

/// Thread-safe in-memory index store
#[derive(Debug, Default)]
pub struct MemoryStore {
    pending: Mutex<Pending>,
    published: RwLock<Option<Arc<MemorySnapshot>>>,
    last_generation: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an already-built generation published
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let store = Self::default();
        store
            .last_generation
            .store(snapshot.generation, Ordering::SeqCst);
        if let Ok(mut published) = store.published.write() {
            *published = Some(Arc::new(snapshot));
        }
        store
    }

    /// The published generation, if any
    pub fn published(&self) -> Option<Arc<MemorySnapshot>> {
        self.published.read().ok()?.clone()
    }

    /// Freeze the pending tables into a new published generation once both
    /// flags are up.
    fn try_publish(&self, pending: &mut Pending) -> Result<()> {
        if !(pending.inverted_ready && pending.dense_ready) {
            return Ok(());
        }

        let mut snapshot = std::mem::take(&mut pending.tables);
        snapshot.generation = self.last_generation.fetch_add(1, Ordering::SeqCst) + 1;
        pending.inverted_ready = false;
        pending.dense_ready = false;

        info!(
            "Publishing index generation {} ({} strings, {} q-grams, {} authors)",
            snapshot.generation,
            snapshot.string_count(),
            snapshot.qgram_count(),
            snapshot.author_count()
        );

        let mut published = self
            .published
            .write()
            .map_err(|_| anyhow!("published generation lock poisoned"))?;
        *published = Some(Arc::new(snapshot));
        Ok(())
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, Pending>> {
        self.pending
            .lock()
            .map_err(|_| anyhow!("pending generation lock poisoned"))
    }
}

impl Table for MemoryStore {
    fn bulk_insert(&self, table: TableName, rows: TableRows, truncate_first: bool) -> Result<()> {
        let mut pending = self.lock_pending()?;

        match (table, rows) {
            (TableName::DenseIndex, TableRows::Dense(rows)) => {
                if truncate_first {
                    pending.tables.names.clear();
                    pending.tables.variants.clear();
                    pending.dense_ready = false;
                }
                pending.tables.insert_dense(rows);
            }
            (TableName::InvertedLists, TableRows::Inverted(rows)) => {
                if truncate_first {
                    pending.tables.grams.clear();
                    pending.inverted_ready = false;
                }
                pending.tables.insert_inverted(rows);
            }
            (table, _) => {
                return Err(anyhow!("Row type does not match table {}", table));
            }
        }
        Ok(())
    }
}

impl ReadinessFlags for MemoryStore {
    fn set_inverted_ready(&self) -> Result<()> {
        let mut pending = self.lock_pending()?;
        pending.inverted_ready = true;
        self.try_publish(&mut pending)
    }

    fn set_dense_ready(&self) -> Result<()> {
        let mut pending = self.lock_pending()?;
        pending.dense_ready = true;
        self.try_publish(&mut pending)
    }

    fn is_operating(&self) -> bool {
        self.published
            .read()
            .map(|published| published.is_some())
            .unwrap_or(false)
    }
}

impl IndexStore for MemoryStore {
    fn current(&self) -> Option<IndexHandle> {
        let snapshot = self.published()?;
        let generation = snapshot.generation;
        Some(IndexHandle::new(generation, snapshot))
    }
}
