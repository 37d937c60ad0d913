//! Storage collaborators.
//!
//! The engine never talks to a database directly. Building reads names from
//! a [`NameSource`] and writes rows through a [`Table`]; querying reads a
//! published generation through an [`IndexReader`] obtained from an
//! [`IndexHandle`].

use crate::index::types::{
    AuthorId, Generation, IndexedString, InvertedRow, QGram, TableName, TableRows,
};
use anyhow::Result;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Source of the raw names the index is built from.
pub trait NameSource: Send + Sync {
    /// Every confirmed raw name and the authors carrying it
    fn confirmed_name_to_authors(&self) -> Result<FxHashMap<String, RoaringBitmap>>;

    /// Every raw name variant of each author with its occurrence count
    fn author_to_variant_occurrences(&self) -> Result<FxHashMap<AuthorId, FxHashMap<String, u64>>>;
}

/// Bulk row sink for the persisted tables.
pub trait Table: Send + Sync {
    fn bulk_insert(&self, table: TableName, rows: TableRows, truncate_first: bool) -> Result<()>;
}

/// Readiness of the generation being built. Queries are served only while
/// both flags are set.
pub trait ReadinessFlags: Send + Sync {
    fn set_inverted_ready(&self) -> Result<()>;
    fn set_dense_ready(&self) -> Result<()>;
    fn is_operating(&self) -> bool;
}

/// Read access to one immutable index generation.
pub trait IndexReader: Send + Sync {
    /// Indexed strings for the given ids; unknown ids are skipped
    fn strings_by_id(&self, ids: &RoaringBitmap) -> Result<Vec<IndexedString>>;

    /// Encoded author sets of the given string ids
    fn author_sets_by_string_id(&self, ids: &RoaringBitmap) -> Result<Vec<Vec<u8>>>;

    /// Cached normalized name variants with occurrence counts
    fn variants_by_author(
        &self,
        authors: &RoaringBitmap,
    ) -> Result<FxHashMap<AuthorId, Vec<(String, u64)>>>;

    /// Inverted lists of the q-grams present in the index
    fn inverted_lists(&self, qgrams: &[QGram]) -> Result<Vec<InvertedRow>>;
}

/// A store the index can be built into and queried from.
pub trait IndexStore: Table + ReadinessFlags {
    /// Handle on the currently published generation, if any
    fn current(&self) -> Option<IndexHandle>;
}

/// Proof that an index generation is fully built.
///
/// Handles are only handed out for published generations, and a generation
/// never changes once published, so any number of queries can share a handle
/// while a rebuild runs.
#[derive(Clone)]
pub struct IndexHandle {
    generation: Generation,
    reader: Arc<dyn IndexReader>,
}

impl IndexHandle {
    pub fn new(generation: Generation, reader: Arc<dyn IndexReader>) -> Self {
        Self { generation, reader }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn reader(&self) -> &dyn IndexReader {
        self.reader.as_ref()
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
