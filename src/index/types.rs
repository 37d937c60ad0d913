use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

/// Identifier of an author identity
pub type AuthorId = u32;

/// Dense, generation-stable identifier of an indexed string
pub type StringId = u32;

/// Generation counter of a published index
pub type Generation = u64;

/// A q-gram: substring of fixed length taken from an indexable string
pub type QGram = String;

/// A canonical indexable string (full name or bare surname) with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedString {
    pub id: StringId,
    pub text: String,
    pub surname: String,
}

/// An inverted list fetched for a q-gram: every string id containing it.
#[derive(Debug, Clone)]
pub struct InvertedList {
    pub ids: RoaringBitmap,
    pub cardinality: usize,
}

/// Row flag distinguishing name-index rows from variant-cache rows in the
/// dense index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RowFlag {
    Name = 0,
    Variants = 1,
}

/// A row of the dense index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenseRow {
    /// Indexed string with its encoded author set
    Name {
        id: StringId,
        text: String,
        authors: Vec<u8>,
        surname: String,
    },
    /// Every normalized name variant of an author and how often it occurs
    Variants {
        author: AuthorId,
        variants: Vec<(String, u64)>,
    },
}

impl DenseRow {
    pub fn flag(&self) -> RowFlag {
        match self {
            DenseRow::Name { .. } => RowFlag::Name,
            DenseRow::Variants { .. } => RowFlag::Variants,
        }
    }
}

/// A row of the inverted index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertedRow {
    pub qgram: QGram,
    pub ids: Vec<u8>,
    pub cardinality: usize,
}

/// Persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    DenseIndex,
    InvertedLists,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::DenseIndex => "dense_index",
            TableName::InvertedLists => "inverted_lists",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of rows for one table
#[derive(Debug, Clone)]
pub enum TableRows {
    Dense(Vec<DenseRow>),
    Inverted(Vec<InvertedRow>),
}

impl TableRows {
    pub fn len(&self) -> usize {
        match self {
            TableRows::Dense(rows) => rows.len(),
            TableRows::Inverted(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Metadata of a persisted generation, stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub generation: Generation,
    /// Distinct per save; every data file carries it in its header
    #[serde(default)]
    pub save_id: u64,
    pub qgram_len: usize,
    pub string_count: u32,
    pub qgram_count: u32,
    pub author_count: u32,
    pub created_at: u64,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self {
            version: 2,
            generation: 0,
            save_id: 0,
            qgram_len: 0,
            string_count: 0,
            qgram_count: 0,
            author_count: 0,
            created_at: 0,
        }
    }
}
