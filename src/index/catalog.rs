use crate::index::store::NameSource;
use crate::index::types::AuthorId;
use anyhow::{Context, Result};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One author-name association: author `author` signed a paper as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub author: AuthorId,
    pub name: String,
}

/// In-memory catalog of confirmed names and per-author name variants.
#[derive(Debug, Clone, Default)]
pub struct NameCatalog {
    confirmed: FxHashMap<String, RoaringBitmap>,
    variants: FxHashMap<AuthorId, FxHashMap<String, u64>>,
}

impl NameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from signatures. Each signature confirms the name for
    /// its author and counts one occurrence of that variant.
    pub fn from_signatures<I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = Signature>,
    {
        let mut catalog = Self::new();
        for signature in signatures {
            catalog.add_signature(signature.author, &signature.name);
        }
        catalog
    }

    /// Load signatures from a JSON array of `{"author": .., "name": ..}`
    pub fn load_signatures(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open signatures file {}", path.display()))?;
        let signatures: Vec<Signature> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse signatures file {}", path.display()))?;
        Ok(Self::from_signatures(signatures))
    }

    pub fn add_signature(&mut self, author: AuthorId, name: &str) {
        self.confirm(name, [author]);
        self.add_occurrences(author, name, 1);
    }

    /// Confirm that `authors` carry `name`
    pub fn confirm<I>(&mut self, name: &str, authors: I)
    where
        I: IntoIterator<Item = AuthorId>,
    {
        self.confirmed
            .entry(name.to_string())
            .or_default()
            .extend(authors);
    }

    /// Record `count` more occurrences of `name` for `author`
    pub fn add_occurrences(&mut self, author: AuthorId, name: &str, count: u64) {
        *self
            .variants
            .entry(author)
            .or_default()
            .entry(name.to_string())
            .or_default() += count;
    }

    pub fn name_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }
}

impl NameSource for NameCatalog {
    fn confirmed_name_to_authors(&self) -> Result<FxHashMap<String, RoaringBitmap>> {
        Ok(self.confirmed.clone())
    }

    fn author_to_variant_occurrences(&self) -> Result<FxHashMap<AuthorId, FxHashMap<String, u64>>> {
        Ok(self.variants.clone())
    }
}
