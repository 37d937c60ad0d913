//! Row producers for the two index tables.
//!
//! A build first collapses raw names into [`IndexableStrings`]; the dense
//! index and the inverted lists are then derived from it independently,
//! which is what lets the two build tasks run in parallel without sharing
//! mutable state.

use crate::index::types::{AuthorId, DenseRow, InvertedRow, QGram, StringId};
use crate::utils::{IdSetCodec, NameNormalizer, unique_qgrams};
use anyhow::Result;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// An indexable string with the authors known under it
#[derive(Debug, Clone, PartialEq)]
pub struct IndexableEntry {
    pub text: String,
    pub surname: String,
    pub authors: RoaringBitmap,
}

/// Indexable strings of one build generation. The id of an entry is its
/// position.
#[derive(Debug, Clone, Default)]
pub struct IndexableStrings {
    entries: Vec<IndexableEntry>,
}

impl IndexableStrings {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, &IndexableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, entry)| (id as StringId, entry))
    }

    pub fn get(&self, id: StringId) -> Option<&IndexableEntry> {
        self.entries.get(id as usize)
    }
}

/// Collapse confirmed raw names into indexable strings.
///
/// Every raw name contributes its authors to the bucket of its normalized
/// text and to the bucket of its bare surname, so a surname ends up carrying
/// every author with any name under that surname. Buckets are ordered by
/// text, which fixes the id assignment of the generation.
pub fn index_author_names(
    names: &FxHashMap<String, RoaringBitmap>,
    normalizer: &dyn NameNormalizer,
) -> IndexableStrings {
    let normalized: Vec<_> = names
        .par_iter()
        .map(|(name, authors)| (normalizer.normalize(name), authors))
        .collect();

    let mut buckets: BTreeMap<String, IndexableEntry> = BTreeMap::new();
    for (name, authors) in normalized {
        if !name.text.is_empty() {
            upsert(&mut buckets, &name.text, &name.surname, authors);
        }
        if !name.surname.is_empty() {
            upsert(&mut buckets, &name.surname, &name.surname, authors);
        }
    }

    IndexableStrings {
        entries: buckets.into_values().collect(),
    }
}

/// Get-or-insert the bucket for `text` and union `authors` into it
fn upsert(
    buckets: &mut BTreeMap<String, IndexableEntry>,
    text: &str,
    surname: &str,
    authors: &RoaringBitmap,
) {
    let entry = buckets
        .entry(text.to_string())
        .or_insert_with(|| IndexableEntry {
            text: text.to_string(),
            surname: surname.to_string(),
            authors: RoaringBitmap::new(),
        });
    entry.authors |= authors;
}

/// Dense index rows: one per indexable string
pub fn dense_index_rows(
    strings: &IndexableStrings,
    codec: &dyn IdSetCodec,
) -> Result<Vec<DenseRow>> {
    strings
        .iter()
        .map(|(id, entry)| -> Result<DenseRow> {
            Ok(DenseRow::Name {
                id,
                text: entry.text.clone(),
                authors: codec.encode(&entry.authors)?,
                surname: entry.surname.clone(),
            })
        })
        .collect()
}

/// Inverted list rows: one per q-gram occurring in any indexable string
pub fn inverted_list_rows(
    strings: &IndexableStrings,
    qgram_len: usize,
    codec: &dyn IdSetCodec,
) -> Result<Vec<InvertedRow>> {
    // q-gram -> (string ids, running cardinality)
    let mut postings: BTreeMap<QGram, (RoaringBitmap, usize)> = BTreeMap::new();

    for (id, entry) in strings.iter() {
        for qgram in unique_qgrams(&entry.text, qgram_len) {
            let (ids, cardinality) = postings.entry(qgram).or_default();
            ids.insert(id);
            *cardinality += 1;
        }
    }

    postings
        .into_iter()
        .map(|(qgram, (ids, cardinality))| -> Result<InvertedRow> {
            Ok(InvertedRow {
                ids: codec.encode(&ids)?,
                qgram,
                cardinality,
            })
        })
        .collect()
}

/// Variant cache rows: every author's normalized name variants, with the
/// occurrences of raw variants that normalize alike summed up.
pub fn variant_cache_rows(
    variants: &FxHashMap<AuthorId, FxHashMap<String, u64>>,
    normalizer: &dyn NameNormalizer,
) -> Vec<DenseRow> {
    let mut rows: Vec<DenseRow> = variants
        .par_iter()
        .map(|(&author, names)| {
            let mut merged: BTreeMap<String, u64> = BTreeMap::new();
            for (name, &occurrences) in names {
                let normalized = normalizer.normalize(name);
                if normalized.is_empty() {
                    continue;
                }
                *merged.entry(normalized.text).or_default() += occurrences;
            }
            DenseRow::Variants {
                author,
                variants: merged.into_iter().collect(),
            }
        })
        .collect();

    rows.sort_by_key(|row| match row {
        DenseRow::Variants { author, .. } => *author,
        DenseRow::Name { id, .. } => *id,
    });
    rows
}
