use crate::index::store::{NameSource, ReadinessFlags, Table};
use crate::index::types::{TableName, TableRows};
use crate::index::writer::{
    IndexableStrings, dense_index_rows, index_author_names, inverted_list_rows,
    variant_cache_rows,
};
use crate::utils::{IdSetCodec, NameNormalizer};
use log::{debug, info};
use std::time::Instant;
use thiserror::Error;

/// Failure of a full index build. The generation being built is left
/// unready; the caller retries by building again from scratch.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read names from the name store")]
    Source(#[source] anyhow::Error),

    #[error("dense index task failed")]
    DenseIndex(#[source] anyhow::Error),

    #[error("inverted list task failed")]
    InvertedLists(#[source] anyhow::Error),

    #[error("failed to cache author name variants")]
    VariantCache(#[source] anyhow::Error),

    #[error("failed to mark the index ready")]
    Readiness(#[source] anyhow::Error),
}

impl BuildError {
    /// The collaborator error that caused the failure
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            BuildError::Source(e)
            | BuildError::DenseIndex(e)
            | BuildError::InvertedLists(e)
            | BuildError::VariantCache(e)
            | BuildError::Readiness(e) => e,
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Both tables written and the generation marked ready
    Built { strings: usize, qgrams: usize, authors: usize },
    /// No confirmed names: nothing was written and nothing marked ready
    Empty,
}

/// Builds a complete index generation from a name source into a store.
pub struct IndexBuilder<'a> {
    names: &'a dyn NameSource,
    normalizer: &'a dyn NameNormalizer,
    codec: &'a dyn IdSetCodec,
    qgram_len: usize,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        names: &'a dyn NameSource,
        normalizer: &'a dyn NameNormalizer,
        codec: &'a dyn IdSetCodec,
        qgram_len: usize,
    ) -> Self {
        Self {
            names,
            normalizer,
            codec,
            qgram_len,
        }
    }

    /// Rebuild the whole index into `store`.
    ///
    /// The dense index and the inverted lists are produced and persisted by
    /// two parallel tasks. Readiness flags are only raised once both tasks
    /// and the variant cache succeeded.
    pub fn build<S>(&self, store: &S) -> Result<BuildOutcome, BuildError>
    where
        S: Table + ReadinessFlags,
    {
        let start = Instant::now();

        let confirmed = self
            .names
            .confirmed_name_to_authors()
            .map_err(BuildError::Source)?;
        let strings = index_author_names(&confirmed, self.normalizer);

        if strings.is_empty() {
            info!("No confirmed names to index, leaving the index untouched");
            return Ok(BuildOutcome::Empty);
        }

        let variants = self
            .names
            .author_to_variant_occurrences()
            .map_err(BuildError::Source)?;

        info!(
            "Indexing {} strings from {} confirmed names",
            strings.len(),
            confirmed.len()
        );

        let (dense, inverted) = rayon::join(
            || self.dense_index_task(&strings, store),
            || self.inverted_list_task(&strings, store),
        );
        dense.map_err(BuildError::DenseIndex)?;
        let qgrams = inverted.map_err(BuildError::InvertedLists)?;

        let variant_rows = variant_cache_rows(&variants, self.normalizer);
        let authors = variant_rows.len();
        store
            .bulk_insert(TableName::DenseIndex, TableRows::Dense(variant_rows), false)
            .map_err(BuildError::VariantCache)?;

        store.set_inverted_ready().map_err(BuildError::Readiness)?;
        store.set_dense_ready().map_err(BuildError::Readiness)?;

        info!(
            "Index built in {:.2?}: {} strings, {} q-grams, {} authors",
            start.elapsed(),
            strings.len(),
            qgrams,
            authors
        );

        Ok(BuildOutcome::Built {
            strings: strings.len(),
            qgrams,
            authors,
        })
    }

    fn dense_index_task(&self, strings: &IndexableStrings, table: &dyn Table) -> anyhow::Result<()> {
        let rows = dense_index_rows(strings, self.codec)?;
        debug!("Writing {} dense index rows", rows.len());
        table.bulk_insert(TableName::DenseIndex, TableRows::Dense(rows), true)
    }

    fn inverted_list_task(
        &self,
        strings: &IndexableStrings,
        table: &dyn Table,
    ) -> anyhow::Result<usize> {
        let rows = inverted_list_rows(strings, self.qgram_len, self.codec)?;
        let count = rows.len();
        debug!("Writing {} inverted list rows", count);
        table.bulk_insert(TableName::InvertedLists, TableRows::Inverted(rows), true)?;
        Ok(count)
    }
}
