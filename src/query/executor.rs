use crate::index::store::IndexHandle;
use crate::index::types::{AuthorId, Generation};
use crate::query::ranker::{RankedAuthor, Ranker};
use crate::query::retrieval::Retriever;
use crate::utils::{EngineConfig, IdSetCodec, NameNormalizer};
use anyhow::Result;
use log::debug;
use std::time::Instant;

/// Ranked answer to one query
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Generation the query ran against
    pub generation: Generation,
    /// Normalized query text
    pub query: String,
    pub authors: Vec<RankedAuthor>,
}

impl SearchResults {
    pub fn author_ids(&self) -> Vec<AuthorId> {
        self.authors.iter().map(|a| a.author).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }
}

/// Query executor bound to one published index generation
pub struct QueryExecutor<'a> {
    handle: &'a IndexHandle,
    normalizer: &'a dyn NameNormalizer,
    codec: &'a dyn IdSetCodec,
    config: &'a EngineConfig,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        handle: &'a IndexHandle,
        normalizer: &'a dyn NameNormalizer,
        codec: &'a dyn IdSetCodec,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            handle,
            normalizer,
            codec,
            config,
        }
    }

    /// Execute a query and return the ranked author ids
    pub fn execute(&self, query: &str) -> Result<Vec<AuthorId>> {
        Ok(self.execute_detailed(query)?.author_ids())
    }

    /// Execute a query and keep the scores behind the ranking
    pub fn execute_detailed(&self, query: &str) -> Result<SearchResults> {
        let start = Instant::now();
        let normalized = self.normalizer.normalize(query);

        let mut results = SearchResults {
            generation: self.handle.generation(),
            query: normalized.text.clone(),
            authors: Vec::new(),
        };
        if normalized.is_empty() {
            return Ok(results);
        }

        let reader = self.handle.reader();
        let candidates = Retriever::new(reader, self.codec, self.config).candidates(&normalized)?;
        let mut surname_scores = candidates.surname_scores;

        results.authors = Ranker::new(reader, self.normalizer).rank(
            &candidates.authors,
            &normalized,
            &mut surname_scores,
        )?;

        debug!(
            "Query {:?} on generation {}: {} authors in {:.2?}",
            results.query,
            results.generation,
            results.authors.len(),
            start.elapsed()
        );

        Ok(results)
    }
}
