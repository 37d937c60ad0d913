//! The author search facade: one store, one normalizer, one codec, one
//! configuration, shared by building and querying.

use crate::index::build::{BuildError, BuildOutcome, IndexBuilder};
use crate::index::store::{IndexHandle, IndexStore, NameSource};
use crate::index::types::AuthorId;
use crate::query::{QueryExecutor, SearchResults};
use crate::utils::{CachedNormalizer, DeltaVarintCodec, EngineConfig, IdSetCodec};
use anyhow::Result;
use log::debug;

/// Approximate author-name search over an index store
pub struct AuthorSearch<S: IndexStore> {
    store: S,
    normalizer: CachedNormalizer,
    codec: Box<dyn IdSetCodec>,
    config: EngineConfig,
}

impl<S: IndexStore> AuthorSearch<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_codec(store, config, Box::new(DeltaVarintCodec))
    }

    /// Use `codec` for the id sets written to and read from the store
    pub fn with_codec(store: S, config: EngineConfig, codec: Box<dyn IdSetCodec>) -> Self {
        Self {
            store,
            normalizer: CachedNormalizer::new(config.normalizer_cache_size),
            codec,
            config,
        }
    }

    /// Rebuild the whole index from `names`.
    ///
    /// Queries keep being served from the previous generation, if any, until
    /// the new one is complete.
    pub fn build_index(&self, names: &dyn NameSource) -> Result<BuildOutcome, BuildError> {
        IndexBuilder::new(
            names,
            &self.normalizer,
            self.codec.as_ref(),
            self.config.qgram_len,
        )
        .build(&self.store)
    }

    /// Handle on the generation queries currently run against
    pub fn handle(&self) -> Option<IndexHandle> {
        self.store.current()
    }

    /// Authors whose names approximately match `query`, best first.
    ///
    /// `Ok(None)` when no complete index generation is available yet, and
    /// `Ok(Some(vec![]))` when nothing matches.
    pub fn find_author_ids(&self, query: &str) -> Result<Option<Vec<AuthorId>>> {
        Ok(self.search(query)?.map(|results| results.author_ids()))
    }

    /// Like [`find_author_ids`](Self::find_author_ids), keeping the scores
    pub fn search(&self, query: &str) -> Result<Option<SearchResults>> {
        let Some(handle) = self.handle() else {
            debug!("Index not ready, skipping query {:?}", query);
            return Ok(None);
        };

        QueryExecutor::new(&handle, &self.normalizer, self.codec.as_ref(), &self.config)
            .execute_detailed(query)
            .map(Some)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::catalog::NameCatalog;
    use crate::index::memory::MemoryStore;
    use crate::utils::RoaringCodec;

    fn catalog() -> NameCatalog {
        let mut catalog = NameCatalog::new();
        catalog.add_signature(10, "Ellis, J");
        catalog.add_signature(10, "Ellis, John");
        catalog.add_signature(20, "Smith, J");
        catalog
    }

    #[test]
    fn test_not_ready_before_build() {
        let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
        assert_eq!(engine.find_author_ids("J Ellis").unwrap(), None);
    }

    #[test]
    fn test_build_then_query() {
        let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
        engine.build_index(&catalog()).unwrap();
        assert_eq!(engine.find_author_ids("J Ellis").unwrap(), Some(vec![10]));
        assert_eq!(engine.find_author_ids("Zzyx Qqrv").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_roaring_codec_engine() {
        let engine = AuthorSearch::with_codec(
            MemoryStore::new(),
            EngineConfig::default(),
            Box::new(RoaringCodec),
        );
        engine.build_index(&catalog()).unwrap();
        assert_eq!(engine.find_author_ids("Smith").unwrap(), Some(vec![20]));
    }

    #[test]
    fn test_empty_build_keeps_not_ready() {
        let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
        let outcome = engine.build_index(&NameCatalog::new()).unwrap();
        assert_eq!(outcome, BuildOutcome::Empty);
        assert!(engine.handle().is_none());
    }
}
