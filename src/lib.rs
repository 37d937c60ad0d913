//! # authdex - Approximate Author Name Search
//!
//! authdex finds the author identities whose known names approximately match
//! a free-text name query such as `"J Ellis"` or `"Ellis, John R."`.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Index building, storage collaborators and persistence
//! - [`query`] - Similarity scoring, candidate retrieval and ranking
//! - [`engine`] - The [`AuthorSearch`] facade tying both together
//! - [`output`] - Result formatting (colored text or JSON)
//! - [`utils`] - Utility functions (q-grams, name normalization, codecs, config)
//!
//! ## Quick Start
//!
//! ```
//! use authdex::index::{MemoryStore, NameCatalog};
//! use authdex::utils::EngineConfig;
//! use authdex::AuthorSearch;
//!
//! let mut catalog = NameCatalog::new();
//! catalog.add_signature(10, "Ellis, J");
//! catalog.add_signature(10, "Ellis, John");
//! catalog.add_signature(20, "Smith, J");
//!
//! let engine = AuthorSearch::new(MemoryStore::new(), EngineConfig::default());
//! engine.build_index(&catalog).unwrap();
//!
//! let authors = engine.find_author_ids("J Ellis").unwrap();
//! assert_eq!(authors, Some(vec![10]));
//! ```
//!
//! ## How it works
//!
//! Every confirmed name is normalized and indexed twice, once as the full
//! name and once as its bare surname, into a q-gram inverted index. A query
//! is answered in three steps:
//!
//! 1. **Retrieval** - an adaptive thresholded intersection of the query's
//!    inverted lists (the T-occurrence problem) yields candidate strings
//! 2. **Filtering** - strings whose surname is not close to the query's are
//!    dropped, and the rest resolve to candidate authors
//! 3. **Ranking** - authors are clustered by surname similarity and ordered
//!    by given-name similarity and name frequency within each cluster

pub mod engine;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use engine::AuthorSearch;
