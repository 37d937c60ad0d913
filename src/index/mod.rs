pub mod build;
pub mod catalog;
pub mod memory;
pub mod persist;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use build::{BuildError, BuildOutcome, IndexBuilder};
pub use catalog::{NameCatalog, Signature};
pub use memory::{MemorySnapshot, MemoryStore};
pub use store::{IndexHandle, IndexReader, IndexStore, NameSource, ReadinessFlags, Table};
pub use types::*;
