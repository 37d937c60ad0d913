pub mod executor;
pub mod ranker;
pub mod retrieval;
pub mod scorer;

pub use executor::{QueryExecutor, SearchResults};
pub use ranker::{RankedAuthor, Ranker, SurnameCluster};
pub use retrieval::{Candidates, Retriever, SurnameScores, solve_t_occurrence};
pub use scorer::{position_weight, similarity, token_similarity};
