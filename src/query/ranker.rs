use crate::index::store::IndexReader;
use crate::index::types::AuthorId;
use crate::query::retrieval::SurnameScores;
use crate::query::scorer::token_similarity;
use crate::utils::{NameNormalizer, NormalizedName};
use anyhow::Result;
use log::{debug, warn};
use roaring::RoaringBitmap;

/// A ranked candidate author
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAuthor {
    pub author: AuthorId,
    /// Best surname similarity over the author's variants
    pub surname_score: f64,
    /// Best given-name similarity over the author's variants
    pub given_name_score: f64,
    /// Occurrences of the variant that achieved the given-name score
    pub occurrences: u64,
    /// That variant's normalized text
    pub best_variant: Option<String>,
}

/// Authors sharing one surname score
#[derive(Debug, Clone)]
pub struct SurnameCluster {
    pub score: f64,
    pub authors: Vec<RankedAuthor>,
}

/// Orders candidate authors by how well their known names fit the query
pub struct Ranker<'a> {
    reader: &'a dyn IndexReader,
    normalizer: &'a dyn NameNormalizer,
}

impl<'a> Ranker<'a> {
    pub fn new(reader: &'a dyn IndexReader, normalizer: &'a dyn NameNormalizer) -> Self {
        Self { reader, normalizer }
    }

    /// Rank `candidates` for `query`, best match first.
    ///
    /// Authors are clustered by surname score; clusters come out in
    /// descending score order, and within a cluster authors are ordered by
    /// given-name score, then by occurrences of their best variant, then by
    /// id.
    pub fn rank(
        &self,
        candidates: &RoaringBitmap,
        query: &NormalizedName,
        surname_scores: &mut SurnameScores,
    ) -> Result<Vec<RankedAuthor>> {
        let clusters = self.cluster(candidates, query, surname_scores)?;
        debug!(
            "Ranking {} authors in {} surname clusters",
            candidates.len(),
            clusters.len()
        );

        Ok(clusters
            .into_iter()
            .flat_map(|cluster| cluster.authors)
            .collect())
    }

    /// Score every candidate and group them by surname score
    pub fn cluster(
        &self,
        candidates: &RoaringBitmap,
        query: &NormalizedName,
        surname_scores: &mut SurnameScores,
    ) -> Result<Vec<SurnameCluster>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let variants = self.reader.variants_by_author(candidates)?;

        let mut scored: Vec<RankedAuthor> = Vec::with_capacity(candidates.len() as usize);
        for author in candidates {
            match variants.get(&author) {
                Some(names) => scored.push(self.score_author(author, names, query, surname_scores)),
                None => {
                    warn!("Author {} has no cached name variants", author);
                    scored.push(RankedAuthor {
                        author,
                        surname_score: 0.0,
                        given_name_score: 0.0,
                        occurrences: 0,
                        best_variant: None,
                    });
                }
            }
        }

        scored.sort_by(|a, b| b.surname_score.total_cmp(&a.surname_score));

        let mut clusters: Vec<SurnameCluster> = Vec::new();
        for group in scored.chunk_by(|a, b| a.surname_score.to_bits() == b.surname_score.to_bits()) {
            let mut authors = group.to_vec();
            authors.sort_by(|a, b| {
                b.given_name_score
                    .total_cmp(&a.given_name_score)
                    .then_with(|| b.occurrences.cmp(&a.occurrences))
                    .then_with(|| a.author.cmp(&b.author))
            });
            clusters.push(SurnameCluster {
                score: group[0].surname_score,
                authors,
            });
        }

        Ok(clusters)
    }

    fn score_author(
        &self,
        author: AuthorId,
        variants: &[(String, u64)],
        query: &NormalizedName,
        surname_scores: &mut SurnameScores,
    ) -> RankedAuthor {
        let mut surname_score = 0.0f64;
        let mut given_name_score = -1.0f64;
        let mut occurrences = 0u64;
        let mut best_variant = None;

        for (text, count) in variants {
            // Stored texts are canonical, so this recovers their parts exactly
            let variant = self.normalizer.normalize(text);

            surname_score = surname_score.max(surname_scores.score(&variant.surname));

            let score = token_similarity(&query.given_names, &variant.given_names);
            if score > given_name_score {
                given_name_score = score;
                occurrences = *count;
                best_variant = Some(text.clone());
            } else if score == given_name_score && *count > occurrences {
                occurrences = *count;
                best_variant = Some(text.clone());
            }
        }

        RankedAuthor {
            author,
            surname_score,
            given_name_score: given_name_score.max(0.0),
            occurrences,
            best_variant,
        }
    }
}
