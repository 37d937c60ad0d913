//! Candidate retrieval over the inverted index.
//!
//! A query's q-grams select inverted lists; an adaptive thresholded
//! intersection of those lists (the T-occurrence problem) yields candidate
//! strings, which are then filtered by surname similarity and resolved to
//! author ids.

use crate::index::store::IndexReader;
use crate::index::types::{IndexedString, InvertedList, QGram};
use crate::query::scorer::similarity;
use crate::utils::{EngineConfig, IdSetCodec, NormalizedName, unique_qgrams};
use anyhow::{Context, Result};
use log::debug;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

/// Memoized surname similarities against one query surname
#[derive(Debug, Clone)]
pub struct SurnameScores {
    query_surname: String,
    cache: FxHashMap<String, f64>,
}

impl SurnameScores {
    pub fn new(query_surname: &str) -> Self {
        Self {
            query_surname: query_surname.to_string(),
            cache: FxHashMap::default(),
        }
    }

    pub fn score(&mut self, surname: &str) -> f64 {
        if let Some(&score) = self.cache.get(surname) {
            return score;
        }
        let score = similarity(&self.query_surname, surname);
        self.cache.insert(surname.to_string(), score);
        score
    }

    /// Number of distinct surnames scored so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Solve the T-occurrence problem over a query's inverted lists.
///
/// Lists are ordered from most to least common. The intersection of the
/// first `T = floor(percentage * lists)` lists (at least one) seeds the
/// result. The rarer lists are then folded in one by one while the result
/// still holds at least `max_result_cardinality` ids, and only as long as a
/// step leaves more than `min_result_cardinality` ids, so that one rare
/// q-gram cannot wipe out legitimate fuzzy matches.
pub fn solve_t_occurrence(
    mut lists: Vec<(QGram, InvertedList)>,
    config: &EngineConfig,
) -> RoaringBitmap {
    if lists.is_empty() {
        return RoaringBitmap::new();
    }

    lists.sort_by(|a, b| {
        b.1.cardinality
            .cmp(&a.1.cardinality)
            .then_with(|| a.0.cmp(&b.0))
    });

    let t = (config.matching_qgrams_percentage * lists.len() as f64).floor() as usize;
    let seed_len = t.clamp(1, lists.len());

    let mut result = lists[0].1.ids.clone();
    for (_, list) in &lists[1..seed_len] {
        result &= &list.ids;
    }

    for (_, list) in &lists[seed_len..] {
        if (result.len() as usize) < config.max_result_cardinality {
            break;
        }
        let narrower = &result & &list.ids;
        if narrower.len() as usize > config.min_result_cardinality {
            result = narrower;
        } else {
            break;
        }
    }

    debug!(
        "T-occurrence: {} lists, T = {}, {} strings",
        lists.len(),
        t,
        result.len()
    );
    result
}

/// Candidate authors for a query, with the surname scores computed on the way
#[derive(Debug, Clone)]
pub struct Candidates {
    pub authors: RoaringBitmap,
    pub surname_scores: SurnameScores,
}

/// Retrieves candidate authors from one index generation
pub struct Retriever<'a> {
    reader: &'a dyn IndexReader,
    codec: &'a dyn IdSetCodec,
    config: &'a EngineConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(
        reader: &'a dyn IndexReader,
        codec: &'a dyn IdSetCodec,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            reader,
            codec,
            config,
        }
    }

    /// Ids of the indexed strings sharing enough q-grams with `text`
    pub fn string_ids(&self, text: &str) -> Result<RoaringBitmap> {
        let qgrams = unique_qgrams(text, self.config.qgram_len);
        if qgrams.is_empty() {
            return Ok(RoaringBitmap::new());
        }

        let rows = self.reader.inverted_lists(&qgrams)?;
        let lists = rows
            .into_iter()
            .map(|row| -> Result<(QGram, InvertedList)> {
                let ids = self
                    .codec
                    .decode(&row.ids)
                    .with_context(|| format!("Corrupt inverted list for q-gram {:?}", row.qgram))?;
                Ok((
                    row.qgram,
                    InvertedList {
                        ids,
                        cardinality: row.cardinality,
                    },
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(solve_t_occurrence(lists, self.config))
    }

    /// Candidate authors for a normalized query. Empty when nothing matches.
    pub fn candidates(&self, query: &NormalizedName) -> Result<Candidates> {
        let mut surname_scores = SurnameScores::new(&query.surname);

        // Full-name and surname matches, deduplicated by the union
        let string_ids = self.string_ids(&query.text)? | self.string_ids(&query.surname)?;
        if string_ids.is_empty() {
            return Ok(Candidates {
                authors: RoaringBitmap::new(),
                surname_scores,
            });
        }

        let strings = self.reader.strings_by_id(&string_ids)?;
        let passing = self.remove_false_positives(&strings, &mut surname_scores);

        debug!(
            "Retrieved {} strings, {} passed the surname filter",
            strings.len(),
            passing.len()
        );

        let mut authors = RoaringBitmap::new();
        if !passing.is_empty() {
            for encoded in self.reader.author_sets_by_string_id(&passing)? {
                authors |= self.codec.decode(&encoded).context("Corrupt author set")?;
            }
        }

        Ok(Candidates {
            authors,
            surname_scores,
        })
    }

    /// Keep the strings whose surname is close enough to the query surname
    fn remove_false_positives(
        &self,
        strings: &[IndexedString],
        scores: &mut SurnameScores,
    ) -> RoaringBitmap {
        strings
            .iter()
            .filter(|s| scores.score(&s.surname) >= self.config.surname_threshold)
            .map(|s| s.id)
            .collect()
    }
}
