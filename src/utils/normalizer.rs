//! Person-name normalization.
//!
//! Raw names arrive in many shapes ("Ellis, John R.", "J. Ellis",
//! "Müller-Lüdenscheidt, K"). Everything the engine indexes or compares goes
//! through [`NameNormalizer::normalize`] first, which produces the canonical
//! indexable text along with its surname and given-name parts.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Characters folded before the generic NFKD pass
const LOCALE_MAPPING: &[(char, &str)] = &[
    ('ß', "ss"),
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
];

/// Canonical parts of a person name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName {
    /// Canonical indexable form: `surname` or `surname, given1 given2`
    pub text: String,
    /// Canonical surname, possibly several space-separated tokens
    pub surname: String,
    /// Given names and initials, in their original order
    pub given_names: Vec<String>,
}

impl NormalizedName {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Turns a raw name into its canonical indexable form.
///
/// Implementations must be deterministic and idempotent: normalizing the
/// `text` of a result yields the same result again.
pub trait NameNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> NormalizedName;
}

/// Default normalizer: ASCII folding, punctuation stripping and
/// surname-first ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizer;

impl NameNormalizer for DefaultNormalizer {
    fn normalize(&self, raw: &str) -> NormalizedName {
        let cleaned = clean_name(&fold_to_ascii(raw));
        let (surname, given_names) = split_name_parts(&cleaned);

        let text = if given_names.is_empty() {
            // Trailing comma keeps a multi-token surname from being re-split
            if surname.contains(' ') {
                format!("{},", surname)
            } else {
                surname.clone()
            }
        } else {
            format!("{}, {}", surname, given_names.join(" "))
        };

        NormalizedName {
            text,
            surname,
            given_names,
        }
    }
}

/// Normalizer wrapper memoizing results in an LRU cache.
///
/// Name variants repeat heavily across an author's papers, so the same raw
/// strings are normalized over and over during builds and ranking.
pub struct CachedNormalizer<N = DefaultNormalizer> {
    inner: N,
    cache: Mutex<LruCache<String, NormalizedName>>,
}

impl CachedNormalizer<DefaultNormalizer> {
    pub fn new(capacity: usize) -> Self {
        Self::with_normalizer(DefaultNormalizer, capacity)
    }
}

impl<N: NameNormalizer> CachedNormalizer<N> {
    pub fn with_normalizer(inner: N, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<N: NameNormalizer> NameNormalizer for CachedNormalizer<N> {
    fn normalize(&self, raw: &str) -> NormalizedName {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(raw) {
                return hit.clone();
            }
        }

        let normalized = self.inner.normalize(raw);

        // A poisoned cache only costs us memoization
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(raw.to_string(), normalized.clone());
        }
        normalized
    }
}

/// Fold a string to ASCII: locale digraphs first, then strip combining marks
/// from the NFKD decomposition and drop whatever is still non-ASCII.
pub fn fold_to_ascii(s: &str) -> String {
    let mut mapped = String::with_capacity(s.len());
    for c in s.chars() {
        match LOCALE_MAPPING.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => mapped.push_str(to),
            None => mapped.push(c),
        }
    }

    mapped
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii())
        .collect()
}

/// Replace everything except letters, commas and whitespace with a space
fn clean_name(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphabetic() || c == ',' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Split a cleaned name into (surname, given names), both lowercased.
fn split_name_parts(name: &str) -> (String, Vec<String>) {
    let name = name.trim();

    if let Some((surname, rest)) = name.split_once(',') {
        // "Ellis, John, Jr" -> drop the trailing addition
        let rest = match rest.rfind(',') {
            Some(pos) => &rest[..pos],
            None => rest,
        };
        let surname = join_tokens(surname.split_whitespace());
        let given: Vec<String> = rest
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if surname.is_empty() {
            // ", John Ellis": nothing before the comma, read the rest as a plain name
            return split_name_parts(&given.join(" "));
        }
        return (surname, given);
    }

    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.pop() {
        Some(last) => {
            let given = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
            (last.to_ascii_lowercase(), given)
        }
        None => (String::new(), Vec::new()),
    }
}

fn join_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> NormalizedName {
        DefaultNormalizer.normalize(s)
    }

    #[test]
    fn test_comma_form() {
        let n = norm("Ellis, John R.");
        assert_eq!(n.text, "ellis, john r");
        assert_eq!(n.surname, "ellis");
        assert_eq!(n.given_names, vec!["john", "r"]);
    }

    #[test]
    fn test_given_first_form() {
        let n = norm("J Ellis");
        assert_eq!(n.text, "ellis, j");
        assert_eq!(n.surname, "ellis");
        assert_eq!(n.given_names, vec!["j"]);

        assert_eq!(norm("J. R. Ellis").text, "ellis, j r");
    }

    #[test]
    fn test_bare_surname() {
        let n = norm("Ellis");
        assert_eq!(n.text, "ellis");
        assert_eq!(n.surname, "ellis");
        assert!(n.given_names.is_empty());
    }

    #[test]
    fn test_multi_token_surname() {
        let n = norm("van der Berg, Jan");
        assert_eq!(n.text, "van der berg, jan");
        assert_eq!(n.surname, "van der berg");

        let bare = norm("van der Berg,");
        assert_eq!(bare.text, "van der berg,");
        assert_eq!(bare.surname, "van der berg");
    }

    #[test]
    fn test_suffix_dropped() {
        let n = norm("Smith, J., Jr.");
        assert_eq!(n.text, "smith, j");
    }

    #[test]
    fn test_ascii_folding() {
        assert_eq!(norm("Müller, Jürgen").text, "mueller, juergen");
        assert_eq!(norm("Gödel, K").surname, "goedel");
        assert_eq!(norm("Żółć, Ł").surname, "zoc");
        assert_eq!(norm("Dvořák, Antonín").text, "dvorak, antonin");
        assert_eq!(fold_to_ascii("Straße"), "Strasse");
    }

    #[test]
    fn test_punctuation_separates() {
        assert_eq!(norm("O'Brien, Sean-Paul").text, "o brien, sean paul");
        assert_eq!(norm("Ellis2, J").text, "ellis, j");
    }

    #[test]
    fn test_empty_and_degenerate() {
        assert!(norm("").is_empty());
        assert!(norm("  ...  ").is_empty());
        assert_eq!(norm(", John Ellis").text, "ellis, john");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Ellis, John R.",
            "J Ellis",
            "Ellis",
            "van der Berg, Jan",
            "van der Berg",
            "Smith, J., Jr.",
            "Müller-Lüdenscheidt, K",
            "",
            ", John",
            "a, b, c, d",
        ];
        for raw in samples {
            let once = norm(raw);
            let twice = norm(&once.text);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_cached_normalizer_matches_inner() {
        let cached = CachedNormalizer::new(2);
        for raw in ["Ellis, J", "Smith, John", "Ellis, J", "Doe", "Smith, John"] {
            assert_eq!(cached.normalize(raw), norm(raw));
        }
    }

    #[test]
    fn test_cached_normalizer_zero_capacity() {
        let cached = CachedNormalizer::new(0);
        assert_eq!(cached.normalize("Ellis, J").text, "ellis, j");
    }
}
