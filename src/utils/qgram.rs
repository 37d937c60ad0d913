use crate::index::types::QGram;

/// Decompose a string into its q-grams, left to right.
///
/// The q-grams of a string are its substrings of `q` characters, so
/// `"cathey"` with `q = 2` yields `ca, at, th, he, ey`. Duplicates are kept
/// and order follows position. Strings shorter than `q` (and `q == 0`)
/// yield nothing.
pub fn extract_qgrams(s: &str, q: usize) -> Vec<QGram> {
    if q == 0 {
        return Vec::new();
    }

    // Indexable strings are ASCII; fast path slices bytes directly
    if s.is_ascii() {
        if s.len() < q {
            return Vec::new();
        }
        return s
            .as_bytes()
            .windows(q)
            .map(|w| w.iter().map(|&b| b as char).collect())
            .collect();
    }

    let chars: Vec<char> = s.chars().collect();
    if chars.len() < q {
        return Vec::new();
    }
    chars.windows(q).map(|w| w.iter().collect()).collect()
}

/// Unique q-grams of a string, sorted. Used for both indexing and lookups,
/// where a repeated q-gram must count once.
pub fn unique_qgrams(s: &str, q: usize) -> Vec<QGram> {
    let mut qgrams = extract_qgrams(s, q);
    qgrams.sort_unstable();
    qgrams.dedup();
    qgrams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_qgrams() {
        let qgrams = extract_qgrams("cathey", 2);
        assert_eq!(qgrams, vec!["ca", "at", "th", "he", "ey"]);
    }

    #[test]
    fn test_extract_qgrams_count() {
        let s = "ellis, john";
        for q in 1..=s.len() {
            let qgrams = extract_qgrams(s, q);
            assert_eq!(qgrams.len(), s.len() - q + 1);
            assert!(qgrams.iter().all(|g| g.len() == q));
            assert_eq!(qgrams[0], &s[..q]);
        }
    }

    #[test]
    fn test_extract_qgrams_short() {
        assert!(extract_qgrams("", 2).is_empty());
        assert!(extract_qgrams("a", 2).is_empty());
        assert!(extract_qgrams("abc", 4).is_empty());
        assert!(extract_qgrams("abc", 0).is_empty());
        assert_eq!(extract_qgrams("ab", 2), vec!["ab"]);
    }

    #[test]
    fn test_extract_qgrams_non_ascii() {
        let qgrams = extract_qgrams("müll", 2);
        assert_eq!(qgrams, vec!["mü", "ül", "ll"]);
    }

    #[test]
    fn test_unique_qgrams() {
        // "anana" -> an, na, an, na
        let qgrams = unique_qgrams("anana", 2);
        assert_eq!(qgrams, vec!["an", "na"]);
    }
}
