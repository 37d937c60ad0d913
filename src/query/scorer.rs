//! Positional string similarity.
//!
//! Names are compared character by character after padding the shorter one
//! with trailing spaces. Agreement at early positions weighs far more than
//! agreement at late ones, since leading characters of a surname or initial
//! disambiguate the most.

/// Weight of position `i` out of `n` slots, given whether it matched.
///
/// The weights of all `n` slots form a decreasing arithmetic series summing
/// to 1, and the last slot always weighs zero.
#[inline]
pub fn position_weight(matched: bool, i: usize, n: usize) -> f64 {
    if !matched || n < 2 {
        return 0.0;
    }
    (n - i - 1) as f64 * 2.0 / (n * (n - 1)) as f64
}

/// Similarity of two strings in `[0, 1]`; `1.0` for identical non-empty
/// strings. Symmetric in its arguments.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_ascii() && b.is_ascii() {
        return score_aligned(a.as_bytes(), b.as_bytes(), b' ');
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    score_aligned(&a, &b, ' ')
}

fn score_aligned<T: PartialEq + Copy>(a: &[T], b: &[T], pad: T) -> f64 {
    let n = a.len().max(b.len());
    // Weights are taken over n + 1 slots so the trailing padding slot is free
    let slots = n + 1;

    (0..n)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(pad);
            let y = b.get(i).copied().unwrap_or(pad);
            position_weight(x == y, i, slots)
        })
        .fold(0.0, |acc, w| acc + w)
}

/// Sum of pairwise similarities of two token lists, position by position,
/// over as many positions as the shorter list has. Empty lists score `+0.0`.
pub fn token_similarity(query: &[String], candidate: &[String]) -> f64 {
    // `Sum` starts from -0.0, which `total_cmp` orders below +0.0
    query
        .iter()
        .zip(candidate)
        .map(|(q, c)| similarity(q, c))
        .fold(0.0, |acc, s| acc + s)
}
