#![no_main]

use authdex::utils::{extract_qgrams, unique_qgrams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&q, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };
    let q = (q % 5) as usize;

    let grams = extract_qgrams(text, q);
    let unique = unique_qgrams(text, q);
    assert!(unique.len() <= grams.len());
    if q > 0 {
        assert!(grams.iter().all(|g| g.chars().count() == q));
    }
});
