#![no_main]

use authdex::utils::{DefaultNormalizer, NameNormalizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let once = DefaultNormalizer.normalize(raw);
    assert!(once.text.is_ascii());

    // Normalizing a canonical text must give back the same parts
    let twice = DefaultNormalizer.normalize(&once.text);
    assert_eq!(once, twice);
});
