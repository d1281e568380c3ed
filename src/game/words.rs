//! Round word selection
//!
//! Embeds the word list (common 4-8 letter English words) at build time.
//! The word for a round is derived from the match seed plus the round number,
//! so every peer resolves the same word independently. The host still sends
//! the resolved word in `start-round`; the local derivation exists so a
//! mismatch is detectable rather than silently divergent.

use super::rng::Mulberry32;
use once_cell::sync::Lazy;

/// Embedded word list, one lowercase word per line. Order is load-bearing:
/// word selection indexes into this list by position.
static WORDS_DATA: &str = include_str!("../../data/words.txt");

static WORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    WORDS_DATA
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect()
});

/// The word for a given round, uppercased.
///
/// Same `(seed, round_number)` always yields the same word on every peer.
pub fn word_for_round(seed: u32, round_number: u32) -> String {
    let mut rng = Mulberry32::new(seed.wrapping_add(round_number));
    let index = (rng.next_f64() * WORDS.len() as f64) as usize;
    WORDS[index].to_uppercase()
}

/// Number of words in the embedded list.
pub fn word_count() -> usize {
    WORDS.len()
}
