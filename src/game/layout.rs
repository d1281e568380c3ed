//! Seeded keyboard shuffle
//!
//! A match-long permutation of the 26 letters, derived from the match seed.
//! The shuffled letters are laid back out in the standard 10/9/7 three-row
//! partition, and an inverse mapping translates the physical key a player
//! presses into the letter displayed at that position.

use super::rng::Mulberry32;
use std::collections::HashMap;

/// Standard QWERTY rows, the physical reference layout.
pub const QWERTY_ROWS: [&str; 3] = ["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM"];

/// A shuffled keyboard for one match.
#[derive(Debug, Clone)]
pub struct ShuffledLayout {
    /// Shuffled letters partitioned into 10/9/7 rows.
    rows: [Vec<char>; 3],
    /// Physical (QWERTY) key -> displayed (shuffled) letter at that position.
    key_map: HashMap<char, char>,
}

impl ShuffledLayout {
    /// Generate the layout for a match seed.
    ///
    /// For a fixed seed the result is identical across processes and
    /// platforms; both sides of a match call this independently.
    pub fn generate(seed: u32) -> Self {
        let qwerty_flat: Vec<char> = QWERTY_ROWS.iter().flat_map(|r| r.chars()).collect();

        let mut shuffled = qwerty_flat.clone();
        Mulberry32::new(seed).shuffle(&mut shuffled);

        // Rebuild rows with the same partition sizes.
        let mut index = 0;
        let rows = QWERTY_ROWS.map(|row| {
            let out: Vec<char> = shuffled[index..index + row.len()].to_vec();
            index += row.len();
            out
        });

        // Physical position -> displayed letter.
        let key_map = qwerty_flat
            .iter()
            .copied()
            .zip(shuffled.iter().copied())
            .collect();

        Self { rows, key_map }
    }

    /// The shuffled rows for display.
    pub fn rows(&self) -> &[Vec<char>; 3] {
        &self.rows
    }

    /// Translate a physical keystroke to the displayed letter at that key's
    /// position. Returns `None` for anything outside A-Z.
    pub fn displayed_for(&self, physical: char) -> Option<char> {
        self.key_map.get(&physical.to_ascii_uppercase()).copied()
    }
}
