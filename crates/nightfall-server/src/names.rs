//! Display-name generation.
//!
//! Agents joining a game are handed a pseudonym so nobody plays under
//! an identifying handle. Names are drawn uniformly from two fixed
//! word lists; collisions are possible and the caller retries.

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST: &[&str] = &[
    "Alex", "Briar", "Casey", "Dana", "Ellis", "Frankie", "Gale", "Harper",
    "Indra", "Jules", "Kit", "Lane", "Marlow", "Noor", "Oakley", "Perry",
    "Quinn", "Remy", "Sasha", "Tate", "Uma", "Vesper", "Wren", "Yael",
];

const LAST: &[&str] = &[
    "Ashford", "Birch", "Calloway", "Drake", "Ember", "Fenwick", "Grove",
    "Hollis", "Ingram", "Juniper", "Kestrel", "Larkspur", "Mercer", "North",
    "Onyx", "Pryor", "Quill", "Rook", "Sable", "Thorne", "Underhill", "Vale",
    "Winters", "York",
];

/// Draws a "First Last" pseudonym from the word lists.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST.choose(rng).copied().unwrap_or("Alex");
    let last = LAST.choose(rng).copied().unwrap_or("Ashford");
    format!("{first} {last}")
}
