//! Genre vocabulary and custom genre derivation

use std::collections::BTreeSet;

use super::Channel;

/// Categories known to the public channel directory.
pub const STANDARD_GENRES: &[&str] = &[
    "animation",
    "auto",
    "business",
    "classic",
    "comedy",
    "cooking",
    "culture",
    "documentary",
    "education",
    "entertainment",
    "family",
    "general",
    "kids",
    "legislative",
    "lifestyle",
    "movies",
    "music",
    "news",
    "outdoor",
    "relax",
    "religious",
    "science",
    "series",
    "shop",
    "sports",
    "travel",
    "weather",
    "xxx",
];

#[must_use]
pub fn is_standard_genre(genre: &str) -> bool {
    STANDARD_GENRES.contains(&genre.to_lowercase().as_str())
}

/// Collect categories that are not part of the standard vocabulary.
///
/// The result is sorted and de-duplicated so two refreshes over the same
/// input publish the same genre options.
#[must_use]
pub fn collect_custom_genres<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> Vec<String> {
    channels
        .into_iter()
        .flat_map(|c| c.categories.iter())
        .filter(|category| !is_standard_genre(category))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
