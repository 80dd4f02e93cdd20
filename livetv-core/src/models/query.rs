use serde::{Deserialize, Serialize};

use super::MergedMeta;

/// The `genre` extra of a catalog request: a single genre or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenreFilter {
    One(String),
    Many(Vec<String>),
}

impl GenreFilter {
    /// A list matches when any of its genres is present. Blank genres are
    /// ignored; a filter with nothing left matches everything.
    #[must_use]
    pub fn matches(&self, meta: &MergedMeta) -> bool {
        let wanted: Vec<&str> = match self {
            Self::One(genre) => vec![genre.as_str()],
            Self::Many(genres) => genres.iter().map(String::as_str).collect(),
        };
        let wanted: Vec<&str> = wanted
            .into_iter()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .collect();

        wanted.is_empty() || wanted.iter().any(|g| meta.has_genre(g))
    }
}

impl From<&str> for GenreFilter {
    fn from(genre: &str) -> Self {
        Self::One(genre.to_string())
    }
}

impl From<Vec<String>> for GenreFilter {
    fn from(genres: Vec<String>) -> Self {
        Self::Many(genres)
    }
}
