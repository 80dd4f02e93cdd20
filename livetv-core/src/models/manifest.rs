//! Catalog manifest descriptor
//!
//! Built once per successful refresh and published inside the snapshot it
//! describes, so groupings and genre options always match the served catalog.

use serde::{Deserialize, Serialize};

use super::genre::STANDARD_GENRES;
use super::meta::META_TYPE;
use crate::config::CatalogConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogManifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub types: Vec<String>,
    pub id_prefixes: Vec<String>,
    pub resources: Vec<String>,
    pub catalogs: Vec<CatalogDescriptor>,
}

/// One browsable grouping (a country) with its genre filter options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    pub group: String,
    pub genres: Vec<String>,
}

impl CatalogManifest {
    /// Build the manifest for the given groupings.
    ///
    /// Genre options are the standard vocabulary followed by the custom
    /// genres discovered in the overlay.
    #[must_use]
    pub fn build(settings: &CatalogConfig, groups: &[String], custom_genres: &[String]) -> Self {
        let mut genres: Vec<String> = STANDARD_GENRES.iter().map(|g| (*g).to_string()).collect();
        for genre in custom_genres {
            if !genres.contains(genre) {
                genres.push(genre.clone());
            }
        }

        let catalogs = groups
            .iter()
            .map(|group| CatalogDescriptor {
                kind: META_TYPE.to_string(),
                id: format!("{}{}", settings.id_prefix, group),
                name: format!("{} {}", settings.addon_name, group),
                group: group.clone(),
                genres: genres.clone(),
            })
            .collect();

        Self {
            id: settings.addon_id.clone(),
            version: settings.addon_version.clone(),
            name: settings.addon_name.clone(),
            types: vec![META_TYPE.to_string()],
            id_prefixes: vec![settings.id_prefix.clone()],
            resources: vec![
                "catalog".to_string(),
                "meta".to_string(),
                "stream".to_string(),
            ],
            catalogs,
        }
    }

    /// Groupings listed by this manifest, in catalog order
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        self.catalogs.iter().map(|c| c.group.as_str()).collect()
    }
}
