//! Provider-agnostic shapes returned by the API.

use serde::{Deserialize, Serialize};

use crate::types::MediaType;

/// One hit from a name search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// `"<provider>:<nativeId>"`, parseable as a [`crate::MediaId`].
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub adult: bool,
    pub title: String,
    pub overview: String,
    pub poster_uri: String,
    /// Provider-native date string, not normalised.
    pub release_date: String,
}

/// Full record for a single media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub adult: bool,
    pub links: Vec<Link>,
    pub title: String,
    pub status: String,
    /// Minutes; 0 when unknown.
    pub runtime: u32,
    pub episodes: Vec<Episode>,
    pub overview: String,
    pub poster_uri: String,
    pub release_date: String,
}

impl Details {
    pub fn new(id: String, media_type: MediaType) -> Self {
        Self {
            id,
            media_type,
            adult: false,
            links: Vec::new(),
            title: String::new(),
            status: String::new(),
            runtime: 0,
            episodes: Vec::new(),
            overview: String::new(),
            poster_uri: String::new(),
            release_date: String::new(),
        }
    }

    pub fn push_link(&mut self, name: &str, url: impl Into<String>) {
        self.links.push(Link {
            name: name.to_string(),
            url: url.into(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub name: String,
    /// Absolute episode number across all seasons.
    pub number: u32,
    pub season: u32,
    pub air_date: String,
    /// Episode number within the season.
    pub episode: u32,
    pub overview: String,
}

/// External reference. Names are labels, duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}
