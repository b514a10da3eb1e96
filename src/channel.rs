// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UrlError;
use crate::urls::{Credentials, add_credentials, extract_credentials, strip_credentials};

/// A subscribed source and the episodes discovered from it so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Subscription URL, never containing credentials
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Episodes in discovery order
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// A single discovered media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub description: String,
    /// Media URL without credentials
    pub url: String,
    /// Size in bytes, 0 when unknown
    pub file_size: u64,
    pub mime_type: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Channel {
    /// Create an empty channel, moving any credentials out of the URL
    pub fn new(url: &str) -> Result<Self, UrlError> {
        let Credentials { username, password } = extract_credentials(url)?;

        Ok(Self {
            url: strip_credentials(url),
            username: username.filter(|u| !u.is_empty()),
            password,
            ..Default::default()
        })
    }

    /// GUIDs of all known episodes
    pub fn guids(&self) -> HashSet<&str> {
        self.episodes.iter().map(|e| e.guid.as_str()).collect()
    }

    /// Re-embed this channel's credentials into `url`
    pub fn authenticate_url(&self, url: &str) -> Result<String, UrlError> {
        add_credentials(url, self.username.as_deref(), self.password.as_deref())
    }
}
