// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod soundcloud;

pub use soundcloud::{
    FeedKind, SoundcloudApi, SoundcloudFeed, SoundcloudUser, UserEntry, expand_url_shortcut,
    match_soundcloud_url,
};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::channel::Channel;
use crate::config::ProviderConfig;
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::progress::SharedProgressReporter;
use crate::sync::SyncOutcome;
use crate::urls::strip_credentials;

/// A track object as returned by the provider's listing endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Absent or `null` counts as not downloadable
    #[serde(default, deserialize_with = "null_as_false")]
    pub downloadable: bool,
    /// `YYYY/MM/DD HH:MM:SS`, optionally followed by a zone offset
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Track {
    /// Stable identifier: the permalink slug, else the numeric ID
    pub fn guid(&self) -> Result<String, SyncError> {
        if let Some(permalink) = non_empty(&self.permalink) {
            return Ok(permalink.to_string());
        }
        self.id.map(|id| id.to_string()).ok_or_else(|| SyncError::MissingField {
            track: self.label(),
            field: "id",
        })
    }

    /// Media location, preferring the stream URL over the download URL
    pub fn media_url(&self) -> Result<&str, SyncError> {
        non_empty(&self.stream_url)
            .or_else(|| non_empty(&self.download_url))
            .ok_or_else(|| SyncError::MissingField {
                track: self.label(),
                field: "stream_url",
            })
    }

    /// Display title with the provider's fallbacks applied
    pub fn display_title(&self) -> &str {
        non_empty(&self.title)
            .or_else(|| non_empty(&self.permalink))
            .unwrap_or("Unknown track")
    }

    /// Something human-readable to name the track in errors
    fn label(&self) -> String {
        non_empty(&self.permalink)
            .map(String::from)
            .or_else(|| self.id.map(|id| id.to_string()))
            .or_else(|| non_empty(&self.title).map(String::from))
            .unwrap_or_else(|| "<unidentified>".to_string())
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Source of track listings consumed by the sync engine
#[async_trait]
pub trait TrackProvider: Send + Sync {
    /// Fetch the complete current listing, in provider order
    async fn list_tracks(&self) -> Result<Vec<Track>, SyncError>;

    /// Turn a track's media URL into one the provider will serve
    fn authorize_media_url(&self, url: &str) -> Result<String, SyncError>;

    /// Link used for tracks that carry no permalink URL
    fn fallback_link(&self) -> String;

    /// Form of an authorized media URL that is safe to show in logs and errors
    fn display_url(&self, url: &str) -> String {
        strip_credentials(url)
    }
}

/// Capabilities every subscribed feed offers, whatever its provider
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn title(&self) -> String;

    fn link(&self) -> String;

    fn description(&self) -> String;

    /// Cover art URL, if the provider has one
    async fn image(&self) -> Result<Option<String>, SyncError>;

    /// Discover episodes not yet in `channel` and append them to it
    async fn new_episodes(
        &self,
        channel: &mut Channel,
        reporter: &SharedProgressReporter,
    ) -> Result<SyncOutcome, SyncError>;
}

/// Pick the feed handler responsible for a subscription URL
pub fn resolve_feed_source<C>(
    url: &str,
    client: &C,
    config: &ProviderConfig,
) -> Option<Box<dyn FeedSource>>
where
    C: HttpClient + Clone + 'static,
{
    let (username, kind) = match_soundcloud_url(url)?;
    let user = SoundcloudUser::new(client.clone(), config.clone(), username);
    Some(Box::new(SoundcloudFeed::new(user, kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn track_deserializes_from_provider_json() {
        let json = r#"{
            "id": 13158665,
            "title": "Munching at Tiannas house",
            "permalink": "munching-at-tiannas-house",
            "permalink_url": "https://soundcloud.com/user2835985/munching-at-tiannas-house",
            "description": null,
            "stream_url": "https://api.soundcloud.com/tracks/13158665/stream",
            "downloadable": true,
            "created_at": "2011/04/06 15:37:43 +0000",
            "genre": "ignored"
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();

        assert_eq!(track.id, Some(13158665));
        assert_eq!(track.guid().unwrap(), "munching-at-tiannas-house");
        assert!(track.downloadable);
        assert!(track.description.is_none());
        assert!(track.download_url.is_none());
    }

    #[test]
    fn downloadable_defaults_to_false() {
        let track: Track = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(!track.downloadable);
    }

    #[test]
    fn downloadable_null_counts_as_false() {
        let tracks: Vec<Track> = serde_json::from_str(
            r#"[{"id": 1, "permalink": "a", "downloadable": null},
                {"id": 2, "permalink": "b", "downloadable": true}]"#,
        )
        .unwrap();

        assert!(!tracks[0].downloadable);
        assert!(tracks[1].downloadable);
    }

    #[test]
    fn guid_falls_back_to_id() {
        let track = Track {
            id: Some(99),
            permalink: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(track.guid().unwrap(), "99");
    }

    #[test]
    fn guid_requires_permalink_or_id() {
        let track = Track {
            title: Some("Orphan".to_string()),
            ..Default::default()
        };
        let err = track.guid().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.to_string().contains("Orphan"));
    }

    #[test]
    fn media_url_prefers_stream_url() {
        let track = Track {
            stream_url: Some("https://a/stream".to_string()),
            download_url: Some("https://a/download".to_string()),
            ..Default::default()
        };
        assert_eq!(track.media_url().unwrap(), "https://a/stream");
    }

    #[test]
    fn media_url_falls_back_to_download_url() {
        let track = Track {
            stream_url: None,
            download_url: Some("https://a/download".to_string()),
            ..Default::default()
        };
        assert_eq!(track.media_url().unwrap(), "https://a/download");
    }

    #[test]
    fn media_url_missing_is_an_error() {
        let track = Track {
            id: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            track.media_url(),
            Err(SyncError::MissingField {
                field: "stream_url",
                ..
            })
        ));
    }

    #[test]
    fn display_title_fallbacks() {
        let titled = Track {
            title: Some("Title".to_string()),
            permalink: Some("slug".to_string()),
            ..Default::default()
        };
        let slug_only = Track {
            permalink: Some("slug".to_string()),
            ..Default::default()
        };

        assert_eq!(titled.display_title(), "Title");
        assert_eq!(slug_only.display_title(), "slug");
        assert_eq!(Track::default().display_title(), "Unknown track");
    }
}
