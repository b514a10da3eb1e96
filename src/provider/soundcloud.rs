// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::channel::Channel;
use crate::config::ProviderConfig;
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::progress::SharedProgressReporter;
use crate::sync::{SyncOutcome, sync_channel};
use crate::urls::strip_credentials;

use super::{FeedSource, Track, TrackProvider};

const WEB_BASE: &str = "https://soundcloud.com";
const SHORTCUT_BASE: &str = "http://soundcloud.com";
const API_KEY_PARAM: &str = "consumer_key";

/// `prefix:username` shortcuts and the URL each one expands to
const URL_SHORTCUTS: &[(&str, FeedKind)] = &[("sc", FeedKind::Tracks), ("scfav", FeedKind::Favorites)];

/// Which of a user's track lists a feed follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Tracks the user published
    Tracks,
    /// Tracks the user favorited
    Favorites,
}

impl FeedKind {
    fn endpoint(self) -> &'static str {
        match self {
            FeedKind::Tracks => "tracks",
            FeedKind::Favorites => "favorites",
        }
    }

    fn web_link(self, username: &str) -> String {
        self.link_on(WEB_BASE, username)
    }

    fn link_on(self, base: &str, username: &str) -> String {
        match self {
            FeedKind::Tracks => format!("{base}/{username}"),
            FeedKind::Favorites => format!("{base}/{username}/favorites"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    avatar_url: Option<String>,
}

/// A user found through the directory search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntry {
    pub username: String,
    #[serde(default)]
    pub permalink_url: String,
}

/// Client for API endpoints that are not tied to one user
#[derive(Clone)]
pub struct SoundcloudApi<C> {
    client: C,
    config: ProviderConfig,
}

impl<C: HttpClient> SoundcloudApi<C> {
    pub fn new(client: C, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Search the user directory
    pub async fn search_users(&self, query: &str) -> Result<Vec<UserEntry>, SyncError> {
        let url = self.api_url("users.json", &[("q", query)])?;
        let users: Vec<UserEntry> = self.fetch_json(&url).await?;
        debug!(query, count = users.len(), "Searched users");
        Ok(users)
    }

    /// Append the consumer key so the media URL can be fetched
    pub fn authorize(&self, media_url: &str) -> Result<String, SyncError> {
        let mut url = Url::parse(media_url).map_err(|source| SyncError::InvalidUrl {
            url: media_url.to_string(),
            source,
        })?;
        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, &self.config.api_key);
        Ok(url.into())
    }

    fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, SyncError> {
        let raw = format!("{}/{}", self.config.api_base, path);
        let mut url = Url::parse(&raw).map_err(|source| SyncError::InvalidUrl { url: raw, source })?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair(API_KEY_PARAM, &self.config.api_key);
        }

        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, SyncError> {
        let display_url = redact_api_key(url);

        let bytes = self
            .client
            .get_bytes(url.as_str())
            .await
            .map_err(|source| SyncError::ListingFailed {
                url: display_url.clone(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| SyncError::ListingParseFailed {
            url: display_url,
            source,
        })
    }
}

/// API client scoped to a single SoundCloud user
#[derive(Clone)]
pub struct SoundcloudUser<C> {
    api: SoundcloudApi<C>,
    username: String,
}

impl<C: HttpClient> SoundcloudUser<C> {
    pub fn new(client: C, config: ProviderConfig, username: impl Into<String>) -> Self {
        Self {
            api: SoundcloudApi::new(client, config),
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn client(&self) -> &C {
        self.api.client()
    }

    /// Avatar URL of the user, if one is set
    pub async fn cover_art(&self) -> Result<Option<String>, SyncError> {
        let url = self.api.api_url(&format!("users/{}.json", self.username), &[])?;
        let info: UserInfo = self.api.fetch_json(&url).await?;
        Ok(info.avatar_url.filter(|u| !u.is_empty()))
    }

    /// The user's published or favorited tracks, in API order
    pub async fn tracks(&self, kind: FeedKind) -> Result<Vec<Track>, SyncError> {
        let path = format!("users/{}/{}.json", self.username, kind.endpoint());
        let url = self.api.api_url(&path, &[("filter", "downloadable")])?;

        let tracks: Vec<Track> = self.api.fetch_json(&url).await?;
        debug!(user = %self.username, kind = kind.endpoint(), count = tracks.len(), "Fetched tracks");
        Ok(tracks)
    }

    pub fn authorize(&self, media_url: &str) -> Result<String, SyncError> {
        self.api.authorize(media_url)
    }
}

/// Render a URL for logs and errors without the consumer key
fn redact_api_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
        return url.to_string();
    }

    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == API_KEY_PARAM { "***".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.into()
}

/// Like [`redact_api_key`], for URLs that may also carry credentials
fn redact_media_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => strip_credentials(&redact_api_key(&parsed)),
        Err(_) => strip_credentials(url),
    }
}

/// A SoundCloud user's tracks or favorites presented as a feed
pub struct SoundcloudFeed<C> {
    user: SoundcloudUser<C>,
    kind: FeedKind,
}

impl<C: HttpClient> SoundcloudFeed<C> {
    pub fn new(user: SoundcloudUser<C>, kind: FeedKind) -> Self {
        Self { user, kind }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }
}

#[async_trait]
impl<C: HttpClient + 'static> TrackProvider for SoundcloudFeed<C> {
    async fn list_tracks(&self) -> Result<Vec<Track>, SyncError> {
        self.user.tracks(self.kind).await
    }

    fn authorize_media_url(&self, url: &str) -> Result<String, SyncError> {
        self.user.authorize(url)
    }

    fn fallback_link(&self) -> String {
        format!("{WEB_BASE}/{}", self.user.username)
    }

    fn display_url(&self, url: &str) -> String {
        redact_media_url(url)
    }
}

#[async_trait]
impl<C: HttpClient + 'static> FeedSource for SoundcloudFeed<C> {
    fn title(&self) -> String {
        match self.kind {
            FeedKind::Tracks => format!("{} on Soundcloud", self.user.username),
            FeedKind::Favorites => format!("{}'s favorites on Soundcloud", self.user.username),
        }
    }

    fn link(&self) -> String {
        self.kind.web_link(&self.user.username)
    }

    fn description(&self) -> String {
        match self.kind {
            FeedKind::Tracks => {
                format!("Tracks published by {} on Soundcloud.", self.user.username)
            }
            FeedKind::Favorites => {
                format!("Tracks favorited by {} on Soundcloud.", self.user.username)
            }
        }
    }

    async fn image(&self) -> Result<Option<String>, SyncError> {
        self.user.cover_art().await
    }

    async fn new_episodes(
        &self,
        channel: &mut Channel,
        reporter: &SharedProgressReporter,
    ) -> Result<SyncOutcome, SyncError> {
        sync_channel(self.user.client(), channel, self, reporter).await
    }
}

/// Recognize `http(s)://[sub.]soundcloud.com/<user>[/favorites]`
pub fn match_soundcloud_url(url: &str) -> Option<(String, FeedKind)> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let on_soundcloud = match host.strip_suffix("soundcloud.com") {
        Some("") => true,
        Some(prefix) => prefix
            .strip_suffix('.')
            .is_some_and(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphabetic())),
        None => false,
    };
    if !on_soundcloud {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [user] => Some((user.to_string(), FeedKind::Tracks)),
        [user, list] if list.eq_ignore_ascii_case("favorites") => {
            Some((user.to_string(), FeedKind::Favorites))
        }
        _ => None,
    }
}

/// Expand `sc:<user>` and `scfav:<user>` into full feed URLs
pub fn expand_url_shortcut(input: &str) -> String {
    let trimmed = input.trim();

    if let Some((prefix, username)) = trimmed.split_once(':')
        && !username.is_empty()
        && !username.starts_with("//")
        && let Some((_, kind)) = URL_SHORTCUTS.iter().find(|(p, _)| p.eq_ignore_ascii_case(prefix))
    {
        return kind.link_on(SHORTCUT_BASE, username);
    }

    trimmed.to_string()
}
