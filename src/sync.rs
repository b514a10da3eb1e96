// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::channel::{Channel, Episode};
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::probe::probe_media;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::provider::{Track, TrackProvider, non_empty};
use crate::urls::strip_credentials;

const CREATED_AT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const DEFAULT_DESCRIPTION: &str = "No description available";

/// Result of a sync operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Episodes appended to the channel, in listing order
    pub new_episodes: Vec<Episode>,
    /// GUIDs of every downloadable track in the listing, known ones included
    pub seen_guids: HashSet<String>,
}

/// Synchronize a channel with its provider's current track listing.
///
/// This is the main entry point for the library. It:
/// 1. Fetches the full listing and keeps downloadable tracks
/// 2. Skips tracks whose GUID the channel already knows
/// 3. Probes each new track's media URL for size, type and filename
/// 4. Appends the resulting episodes to the channel
///
/// The channel is only modified once every new track resolved. Any error,
/// or dropping the returned future, leaves it as it was.
pub async fn sync_channel<C, P>(
    client: &C,
    channel: &mut Channel,
    provider: &P,
    reporter: &SharedProgressReporter,
) -> Result<SyncOutcome, SyncError>
where
    C: HttpClient + ?Sized,
    P: TrackProvider + ?Sized,
{
    reporter.report(ProgressEvent::FetchingListing {
        channel_url: channel.url.clone(),
    });

    let tracks = provider.list_tracks().await?;
    let total_tracks = tracks.len();
    let downloadable: Vec<Track> = tracks.into_iter().filter(|t| t.downloadable).collect();

    reporter.report(ProgressEvent::ListingReceived {
        total_tracks,
        downloadable_tracks: downloadable.len(),
    });

    let mut known: HashSet<String> = channel.guids().into_iter().map(String::from).collect();
    let mut seen_guids = HashSet::new();
    let mut pending = Vec::new();

    // Every downloadable track must be well-formed, known or not
    for track in downloadable {
        let guid = track.guid()?;
        let published = non_empty(&track.created_at)
            .map(parse_created_at)
            .transpose()?;
        track.media_url()?;
        seen_guids.insert(guid.clone());

        // Also drops repeats within this listing
        if known.insert(guid.clone()) {
            pending.push((guid, published, track));
        }
    }

    debug!(
        channel = %channel.url,
        known = seen_guids.len() - pending.len(),
        new = pending.len(),
        "Planned sync"
    );

    let total = pending.len();
    let snapshot: &Channel = channel;

    let new_episodes = stream::iter(pending.into_iter().enumerate())
        .then(move |(index, (guid, published, track))| async move {
            reporter.report(ProgressEvent::ProbingTrack {
                index,
                total,
                title: track.display_title().to_string(),
            });
            resolve_track(client, snapshot, provider, guid, published, &track).await
        })
        .try_fold(Vec::with_capacity(total), move |mut episodes, episode| async move {
            reporter.report(ProgressEvent::EpisodeDiscovered {
                guid: episode.guid.clone(),
                title: episode.title.clone(),
            });
            episodes.push(episode);
            Ok::<_, SyncError>(episodes)
        })
        .await?;

    channel.episodes.extend(new_episodes.iter().cloned());

    reporter.report(ProgressEvent::SyncCompleted {
        new_count: new_episodes.len(),
        seen_count: seen_guids.len(),
    });
    info!(
        channel = %channel.url,
        new = new_episodes.len(),
        seen = seen_guids.len(),
        "Channel synchronized"
    );

    Ok(SyncOutcome {
        new_episodes,
        seen_guids,
    })
}

/// Turn a track not yet in the channel into an episode
async fn resolve_track<C, P>(
    client: &C,
    channel: &Channel,
    provider: &P,
    guid: String,
    published: Option<DateTime<Utc>>,
    track: &Track,
) -> Result<Episode, SyncError>
where
    C: HttpClient + ?Sized,
    P: TrackProvider + ?Sized,
{
    let media_url = provider.authorize_media_url(track.media_url()?)?;
    let probe_url = channel.authenticate_url(&media_url)?;
    let media = probe_media(client, &probe_url, &provider.display_url(&media_url)).await?;

    Ok(Episode {
        guid,
        title: track.display_title().to_string(),
        link: non_empty(&track.permalink_url)
            .map(String::from)
            .unwrap_or_else(|| provider.fallback_link()),
        description: non_empty(&track.description)
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string(),
        url: strip_credentials(&media_url),
        file_size: media.file_size,
        mime_type: media.mime_type,
        filename: media.filename,
        published,
    })
}

/// Parse a provider timestamp such as `2013/02/01 10:00:00 +0000` as UTC.
///
/// Anything after the seconds field, like a zone offset, is ignored.
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>, SyncError> {
    let invalid = || SyncError::InvalidTimestamp {
        value: value.to_string(),
    };

    let (naive, rest) =
        NaiveDateTime::parse_and_remainder(value.trim(), CREATED_AT_FORMAT).map_err(|_| invalid())?;

    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(naive.and_utc())
}
