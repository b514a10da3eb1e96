// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use tracing::debug;

use crate::atomic::write_atomically;
use crate::channel::Channel;
use crate::error::StoreError;

/// Write channel state as pretty JSON, replacing any previous file atomically
pub fn save_channel(channel: &Channel, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(channel)?;
    write_atomically(path, json.as_bytes())?;

    debug!(path = %path.display(), episodes = channel.episodes.len(), "Saved channel state");
    Ok(())
}

/// Read channel state written by [`save_channel`]
pub fn load_channel(path: &Path) -> Result<Channel, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| StoreError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Like [`load_channel`], but a missing file yields `None`
pub fn load_channel_if_exists(path: &Path) -> Result<Option<Channel>, StoreError> {
    match load_channel(path) {
        Ok(channel) => Ok(Some(channel)),
        Err(StoreError::ReadFailed { source, .. }) if source.kind() == IoErrorKind::NotFound => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
