// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::error::{HttpError, SyncError};
use crate::http::HttpClient;
use crate::urls::strip_credentials;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// File metadata learned from a media URL's response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    /// Size in bytes, 0 when the server sent no usable Content-Length
    pub file_size: u64,
    pub mime_type: String,
    pub filename: String,
}

/// Read size, type and filename of a media file without downloading it.
///
/// `display_url` stands in for `url` in errors, logs and the filename
/// fallback, so it should carry no secrets.
pub async fn probe_media<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    display_url: &str,
) -> Result<MediaInfo, SyncError> {
    let display_url = strip_credentials(display_url);

    let response = client
        .get_headers(url)
        .await
        .map_err(|source| SyncError::ProbeFailed {
            url: display_url.clone(),
            source,
        })?;

    if response.status >= 400 {
        return Err(SyncError::ProbeFailed {
            url: display_url.clone(),
            source: HttpError::Status {
                url: display_url,
                status: response.status,
            },
        });
    }

    let filename = response
        .content_disposition
        .as_deref()
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| filename_from_url(&display_url).to_string());

    let info = MediaInfo {
        file_size: response.content_length.unwrap_or(0),
        mime_type: response
            .content_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        filename: sanitize_filename::sanitize(filename),
    };

    debug!(url = %display_url, size = info.file_size, mime = %info.mime_type, "Probed media");
    Ok(info)
}

/// Extract the filename parameter of a Content-Disposition header.
///
/// An RFC 5987 `filename*` value wins over a plain `filename`.
fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;

    for param in header.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(decoded) = decode_extended_value(value) {
                    return Some(decoded).filter(|f| !f.is_empty());
                }
            }
            "filename" => plain = Some(unquote(value)),
            _ => {}
        }
    }

    plain.filter(|f| !f.is_empty())
}

/// Decode `charset'language'percent-encoded` (UTF-8 only)
fn decode_extended_value(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_language, encoded) = rest.split_once('\'')?;

    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }

    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\""),
        None => value.to_string(),
    }
}

/// Name of the directory holding the media file, e.g. the track ID in
/// `https://api.example.com/tracks/123/stream`
fn filename_from_url(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query.rsplit('/').nth(1).unwrap_or("")
}
