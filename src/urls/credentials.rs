// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::UrlError;

use super::parts::UrlParts;

// `@` stays raw in both fields and `:` stays raw in the password; the
// authority is split at the last `@` and the userinfo at the first `:`, so
// both still decode unambiguously.
const USERNAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@');
const PASSWORD_ENCODE_SET: &AsciiSet = &USERNAME_ENCODE_SET.remove(b':');

/// Username and password carried in a URL's userinfo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// True when a non-empty username is present
    pub fn is_present(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Extract percent-decoded credentials from a URL.
///
/// The authority is split at its last `@`, so usernames and passwords may
/// contain `@`; the userinfo is split at its first `:`, so passwords may
/// contain `:`.
pub fn extract_credentials(url: &str) -> Result<Credentials, UrlError> {
    let parts = UrlParts::split(url);

    let Some((Some(userinfo), _host)) = parts.userinfo_and_host() else {
        return Ok(Credentials::default());
    };

    let decode = |raw: &str| -> Result<String, UrlError> {
        percent_decode_str(raw)
            .decode_utf8()
            .map(Cow::into_owned)
            .map_err(|_| UrlError::InvalidEncoding {
                url: strip_credentials(url),
            })
    };

    match userinfo.split_once(':') {
        Some((username, password)) => Ok(Credentials {
            username: Some(decode(username)?),
            password: Some(decode(password)?),
        }),
        None => Ok(Credentials {
            username: Some(decode(userinfo)?),
            password: None,
        }),
    }
}

/// Remove any userinfo from a URL, leaving every other part untouched
pub fn strip_credentials(url: &str) -> String {
    let parts = UrlParts::split(url);

    match parts.userinfo_and_host() {
        Some((Some(_), host)) => UrlParts {
            authority: Some(host),
            ..parts
        }
        .to_string(),
        _ => url.to_string(),
    }
}

/// Embed credentials into a URL, replacing any that are already there.
///
/// Returns the URL unchanged when `username` is absent or empty.
pub fn add_credentials(
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<String, UrlError> {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return Ok(url.to_string());
    };

    let parts = UrlParts::split(url);
    let Some((_, host)) = parts.userinfo_and_host() else {
        return Err(UrlError::MissingAuthority {
            url: url.to_string(),
        });
    };

    let mut auth = utf8_percent_encode(username, USERNAME_ENCODE_SET).to_string();
    if let Some(password) = password {
        auth.push(':');
        auth.extend(utf8_percent_encode(password, PASSWORD_ENCODE_SET));
    }
    auth.push('@');
    auth.push_str(host);

    Ok(UrlParts {
        authority: Some(&auth),
        ..parts
    }
    .to_string())
}
