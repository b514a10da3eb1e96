// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::time::Duration;

/// Base URL of the SoundCloud public API
pub const DEFAULT_API_BASE: &str = "https://api.soundcloud.com";

/// Client identifier sent with every request
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Provider settings handed to clients and feed sources at construction.
///
/// The API key is read-only for the lifetime of the value; nothing in the
/// crate keeps a process-wide copy.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Consumer key appended to every API and media request
    pub api_key: String,
    /// Base URL for API calls, without a trailing slash
    pub api_base: String,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Per-request timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: default_user_agent(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

// Keep the key out of logs and error output
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("ProviderConfig")
            .field("api_key", &masked)
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}
