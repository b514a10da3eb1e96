pub mod atomic;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod probe;
pub mod progress;
pub mod provider;
pub mod store;
pub mod sync;
pub mod urls;

// Re-export main types for convenience
pub use atomic::{ReplaceStrategy, update_file_safely, update_file_safely_with, write_atomically};
pub use channel::{Channel, Episode};
pub use config::ProviderConfig;
pub use error::{ErrorKind, HttpError, StoreError, SyncError, UrlError, WriteError};
pub use http::{HeadResponse, HttpClient, ReqwestClient};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use provider::{FeedSource, Track, TrackProvider, expand_url_shortcut, resolve_feed_source};
pub use store::{load_channel, load_channel_if_exists, save_channel};
pub use sync::{SyncOutcome, sync_channel};
pub use urls::{add_credentials, extract_credentials, normalize_feed_url, strip_credentials};
