// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted during channel synchronization for progress reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Track listing is being requested for a channel
    FetchingListing { channel_url: String },

    /// Track listing arrived from the provider
    ListingReceived {
        total_tracks: usize,
        /// Tracks the provider marks as downloadable
        downloadable_tracks: usize,
    },

    /// Metadata probe is running for a track
    ProbingTrack {
        /// Position among the new tracks being probed
        index: usize,
        total: usize,
        title: String,
    },

    /// A track not seen before became an episode
    EpisodeDiscovered { guid: String, title: String },

    /// Sync operation completed
    SyncCompleted { new_count: usize, seen_count: usize },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingReporter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for CollectingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter::shared();

        reporter.report(ProgressEvent::FetchingListing {
            channel_url: "https://soundcloud.com/someone".to_string(),
        });
        reporter.report(ProgressEvent::ListingReceived {
            total_tracks: 4,
            downloadable_tracks: 3,
        });
        reporter.report(ProgressEvent::ProbingTrack {
            index: 0,
            total: 3,
            title: "Track".to_string(),
        });
        reporter.report(ProgressEvent::EpisodeDiscovered {
            guid: "track".to_string(),
            title: "Track".to_string(),
        });
        reporter.report(ProgressEvent::SyncCompleted {
            new_count: 1,
            seen_count: 3,
        });
    }

    #[test]
    fn shared_reporter_forwards_events() {
        let collector = Arc::new(CollectingReporter::default());
        let reporter: SharedProgressReporter = collector.clone();

        reporter.report(ProgressEvent::SyncCompleted {
            new_count: 2,
            seen_count: 5,
        });

        assert_eq!(
            *collector.events.lock().unwrap(),
            vec![ProgressEvent::SyncCompleted {
                new_count: 2,
                seen_count: 5
            }]
        );
    }
}
