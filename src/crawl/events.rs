//! Structured progress events emitted by the crawler.
//!
//! The crawler never writes to the terminal itself. Presentation layers
//! subscribe to a [`ProgressSink`] and render events however they like.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::classify::FetchFailureCause;
use super::context::RunSummary;
use crate::store::StatusCode;

/// How a visited track ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Already terminal in the store; nothing done.
    Skipped(StatusCode),
    /// A file with the expected name was already on disk.
    Present,
    /// No source id; the track cannot be fetched.
    Unavailable,
    /// Fetched; `tagged` tells whether metadata was written.
    Fetched { tagged: bool },
    /// Fetch failed with a skippable cause.
    Abandoned(FetchFailureCause),
}

/// One step of a run, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStarted {
        artists: usize,
    },
    ArtistStarted {
        index: usize,
        total: usize,
        name: String,
    },
    /// Artist already handled by an earlier run.
    ArtistSkipped {
        name: String,
        status: StatusCode,
    },
    /// No confident match; `suggestion` is the best hit, if any.
    ArtistRejected {
        name: String,
        suggestion: Option<String>,
    },
    /// Artist row created; catalog left for a later run.
    ArtistPreloaded {
        name: String,
    },
    ArtistFinished {
        name: String,
        status: Option<StatusCode>,
    },
    AlbumStarted {
        index: usize,
        total: usize,
        title: String,
    },
    AlbumFinished {
        title: String,
        status: StatusCode,
    },
    TrackFinished {
        title: String,
        outcome: TrackOutcome,
    },
    /// Waiting before the single retry of a failed fetch.
    Cooldown {
        cause: FetchFailureCause,
        wait: Duration,
    },
    RunFinished(RunSummary),
}

/// Sending half of the progress stream. Dropped receivers are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Sink that discards every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates a connected sink and its receiver.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (sink, mut receiver) = ProgressSink::channel();
        sink.emit(ProgressEvent::RunStarted { artists: 2 });
        sink.emit(ProgressEvent::ArtistPreloaded {
            name: "Can".to_string(),
        });
        drop(sink);

        assert_eq!(
            receiver.recv().await.unwrap(),
            ProgressEvent::RunStarted { artists: 2 }
        );
        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::ArtistPreloaded { .. }
        ));
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_disabled_sink_and_closed_receiver_do_not_panic() {
        ProgressSink::disabled().emit(ProgressEvent::RunStarted { artists: 0 });

        let (sink, receiver) = ProgressSink::channel();
        drop(receiver);
        sink.emit(ProgressEvent::RunStarted { artists: 1 });
    }
}
