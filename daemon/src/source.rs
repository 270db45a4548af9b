use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SourceFailure;
use crate::event::{PlaybackStatus, TrackDetails};

/// Capacity of the monitor → loop channel. A full channel blocks the monitor.
pub const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// One observed change of the player's state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: PlaybackStatus,
    pub details: TrackDetails,
}

/// Producer of player state changes. `next` waits until the state changes.
#[async_trait]
pub trait StatusSource: Send {
    async fn next(&mut self) -> Result<StatusUpdate, SourceFailure>;
}

pub type UpdateSender = mpsc::Sender<Result<StatusUpdate, SourceFailure>>;

/// [`StatusSource`] fed through a bounded channel by a producer task.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<StatusUpdate, SourceFailure>>,
}

/// Creates a connected sender / source pair.
pub fn channel(capacity: usize) -> (UpdateSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelSource { rx })
}

#[async_trait]
impl StatusSource for ChannelSource {
    async fn next(&mut self) -> Result<StatusUpdate, SourceFailure> {
        match self.rx.recv().await {
            Some(update) => update,
            None => Err(SourceFailure::Closed),
        }
    }
}
