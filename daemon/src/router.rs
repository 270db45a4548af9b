use crate::error::{IoFailure, RemoteFailure, SinkFailure};
use crate::event::TrackChangeEvent;
use crate::file_sink::FileSink;
use crate::queue_sink::BoundedQueueSink;

/// Per-sink outcome of delivering one event.
#[derive(Debug)]
pub struct DeliveryReport {
    pub file: Result<(), IoFailure>,
    pub remote: Result<(), RemoteFailure>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.file.is_ok() && self.remote.is_ok()
    }

    /// Failures in delivery order, labelled with the sink name.
    pub fn into_failures(self) -> Vec<(&'static str, SinkFailure)> {
        let mut failures = Vec::new();
        if let Err(e) = self.file {
            failures.push(("file", e.into()));
        }
        if let Err(e) = self.remote {
            failures.push(("remote", e.into()));
        }
        failures
    }
}

/// Sends each event to the file sink, then the remote queue sink. A failure
/// in one sink never keeps the other from running.
pub struct DeliveryRouter {
    file: FileSink,
    queue: BoundedQueueSink,
}

impl DeliveryRouter {
    pub fn new(file: FileSink, queue: BoundedQueueSink) -> Self {
        Self { file, queue }
    }

    pub fn has_enabled_sink(&self) -> bool {
        self.file.path().is_some() || self.queue.is_enabled()
    }

    pub async fn deliver(&mut self, event: &TrackChangeEvent) -> DeliveryReport {
        let file = self.file.write(event);
        let remote = self.queue.push(event).await;
        DeliveryReport { file, remote }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue_sink::memory::MemoryList;

    fn event(path: &str) -> TrackChangeEvent {
        TrackChangeEvent {
            details: [("started", "t0"), ("path", path)].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn delivers_to_both_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("played.log");
        let store = MemoryList::new();
        let mut router = DeliveryRouter::new(
            FileSink::new(Some(log.clone())),
            BoundedQueueSink::new(Box::new(store.clone()), "k", 10),
        );

        let report = router.deliver(&event("/a.mp3")).await;

        assert!(report.is_success());
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "t0 /a.mp3\n");
        assert_eq!(store.entries("k").len(), 1);
    }

    #[tokio::test]
    async fn file_failure_does_not_block_remote() {
        let dir = tempfile::tempdir().unwrap();
        let unwritable = dir.path().join("no-such-dir").join("played.log");
        let store = MemoryList::new();
        let mut router = DeliveryRouter::new(
            FileSink::new(Some(unwritable)),
            BoundedQueueSink::new(Box::new(store.clone()), "k", 10),
        );

        let report = router.deliver(&event("/a.mp3")).await;

        assert!(report.file.is_err());
        assert!(report.remote.is_ok());
        assert_eq!(store.entries("k").len(), 1);

        let failures = report.into_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "file");
        assert!(matches!(failures[0].1, SinkFailure::Io(_)));
    }

    #[tokio::test]
    async fn remote_failure_does_not_block_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("played.log");
        let store = MemoryList::new();
        store.set_failing(true);
        let mut router = DeliveryRouter::new(
            FileSink::new(Some(log.clone())),
            BoundedQueueSink::new(Box::new(store.clone()), "k", 10),
        );

        let report = router.deliver(&event("/a.mp3")).await;

        assert!(report.file.is_ok());
        assert!(matches!(report.remote, Err(RemoteFailure::NotConnected)));
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "t0 /a.mp3\n");

        let failures = report.into_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "remote");
    }

    #[tokio::test]
    async fn no_sinks_configured_is_success() {
        let mut router = DeliveryRouter::new(FileSink::new(None), BoundedQueueSink::disabled());
        assert!(!router.has_enabled_sink());
        assert!(router.deliver(&event("/a.mp3")).await.is_success());
    }
}
