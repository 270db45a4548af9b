use async_trait::async_trait;

use crate::error::RemoteFailure;
use crate::event::TrackChangeEvent;

/// Default number of events retained in the remote list.
pub const DEFAULT_MAX_ITEMS: usize = 8000;

/// A remote list store with push-to-head and trim-by-length semantics.
#[async_trait]
pub trait RemoteList: Send {
    /// Pushes `record` onto the head of the list at `key`.
    async fn push_front(&mut self, key: &str, record: &str) -> Result<(), RemoteFailure>;

    /// Keeps only the `max_items` entries nearest the head of `key`.
    async fn trim(&mut self, key: &str, max_items: usize) -> Result<(), RemoteFailure>;

    /// Push followed by trim. Backends that can apply both in one round trip
    /// override this.
    async fn push_bounded(
        &mut self,
        key: &str,
        record: &str,
        max_items: usize,
    ) -> Result<(), RemoteFailure> {
        self.push_front(key, record).await?;
        self.trim(key, max_items).await
    }
}

/// Pushes events to a size-capped remote list, trimming after every push so
/// the list never holds more than `max_items` entries.
pub struct BoundedQueueSink {
    store: Option<Box<dyn RemoteList>>,
    key: String,
    max_items: usize,
}

impl BoundedQueueSink {
    pub fn new(store: Box<dyn RemoteList>, key: impl Into<String>, max_items: usize) -> Self {
        Self {
            store: Some(store),
            key: key.into(),
            max_items: max_items.max(1),
        }
    }

    /// A sink with no remote configured; every push succeeds without effect.
    pub fn disabled() -> Self {
        Self {
            store: None,
            key: String::new(),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn push(&mut self, event: &TrackChangeEvent) -> Result<(), RemoteFailure> {
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };
        let record = event.to_record()?;
        store.push_bounded(&self.key, &record, self.max_items).await
    }
}
