/// The poll → classify → deliver loop and the context it runs in.
///
/// The loop waits on the status source, classifies each update and hands
/// events to the router. Sink failures are logged and the loop carries on;
/// only a failing status source ends it.
use tracing::{error, info, warn};

use crate::classify::classify;
use crate::config::SinkConfig;
use crate::error::SourceFailure;
use crate::file_sink::FileSink;
use crate::queue_sink::BoundedQueueSink;
use crate::redis_list::RedisList;
use crate::router::DeliveryRouter;
use crate::source::StatusSource;

/// Everything the loop needs, built once at startup.
pub struct DaemonContext<S> {
    source: S,
    router: DeliveryRouter,
}

impl<S: StatusSource> DaemonContext<S> {
    pub fn new(source: S, router: DeliveryRouter) -> Self {
        Self { source, router }
    }

    /// Runs until the status source fails, returning that failure.
    pub async fn run(mut self) -> SourceFailure {
        let mut delivered: u64 = 0;
        loop {
            let update = match self.source.next().await {
                Ok(update) => update,
                Err(e) => {
                    info!("Delivered {delivered} event(s) to every sink before stopping");
                    return e;
                }
            };

            let Some(event) = classify(&update.status, &update.details) else {
                continue;
            };

            let report = self.router.deliver(&event).await;
            if report.is_success() {
                delivered += 1;
            }
            info!(
                "Track started: {} {}",
                event.details.field_text("started"),
                event.details.field_text("path")
            );
            for (sink, failure) in report.into_failures() {
                warn!("[{sink}] Delivery failed: {failure}");
            }
        }
    }
}

/// Builds the sinks described by `sinks`.
///
/// The remote store is connected and pinged once. A failure there is logged
/// and the sink is kept; whether later pushes reconnect is up to the
/// remote's `reconnect` setting.
pub async fn build_router(sinks: &SinkConfig) -> DeliveryRouter {
    let file = FileSink::new(sinks.log_file.clone());
    if let Some(path) = file.path() {
        info!("Logging played tracks to {}", path.display());
    }

    let queue = match &sinks.remote {
        None => BoundedQueueSink::disabled(),
        Some(settings) => match RedisList::open(settings) {
            Ok(mut list) => {
                if let Err(e) = list.connect().await {
                    error!("[remote] Connect to {} failed: {e}", settings.host);
                }
                if list.is_connected() {
                    if let Err(e) = list.ping().await {
                        error!("[remote] Ping failed: {e}");
                    }
                }
                info!(
                    "Pushing played tracks to '{}' (max {} items)",
                    settings.key, sinks.max_items
                );
                BoundedQueueSink::new(Box::new(list), settings.key.clone(), sinks.max_items)
            }
            Err(e) => {
                error!("[remote] Invalid settings, remote delivery disabled: {e}");
                BoundedQueueSink::disabled()
            }
        },
    };

    let router = DeliveryRouter::new(file, queue);
    if !router.has_enabled_sink() {
        warn!("No log file or remote store configured; events will only be logged here");
    }
    router
}
