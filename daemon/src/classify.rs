use crate::event::{PlaybackStatus, TrackChangeEvent, TrackDetails};

/// Decides whether a status update is a genuine "track started" event.
///
/// Only `Playing` with non-empty details qualifies. Details lacking `started`
/// or `path` still produce an event; the sinks render whatever is present.
pub fn classify(status: &PlaybackStatus, details: &TrackDetails) -> Option<TrackChangeEvent> {
    if *status == PlaybackStatus::Playing && !details.is_empty() {
        Some(TrackChangeEvent {
            details: details.clone(),
        })
    } else {
        None
    }
}
