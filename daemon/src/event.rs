use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Playback state reported by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    /// Any state string the player reports that we do not recognise.
    Unknown(String),
}

impl PlaybackStatus {
    /// Parses a player-reported status string. Matching is case-insensitive
    /// and ignores surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "playing" => PlaybackStatus::Playing,
            "paused" => PlaybackStatus::Paused,
            "stopped" => PlaybackStatus::Stopped,
            _ => PlaybackStatus::Unknown(trimmed.to_string()),
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Playing => f.write_str("playing"),
            PlaybackStatus::Paused => f.write_str("paused"),
            PlaybackStatus::Stopped => f.write_str("stopped"),
            PlaybackStatus::Unknown(s) => write!(f, "unknown({s})"),
        }
    }
}

/// Metadata for one playback event.
///
/// `started` and `path` are the only fields the daemon reads; anything else
/// the player reports is carried through to the sinks untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackDetails(BTreeMap<String, Value>);

impl TrackDetails {
    pub const STARTED: &'static str = "started";
    pub const PATH: &'static str = "path";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// A copy with `field` removed.
    pub fn without(&self, field: &str) -> Self {
        let mut copy = self.clone();
        copy.0.remove(field);
        copy
    }

    pub fn started(&self) -> Option<&Value> {
        self.get(Self::STARTED)
    }

    pub fn path(&self) -> Option<&Value> {
        self.get(Self::PATH)
    }

    /// Renders a field the way it appears in the log file: strings verbatim,
    /// other JSON values in their JSON form, missing fields as "".
    pub fn field_text(&self, field: &str) -> String {
        match self.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TrackDetails {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A detected transition into the playing state, carrying the track details
/// exactly as the status source reported them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChangeEvent {
    pub details: TrackDetails,
}

impl TrackChangeEvent {
    /// One log-file line: `"<started> <path>\n"`.
    pub fn log_line(&self) -> String {
        format!(
            "{} {}\n",
            self.details.field_text(TrackDetails::STARTED),
            self.details.field_text(TrackDetails::PATH)
        )
    }

    /// Serializes the details as a JSON object for the remote list.
    pub fn to_record(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.details)
    }
}
