use std::process::Stdio;
use sysinfo::{ProcessesToUpdate, System};
use tokio::process::Command;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::error::SourceFailure;
use crate::event::{PlaybackStatus, TrackDetails};
use crate::source::{StatusUpdate, UpdateSender};

/// Upper bound on a single run of the status command.
const COMMAND_TIMEOUT_SECS: u64 = 5;

/// Polls the player every `poll_interval_ms` and sends a [`StatusUpdate`]
/// whenever its status or current track changes.
///
/// With `process_name` set, polling waits until the player is first seen
/// running. Stops after sending a [`SourceFailure`] when that process later
/// disappears or the status command cannot be started, and stops quietly
/// once the receiving side is gone.
pub async fn run(config: PlayerConfig, tx: UpdateSender) {
    let mut sys = System::new();
    let mut presence = PlayerPresence::default();
    let mut tracker = ChangeTracker::default();
    let mut ticker = interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Some(name) = &config.process_name {
            sys.refresh_processes(ProcessesToUpdate::All, false);
            match presence.check(is_running(&sys, name)) {
                Presence::Waiting => continue,
                Presence::Running => {}
                Presence::Gone => {
                    warn!("Player process '{name}' exited");
                    let _ = tx.send(Err(SourceFailure::PlayerGone(name.clone()))).await;
                    break;
                }
            }
        }

        let (status, details) = match read_status(&config).await {
            Ok(Some(reading)) => reading,
            Ok(None) => continue,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        };

        let now = || chrono::Local::now().to_rfc3339();
        if let Some(update) = tracker.observe(status, details, now) {
            debug!("Player status: {}", update.status);
            if tx.send(Ok(update)).await.is_err() {
                break;
            }
        }
    }

    info!("Player monitor stopped");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Not seen running yet.
    Waiting,
    Running,
    /// Seen running before and no longer is.
    Gone,
}

/// Tells "not started yet" apart from "exited".
#[derive(Debug, Default)]
struct PlayerPresence {
    seen: bool,
}

impl PlayerPresence {
    fn check(&mut self, running: bool) -> Presence {
        match (running, self.seen) {
            (true, false) => {
                info!("Player process is running");
                self.seen = true;
                Presence::Running
            }
            (true, true) => Presence::Running,
            (false, true) => Presence::Gone,
            (false, false) => Presence::Waiting,
        }
    }
}

fn is_running(sys: &System, name: &str) -> bool {
    let target = name.to_lowercase();
    sys.processes()
        .values()
        .any(|p| p.name().to_string_lossy().to_lowercase() == target)
}

/// Runs the status command once. `Ok(None)` means no reading this tick.
async fn read_status(
    config: &PlayerConfig,
) -> Result<Option<(PlaybackStatus, TrackDetails)>, SourceFailure> {
    let Some((program, args)) = config.command.split_first() else {
        return Err(SourceFailure::Command {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    let timeout = Duration::from_secs(COMMAND_TIMEOUT_SECS);
    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(SourceFailure::Command {
                program: program.clone(),
                source,
            })
        }
        Err(_) => {
            warn!("Status command '{program}' timed out");
            return Ok(None);
        }
    };

    // Players report "nothing loaded" by exiting non-zero (playerctl: "No
    // players found").
    if !output.status.success() {
        return Ok(Some((PlaybackStatus::Stopped, TrackDetails::new())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap_or_default();
    Ok(Some(parse_status_line(line, &config.fields)))
}

/// Splits a tab-separated status line into columns named by `fields`.
/// The `status` column becomes the playback status; every other non-empty
/// column becomes a details field.
fn parse_status_line(line: &str, fields: &[String]) -> (PlaybackStatus, TrackDetails) {
    let mut status = PlaybackStatus::Unknown(String::new());
    let mut details = TrackDetails::new();
    for (field, value) in fields.iter().zip(line.split('\t')) {
        let value = value.trim();
        if field == "status" {
            status = PlaybackStatus::parse(value);
        } else if !value.is_empty() {
            details.insert(field.as_str(), value);
        }
    }
    (status, details)
}

/// Suppresses repeated readings and stamps `started` on newly seen tracks.
///
/// A track is identified by all of its details except `started`, so tracks
/// without a `path`, or streams whose `path` never changes, still register
/// as new tracks when any other field changes.
#[derive(Debug, Default)]
struct ChangeTracker {
    /// Last emitted status and track identity.
    last: Option<(PlaybackStatus, TrackDetails)>,
    /// Identity and start time of the track currently loaded in the player.
    current: Option<(TrackDetails, String)>,
}

impl ChangeTracker {
    fn observe(
        &mut self,
        status: PlaybackStatus,
        mut details: TrackDetails,
        now: impl FnOnce() -> String,
    ) -> Option<StatusUpdate> {
        let identity = details.without(TrackDetails::STARTED);
        let key = (status.clone(), identity.clone());
        if self.last.as_ref() == Some(&key) {
            return None;
        }
        self.last = Some(key);

        match status {
            PlaybackStatus::Playing if !details.is_empty() => {
                let started = match (&self.current, details.started()) {
                    (_, Some(_)) => details.field_text(TrackDetails::STARTED),
                    // Resuming after a pause keeps the original start time.
                    (Some((current, started)), None) if *current == identity => {
                        started.clone()
                    }
                    _ => now(),
                };
                details.insert(TrackDetails::STARTED, started.clone());
                self.current = Some((identity, started));
            }
            PlaybackStatus::Paused => {}
            _ => self.current = None,
        }

        Some(StatusUpdate { status, details })
    }
}
