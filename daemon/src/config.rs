use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;
use crate::queue_sink::DEFAULT_MAX_ITEMS;

pub const DEFAULT_REMOTE_PORT: u16 = 6379;
pub const DEFAULT_REMOTE_KEY: &str = "playlogd";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 5;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Root configuration structure. Deserialized from `config.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Maximum number of events retained in the remote list.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub log: LogConfig,
    /// Remote list store; absent disables remote delivery.
    pub remote: Option<RemoteSettings>,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            log: LogConfig::default(),
            remote: None,
            player: PlayerConfig::default(),
        }
    }
}

/// Played-tracks log file.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LogConfig {
    /// `~` and `$VAR` are expanded when the sink is built. Absent disables
    /// the file sink.
    pub file: Option<String>,
}

/// Connection parameters for the remote list store.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteSettings {
    pub host: String,
    #[serde(default = "default_remote_port")]
    pub port: u16,
    /// Password, if the store requires one.
    pub auth: Option<String>,
    /// Name of the list events are pushed to.
    #[serde(default = "default_remote_key")]
    pub key: String,
    /// Upper bound on connecting and on each command round trip.
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
    /// Re-establish a lost connection on the next push instead of failing
    /// every push until restart.
    #[serde(default = "default_true")]
    pub reconnect: bool,
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// How the player's state is observed.
#[derive(Debug, Deserialize, Clone)]
pub struct PlayerConfig {
    /// Executable name of the player. When set, the daemon stops once no
    /// process with this name is running.
    pub process_name: Option<String>,
    /// Program and arguments printing one tab-separated status line.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Column names of the status line, in order. Must include `status`.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            process_name: None,
            command: default_command(),
            fields: default_fields(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PlayerConfig {
    /// Poll interval, clamped to at least [`MIN_POLL_INTERVAL_MS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Sink settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub log_file: Option<PathBuf>,
    pub remote: Option<RemoteSettings>,
    pub max_items: usize,
}

impl Config {
    /// Resolves the sink settings, expanding the log file path.
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            log_file: self.log.file.as_deref().map(paths::expand_path),
            remote: self.remote.clone(),
            max_items: self.max_items.max(1),
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    if !config.player.fields.iter().any(|f| f == "status") {
        anyhow::bail!(
            "Invalid config file {}: player.fields must include \"status\"",
            path.display()
        );
    }
    if config.player.command.is_empty() {
        anyhow::bail!(
            "Invalid config file {}: player.command must not be empty",
            path.display()
        );
    }
    Ok(config)
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_remote_port() -> u16 {
    DEFAULT_REMOTE_PORT
}

fn default_remote_key() -> String {
    DEFAULT_REMOTE_KEY.to_string()
}

fn default_remote_timeout() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_command() -> Vec<String> {
    [
        "playerctl",
        "metadata",
        "--format",
        "{{lc(status)}}\t{{xesam:url}}\t{{artist}}\t{{album}}\t{{title}}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_fields() -> Vec<String> {
    ["status", "path", "artist", "album", "title"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn config_default_values() {
        let c = Config::default();
        assert_eq!(c.max_items, DEFAULT_MAX_ITEMS);
        assert!(c.log.file.is_none());
        assert!(c.remote.is_none());
        assert_eq!(c.player.fields, default_fields());
        assert_eq!(c.player.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn sink_config_raises_zero_bound() {
        let config = Config {
            max_items: 0,
            ..Config::default()
        };
        let sink = config.sink_config();
        assert_eq!(sink.max_items, 1);
        assert!(sink.log_file.is_none());
    }

    #[test]
    fn poll_interval_is_clamped() {
        let mut player = PlayerConfig::default();
        player.poll_interval_ms = 5;
        assert_eq!(player.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }

    // ── load_or_default ───────────────────────────────────────────────────────

    #[test]
    fn load_or_default_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_or_default(&path).unwrap();
        assert!(config.remote.is_none());
        assert!(config.log.file.is_none());
    }

    #[test]
    fn load_or_default_empty_file_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.max_items, DEFAULT_MAX_ITEMS);
        assert_eq!(config.player.command, default_command());
        assert_eq!(config.sink_config().max_items, DEFAULT_MAX_ITEMS);
    }

    #[test]
    fn load_or_default_parses_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
max_items = 500

[log]
file = "/var/log/played.log"

[remote]
host = "cache.local"
auth = "hunter2"
key = "music/played"
timeout_secs = 3
reconnect = false

[player]
process_name = "Music"
command = ["my-status"]
fields = ["status", "path", "started"]
poll_interval_ms = 250
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.max_items, 500);
        assert_eq!(config.log.file.as_deref(), Some("/var/log/played.log"));

        let remote = config.remote.as_ref().unwrap();
        assert_eq!(remote.host, "cache.local");
        assert_eq!(remote.port, DEFAULT_REMOTE_PORT);
        assert_eq!(remote.auth.as_deref(), Some("hunter2"));
        assert_eq!(remote.key, "music/played");
        assert_eq!(remote.timeout(), Duration::from_secs(3));
        assert!(!remote.reconnect);

        assert_eq!(config.player.process_name.as_deref(), Some("Music"));
        assert_eq!(config.player.command, vec!["my-status"]);
        assert_eq!(config.player.fields, vec!["status", "path", "started"]);
        assert_eq!(config.player.poll_interval(), Duration::from_millis(250));

        let sink = config.sink_config();
        assert_eq!(sink.log_file, Some(PathBuf::from("/var/log/played.log")));
        assert_eq!(sink.max_items, 500);
    }

    #[test]
    fn load_or_default_remote_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote]\nhost = \"localhost\"\n").unwrap();

        let remote = load_or_default(&path).unwrap().remote.unwrap();
        assert_eq!(remote.port, DEFAULT_REMOTE_PORT);
        assert_eq!(remote.key, DEFAULT_REMOTE_KEY);
        assert_eq!(remote.timeout_secs, DEFAULT_REMOTE_TIMEOUT_SECS);
        assert!(remote.auth.is_none());
        assert!(remote.reconnect);
    }

    #[test]
    fn load_or_default_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_or_default(&path).is_err());
    }

    #[test]
    fn load_or_default_rejects_fields_without_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\nfields = [\"path\"]\n").unwrap();
        assert!(load_or_default(&path).is_err());
    }

    #[test]
    fn load_or_default_rejects_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\ncommand = []\n").unwrap();
        assert!(load_or_default(&path).is_err());
    }
}
