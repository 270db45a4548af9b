/// Canonical file paths and path expansion.
///
/// The config file is looked up in order:
///   - `$PLAYLOG_CONFIG`
///   - `$XDG_CONFIG_HOME/playlog/config.toml`
///   - `~/.config/playlog/config.toml`
use std::path::PathBuf;

const APP_DIR_NAME: &str = "playlog";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "PLAYLOG_CONFIG";

/// Returns the config file path for the current environment.
pub fn config_file_path() -> PathBuf {
    config_file_path_with(|var| std::env::var(var).ok())
}

fn config_file_path_with(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(explicit) = lookup(CONFIG_ENV_VAR).filter(|s| !s.is_empty()) {
        return PathBuf::from(expand_with(&explicit, &lookup));
    }
    let config_dir = match lookup("XDG_CONFIG_HOME").filter(|s| !s.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(lookup("HOME").unwrap_or_default()).join(".config"),
    };
    config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Expands a leading `~/` and `$VAR` / `${VAR}` references using the process
/// environment. Unknown variables are left as written.
pub fn expand_path(s: &str) -> PathBuf {
    PathBuf::from(expand_with(s, &|var: &str| std::env::var(var).ok()))
}

fn expand_with(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let tilde_expanded = match s.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match lookup("HOME") {
            Some(home) => format!("{home}{rest}"),
            None => s.to_string(),
        },
        _ => s.to_string(),
    };

    let mut out = String::with_capacity(tilde_expanded.len());
    let mut rest = tilde_expanded.as_str();
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}
