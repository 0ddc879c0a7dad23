//! Shared path helpers: home directory lookup and `~` expansion.

use std::env;
use std::path::{Path, PathBuf};

/// `$HOME`, or `/tmp` when it is unset or empty.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

/// Default config file: `$XDG_CONFIG_HOME/slh/config.toml`, falling back to
/// `~/.config/slh/config.toml`.
pub fn default_config_file() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config").join("slh/config.toml")
}

/// Default activity log: `$XDG_STATE_HOME/slh/activity.jsonl`, falling back
/// to `~/.local/state/slh/activity.jsonl`.
pub fn default_activity_log() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", ".local/state").join("slh/activity.jsonl")
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .unwrap_or_else(|| home_dir().join(fallback))
}

/// Replace a leading `~` component with `home`.
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_leading_tilde() {
        let home = Path::new("/home/ada");
        assert_eq!(
            expand_tilde(Path::new("~/.local/state/slh.jsonl"), home),
            PathBuf::from("/home/ada/.local/state/slh.jsonl")
        );
        assert_eq!(expand_tilde(Path::new("~"), home), PathBuf::from("/home/ada"));
    }

    #[test]
    fn leaves_other_paths_alone() {
        let home = Path::new("/home/ada");
        assert_eq!(
            expand_tilde(Path::new("/var/log/slh.jsonl"), home),
            PathBuf::from("/var/log/slh.jsonl")
        );
        // Only a whole `~` component is expanded.
        assert_eq!(
            expand_tilde(Path::new("~ada/file"), home),
            PathBuf::from("~ada/file")
        );
    }

    #[test]
    fn defaults_end_in_slh_files() {
        assert!(default_config_file().ends_with("slh/config.toml"));
        assert!(default_activity_log().ends_with("slh/activity.jsonl"));
    }
}
