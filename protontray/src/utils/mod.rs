pub mod command;
pub mod privilege;
pub mod tracing;

use std::env;
use std::path::{Path, PathBuf};

/// Expands a leading `~/` to the user's home directory.
///
/// Paths without the shortcut, or without `HOME` set, are returned unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_untouched() {
        let path = Path::new("/etc/protontray/config.toml");
        assert_eq!(expand_path(path), path);
    }

    #[test]
    fn home_shortcut_is_expanded() {
        let Ok(home) = env::var("HOME") else {
            return;
        };
        assert_eq!(
            expand_path(Path::new("~/.pvpn-cli/serverinfo.json")),
            Path::new(&home).join(".pvpn-cli/serverinfo.json")
        );
    }
}
