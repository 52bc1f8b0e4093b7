pub mod subprocess;

use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory. Paths without the
/// prefix (and `~user` forms) pass through untouched.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}
