use std::path::{Path, PathBuf};

use exercise_core::config::CONFIG_FILE_NAME;

/// Resolve which config file to read.
///
/// Priority:
/// 1. `--config` flag / `EXERCISE_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `exercise.yaml`
/// 3. None: built-in defaults
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    find_upward(&cwd)
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
