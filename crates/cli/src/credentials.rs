//! Store credential lookup: process environment first, then a dotfile.

use std::path::Path;

use tasks::WorkerError;
use tracing::debug;

/// Returns the API token from `TODOIST_API_TOKEN`, falling back to the same
/// key in `env_file`. A missing dotfile is not an error on its own.
pub fn load_token(env_file: &Path) -> Result<String, WorkerError> {
    let key = todoist::TOKEN_ENV;
    if let Some(token) = std::env::var(key).ok().filter(|t| !t.trim().is_empty()) {
        return Ok(token);
    }
    if let Some(token) = from_dotfile(env_file, key)? {
        return Ok(token);
    }
    Err(WorkerError::configuration(format!(
        "{key} not set. Add it to {} or export it.",
        env_file.display()
    )))
}

/// Value of the last non-blank `key` assignment in `env_file`, or `None` when
/// the file does not exist or never sets it.
///
/// The process environment is left untouched.
pub fn from_dotfile(env_file: &Path, key: &str) -> Result<Option<String>, WorkerError> {
    let entries = match dotenvy::from_path_iter(env_file) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => {
            return Err(WorkerError::configuration(format!(
                "cannot read {}: {e}",
                env_file.display()
            )))
        }
    };
    debug!(path = %env_file.display(), "Reading credentials from dotfile");

    let mut found = None;
    for entry in entries {
        let (name, value) = entry.map_err(|e| {
            WorkerError::configuration(format!("cannot parse {}: {e}", env_file.display()))
        })?;
        if name == key {
            found = Some(value);
        }
    }
    Ok(found.filter(|v| !v.trim().is_empty()))
}
