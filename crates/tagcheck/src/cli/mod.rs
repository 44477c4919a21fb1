//! Command implementations.

pub mod audit;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod metrics;

use std::path::PathBuf;

/// Expand `~` in a user-supplied path.
pub(crate) fn expand_path(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Fail early with a hint when an input file or directory is missing.
pub(crate) fn require_exists(path: &std::path::Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            path
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn expand_path_leaves_plain_paths_alone() {
        assert_eq!(expand_path(Path::new("data/eval.csv")), PathBuf::from("data/eval.csv"));
    }

    #[test]
    fn require_exists_reports_path() {
        let err = require_exists(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("here.csv"));
    }
}
