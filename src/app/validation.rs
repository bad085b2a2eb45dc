use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Returns the absolute destination path, failing unless it is an existing
/// directory. The destination is never created.
pub(crate) fn ensure_destination_dir(destination: &Path) -> Result<PathBuf> {
    if !destination.is_dir() {
        bail!(
            "destination folder does not exist: {}\n  \
             Create it first, then run again.",
            destination.display()
        );
    }
    std::path::absolute(destination)
        .with_context(|| format!("unable to resolve destination {}", destination.display()))
}
