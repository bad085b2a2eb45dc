//! Already-downloaded detection.
//!
//! A song counts as present when any file named `<stem>.<anything>` exists
//! where the song would be written. Only the name is checked; a truncated
//! file with a matching name still counts as downloaded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::catalog::SongEntry;

use super::path::PathResolver;

/// Decides whether a catalog song already has a local file.
#[derive(Debug, Clone)]
pub struct SkipFilter {
    root: PathBuf,
    resolver: PathResolver,
    force: bool,
}

impl SkipFilter {
    /// Creates a filter probing under `root`. With `force` set, nothing is
    /// ever reported as present.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, resolver: PathResolver, force: bool) -> Self {
        Self {
            root: root.into(),
            resolver,
            force,
        }
    }

    /// Returns true if a file for `song` exists with any extension.
    #[must_use]
    pub fn exists(&self, song: &SongEntry) -> bool {
        if self.force {
            return false;
        }
        let (dir, stem) = self.resolver.probe_target(song);
        has_file_with_stem(&self.root.join(dir), &stem)
    }
}

/// Wildcard probe for `dir/stem.*`.
///
/// A missing or unreadable directory means no match. Symlinks count when
/// they resolve to a regular file.
fn has_file_with_stem(dir: &Path, stem: &str) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    let prefix = format!("{stem}.");
    entries.flatten().any(|entry| {
        let name = entry.file_name();
        let matched = name.to_str().is_some_and(|n| n.starts_with(&prefix))
            && fs::metadata(entry.path()).is_ok_and(|m| m.is_file());
        if matched {
            trace!(file = ?name, "found existing file");
        }
        matched
    })
}
