//! A single song download: fetch, infer extension, resolve path, write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::catalog::{CatalogSource, SongEntry, StreamOptions};

use super::DownloadError;
use super::path::PathResolver;
use super::sniff::ContentSniffer;

/// Parameters shared by every task of a run.
#[derive(Debug, Clone, Default)]
pub struct RunParameters {
    /// Bitrate/format requested from the server.
    pub stream: StreamOptions,
    /// Extension applied to every file instead of sniffing.
    pub extension_override: Option<String>,
}

/// A song bound to the run parameters. Immutable once enqueued.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    song: SongEntry,
    params: Arc<RunParameters>,
}

impl DownloadTask {
    #[must_use]
    pub fn new(song: SongEntry, params: Arc<RunParameters>) -> Self {
        Self { song, params }
    }

    /// Binds every song of a work list to the same parameters.
    #[must_use]
    pub fn batch(songs: Vec<SongEntry>, params: &Arc<RunParameters>) -> Vec<Self> {
        songs
            .into_iter()
            .map(|song| Self::new(song, Arc::clone(params)))
            .collect()
    }

    #[must_use]
    pub fn song(&self) -> &SongEntry {
        &self.song
    }

    #[must_use]
    pub fn params(&self) -> &RunParameters {
        &self.params
    }
}

/// Result of one task.
#[derive(Debug)]
pub enum Outcome {
    /// The song was written.
    Written {
        /// Absolute path of the written file.
        path: PathBuf,
        /// Number of bytes written.
        bytes: u64,
    },
    /// The song could not be downloaded or written.
    Failed(DownloadError),
    /// The task never started, or was abandoned on a second interrupt.
    Cancelled,
}

impl Outcome {
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An outcome tagged with the song it belongs to.
#[derive(Debug)]
pub struct TaskOutcome {
    pub song: SongEntry,
    pub outcome: Outcome,
}

/// Shared, read-only services a task needs.
#[derive(Debug, Clone)]
pub(super) struct TaskContext {
    pub(super) root: PathBuf,
    pub(super) resolver: PathResolver,
    pub(super) sniffer: Arc<ContentSniffer>,
}

/// Downloads one song and writes it below `ctx.root`.
pub(super) async fn process_download_task(
    source: &dyn CatalogSource,
    task: &DownloadTask,
    ctx: &TaskContext,
) -> Outcome {
    match download_song(source, task, ctx).await {
        Ok((path, bytes)) => {
            debug!(path = %path.display(), bytes, "song written");
            Outcome::Written { path, bytes }
        }
        Err(error) => {
            warn!(song = task.song.title(), error = %error, "song download failed");
            Outcome::Failed(error)
        }
    }
}

async fn download_song(
    source: &dyn CatalogSource,
    task: &DownloadTask,
    ctx: &TaskContext,
) -> Result<(PathBuf, u64), DownloadError> {
    let song = task.song();
    let params = task.params();

    let payload = source
        .fetch_stream(song.id(), &params.stream)
        .await
        .map_err(|e| DownloadError::fetch(song.id(), e))?;

    let extension = ctx
        .sniffer
        .infer(&payload.bytes, params.extension_override.as_deref());
    if let Some(declared) = payload.declared_content_type.as_deref() {
        debug!(
            song = song.title(),
            declared,
            sniffed = ctx.sniffer.mime_type(&payload.bytes),
            extension = %extension,
            "content type resolved"
        );
    }

    let relative = ctx
        .resolver
        .song_path(song, &extension)
        .map_err(|e| DownloadError::path(song.id(), e))?;
    let path = ctx.root.join(relative);

    write_file(&path, &payload.bytes).await?;
    Ok((path, payload.bytes.len() as u64))
}

/// Writes `bytes` to `path`, replacing any file already there.
///
/// Data goes to a hidden `.<name>.part` sibling first and is renamed into
/// place once complete, so an aborted task never leaves a truncated file
/// under the final name.
async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    let partial = PartialFile::new(path);
    let mut file = fs::File::create(partial.path())
        .await
        .map_err(|e| DownloadError::io(partial.path(), e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| DownloadError::io(partial.path(), e))?;
    file.flush()
        .await
        .map_err(|e| DownloadError::io(partial.path(), e))?;
    drop(file);

    fs::rename(partial.path(), path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    partial.commit();
    Ok(())
}

/// Removes the partial file on drop unless committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(target: &Path) -> Self {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: target.with_file_name(format!(".{name}.part")),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
