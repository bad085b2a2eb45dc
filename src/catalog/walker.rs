//! Sequential traversal of artist → album → song into a flat work list.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::download::{PathResolver, SkipFilter};

use super::{AlbumEntry, ArtistEntry, CatalogSource, DiscoveryError, SongEntry};

/// Walks the remote catalog and builds the list of songs to download.
///
/// Artist and album directories are created as they are visited, so the
/// tree exists even for albums whose songs are all skipped.
pub struct CatalogWalker<'a> {
    source: &'a dyn CatalogSource,
    root: PathBuf,
    resolver: PathResolver,
    skip: SkipFilter,
}

/// Tracks what has already been emitted so two tasks never share a file.
#[derive(Default)]
struct WorkList {
    songs: Vec<SongEntry>,
    ids: HashSet<String>,
    targets: HashSet<(PathBuf, String)>,
    present: usize,
}

impl<'a> CatalogWalker<'a> {
    /// Creates a walker writing directories below `root`. With `force` set,
    /// songs already on disk are emitted again.
    pub fn new(
        source: &'a dyn CatalogSource,
        root: impl Into<PathBuf>,
        resolver: PathResolver,
        force: bool,
    ) -> Self {
        let root = root.into();
        Self {
            source,
            skip: SkipFilter::new(root.clone(), resolver, force),
            root,
            resolver,
        }
    }

    /// Traverses the whole catalog and returns the songs still to download,
    /// in traversal order.
    ///
    /// # Errors
    ///
    /// Any remote failure aborts discovery with [`DiscoveryError::Remote`];
    /// a directory that cannot be created gives [`DiscoveryError::Io`].
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn discover(&self) -> Result<Vec<SongEntry>, DiscoveryError> {
        let artists = self
            .source
            .catalog_index()
            .await
            .map_err(|e| DiscoveryError::remote("index", e))?;

        if artists.is_empty() {
            warn!("server returned no artists");
            return Ok(Vec::new());
        }
        debug!(artists = artists.len(), "fetched catalog index");

        let mut work = WorkList::default();
        for artist in &artists {
            self.walk_artist(artist, &mut work).await?;
        }

        info!(
            songs = work.songs.len(),
            already_present = work.present, "discovery complete"
        );
        Ok(work.songs)
    }

    async fn walk_artist(
        &self,
        artist: &ArtistEntry,
        work: &mut WorkList,
    ) -> Result<(), DiscoveryError> {
        self.ensure_dir(self.resolver.directory(&artist.name, None))
            .await?;

        let children = self
            .source
            .children(&artist.id)
            .await
            .map_err(|e| DiscoveryError::remote(&artist.id, e))?;

        for child in children {
            if child.is_dir {
                let album = AlbumEntry {
                    id: child.id,
                    title: child.title,
                    artist: artist.name.clone(),
                };
                self.walk_album(&album, work).await?;
            } else {
                debug!(artist = %artist.name, song = %child.title, "song directly under artist");
                self.consider(child.into_song(), work);
            }
        }
        Ok(())
    }

    async fn walk_album(
        &self,
        album: &AlbumEntry,
        work: &mut WorkList,
    ) -> Result<(), DiscoveryError> {
        self.ensure_dir(self.resolver.directory(&album.artist, Some(&album.title)))
            .await?;

        let children = self
            .source
            .children(&album.id)
            .await
            .map_err(|e| DiscoveryError::remote(&album.id, e))?;

        for child in children {
            if child.is_dir {
                debug!(album = %album.title, dir = %child.title, "skipping nested directory");
                continue;
            }
            self.consider(child.into_song(), work);
        }
        Ok(())
    }

    fn consider(&self, song: SongEntry, work: &mut WorkList) {
        if !work.ids.insert(song.id().to_string()) {
            warn!(
                song_id = song.id(),
                title = song.title(), "duplicate song id in catalog, ignoring"
            );
            return;
        }
        if !work.targets.insert(self.resolver.probe_target(&song)) {
            warn!(
                song_id = song.id(),
                title = song.title(), "another song maps to the same file, ignoring"
            );
            return;
        }
        if self.skip.exists(&song) {
            debug!(title = song.title(), "already downloaded");
            work.present += 1;
            return;
        }
        work.songs.push(song);
    }

    async fn ensure_dir(&self, relative: PathBuf) -> Result<(), DiscoveryError> {
        let dir = self.root.join(relative);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DiscoveryError::io(dir, e))
    }
}
