//! Remote catalog model and traversal.
//!
//! The remote service is consumed through the [`CatalogSource`] trait; the
//! OpenSubsonic implementation lives in [`crate::subsonic`]. Traversal into a
//! flat work list is done by [`CatalogWalker`].

mod error;
mod walker;

pub use error::{CatalogError, DiscoveryError};
pub use walker::CatalogWalker;

use async_trait::async_trait;

/// Top-level artist from the catalog index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistEntry {
    pub id: String,
    pub name: String,
}

/// Album under an artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumEntry {
    pub id: String,
    pub title: String,
    /// Display name of the parent artist.
    pub artist: String,
}

/// A song to mirror.
///
/// A song without artist metadata never carries an album: it is placed flat
/// at the destination root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongEntry {
    id: String,
    title: String,
    artist: Option<String>,
    album: Option<String>,
}

impl SongEntry {
    /// Creates a song entry, dropping the album when the artist is absent.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: Option<String>,
        album: Option<String>,
    ) -> Self {
        let artist = artist.filter(|a| !a.is_empty());
        let album = if artist.is_some() {
            album.filter(|a| !a.is_empty())
        } else {
            None
        };
        Self {
            id: id.into(),
            title: title.into(),
            artist,
            album,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }
}

/// One entry of a directory listing: an album (`is_dir`) or a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogChild {
    pub id: String,
    pub title: String,
    pub is_dir: bool,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl CatalogChild {
    /// Converts a song child into a [`SongEntry`].
    #[must_use]
    pub fn into_song(self) -> SongEntry {
        SongEntry::new(self.id, self.title, self.artist, self.album)
    }
}

/// Transcoding parameters sent with every stream request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Target bitrate in kbps; `None` or `Some(0)` means no limit.
    pub bitrate: Option<u32>,
    /// Target format (`mp3`, `flac`, `aac`, `raw`, ...); `None` lets the
    /// server decide.
    pub format: Option<String>,
}

/// Raw song bytes as returned by the server.
#[derive(Debug, Clone)]
pub struct StreamPayload {
    pub bytes: Vec<u8>,
    /// Content type the server declared. Informational only: the file
    /// extension is derived from the bytes.
    pub declared_content_type: Option<String>,
}

/// Read-only access to a remote music catalog.
///
/// Implementations must be safe to share across concurrent download workers.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Returns every artist in the catalog index.
    async fn catalog_index(&self) -> Result<Vec<ArtistEntry>, CatalogError>;

    /// Lists the children (albums or songs) of a container.
    async fn children(&self, container_id: &str) -> Result<Vec<CatalogChild>, CatalogError>;

    /// Fetches the audio bytes of a song.
    async fn fetch_stream(
        &self,
        song_id: &str,
        options: &StreamOptions,
    ) -> Result<StreamPayload, CatalogError>;
}
