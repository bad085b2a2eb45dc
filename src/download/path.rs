//! Sanitized, deterministic local paths for artists, albums and songs.
//!
//! The invalid-character rule set is chosen once at startup
//! ([`SanitizeRules::for_target`]) and injected into [`PathResolver`]; no
//! per-call platform branching happens afterwards.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::SongEntry;

/// Character substituted for every filesystem-invalid character.
pub const SUBSTITUTE: char = '-';

/// Errors from path resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// A song leaf was requested without an extension.
    #[error("song `{song}` requires an extension to form a file name")]
    MissingExtension {
        /// The song title.
        song: String,
    },
}

/// Invalid-character rule set for a filesystem convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeRules {
    /// Windows reserves `/ \ < > : " | ? *` and NUL.
    Windows,
    /// Unix-like systems: path separators and colon.
    Posix,
}

impl SanitizeRules {
    /// Selects the rule set for the platform this binary was compiled for.
    #[must_use]
    pub fn for_target() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Returns true if `c` may not appear in a path segment.
    #[must_use]
    pub fn is_invalid(self, c: char) -> bool {
        match self {
            Self::Windows => matches!(
                c,
                '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0'
            ),
            Self::Posix => matches!(c, '/' | '\\' | ':'),
        }
    }

    /// Replaces every invalid character in `value` with [`SUBSTITUTE`].
    #[must_use]
    pub fn sanitize(self, value: &str) -> String {
        value
            .chars()
            .map(|c| if self.is_invalid(c) { SUBSTITUTE } else { c })
            .collect()
    }
}

/// Maps catalog names to relative filesystem paths.
///
/// Pure: identical inputs always give identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResolver {
    rules: SanitizeRules,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(SanitizeRules::for_target())
    }
}

impl PathResolver {
    /// Creates a resolver with an explicit rule set.
    #[must_use]
    pub fn new(rules: SanitizeRules) -> Self {
        Self { rules }
    }

    /// Returns the injected rule set.
    #[must_use]
    pub fn rules(&self) -> SanitizeRules {
        self.rules
    }

    /// Sanitizes a single path segment.
    #[must_use]
    pub fn sanitize(&self, value: &str) -> String {
        self.rules.sanitize(value)
    }

    /// Sanitizes a title for a file placed directly at the destination root.
    ///
    /// Besides the invalid characters, whitespace runs collapse into one
    /// [`SUBSTITUTE`] so `Loose Track` becomes `Loose-Track`.
    #[must_use]
    pub fn flat_name(&self, title: &str) -> String {
        let sanitized = self.sanitize(title);
        let mut out = String::with_capacity(sanitized.len());
        let mut in_space = false;
        for c in sanitized.chars() {
            if c.is_whitespace() {
                if !in_space {
                    out.push(SUBSTITUTE);
                }
                in_space = true;
            } else {
                out.push(c);
                in_space = false;
            }
        }
        out
    }

    /// Sanitizes a directory or stem segment, neutralizing `.`/`..` and empty
    /// names so no segment can climb out of the destination.
    fn segment(&self, value: &str) -> String {
        neutralize_dots(self.sanitize(value))
    }

    fn flat_stem(&self, title: &str) -> String {
        neutralize_dots(self.flat_name(title))
    }

    /// Resolves `artist[/album][/song.extension]`.
    ///
    /// Each present segment is sanitized independently. Album and song are
    /// independent of each other, so callers may ask for an artist-only or
    /// artist+album directory. A song needs an extension.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::MissingExtension`] when `song` is given without
    /// `extension`.
    pub fn resolve(
        &self,
        artist: &str,
        album: Option<&str>,
        song: Option<&str>,
        extension: Option<&str>,
    ) -> Result<PathBuf, PathError> {
        let mut path = self.directory(artist, album);
        if let Some(song) = song {
            let extension = extension.ok_or_else(|| PathError::MissingExtension {
                song: song.to_string(),
            })?;
            path.push(format!("{}.{extension}", self.segment(song)));
        }
        Ok(path)
    }

    /// Resolves an artist or artist/album directory.
    #[must_use]
    pub fn directory(&self, artist: &str, album: Option<&str>) -> PathBuf {
        let mut path = PathBuf::from(self.segment(artist));
        if let Some(album) = album {
            path.push(self.segment(album));
        }
        path
    }

    /// Resolves the final write path of `song` with `extension`.
    ///
    /// Songs without artist metadata are placed flat at the destination
    /// root; they never carry an album.
    ///
    /// # Errors
    ///
    /// Propagates [`PathError`] from [`Self::resolve`].
    pub fn song_path(&self, song: &SongEntry, extension: &str) -> Result<PathBuf, PathError> {
        match song.artist() {
            Some(artist) => self.resolve(artist, song.album(), Some(song.title()), Some(extension)),
            None => Ok(PathBuf::from(format!("{}.{extension}", self.flat_stem(song.title())))),
        }
    }

    /// Splits the probe target for `song` into (parent directory, file stem).
    ///
    /// The stem is what precedes the `.extension` of the file the song would
    /// be written to; the skip filter treats the extension as a wildcard.
    #[must_use]
    pub fn probe_target(&self, song: &SongEntry) -> (PathBuf, String) {
        match song.artist() {
            Some(artist) => (
                self.directory(artist, song.album()),
                self.segment(song.title()),
            ),
            None => (PathBuf::new(), self.flat_stem(song.title())),
        }
    }
}

fn neutralize_dots(segment: String) -> String {
    if segment.is_empty() || segment.chars().all(|c| c == '.') {
        SUBSTITUTE.to_string().repeat(segment.len().max(1))
    } else {
        segment
    }
}
