//! File extension inference from downloaded bytes.
//!
//! The server's declared content type is ignored; the leading signature of
//! the payload decides. The mapping is deliberately narrow: `audio/mpeg`
//! becomes `mp3`, AAC-family types become `m4a`, and everything else
//! (including audio formats with their own well-known extensions) becomes
//! `flac`.

use std::sync::LazyLock;

use regex::Regex;

/// Extension used for anything that is neither MPEG nor AAC.
pub const FALLBACK_EXTENSION: &str = "flac";

/// MIME type reported for unrecognized signatures.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

#[allow(clippy::expect_used)]
static AAC_MIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^audio/(.*\W)?aac(\W.*)?$").expect("AAC mime regex is valid"));

/// Stateless content-type sniffer.
///
/// Construct once and share it (`Arc<ContentSniffer>`) with the download
/// engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl ContentSniffer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the extension for `bytes`, or `override_extension` verbatim
    /// when one is given (no inspection happens in that case).
    #[must_use]
    pub fn infer(&self, bytes: &[u8], override_extension: Option<&str>) -> String {
        match override_extension {
            Some(extension) => extension.to_string(),
            None => self.extension_for_mime(self.mime_type(bytes)).to_string(),
        }
    }

    /// Maps a MIME type onto the narrow extension set.
    #[must_use]
    pub fn extension_for_mime(&self, mime: &str) -> &'static str {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if mime == "audio/mpeg" {
            "mp3"
        } else if AAC_MIME_PATTERN.is_match(&mime) {
            "m4a"
        } else {
            FALLBACK_EXTENSION
        }
    }

    /// Identifies the MIME type of `bytes` from its leading signature.
    #[must_use]
    pub fn mime_type(&self, bytes: &[u8]) -> &'static str {
        if let Some(rest) = skip_id3v2(bytes) {
            // ID3v2 tags front MP3 files but occasionally FLAC/AAC as well.
            return match self.mime_type(rest) {
                UNKNOWN_MIME => "audio/mpeg",
                other => other,
            };
        }

        if bytes.starts_with(b"fLaC") {
            return "audio/flac";
        }
        if bytes.starts_with(b"OggS") {
            return "audio/ogg";
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return "audio/x-wav";
        }
        if bytes.len() >= 12
            && &bytes[0..4] == b"FORM"
            && matches!(&bytes[8..12], b"AIFF" | b"AIFC")
        {
            return "audio/x-aiff";
        }
        if bytes.starts_with(b"wvpk") {
            return "audio/x-wavpack";
        }
        if bytes.starts_with(b"MAC ") {
            return "audio/x-ape";
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return match &bytes[8..12] {
                b"M4A " | b"M4B " | b"M4P " => "audio/x-m4a",
                _ => "video/mp4",
            };
        }
        if bytes.starts_with(b"ADIF") {
            return "audio/x-hx-aac-adif";
        }
        if bytes.len() >= 2 && bytes[0] == 0xFF {
            let second = bytes[1];
            // ADTS: 12-bit sync, layer bits 00.
            if second & 0xF6 == 0xF0 {
                return "audio/x-hx-aac-adts";
            }
            // MPEG audio: 11-bit sync, non-reserved version and layer.
            if second & 0xE0 == 0xE0 && second & 0x18 != 0x08 && second & 0x06 != 0 {
                return "audio/mpeg";
            }
        }
        UNKNOWN_MIME
    }
}

/// Returns the bytes after a leading ID3v2 tag, if one is present.
fn skip_id3v2(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.len() < 10 || !bytes.starts_with(b"ID3") {
        return None;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    let end = 10usize.saturating_add(size).saturating_add(footer);
    Some(bytes.get(end..).unwrap_or(&[]))
}
