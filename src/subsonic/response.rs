//! JSON shapes of the OpenSubsonic `subsonic-response` envelope.
//!
//! Only the fields the mirror needs are modeled; everything else is ignored.

use serde::{Deserialize, Deserializer};

use crate::catalog::{ArtistEntry, CatalogChild, CatalogError};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(rename = "subsonic-response")]
    response: ResponseBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseBody {
    status: String,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    indexes: Option<Indexes>,
    #[serde(default)]
    directory: Option<Directory>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct Indexes {
    #[serde(default)]
    index: Vec<IndexGroup>,
}

#[derive(Debug, Deserialize)]
struct IndexGroup {
    #[serde(default)]
    artist: Vec<ArtistItem>,
}

#[derive(Debug, Deserialize)]
struct ArtistItem {
    #[serde(deserialize_with = "lenient_id")]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Directory {
    #[serde(default)]
    child: Vec<ChildItem>,
}

#[derive(Debug, Deserialize)]
struct ChildItem {
    #[serde(deserialize_with = "lenient_id")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "isDir")]
    is_dir: bool,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
}

impl Envelope {
    /// Unwraps the body, turning a `failed` status into [`CatalogError::Api`].
    pub(crate) fn into_body(self, endpoint: &str) -> Result<ResponseBody, CatalogError> {
        let body = self.response;
        if body.status == "ok" {
            return Ok(body);
        }
        let (code, message) = body.error.map_or_else(
            || (0, format!("status {}", body.status)),
            |e| (e.code, e.message),
        );
        Err(CatalogError::api(endpoint, code, message))
    }
}

impl ResponseBody {
    /// Flattens the index groups into one artist list. A missing `indexes`
    /// element means an empty catalog.
    pub(crate) fn into_artists(self) -> Vec<ArtistEntry> {
        self.indexes
            .unwrap_or_default()
            .index
            .into_iter()
            .flat_map(|group| group.artist)
            .map(|a| ArtistEntry {
                id: a.id,
                name: a.name,
            })
            .collect()
    }

    pub(crate) fn into_children(self, endpoint: &str) -> Result<Vec<CatalogChild>, CatalogError> {
        let directory = self
            .directory
            .ok_or_else(|| CatalogError::decode(endpoint, "response has no directory element"))?;
        Ok(directory
            .child
            .into_iter()
            .map(ChildItem::into_child)
            .collect())
    }
}

impl ChildItem {
    fn into_child(self) -> CatalogChild {
        // Directory entries sometimes only carry `name` or `album`.
        let title = self
            .title
            .or(self.name)
            .or_else(|| self.album.clone())
            .unwrap_or_default();
        CatalogChild {
            id: self.id,
            title,
            is_dir: self.is_dir,
            artist: self.artist,
            album: self.album,
        }
    }
}

/// Accepts ids encoded as either JSON strings or numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_failed_status_maps_to_api_error() {
        let envelope = parse(
            r#"{"subsonic-response":{"status":"failed","version":"1.16.1",
                "error":{"code":40,"message":"Wrong username or password"}}}"#,
        );
        let error = envelope.into_body("rest/ping").unwrap_err();
        assert!(matches!(error, CatalogError::Api { code: 40, .. }));
    }

    #[test]
    fn test_indexes_flatten_and_accept_numeric_ids() {
        let body = parse(
            r#"{"subsonic-response":{"status":"ok","indexes":{"index":[
                {"name":"A","artist":[{"id":"ar-1","name":"Alpha"}]},
                {"name":"B","artist":[{"id":42,"name":"Beta"}]}]}}}"#,
        )
        .into_body("rest/getIndexes")
        .unwrap();

        let artists = body.into_artists();
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[1].id, "42");
        assert_eq!(artists[1].name, "Beta");
    }

    #[test]
    fn test_missing_indexes_is_empty_catalog() {
        let body = parse(r#"{"subsonic-response":{"status":"ok"}}"#)
            .into_body("rest/getIndexes")
            .unwrap();
        assert!(body.into_artists().is_empty());
    }

    #[test]
    fn test_directory_children() {
        let body = parse(
            r#"{"subsonic-response":{"status":"ok","directory":{"id":"ar-1","name":"A","child":[
                {"id":"al-1","isDir":true,"title":"B","artist":"A"},
                {"id":"s-1","isDir":false,"title":"C/D","artist":"A","album":"B",
                 "suffix":"mp3"}]}}}"#,
        )
        .into_body("rest/getMusicDirectory")
        .unwrap();

        let children = body.into_children("rest/getMusicDirectory").unwrap();
        assert!(children[0].is_dir);
        assert_eq!(children[0].title, "B");
        assert_eq!(children[1].album.as_deref(), Some("B"));
    }

    #[test]
    fn test_directory_child_falls_back_to_album_name() {
        let body = parse(
            r#"{"subsonic-response":{"status":"ok","directory":{"child":[
                {"id":"al-1","isDir":true,"album":"Only Album"}]}}}"#,
        )
        .into_body("rest/getMusicDirectory")
        .unwrap();
        assert_eq!(
            body.into_children("rest/getMusicDirectory").unwrap()[0].title,
            "Only Album"
        );
    }

    #[test]
    fn test_missing_directory_is_decode_error() {
        let body = parse(r#"{"subsonic-response":{"status":"ok"}}"#)
            .into_body("rest/getMusicDirectory")
            .unwrap();
        assert!(matches!(
            body.into_children("rest/getMusicDirectory"),
            Err(CatalogError::Decode { .. })
        ));
    }
}
