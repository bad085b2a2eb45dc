//! Wiremock fixtures that answer like an OpenSubsonic server.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// MPEG audio frame header; sniffs as `audio/mpeg`.
pub const MP3_BYTES: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00];

/// `fLaC` stream marker.
pub const FLAC_BYTES: &[u8] = b"fLaC\x00\x00\x00\x22";

pub fn ok_envelope(body: Value) -> Value {
    let mut response = json!({ "status": "ok", "version": "1.16.1" });
    if let (Some(target), Some(extra)) = (response.as_object_mut(), body.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    json!({ "subsonic-response": response })
}

pub fn failed_envelope(code: i32, message: &str) -> Value {
    json!({
        "subsonic-response": {
            "status": "failed",
            "version": "1.16.1",
            "error": { "code": code, "message": message }
        }
    })
}

pub async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(json!({}))))
        .mount(server)
        .await;
}

pub async fn mount_ping_rejected(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(failed_envelope(40, "Wrong username or password")),
        )
        .mount(server)
        .await;
}

/// `artists` is a list of `(id, name)` pairs in one index group.
pub async fn mount_index(server: &MockServer, artists: &[(&str, &str)]) {
    let artist: Vec<Value> = artists
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    let body = if artist.is_empty() {
        json!({ "indexes": { "lastModified": 0 } })
    } else {
        json!({ "indexes": { "index": [ { "name": "A", "artist": artist } ] } })
    };
    Mock::given(method("GET"))
        .and(path("/rest/getIndexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(body)))
        .mount(server)
        .await;
}

pub async fn mount_directory(server: &MockServer, id: &str, children: Value) {
    let body = json!({ "directory": { "id": id, "name": id, "child": children } });
    Mock::given(method("GET"))
        .and(path("/rest/getMusicDirectory"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(body)))
        .mount(server)
        .await;
}

pub async fn mount_stream(server: &MockServer, id: &str, content_type: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/rest/stream"))
        .and(query_param("id", id))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_bytes(bytes.to_vec()),
        )
        .mount(server)
        .await;
}

pub async fn mount_stream_status(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/rest/stream"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn album(id: &str, title: &str, artist: &str) -> Value {
    json!({ "id": id, "title": title, "isDir": true, "artist": artist })
}

pub fn track(id: &str, title: &str, artist: &str, album: Option<&str>) -> Value {
    let mut item = json!({ "id": id, "title": title, "isDir": false, "artist": artist });
    if let (Some(album), Some(object)) = (album, item.as_object_mut()) {
        object.insert("album".into(), json!(album));
    }
    item
}

/// A song without artist metadata; it lands flat at the destination root.
pub fn untagged_track(id: &str, title: &str) -> Value {
    json!({ "id": id, "title": title, "isDir": false })
}

/// One artist `A` with album `B` holding `C:D` and `E`, plus an untagged
/// `Loose Track` listed directly under the artist.
pub async fn mount_small_catalog(server: &MockServer) {
    mount_ping(server).await;
    mount_index(server, &[("ar-1", "A")]).await;
    mount_directory(
        server,
        "ar-1",
        json!([
            album("al-1", "B", "A"),
            untagged_track("s-3", "Loose Track"),
        ]),
    )
    .await;
    mount_directory(
        server,
        "al-1",
        json!([
            track("s-1", "C:D", "A", Some("B")),
            track("s-2", "E", "A", Some("B")),
        ]),
    )
    .await;
}
