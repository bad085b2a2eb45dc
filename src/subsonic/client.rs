//! HTTP client for the OpenSubsonic REST API.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use crate::catalog::{
    ArtistEntry, CatalogChild, CatalogError, CatalogSource, StreamOptions, StreamPayload,
};
use crate::credentials::Credentials;
use crate::server::ServerLocation;

use super::response::{Envelope, ResponseBody};

/// REST API version announced to the server.
pub const API_VERSION: &str = "1.16.1";

/// Client name announced to the server.
pub const CLIENT_NAME: &str = "sonic-mirror";

/// HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP request timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

const SALT_LEN: usize = 12;

/// OpenSubsonic client with token authentication.
///
/// Wraps a single pooled [`reqwest::Client`]; clone it or share it behind an
/// `Arc` across download workers.
#[derive(Debug, Clone)]
pub struct SubsonicClient {
    client: Client,
    base: Url,
    credentials: Credentials,
}

impl SubsonicClient {
    /// Creates a client for the server at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] if the location does not form a
    /// valid URL and [`CatalogError::ClientBuild`] if the HTTP client cannot
    /// be built.
    pub fn new(location: &ServerLocation, credentials: Credentials) -> Result<Self, CatalogError> {
        let base = location.base_url().map_err(|source| CatalogError::InvalidUrl {
            endpoint: location.to_string(),
            source,
        })?;
        Self::with_base_url(base, credentials)
    }

    /// Creates a client rooted at an explicit base URL. Requests go to
    /// `<base>/rest/<endpoint>`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ClientBuild`] if the HTTP client cannot be
    /// built.
    pub fn with_base_url(mut base: Url, credentials: Credentials) -> Result<Self, CatalogError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .user_agent(user_agent())
            .build()
            .map_err(|source| CatalogError::ClientBuild { source })?;

        debug!(base = %base, user = credentials.user(), "created subsonic client");
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    /// Checks connectivity and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the server is unreachable or rejects the
    /// credentials.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), CatalogError> {
        self.get_json("ping", &[]).await.map(|_| ())
    }

    /// Builds `rest/<endpoint>` with authentication and `params`.
    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let mut url = self
            .base
            .join(&format!("rest/{endpoint}"))
            .map_err(|source| CatalogError::InvalidUrl {
                endpoint: rest_name(endpoint),
                source,
            })?;

        let salt = new_salt();
        let token = auth_token(self.credentials.password(), &salt);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("u", self.credentials.user())
                .append_pair("t", &token)
                .append_pair("s", &salt)
                .append_pair("v", API_VERSION)
                .append_pair("c", CLIENT_NAME)
                .append_pair("f", "json");
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, CatalogError> {
        let name = rest_name(endpoint);
        let url = self.endpoint_url(endpoint, params)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::network(&name, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::http_status(name, status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<ResponseBody, CatalogError> {
        let name = rest_name(endpoint);
        let bytes = self
            .send(endpoint, params)
            .await?
            .bytes()
            .await
            .map_err(|e| CatalogError::network(&name, e.without_url()))?;
        decode_envelope(&name, &bytes)
    }
}

#[async_trait]
impl CatalogSource for SubsonicClient {
    #[instrument(skip(self))]
    async fn catalog_index(&self) -> Result<Vec<ArtistEntry>, CatalogError> {
        Ok(self.get_json("getIndexes", &[]).await?.into_artists())
    }

    #[instrument(skip(self))]
    async fn children(&self, container_id: &str) -> Result<Vec<CatalogChild>, CatalogError> {
        self.get_json("getMusicDirectory", &[("id", container_id)])
            .await?
            .into_children(&rest_name("getMusicDirectory"))
    }

    #[instrument(skip(self, options))]
    async fn fetch_stream(
        &self,
        song_id: &str,
        options: &StreamOptions,
    ) -> Result<StreamPayload, CatalogError> {
        let name = rest_name("stream");
        let bitrate = options.bitrate.filter(|b| *b > 0).map(|b| b.to_string());
        let mut params = vec![("id", song_id)];
        if let Some(bitrate) = bitrate.as_deref() {
            params.push(("maxBitRate", bitrate));
        }
        if let Some(format) = options.format.as_deref() {
            params.push(("format", format));
        }

        let response = self.send("stream", &params).await?;
        let declared_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(&name, e.without_url()))?;

        // Errors on the stream endpoint come back as a 200 with an API envelope.
        if let Some(content_type) = declared_content_type.as_deref() {
            if content_type.contains("json") {
                decode_envelope(&name, &bytes)?;
                return Err(CatalogError::decode(name, "expected audio, got an API response"));
            }
            if content_type.contains("xml") {
                return Err(CatalogError::decode(name, "expected audio, got an XML document"));
            }
        }

        debug!(song_id, bytes = bytes.len(), "stream received");
        Ok(StreamPayload {
            bytes: bytes.to_vec(),
            declared_content_type,
        })
    }
}

fn decode_envelope(endpoint: &str, bytes: &[u8]) -> Result<ResponseBody, CatalogError> {
    serde_json::from_slice::<Envelope>(bytes)
        .map_err(|e| CatalogError::decode(endpoint, e.to_string()))?
        .into_body(endpoint)
}

fn rest_name(endpoint: &str) -> String {
    format!("rest/{endpoint}")
}

fn user_agent() -> String {
    format!("{CLIENT_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

fn new_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// `md5(password + salt)` as lowercase hex.
fn auth_token(password: &str, salt: &str) -> String {
    format!("{:x}", md5::compute(format!("{password}{salt}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> SubsonicClient {
        SubsonicClient::with_base_url(
            Url::parse(&server.uri()).unwrap(),
            Credentials::new("alice", "sesame"),
        )
        .unwrap()
    }

    fn ok(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            format!(r#"{{"subsonic-response":{{"status":"ok","version":"1.16.1"{body}}}}}"#),
            "application/json",
        )
    }

    fn failed(code: u32, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "subsonic-response": {
                "status": "failed",
                "version": "1.16.1",
                "error": { "code": code, "message": message }
            }
        }))
    }

    #[test]
    fn test_auth_token_is_md5_of_password_and_salt() {
        // Example from the Subsonic API documentation.
        assert_eq!(
            auth_token("sesame", "c19b2d"),
            "26719a1196d2a940705a59634eb18eab"
        );
    }

    #[test]
    fn test_salt_is_fresh_alphanumeric() {
        let a = new_salt();
        let b = new_salt();
        assert_eq!(a.len(), SALT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_endpoint_url_carries_auth_parameters() {
        let client = SubsonicClient::with_base_url(
            Url::parse("http://music.local:4533/navidrome").unwrap(),
            Credentials::new("alice", "sesame"),
        )
        .unwrap();
        let url = client.endpoint_url("getIndexes", &[("id", "7")]).unwrap();

        assert_eq!(url.path(), "/navidrome/rest/getIndexes");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("u"), Some("alice"));
        assert_eq!(get("v"), Some(API_VERSION));
        assert_eq!(get("c"), Some(CLIENT_NAME));
        assert_eq!(get("f"), Some("json"));
        assert_eq!(get("id"), Some("7"));
        let expected = auth_token("sesame", get("s").unwrap());
        assert_eq!(get("t"), Some(expected.as_str()));
        assert!(!url.as_str().contains("sesame"));
    }

    #[tokio::test]
    async fn test_ping_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/ping"))
            .respond_with(failed(40, "Wrong username or password"))
            .mount(&server)
            .await;

        let error = client(&server).ping().await.unwrap_err();
        assert!(matches!(error, CatalogError::Api { code: 40, .. }));
    }

    #[tokio::test]
    async fn test_catalog_index_and_children() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getIndexes"))
            .respond_with(ok(
                r#","indexes":{"index":[{"name":"A","artist":[{"id":"ar-1","name":"A"}]}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(path("/rest/getMusicDirectory"))
            .and(query_param("id", "ar-1"))
            .respond_with(ok(
                r#","directory":{"id":"ar-1","child":[{"id":"al-1","isDir":true,"title":"B"}]}"#,
            ))
            .mount(&server)
            .await;

        let client = client(&server);
        let artists = client.catalog_index().await.unwrap();
        assert_eq!(artists.len(), 1);
        let children = client.children(&artists[0].id).await.unwrap();
        assert_eq!(children[0].id, "al-1");
        assert!(children[0].is_dir);
    }

    #[tokio::test]
    async fn test_fetch_stream_sends_options_and_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/stream"))
            .and(query_param("id", "s-1"))
            .and(query_param("maxBitRate", "320"))
            .and(query_param("format", "mp3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xFB, 0x90, 0x64], "audio/mpeg"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let options = StreamOptions {
            bitrate: Some(320),
            format: Some("mp3".to_string()),
        };
        let payload = client(&server).fetch_stream("s-1", &options).await.unwrap();
        assert_eq!(payload.bytes, vec![0xFF, 0xFB, 0x90, 0x64]);
        assert_eq!(payload.declared_content_type.as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn test_zero_bitrate_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/stream"))
            .and(query_param_is_missing("maxBitRate"))
            .and(query_param_is_missing("format"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"fLaC".to_vec(), "audio/flac"))
            .expect(1)
            .mount(&server)
            .await;

        let options = StreamOptions {
            bitrate: Some(0),
            format: None,
        };
        client(&server).fetch_stream("s-1", &options).await.unwrap();
    }

    #[tokio::test]
    async fn test_stream_error_envelope_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/stream"))
            .respond_with(failed(70, "not found"))
            .mount(&server)
            .await;

        let error = client(&server)
            .fetch_stream("missing", &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, CatalogError::Api { code: 70, .. }));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/stream"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = client(&server)
            .fetch_stream("s-1", &StreamOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, CatalogError::HttpStatus { status: 503, .. }));
    }
}
