//! Library-level runs: walker and orchestrator against a fake server.

mod support;

use std::sync::{Arc, Mutex};

use serde_json::json;
use sonic_mirror::catalog::CatalogError;
use sonic_mirror::download::{DownloadError, SanitizeRules};
use sonic_mirror::{
    CatalogSource, CatalogWalker, ContentSniffer, Credentials, DiscoveryError,
    DownloadOrchestrator, DownloadTask, Outcome, PathResolver, ProgressObserver, RunParameters,
    ShutdownSignal, SubsonicClient,
};
use support::fake_subsonic::{
    FLAC_BYTES, MP3_BYTES, album, mount_directory, mount_index, mount_ping, mount_small_catalog,
    mount_stream, mount_stream_status, track,
};
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use url::Url;

fn client_for(uri: &str) -> SubsonicClient {
    let base = Url::parse(uri).expect("mock uri");
    SubsonicClient::with_base_url(base, Credentials::new("alice", "sesame")).expect("client")
}

#[derive(Default)]
struct TitleLog(Mutex<Vec<String>>);

impl ProgressObserver for TitleLog {
    fn on_task_completed(&self, title: &str, outcome: &Outcome) {
        let marker = if outcome.is_failed() { " (failed)" } else { "" };
        let mut titles = self.0.lock().expect("lock");
        titles.push(format!("{title}{marker}"));
    }
}

#[tokio::test]
async fn test_discovery_then_download_mirrors_catalog() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_small_catalog(&server).await;
    mount_stream(&server, "s-1", "audio/mpeg", MP3_BYTES).await;
    mount_stream(&server, "s-2", "audio/mpeg", FLAC_BYTES).await;
    mount_stream_status(&server, "s-3", 502).await;

    let destination = TempDir::new().expect("destination");
    let resolver = PathResolver::new(SanitizeRules::Posix);
    let client = Arc::new(client_for(&server.uri()));
    client.ping().await.expect("ping");

    let songs = CatalogWalker::new(client.as_ref(), destination.path(), resolver, false)
        .discover()
        .await
        .expect("discovery");
    assert_eq!(songs.len(), 3);

    let tasks = DownloadTask::batch(songs, &Arc::new(RunParameters::default()));
    let engine = DownloadOrchestrator::new(
        2,
        destination.path(),
        resolver,
        Arc::new(ContentSniffer::new()),
    )
    .expect("engine");
    let log = Arc::new(TitleLog::default());
    let source: Arc<dyn CatalogSource> = client;
    let report = engine
        .run(
            source,
            tasks,
            Some(log.clone() as Arc<dyn ProgressObserver>),
            &ShutdownSignal::new(),
        )
        .await
        .expect("run");

    assert_eq!(report.total(), 3);
    assert_eq!(report.written(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.was_interrupted());

    let (failed, error) = report.failures().next().expect("one failure");
    assert_eq!(failed.song.title(), "Loose Track");
    assert!(matches!(
        error,
        DownloadError::Fetch {
            source: CatalogError::HttpStatus { status: 502, .. },
            ..
        }
    ));

    // Declared content type is ignored; the bytes decide.
    assert!(destination.path().join("A/B/E.flac").exists());
    assert!(destination.path().join("A/B/C-D.mp3").exists());

    let mut titles = log.0.lock().expect("lock").clone();
    titles.sort();
    assert_eq!(titles, vec!["C:D", "E", "Loose Track (failed)"]);
}

#[tokio::test]
async fn test_discovery_failure_stops_before_downloads() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ping(&server).await;
    mount_index(&server, &[("ar-1", "A"), ("ar-2", "Z")]).await;
    mount_directory(&server, "ar-1", json!([album("al-1", "B", "A")])).await;
    mount_directory(&server, "al-1", json!([track("s-1", "C", "A", Some("B"))])).await;
    // ar-2 has no mock: the server answers 404.

    let destination = TempDir::new().expect("destination");
    let client = client_for(&server.uri());
    let error = CatalogWalker::new(&client, destination.path(), PathResolver::default(), false)
        .discover()
        .await
        .expect_err("discovery must fail");

    match error {
        DiscoveryError::Remote { container, .. } => assert_eq!(container, "ar-2"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unreachable_server_reports_network_error() {
    let client = client_for("http://127.0.0.1:9/");
    let result = tokio_test::block_on(client.ping());
    assert!(matches!(result, Err(CatalogError::Network { .. })));
}
