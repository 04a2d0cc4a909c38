//! Integration tests for image download candidate handling

use mapgen_client::{Error, MapApiClient, MapMetadata};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn metadata_with_urls(server: &MockServer) -> MapMetadata {
    MapMetadata {
        id: "abc123".into(),
        seed: 42,
        size: 3500,
        download_url: Some(format!("{}/download", server.uri())),
        image_url: Some(format!("{}/image", server.uri())),
        raw_image_url: Some(format!("{}/raw", server.uri())),
        thumbnail_url: Some(format!("{}/thumb", server.uri())),
        ..MapMetadata::default()
    }
}

#[tokio::test]
async fn first_successful_candidate_wins() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"png-bytes".to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    // Lower-priority candidates must never be attempted.
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = MapApiClient::new("test-key").unwrap();
    let metadata = metadata_with_urls(&server);

    let image = client
        .download_image(&metadata, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(&image.bytes[..], b"png-bytes");
    assert_eq!(image.extension, "png");
    assert_eq!(image.mime, "image/png");
    assert_eq!(image.source_url, format!("{}/image", server.uri()));
}

#[tokio::test]
async fn unknown_content_type_defaults_to_jpg() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"bytes".to_vec(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let client = MapApiClient::new("test-key").unwrap();
    let metadata = MapMetadata {
        id: "abc123".into(),
        seed: 42,
        size: 3500,
        download_url: Some(format!("{}/download", server.uri())),
        ..MapMetadata::default()
    };

    let image = client
        .download_image(&metadata, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(image.extension, "jpg");
}

#[tokio::test]
async fn all_candidates_failing_aggregates_the_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = MapApiClient::new("test-key").unwrap();
    let metadata = metadata_with_urls(&server);

    let err = client
        .download_image(&metadata, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::ImageFetch {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("/thumb"), "last error was: {last_error}");
        }
        other => panic!("expected ImageFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn metadata_without_urls_fails_without_requests() {
    let client = MapApiClient::new("test-key").unwrap();
    let metadata = MapMetadata {
        id: "abc123".into(),
        seed: 42,
        size: 3500,
        ..MapMetadata::default()
    };

    let err = client
        .download_image(&metadata, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ImageFetch { attempts: 0, .. }));
}

#[tokio::test]
async fn cancellation_preempts_remaining_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = MapApiClient::new("test-key").unwrap();
    let metadata = metadata_with_urls(&server);

    let err = client.download_image(&metadata, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
