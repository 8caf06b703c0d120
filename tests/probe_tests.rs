//! Probe command behaviour.

use image_relay::probe::{probe, ProbeError};
use image_relay::upstream::FetchError;

mod common;
use common::{image, start_upstream, status};

#[tokio::test]
async fn reports_every_attempt_until_success() {
    let upstream = start_upstream(|target| match target {
        "/u/icon.png" => image("image/png", b"\x89PNG"),
        _ => status("404 Not Found"),
    })
    .await;

    let report = probe(&upstream.config(), "icon", None).await.unwrap();

    let targets: Vec<_> = report.attempts.iter().map(|a| a.target.as_str()).collect();
    assert_eq!(targets, vec!["/u/icon.webp", "/u/icon.png"]);
    assert!(matches!(
        report.attempts[0].result,
        Err(FetchError::NonSuccessStatus(404))
    ));

    let found = report.success().unwrap();
    assert_eq!(found.candidate.as_str(), "icon.png");
    assert_eq!(found.result.as_ref().unwrap(), &("image/png".to_string(), 4));
}

#[tokio::test]
async fn writes_body_to_output_file() {
    let upstream = start_upstream(|_| image("image/jpeg", b"JFIFDATA")).await;
    let dir = std::env::temp_dir().join(format!("image-relay-probe-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("photo.jpg");

    let report = probe(&upstream.config(), "photo", Some(&out)).await.unwrap();

    assert!(report.success().is_some());
    assert_eq!(std::fs::read(&out).unwrap(), b"JFIFDATA");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn reports_failure_when_no_candidate_succeeds() {
    let upstream = start_upstream(|_| status("500 Internal Server Error")).await;

    let report = probe(&upstream.config(), "gone", None).await.unwrap();

    assert_eq!(report.attempts.len(), 3);
    assert!(report.success().is_none());
}

#[tokio::test]
async fn invalid_identifier_is_an_error() {
    let upstream = start_upstream(|_| image("image/png", b"x")).await;

    let err = probe(&upstream.config(), "../etc/passwd", None).await.unwrap_err();

    assert!(matches!(err, ProbeError::InvalidIdentifier(_)));
    assert!(upstream.targets().is_empty());
}
