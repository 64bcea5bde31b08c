//! Update detection against scripted release feeds.

use crate::common::{ENGINE_FEED, PLUGIN_FEED, SERVER_EXE, TestHost};
use hostkeep_cli::fetch::HttpResponse;
use hostkeep_cli::models::ArtifactKind;
use hostkeep_cli::test_utils::zip_bytes;
use hostkeep_cli::updater::UpdateOutcome;

const ENGINE_ASSET_URL: &str = "https://github.test/download/SPT-4.0.1-a1b2c3.zip";

#[tokio::test]
async fn test_newer_engine_release_is_detected() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.publish(ENGINE_FEED, &[("v4.0.1", "SPT-4.0.1-a1b2c3.zip", ENGINE_ASSET_URL)]);

    let info = host.service().check_update(ArtifactKind::Engine).await;

    assert!(info.update_available);
    assert_eq!(info.current, "3.9.0");
    assert_eq!(info.latest, "4.0.1");
    assert_eq!(info.download_url.as_deref(), Some(ENGINE_ASSET_URL));
    assert_eq!(info.notes.as_deref(), Some("Release v4.0.1"));
}

#[tokio::test]
async fn test_same_or_older_release_is_not_an_update() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "4.0.1");
    host.publish(ENGINE_FEED, &[("v4.0.1", "SPT-4.0.1-a1b2c3.zip", ENGINE_ASSET_URL)]);
    assert!(!host.service().check_update(ArtifactKind::Engine).await.update_available);

    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "4.1.0");
    host.publish(ENGINE_FEED, &[("v4.0.1", "SPT-4.0.1-a1b2c3.zip", ENGINE_ASSET_URL)]);
    assert!(!host.service().check_update(ArtifactKind::Engine).await.update_available);
}

#[tokio::test]
async fn test_unreachable_feed_reports_no_update() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Plugin, "2.4.0");

    let info = host.service().check_update(ArtifactKind::Plugin).await;

    assert!(!info.update_available);
    assert_eq!(info.latest, "2.4.0");
    assert!(info.download_url.is_none());
    // Every attempt was made
    assert_eq!(host.transport.calls_to(PLUGIN_FEED), 3);
}

#[tokio::test]
async fn test_auth_denied_is_not_retried() {
    let host = TestHost::new();
    host.transport.respond(ENGINE_FEED, HttpResponse::status(403));

    let service = host.service();

    assert!(!service.check_update(ArtifactKind::Engine).await.update_available);
    assert_eq!(host.transport.calls_to(ENGINE_FEED), 1);

    // A configured token that is refused fails the same way
    host.transport.set_credentials(true);
    assert!(!service.check_update(ArtifactKind::Engine).await.update_available);
    assert_eq!(host.transport.calls_to(ENGINE_FEED), 2);
}

#[tokio::test]
async fn test_malformed_feed_reports_no_update() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.transport.respond(ENGINE_FEED, HttpResponse::ok("<html>rate limit page</html>"));

    let info = host.service().check_update(ArtifactKind::Engine).await;
    assert!(!info.update_available);
    assert_eq!(info.latest, "3.9.0");
}

#[tokio::test]
async fn test_release_without_archive_reports_no_update() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.publish(ENGINE_FEED, &[("v4.0.1", "checksums.txt", "https://github.test/checksums.txt")]);

    assert!(!host.service().check_update(ArtifactKind::Engine).await.update_available);
}

#[tokio::test]
async fn test_checks_are_cached_between_calls() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.publish(ENGINE_FEED, &[("v4.0.1", "SPT-4.0.1-a1b2c3.zip", ENGINE_ASSET_URL)]);
    let service = host.service();

    let first = service.check_update(ArtifactKind::Engine).await;
    let second = service.check_update(ArtifactKind::Engine).await;

    assert_eq!(first, second);
    assert_eq!(host.transport.calls_to(ENGINE_FEED), 1);
    assert_eq!(service.last_check(ArtifactKind::Engine), Some(second));
}

#[tokio::test]
async fn test_update_from_feed_then_recheck_refetches() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.publish(ENGINE_FEED, &[("v4.0.1", "SPT-4.0.1-a1b2c3.zip", ENGINE_ASSET_URL)]);
    host.transport.serve_download(
        ENGINE_ASSET_URL,
        zip_bytes(&[(SERVER_EXE, "#!/bin/sh\n# 4.0.1\n"), ("SPT_Data/version.txt", "4.0.1")]),
    );
    let service = host.service();

    assert!(service.check_update(ArtifactKind::Engine).await.update_available);
    let outcome = service.perform_update(ArtifactKind::Engine, None).await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Succeeded {
            version: "4.0.1".to_string()
        }
    );

    // The feed entry was invalidated by the update
    let info = service.check_update(ArtifactKind::Engine).await;
    assert_eq!(host.transport.calls_to(ENGINE_FEED), 2);
    assert!(!info.update_available);
    assert_eq!(info.current, "4.0.1");
}

#[tokio::test]
async fn test_engine_and_plugin_checked_independently() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.set_installed(ArtifactKind::Plugin, "2.4.0");
    host.publish(ENGINE_FEED, &[("v3.9.0", "SPT-3.9.0-ffff.zip", "https://github.test/e.zip")]);
    host.publish(
        PLUGIN_FEED,
        &[
            ("v2.5.0", "Fika.Server.Release.2.5.0.zip", "https://github.test/p250.zip"),
            ("v2.4.0", "Fika.Server.Release.2.4.0.zip", "https://github.test/p240.zip"),
        ],
    );
    let service = host.service();

    assert!(!service.check_update(ArtifactKind::Engine).await.update_available);
    let plugin = service.check_update(ArtifactKind::Plugin).await;
    assert!(plugin.update_available);
    assert_eq!(plugin.download_url.as_deref(), Some("https://github.test/p250.zip"));
}
