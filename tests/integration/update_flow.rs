//! Update sessions end to end: success, every failure class, and rollback.

use crate::common::{SERVER_EXE, TestHost};
use hostkeep_cli::core::HostError;
use hostkeep_cli::models::ArtifactKind;
use hostkeep_cli::test_utils::{FixedDiskSpace, snapshot_tree, zip_bytes};
use hostkeep_cli::updater::{MaintenanceFlag, UpdateOutcome, UpdateStage};

const ENGINE_URL: &str = "https://dl.test/SPT-4.0.1-abc123.zip";
const PLUGIN_URL: &str = "https://dl.test/Fika.Server.Release.2.5.0.zip";
const FIKA_CONFIG: &str = "user/mods/fika-server/assets/configs/fika.jsonc";

fn engine_archive() -> Vec<u8> {
    zip_bytes(&[
        (SERVER_EXE, "#!/bin/sh\n# 4.0.1\n"),
        ("SPT_Data/Server/database/globals.json", r#"{"version": "4.0.1"}"#),
        ("config/server.json", r#"{"port": 6969}"#),
    ])
}

fn plugin_archive() -> Vec<u8> {
    zip_bytes(&[
        ("user/mods/fika-server/package.json", r#"{"version": "2.5.0"}"#),
        (FIKA_CONFIG, r#"{"friendlyFire": false}"#),
        ("BepInEx/plugins/Fika.Core.dll", "dll"),
    ])
}

fn assert_failed(outcome: &UpdateOutcome, stage: UpdateStage, rolled_back: bool) {
    match outcome {
        UpdateOutcome::Failed {
            stage: actual,
            rolled_back: actual_rolled_back,
            ..
        } => {
            assert_eq!(*actual, stage, "wrong failing stage: {outcome}");
            assert_eq!(*actual_rolled_back, rolled_back, "wrong rollback flag: {outcome}");
        }
        other => panic!("expected failure at {stage}, got {other}"),
    }
}

#[tokio::test]
async fn test_engine_update_succeeds_and_restarts() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.start_server();
    host.transport.serve_download(ENGINE_URL, engine_archive());
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Succeeded {
            version: "4.0.1".to_string()
        }
    );
    assert_eq!(host.read_runtime(SERVER_EXE), "#!/bin/sh\n# 4.0.1\n");
    assert!(host.runtime().join("SPT_Data/Server/database/globals.json").is_file());
    // Overlay install leaves unrelated files alone
    assert!(host.runtime().join("user/mods/existing-mod/package.json").is_file());

    let status = service.server_status().await;
    assert_eq!(status.installed_version, "4.0.1");
    assert!(status.is_running);
    assert!(!status.maintenance);
    assert_eq!(host.processes.spawn_count(), 1);
    assert!(host.processes.terminate_count() >= 1);
    // The old process is gone, the new one is up
    assert_eq!(host.processes.running_count(), 1);

    assert_eq!(
        std::fs::read_to_string(host.config.version_file(ArtifactKind::Engine)).unwrap(),
        "4.0.1\n"
    );
    assert!(!host.config.maintenance_flag_path().exists());
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_disk_space_failure_touches_nothing() {
    let mut host = TestHost::new();
    host.disk = FixedDiskSpace(Some(1024));
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.start_server();
    host.transport.serve_download(ENGINE_URL, engine_archive());
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::DiskSpaceCheck, false);
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert_eq!(service.server_status().await.installed_version, "3.9.0");
    assert!(host.transport.calls().is_empty());
    assert_eq!(host.processes.terminate_count(), 0);
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_unknown_free_space_proceeds() {
    let mut host = TestHost::new();
    host.disk = FixedDiskSpace(None);
    host.transport.serve_download(ENGINE_URL, engine_archive());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();
    assert!(outcome.is_success(), "{outcome}");
}

#[tokio::test]
async fn test_truncated_download_rolls_back() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.start_server();
    host.transport.serve_download(ENGINE_URL, b"PK".to_vec());
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::ValidateDownload, true);
    assert_eq!(snapshot_tree(&host.runtime()), before);
    let status = service.server_status().await;
    assert_eq!(status.installed_version, "3.9.0");
    // The previous server comes back up
    assert!(status.is_running);
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_download_error_rolls_back() {
    let host = TestHost::new();
    host.transport.fail_download(ENGINE_URL, 404);
    let before = snapshot_tree(&host.runtime());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::Download, true);
    assert_eq!(snapshot_tree(&host.runtime()), before);
}

#[tokio::test]
async fn test_corrupt_archive_fails_at_extract() {
    let host = TestHost::new();
    host.transport.serve_download(ENGINE_URL, b"definitely not a zip archive".to_vec());
    let before = snapshot_tree(&host.runtime());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::Extract, true);
    assert_eq!(snapshot_tree(&host.runtime()), before);
}

#[tokio::test]
async fn test_plugin_without_markers_restores_exact_tree() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Plugin, "2.4.0");
    host.transport.serve_download(
        PLUGIN_URL,
        zip_bytes(&[("readme.txt", "this archive is not the plugin"), ("junk/data.bin", "x")]),
    );
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Plugin, Some(PLUGIN_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::ValidateInstall, true);
    // Files added by the overlay are gone again
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert!(!host.runtime().join("readme.txt").exists());
    assert_eq!(service.server_status().await.plugin_version, "2.4.0");
}

#[tokio::test]
async fn test_plugin_update_keeps_operator_config() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Plugin, "2.4.0");
    host.write_runtime(FIKA_CONFIG, r#"{"friendlyFire": true}"#);
    host.transport.serve_download(PLUGIN_URL, plugin_archive());

    let outcome =
        host.service().perform_update(ArtifactKind::Plugin, Some(PLUGIN_URL)).await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Succeeded {
            version: "2.5.0".to_string()
        }
    );
    assert_eq!(host.read_runtime(FIKA_CONFIG), r#"{"friendlyFire": true}"#);
    assert_eq!(host.read_runtime(&format!("{FIKA_CONFIG}.new")), r#"{"friendlyFire": false}"#);
    assert_eq!(host.read_runtime("BepInEx/plugins/Fika.Core.dll"), "dll");
}

#[tokio::test]
async fn test_stop_failure_aborts_before_download() {
    let host = TestHost::new();
    host.start_server();
    host.processes.ignore_terminate(true);
    host.processes.ignore_kill(true);
    host.transport.serve_download(ENGINE_URL, engine_archive());
    let before = snapshot_tree(&host.runtime());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::Stop, false);
    assert!(host.transport.calls().is_empty());
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert!(host.processes.kill_count() >= 1);
}

#[tokio::test]
async fn test_restart_failure_rolls_back() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.processes.fail_spawn(true);
    host.transport.serve_download(ENGINE_URL, engine_archive());
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::Restart, true);
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert_eq!(service.server_status().await.installed_version, "3.9.0");
    // One start for the new version, one for the restored one
    assert_eq!(host.processes.spawn_count(), 2);
}

#[tokio::test]
async fn test_server_exiting_after_start_counts_as_restart_failure() {
    let host = TestHost::new();
    host.processes.exit_on_spawn(true);
    host.transport.serve_download(ENGINE_URL, engine_archive());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_eq!(outcome.failed_stage(), Some(UpdateStage::Restart));
}

#[tokio::test]
async fn test_first_install_without_runtime_tree() {
    let host = TestHost::new();
    std::fs::remove_dir_all(host.runtime()).unwrap();
    host.transport.serve_download(ENGINE_URL, engine_archive());

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert!(outcome.is_success(), "{outcome}");
    assert!(host.runtime().join(SERVER_EXE).is_file());
}

#[tokio::test]
async fn test_first_install_failure_cannot_roll_back() {
    let host = TestHost::new();
    std::fs::remove_dir_all(host.runtime()).unwrap();
    host.transport.fail_download(ENGINE_URL, 500);

    let outcome =
        host.service().perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    assert_failed(&outcome, UpdateStage::Download, false);
}

#[tokio::test]
async fn test_update_without_url_or_release_is_rejected() {
    let host = TestHost::new();
    // Feed unreachable: no asset to fall back on
    let err = host.service().perform_update(ArtifactKind::Engine, None).await.unwrap_err();
    assert!(matches!(err, HostError::ValidationFailed { .. }), "{err}");
}

#[tokio::test]
async fn test_status_reports_held_maintenance_flag() {
    let host = TestHost::new();
    let service = host.service();
    assert!(!service.server_status().await.maintenance);

    let flag = MaintenanceFlag::raise(&host.config.maintenance_flag_path(), ArtifactKind::Plugin)
        .await
        .unwrap();
    assert!(service.server_status().await.maintenance);
    let info = MaintenanceFlag::read(flag.path()).unwrap();
    assert_eq!(info.kind, ArtifactKind::Plugin);

    drop(flag);
    assert!(!service.server_status().await.maintenance);
    assert!(!host.config.maintenance_flag_path().exists());
}

#[tokio::test]
async fn test_failed_restore_keeps_session_for_operator() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.start_server();
    host.transport.fail_download(ENGINE_URL, 500);
    // The download lands in the session directory next to the backup
    host.transport.on_download(ENGINE_URL, |dest| {
        let backup = dest.parent().unwrap().join("backup");
        std::fs::remove_dir_all(backup).unwrap();
    });
    let service = host.service();

    let outcome = service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)).await.unwrap();

    match &outcome {
        UpdateOutcome::RollbackFailed {
            stage,
            rollback_error,
            ..
        } => {
            assert_eq!(*stage, UpdateStage::Download);
            assert!(rollback_error.contains("No backup found"), "{rollback_error}");
        }
        other => panic!("expected a failed rollback, got {other}"),
    }
    assert!(outcome.requires_operator());
    // The session directory stays for manual recovery
    assert_eq!(host.leftover_scratch(), 1);
    assert!(!host.config.maintenance_flag_path().exists());
    assert!(!service.server_status().await.maintenance);
}

#[tokio::test]
async fn test_second_session_is_rejected_while_one_runs() {
    let host = TestHost::new();
    host.set_installed(ArtifactKind::Engine, "3.9.0");
    host.transport.serve_download(ENGINE_URL, engine_archive());
    let service = host.service();

    let (first, second) = tokio::join!(
        service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)),
        service.perform_update(ArtifactKind::Engine, Some(ENGINE_URL)),
    );

    let (finished, rejected) = match (first, second) {
        (Ok(outcome), Err(err)) | (Err(err), Ok(outcome)) => (outcome, err),
        (first, second) => panic!("expected one session to be rejected: {first:?} / {second:?}"),
    };
    assert!(finished.is_success(), "{finished}");
    assert!(matches!(rejected, HostError::UpdateInProgress), "{rejected}");
    assert_eq!(host.transport.calls_to(ENGINE_URL), 1);
}
