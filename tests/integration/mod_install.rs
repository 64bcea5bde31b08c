//! Mod packages: layout normalization, idempotent reinstall, uninstall sweep
//! and catalog installs.

use crate::common::{CATALOG, TestHost};
use hostkeep_cli::core::HostError;
use hostkeep_cli::fetch::HttpResponse;
use hostkeep_cli::test_utils::{snapshot_tree, zip_bytes};

const PACKAGE_URL: &str = "https://forge.test/files/my-mod-1.2.0.zip";

fn client_plugin_package() -> Vec<u8> {
    zip_bytes(&[
        ("BepInEx/plugins/MyMod/MyMod.dll", "dll"),
        ("BepInEx/plugins/MyMod/assets/icon.png", "png"),
    ])
}

#[tokio::test]
async fn test_client_plugin_lands_in_slug_directory() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, client_plugin_package());
    let service = host.service();

    assert!(!service.is_mod_installed("my-mod"));
    let report = service.install_mod(PACKAGE_URL, "my-mod").await.unwrap();

    let plugins = host.runtime().join("BepInEx/plugins");
    let entries: Vec<String> = std::fs::read_dir(&plugins)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["my-mod".to_string()]);
    assert_eq!(host.read_runtime("BepInEx/plugins/my-mod/MyMod.dll"), "dll");
    assert_eq!(host.read_runtime("BepInEx/plugins/my-mod/assets/icon.png"), "png");
    assert_eq!(report.directories, vec![plugins.join("my-mod")]);
    assert_eq!(report.verbatim_files, 0);
    assert!(service.is_mod_installed("my-mod"));
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_server_and_client_parts_with_wrapper_directory() {
    let host = TestHost::new();
    host.transport.serve_download(
        PACKAGE_URL,
        zip_bytes(&[
            ("MyMod-1.2.0/user/mods/MyModServer/package.json", r#"{"name": "mymod"}"#),
            ("MyMod-1.2.0/BepInEx/plugins/MyModClient.dll", "client"),
            ("MyMod-1.2.0/BepInEx/patchers/MyModPatcher.dll", "patcher"),
        ]),
    );

    let report = host.service().install_mod(PACKAGE_URL, "my-mod").await.unwrap();

    assert_eq!(host.read_runtime("user/mods/my-mod/package.json"), r#"{"name": "mymod"}"#);
    assert_eq!(host.read_runtime("BepInEx/plugins/my-mod/MyModClient.dll"), "client");
    // Outside the recognized roots files keep their path
    assert_eq!(host.read_runtime("BepInEx/patchers/MyModPatcher.dll"), "patcher");
    assert_eq!(report.directories.len(), 2);
    assert_eq!(report.verbatim_files, 1);
    // Other mods are untouched
    assert!(host.runtime().join("user/mods/existing-mod/package.json").is_file());
}

#[tokio::test]
async fn test_reinstall_is_idempotent() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, client_plugin_package());
    let service = host.service();

    service.install_mod(PACKAGE_URL, "my-mod").await.unwrap();
    let once = snapshot_tree(&host.runtime());
    service.install_mod(PACKAGE_URL, "my-mod").await.unwrap();

    assert_eq!(snapshot_tree(&host.runtime()), once);
}

#[tokio::test]
async fn test_reinstall_drops_files_from_previous_version() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, client_plugin_package());
    let service = host.service();
    service.install_mod(PACKAGE_URL, "my-mod").await.unwrap();

    let newer = "https://forge.test/files/my-mod-1.3.0.zip";
    host.transport.serve_download(newer, zip_bytes(&[("BepInEx/plugins/MyMod/MyMod.dll", "v2")]));
    service.install_mod(newer, "my-mod").await.unwrap();

    assert_eq!(host.read_runtime("BepInEx/plugins/my-mod/MyMod.dll"), "v2");
    assert!(!host.runtime().join("BepInEx/plugins/my-mod/assets").exists());
}

#[tokio::test]
async fn test_uninstall_removes_directories_and_config() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, client_plugin_package());
    host.write_runtime("BepInEx/config/com.author.mymod.cfg", "[General]\nOwner = My-Mod\n");
    host.write_runtime("BepInEx/config/by-id.cfg", "source = 4821\n");
    host.write_runtime("BepInEx/config/other.cfg", "[General]\nOwner = someone-else\n");
    let service = host.service();
    service.install_mod(PACKAGE_URL, "my-mod").await.unwrap();

    assert!(service.uninstall_mod("my-mod", Some("4821")).await.unwrap());

    assert!(!service.is_mod_installed("my-mod"));
    assert!(!host.runtime().join("BepInEx/plugins/my-mod").exists());
    assert!(!host.runtime().join("BepInEx/config/com.author.mymod.cfg").exists());
    assert!(!host.runtime().join("BepInEx/config/by-id.cfg").exists());
    assert!(host.runtime().join("BepInEx/config/other.cfg").exists());

    // Nothing left to remove
    assert!(!service.uninstall_mod("my-mod", None).await.unwrap());
}

#[tokio::test]
async fn test_install_rejects_bad_slug_and_empty_package() {
    let host = TestHost::new();
    let service = host.service();

    let err = service.install_mod(PACKAGE_URL, "../escape").await.unwrap_err();
    assert!(matches!(err, HostError::InvalidSlug { .. }), "{err}");

    host.transport.serve_download(PACKAGE_URL, Vec::new());
    let before = snapshot_tree(&host.runtime());
    let err = service.install_mod(PACKAGE_URL, "my-mod").await.unwrap_err();
    assert!(matches!(err, HostError::ValidationFailed { .. }), "{err}");
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_corrupt_package_leaves_tree_untouched() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, b"not a zip file".to_vec());
    let before = snapshot_tree(&host.runtime());

    let err = host.service().install_mod(PACKAGE_URL, "my-mod").await.unwrap_err();

    assert!(matches!(err, HostError::ArchiveError { .. }), "{err}");
    assert_eq!(snapshot_tree(&host.runtime()), before);
}

#[tokio::test]
async fn test_package_without_files_is_rejected() {
    let host = TestHost::new();
    host.transport.serve_download(PACKAGE_URL, zip_bytes(&[("BepInEx/plugins/MyMod/", "")]));
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let err = service.install_mod(PACKAGE_URL, "my-mod").await.unwrap_err();

    assert!(matches!(err, HostError::ArchiveError { .. }), "{err}");
    assert!(!service.is_mod_installed("my-mod"));
    assert_eq!(snapshot_tree(&host.runtime()), before);
}

#[tokio::test]
async fn test_colliding_package_folders_leave_tree_untouched() {
    let host = TestHost::new();
    host.transport.serve_download(
        PACKAGE_URL,
        zip_bytes(&[
            ("BepInEx/plugins/A/settings.json", "a"),
            ("BepInEx/plugins/B/settings.json", "b"),
        ]),
    );
    let before = snapshot_tree(&host.runtime());
    let service = host.service();

    let err = service.install_mod(PACKAGE_URL, "my-mod").await.unwrap_err();

    assert!(matches!(err, HostError::ArchiveError { .. }), "{err}");
    assert!(!service.is_mod_installed("my-mod"));
    assert_eq!(snapshot_tree(&host.runtime()), before);
    assert_eq!(host.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_install_by_catalog_id() {
    let host = TestHost::new();
    host.transport.respond(
        &format!("{CATALOG}/mods/4821"),
        HttpResponse::ok(r#"{"data": {"id": 4821, "name": "My Mod"}}"#),
    );
    host.transport.respond(
        &format!("{CATALOG}/mods/4821/versions?page=1"),
        HttpResponse::ok(
            r#"{"data": [{"version": "1.0.0", "link": "https://forge.test/files/my-mod-1.0.0.zip"}], "meta": {"last_page": 2}}"#,
        ),
    );
    host.transport.respond(
        &format!("{CATALOG}/mods/4821/versions?page=2"),
        HttpResponse::ok(format!(
            r#"{{"data": [{{"version": "1.1.0", "link": "https://forge.test/files/my-mod-1.1.0.zip"}}, {{"version": "1.2.0", "link": "{PACKAGE_URL}"}}], "meta": {{"last_page": 2}}}}"#
        )),
    );
    host.transport.serve_download(PACKAGE_URL, client_plugin_package());
    let service = host.service();

    let (package, report) = service.install_mod_by_id("4821").await.unwrap();

    assert_eq!(package.version, "1.2.0");
    assert_eq!(package.install_slug, "my-mod");
    assert_eq!(report.slug, "my-mod");
    assert!(service.is_mod_installed("my-mod"));
}

#[tokio::test]
async fn test_unknown_catalog_id_is_an_error() {
    let host = TestHost::new();
    let err = host.service().install_mod_by_id("9999").await.unwrap_err();
    assert!(matches!(err, HostError::ValidationFailed { .. }), "{err}");
}
