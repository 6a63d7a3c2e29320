use kiln_launcher_lib::error::AppError;
use kiln_launcher_lib::integrations::mrpack::{determine_loader, read_index};
use kiln_launcher_lib::state::instance_state::ModLoader;
use kiln_launcher_lib::utils::file_utils::{extract_zip_subtree, sanitize_archive_path};
use std::io::Write;
use std::path::PathBuf;
use zip::write::SimpleFileOptions;

const INDEX_JSON: &str = r#"{
    "formatVersion": 1,
    "game": "minecraft",
    "versionId": "5.14.0",
    "name": "Fabulously Optimized",
    "summary": "Performance pack",
    "files": [
        {
            "path": "mods/sodium.jar",
            "hashes": {"sha1": "3f786850e387550fdab836ed7e6dc881de23001b"},
            "env": {"client": "required", "server": "unsupported"},
            "downloads": ["https://cdn.modrinth.com/data/AANobbMI/sodium.jar"],
            "fileSize": 2
        }
    ],
    "dependencies": {"minecraft": "1.20.4", "fabric-loader": "0.15.11"}
}"#;

fn build_pack(entries: &[(&str, &[u8])]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pack.mrpack");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    (dir, path)
}

#[tokio::test]
async fn parses_index_and_detects_fabric() {
    let (_dir, pack) = build_pack(&[("modrinth.index.json", INDEX_JSON.as_bytes())]);

    let index = read_index(pack).await.unwrap();
    assert_eq!(index.name, "Fabulously Optimized");
    assert_eq!(index.dependencies["minecraft"], "1.20.4");
    assert_eq!(index.files.len(), 1);
    assert!(index.files[0].client_supported());

    let (loader, version) = determine_loader(&index.dependencies).unwrap();
    assert_eq!(loader, ModLoader::Fabric);
    assert_eq!(version.as_deref(), Some("0.15.11"));
}

#[tokio::test]
async fn overrides_extract_with_client_overrides_winning() {
    let (_dir, pack) = build_pack(&[
        ("modrinth.index.json", INDEX_JSON.as_bytes()),
        ("overrides/config/options.txt", b"fov:70"),
        ("overrides/config/shared.txt", b"base"),
        ("client-overrides/config/options.txt", b"fov:90"),
    ]);

    let dest = tempfile::tempdir().unwrap();
    let game_dir = dest.path().to_path_buf();

    // Same order as the installer: overrides first, client-overrides on top.
    extract_zip_subtree(pack.clone(), "overrides".to_string(), game_dir.clone())
        .await
        .unwrap();
    extract_zip_subtree(pack, "client-overrides".to_string(), game_dir.clone())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(game_dir.join("config/options.txt")).unwrap(),
        b"fov:90"
    );
    assert_eq!(
        std::fs::read(game_dir.join("config/shared.txt")).unwrap(),
        b"base"
    );
}

#[tokio::test]
async fn traversal_entries_in_overrides_are_rejected() {
    let (_dir, pack) = build_pack(&[
        ("modrinth.index.json", INDEX_JSON.as_bytes()),
        ("overrides/../outside.txt", b"escape"),
    ]);

    let dest = tempfile::tempdir().unwrap();
    let result = extract_zip_subtree(
        pack,
        "overrides".to_string(),
        dest.path().to_path_buf(),
    )
    .await;

    match result {
        Err(AppError::PathTraversal(_)) => {}
        other => panic!("expected PathTraversal, got {:?}", other.map(|_| ())),
    }
    assert!(!dest.path().join("outside.txt").exists());
    assert!(!dest.path().parent().unwrap().join("outside.txt").exists());
}

#[test]
fn manifest_file_paths_are_validated_before_writing() {
    assert!(sanitize_archive_path("mods/lithium.jar").is_some());
    assert!(sanitize_archive_path("resourcepacks/pack.zip").is_some());
    assert!(sanitize_archive_path("../../../home/user/.bashrc").is_none());
    assert!(sanitize_archive_path("mods/../../escape.jar").is_none());
}
