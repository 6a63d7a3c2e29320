use crate::error::{AppError, Result};
use crate::integrations::modrinth;
use crate::minecraft::installer;
use crate::minecraft::modloader;
use crate::state::event_state::LoaderInstalledPayload;
use crate::state::instance_state::{InstanceState, ModLoader};
use crate::state::State;
use crate::utils::download_utils::{DownloadConfig, DownloadUtils};
use crate::utils::{file_utils, path_utils};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use uuid::Uuid;

pub const MINECRAFT_DEPENDENCY: &str = "minecraft";
pub const FABRIC_LOADER_DEPENDENCY: &str = "fabric-loader";
pub const QUILT_LOADER_DEPENDENCY: &str = "quilt-loader";
pub const FORGE_DEPENDENCY: &str = "forge";
pub const NEOFORGE_DEPENDENCY: &str = "neoforge";

/// `modrinth.index.json` inside a `.mrpack` archive.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModrinthIndex {
    pub format_version: u32,
    pub game: String,
    pub version_id: String,
    pub name: String,
    pub summary: Option<String>,
    pub files: Vec<ModrinthIndexFile>,
    pub dependencies: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModrinthIndexFile {
    /// Target path below the instance's game directory.
    pub path: String,
    pub hashes: HashMap<String, String>,
    pub env: Option<HashMap<String, String>>,
    pub downloads: Vec<String>,
    pub file_size: u64,
}

impl ModrinthIndexFile {
    /// `env.client == "unsupported"` entries are skipped on install.
    pub fn client_supported(&self) -> bool {
        self.env
            .as_ref()
            .and_then(|env| env.get("client"))
            .map(|support| support != "unsupported")
            .unwrap_or(true)
    }
}

/// Loader requirement derived from the manifest dependencies.
pub fn determine_loader(
    dependencies: &HashMap<String, String>,
) -> Option<(ModLoader, Option<String>)> {
    if let Some(version) = dependencies.get(FABRIC_LOADER_DEPENDENCY) {
        Some((ModLoader::Fabric, Some(version.clone())))
    } else if let Some(version) = dependencies.get(QUILT_LOADER_DEPENDENCY) {
        Some((ModLoader::Quilt, Some(version.clone())))
    } else if let Some(version) = dependencies.get(FORGE_DEPENDENCY) {
        Some((ModLoader::Forge, Some(version.clone())))
    } else if let Some(version) = dependencies.get(NEOFORGE_DEPENDENCY) {
        Some((ModLoader::NeoForge, Some(version.clone())))
    } else {
        None
    }
}

/// Reads and parses `modrinth.index.json` out of a pack archive.
pub async fn read_index(pack_path: PathBuf) -> Result<ModrinthIndex> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&pack_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = archive
            .by_name("modrinth.index.json")
            .map_err(|_| AppError::MrpackError("missing modrinth.index.json".to_string()))?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::MrpackError(format!("invalid modrinth.index.json: {}", e)))
    })
    .await?
}

/// Installs a Modrinth modpack version as a brand-new instance and returns
/// its id.
pub async fn install_modpack(name: &str, version_id: &str) -> Result<Uuid> {
    let state = State::get().await?;
    let version = modrinth::get_version(version_id).await?;

    let pack_file = version
        .files
        .iter()
        .find(|f| f.filename.to_lowercase().ends_with(".mrpack"))
        .ok_or_else(|| {
            AppError::MrpackError(format!("version {} ships no .mrpack file", version_id))
        })?;

    // Keep the archive outside the instance so a failed install never
    // leaves a stray pack file behind.
    let staging = tempfile::tempdir()?;
    let pack_path = staging.path().join(&pack_file.filename);
    let mut config = DownloadConfig::new().with_size(pack_file.size);
    if let Some(sha1) = &pack_file.hashes.sha1 {
        config = config.with_sha1(sha1);
    }
    DownloadUtils::download_file(&pack_file.url, &pack_path, config).await?;

    let index = read_index(pack_path.clone()).await?;
    let mc_version = index
        .dependencies
        .get(MINECRAFT_DEPENDENCY)
        .cloned()
        .ok_or_else(|| {
            AppError::MrpackError("manifest declares no minecraft dependency".to_string())
        })?;

    let instance = state
        .instance_manager
        .create(name, &mc_version, Some(mc_version.clone()))
        .await?;
    let instance_id = instance.id;
    info!(
        "Installing modpack '{}' ({} files) as instance {}",
        index.name,
        index.files.len(),
        instance_id
    );

    let loader_info = determine_loader(&index.dependencies);
    if let Some((loader, _)) = &loader_info {
        state
            .event_state
            .emit_modpack_loader_detected(loader.as_str());
    }

    let result = installer::run_exclusive(
        instance_id,
        apply_modpack(instance_id, mc_version, index, pack_path, loader_info),
    )
    .await;

    match result {
        Ok(()) => Ok(instance_id),
        Err(e) => {
            if let Ok(updated) = state
                .instance_manager
                .set_state(instance_id, InstanceState::Error)
                .await
            {
                state.event_state.emit_instance_state(&updated);
            }
            Err(e)
        }
    }
}

async fn apply_modpack(
    instance_id: Uuid,
    mc_version: String,
    index: ModrinthIndex,
    pack_path: PathBuf,
    loader_info: Option<(ModLoader, Option<String>)>,
) -> Result<()> {
    let state = State::get().await?;
    let store = &state.instance_manager;
    let events = &state.event_state;

    let updated = store.set_state(instance_id, InstanceState::Installing).await?;
    events.emit_instance_state(&updated);

    // Vanilla first; the loader overlays it afterwards.
    installer::install_version(&mc_version, events).await?;

    // Manifest files, SHA-1-verified, path-traversal rejected.
    let game_dir = path_utils::minecraft_dir(instance_id);
    let total = index.files.len();
    for (done, file) in index.files.iter().enumerate() {
        if !file.client_supported() {
            info!("Skipping server-only file {}", file.path);
            continue;
        }

        let relative = file_utils::sanitize_archive_path(&file.path)
            .ok_or_else(|| AppError::PathTraversal(file.path.clone().into()))?;
        let dest = game_dir.join(relative);

        let mut config = DownloadConfig::new().with_size(file.file_size);
        if let Some(sha1) = file.hashes.get("sha1") {
            config = config.with_sha1(sha1);
        }

        let mut last_error: Option<AppError> = None;
        let mut downloaded = false;
        for url in &file.downloads {
            match DownloadUtils::download_file(url, &dest, config.clone()).await {
                Ok(()) => {
                    downloaded = true;
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        if !downloaded {
            return Err(last_error
                .unwrap_or_else(|| AppError::MrpackError(format!("no download for {}", file.path))));
        }

        events.emit_download_progress("modpack", done + 1, total);
    }

    // `overrides/` first, `client-overrides/` wins on conflicts.
    file_utils::extract_zip_subtree(pack_path.clone(), "overrides".to_string(), game_dir.clone())
        .await?;
    file_utils::extract_zip_subtree(
        pack_path.clone(),
        "client-overrides".to_string(),
        game_dir.clone(),
    )
    .await?;

    // Loader: install synchronously when the metadata resolves on its own,
    // otherwise leave the choice to the user.
    match loader_info {
        Some((loader @ (ModLoader::Fabric | ModLoader::Quilt), requested_version)) => {
            let loader_version = match requested_version {
                Some(v) => v,
                None => modloader::list_loader_versions(loader, &mc_version, false)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        AppError::LoaderError(format!(
                            "no {} versions for {}",
                            loader.as_str(),
                            mc_version
                        ))
                    })?,
            };

            let derived_id =
                modloader::install_loader_version(loader, &mc_version, &loader_version).await?;
            store
                .apply_loader(instance_id, loader, &loader_version, &derived_id)
                .await?;
            installer::install_version(&derived_id, events).await?;

            events.emit_loader_installed(LoaderInstalledPayload {
                instance_id,
                project_id: loader.as_str().to_string(),
                version_id: loader_version,
            });
        }
        Some((loader, _)) => {
            // Forge/NeoForge installs are not automated yet; record the
            // loader and let the UI surface candidate picking.
            warn!(
                "Modpack wants {}, leaving loader_version unset for manual resolution",
                loader.as_str()
            );
            store.set_loader_fields(instance_id, Some(loader), None).await?;
        }
        None => {}
    }

    let updated = store.set_state(instance_id, InstanceState::Ready).await?;
    events.emit_instance_state(&updated);
    info!("Modpack install complete for instance {}", instance_id);
    Ok(())
}

/// Resolves a Modrinth loader version picked by the user (after
/// `find_loader_candidates`) and installs it into the instance.
pub async fn install_loader_from_modrinth(
    instance_id: Uuid,
    project_id: &str,
    version_id: &str,
) -> Result<()> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    let version = modrinth::get_version(version_id).await?;

    let loader = version
        .loaders
        .iter()
        .find_map(|l| ModLoader::from_str(l).ok())
        .ok_or_else(|| {
            AppError::InvalidModLoader(format!("version {} names no known loader", version_id))
        })?;

    let mc_version = instance.effective_mc_version().to_string();
    let derived_id =
        modloader::install_loader_version(loader, &mc_version, &version.version_number).await?;
    state
        .instance_manager
        .apply_loader(instance_id, loader, &version.version_number, &derived_id)
        .await?;

    state.event_state.emit_loader_installed(LoaderInstalledPayload {
        instance_id,
        project_id: project_id.to_string(),
        version_id: version.version_number,
    });
    Ok(())
}

/// True when a path from a pack manifest stays inside the instance.
pub fn is_safe_pack_path(path: &str) -> bool {
    file_utils::sanitize_archive_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_json() -> &'static str {
        r#"{
            "formatVersion": 1,
            "game": "minecraft",
            "versionId": "5.14.0",
            "name": "Fabulously Optimized",
            "summary": "Improve performance",
            "files": [
                {
                    "path": "mods/sodium.jar",
                    "hashes": {"sha1": "abc123"},
                    "env": {"client": "required", "server": "unsupported"},
                    "downloads": ["https://cdn.modrinth.com/sodium.jar"],
                    "fileSize": 1024
                },
                {
                    "path": "mods/server-only.jar",
                    "hashes": {"sha1": "def456"},
                    "env": {"client": "unsupported", "server": "required"},
                    "downloads": ["https://cdn.modrinth.com/server.jar"],
                    "fileSize": 2048
                }
            ],
            "dependencies": {
                "minecraft": "1.20.4",
                "fabric-loader": "0.15.11"
            }
        }"#
    }

    #[test]
    fn parses_manifest_and_detects_loader() {
        let index: ModrinthIndex = serde_json::from_str(index_json()).unwrap();
        assert_eq!(index.name, "Fabulously Optimized");
        assert_eq!(index.dependencies["minecraft"], "1.20.4");

        let (loader, version) = determine_loader(&index.dependencies).unwrap();
        assert_eq!(loader, ModLoader::Fabric);
        assert_eq!(version.as_deref(), Some("0.15.11"));
    }

    #[test]
    fn env_gating_skips_server_only_files() {
        let index: ModrinthIndex = serde_json::from_str(index_json()).unwrap();
        assert!(index.files[0].client_supported());
        assert!(!index.files[1].client_supported());
    }

    #[test]
    fn manifest_paths_are_validated() {
        assert!(is_safe_pack_path("mods/sodium.jar"));
        assert!(is_safe_pack_path("config/iris.properties"));
        assert!(!is_safe_pack_path("../../.bashrc"));
        assert!(!is_safe_pack_path("/etc/shadow"));
        assert!(!is_safe_pack_path("mods/../../evil.jar"));
    }

    #[tokio::test]
    async fn reads_index_from_archive() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("test.mrpack");
        let file = std::fs::File::create(&pack).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("modrinth.index.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(index_json().as_bytes()).unwrap();
        writer
            .start_file("overrides/config/a.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        writer.finish().unwrap();

        let index = read_index(pack).await.unwrap();
        assert_eq!(index.files.len(), 2);
        assert_eq!(index.version_id, "5.14.0");
    }

    #[tokio::test]
    async fn missing_index_is_an_error() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("broken.mrpack");
        let file = std::fs::File::create(&pack).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("something-else.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"not a pack").unwrap();
        writer.finish().unwrap();

        assert!(read_index(pack).await.is_err());
    }
}
