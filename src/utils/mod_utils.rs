use crate::error::{AppError, Result};
use crate::integrations::modrinth;
use crate::state::instance_state::Instance;
use crate::utils::hash_utils;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::fs;

const DISABLED_SUFFIX: &str = ".disabled";

#[derive(Debug, Serialize, Clone)]
pub struct InstanceModInfo {
    pub filename: String,
    pub size: u64,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct ModUpdateInfo {
    pub filename: String,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub project_id: Option<String>,
    pub update_available: bool,
    /// Embedded metadata names a loader other than the instance's. The mod
    /// is flagged, never auto-disabled.
    pub incompatible: bool,
}

/// Metadata embedded in a mod jar (`fabric.mod.json`, `quilt.mod.json` or
/// `META-INF/mods.toml`).
#[derive(Debug, Clone, Default)]
pub struct JarModMetadata {
    pub mod_id: Option<String>,
    pub version: Option<String>,
    pub loader: Option<String>,
}

fn ensure_plain_filename(filename: &str) -> Result<()> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') || filename.contains("..")
    {
        return Err(AppError::InvalidInput(format!(
            "Invalid mod file name: {}",
            filename
        )));
    }
    Ok(())
}

/// Enumerates `*.jar` and `*.jar.disabled` in the instance mods directory.
pub async fn list_mods(mods_dir: &Path) -> Result<Vec<InstanceModInfo>> {
    let mut mods = Vec::new();
    if !mods_dir.exists() {
        return Ok(mods);
    }

    let mut entries = fs::read_dir(mods_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        if let Some(base) = name.strip_suffix(DISABLED_SUFFIX) {
            if base.ends_with(".jar") {
                mods.push(InstanceModInfo {
                    filename: base.to_string(),
                    size: metadata.len(),
                    enabled: false,
                });
            }
        } else if name.ends_with(".jar") {
            mods.push(InstanceModInfo {
                filename: name,
                size: metadata.len(),
                enabled: true,
            });
        }
    }

    mods.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(mods)
}

/// Renames between `.jar` and `.jar.disabled`. A plain rename on the same
/// volume, so the toggle is atomic.
pub async fn toggle_mod(mods_dir: &Path, filename: &str, enabled: bool) -> Result<()> {
    ensure_plain_filename(filename)?;

    let enabled_path = mods_dir.join(filename);
    let disabled_path = mods_dir.join(format!("{}{}", filename, DISABLED_SUFFIX));

    let (from, to) = if enabled {
        (disabled_path, enabled_path)
    } else {
        (enabled_path, disabled_path)
    };

    if to.exists() {
        debug!("Mod {} already in requested state", filename);
        return Ok(());
    }
    if !from.exists() {
        return Err(AppError::FileNotFound(from));
    }

    fs::rename(&from, &to).await?;
    info!("Toggled mod {} -> enabled={}", filename, enabled);
    Ok(())
}

/// Deletes one mod file (enabled or disabled form); never touches anything
/// else in the directory.
pub async fn remove_mod(mods_dir: &Path, filename: &str) -> Result<()> {
    ensure_plain_filename(filename)?;

    let enabled_path = mods_dir.join(filename);
    let disabled_path = mods_dir.join(format!("{}{}", filename, DISABLED_SUFFIX));

    if enabled_path.exists() {
        fs::remove_file(&enabled_path).await?;
    } else if disabled_path.exists() {
        fs::remove_file(&disabled_path).await?;
    } else {
        return Err(AppError::FileNotFound(enabled_path));
    }
    info!("Removed mod {}", filename);
    Ok(())
}

/// Reads embedded mod metadata out of a jar.
pub async fn probe_jar_metadata(jar_path: PathBuf) -> Result<JarModMetadata> {
    tokio::task::spawn_blocking(move || probe_jar_metadata_blocking(&jar_path)).await?
}

fn probe_jar_metadata_blocking(jar_path: &Path) -> Result<JarModMetadata> {
    let file = std::fs::File::open(jar_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut read_entry = |name: &str| -> Option<String> {
        let mut entry = archive.by_name(name).ok()?;
        let mut content = String::new();
        entry.read_to_string(&mut content).ok()?;
        Some(content)
    };

    if let Some(content) = read_entry("fabric.mod.json") {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) {
            return Ok(JarModMetadata {
                mod_id: json.get("id").and_then(|v| v.as_str()).map(String::from),
                version: json
                    .get("version")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                loader: Some("fabric".to_string()),
            });
        }
    }

    if let Some(content) = read_entry("quilt.mod.json") {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) {
            let loader_block = json.get("quilt_loader");
            return Ok(JarModMetadata {
                mod_id: loader_block
                    .and_then(|q| q.get("id"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
                version: loader_block
                    .and_then(|q| q.get("version"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
                loader: Some("quilt".to_string()),
            });
        }
    }

    if let Some(content) = read_entry("META-INF/mods.toml") {
        if let Ok(value) = content.parse::<toml::Table>() {
            let first_mod = value
                .get("mods")
                .and_then(|m| m.as_array())
                .and_then(|a| a.first())
                .and_then(|m| m.as_table());
            return Ok(JarModMetadata {
                mod_id: first_mod
                    .and_then(|m| m.get("modId"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
                version: first_mod
                    .and_then(|m| m.get("version"))
                    .and_then(|v| v.as_str())
                    .map(String::from),
                loader: Some("forge".to_string()),
            });
        }
    }

    Ok(JarModMetadata::default())
}

/// Checks every enabled mod jar against Modrinth for a newer compatible
/// version. Lookup is by file SHA-1 first, then by the embedded mod id.
pub async fn check_updates(instance: &Instance, mods_dir: &Path) -> Result<Vec<ModUpdateInfo>> {
    let mods = list_mods(mods_dir).await?;
    let mut reports = Vec::with_capacity(mods.len());

    for entry in mods.into_iter().filter(|m| m.enabled) {
        let jar_path = mods_dir.join(&entry.filename);
        let metadata = probe_jar_metadata(jar_path.clone())
            .await
            .unwrap_or_default();

        let incompatible = match (&metadata.loader, &instance.loader) {
            (Some(declared), Some(active)) => declared != active.as_str(),
            _ => false,
        };

        let current = match resolve_installed_version(&jar_path, &metadata).await {
            Some(v) => v,
            None => {
                debug!("No Modrinth match for {}", entry.filename);
                reports.push(ModUpdateInfo {
                    filename: entry.filename,
                    current_version: metadata.version.clone(),
                    latest_version: None,
                    project_id: None,
                    update_available: false,
                    incompatible,
                });
                continue;
            }
        };

        let latest = match modrinth::get_project_versions(&current.project_id).await {
            Ok(versions) => modrinth::filter_compatible(versions, instance).into_iter().next(),
            Err(e) => {
                warn!(
                    "Update check for {} failed against Modrinth: {}",
                    entry.filename, e
                );
                None
            }
        };

        let update_available = latest
            .as_ref()
            .map(|l| l.id != current.id)
            .unwrap_or(false);

        reports.push(ModUpdateInfo {
            filename: entry.filename,
            current_version: Some(current.version_number.clone()),
            latest_version: latest.map(|l| l.version_number),
            project_id: Some(current.project_id),
            update_available,
            incompatible,
        });
    }

    Ok(reports)
}

async fn resolve_installed_version(
    jar_path: &Path,
    metadata: &JarModMetadata,
) -> Option<modrinth::ModrinthVersion> {
    if let Ok(hash) = hash_utils::sha1_file(jar_path).await {
        if let Ok(version) = modrinth::get_version_by_hash(&hash).await {
            return Some(version);
        }
    }

    // Fallback: the embedded mod id often matches the Modrinth slug.
    let mod_id = metadata.mod_id.as_deref()?;
    let versions = modrinth::get_project_versions(mod_id).await.ok()?;
    let want = metadata.version.as_deref()?;
    versions.into_iter().find(|v| v.version_number == want)
}
