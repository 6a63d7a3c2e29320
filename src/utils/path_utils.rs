use crate::config::LAUNCHER_DIRECTORY;
use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Root of all launcher state on disk.
pub fn data_root() -> PathBuf {
    LAUNCHER_DIRECTORY.data_dir().to_path_buf()
}

pub fn launcher_logs_dir() -> PathBuf {
    data_root().join("logs")
}

pub fn instances_dir() -> PathBuf {
    data_root().join("instances")
}

pub fn instance_dir(id: Uuid) -> PathBuf {
    instances_dir().join(id.to_string())
}

pub fn instance_meta_path(id: Uuid) -> PathBuf {
    instance_dir(id).join("instance.json")
}

/// The game working directory; `mods/`, `saves/`, `screenshots/` and
/// `servers.dat` live below it.
pub fn minecraft_dir(id: Uuid) -> PathBuf {
    instance_dir(id).join(".minecraft")
}

pub fn mods_dir(id: Uuid) -> PathBuf {
    minecraft_dir(id).join("mods")
}

/// Natives are extracted per instance to avoid cross-contamination between
/// versions sharing a library.
pub fn natives_dir(id: Uuid) -> PathBuf {
    instance_dir(id).join("natives")
}

pub fn instance_logs_dir(id: Uuid) -> PathBuf {
    instance_dir(id).join("logs")
}

pub fn last_launch_log_path(id: Uuid) -> PathBuf {
    instance_logs_dir(id).join("last-launch.log")
}

pub fn crashes_dir(id: Uuid) -> PathBuf {
    instance_dir(id).join("crashes")
}

pub fn versions_dir() -> PathBuf {
    data_root().join("versions")
}

pub fn version_dir(version_id: &str) -> PathBuf {
    versions_dir().join(version_id)
}

pub fn version_json_path(version_id: &str) -> PathBuf {
    version_dir(version_id).join(format!("{}.json", version_id))
}

pub fn version_jar_path(version_id: &str) -> PathBuf {
    version_dir(version_id).join(format!("{}.jar", version_id))
}

pub fn libraries_dir() -> PathBuf {
    data_root().join("libraries")
}

pub fn assets_dir() -> PathBuf {
    data_root().join("assets")
}

pub fn asset_indexes_dir() -> PathBuf {
    assets_dir().join("indexes")
}

pub fn asset_objects_dir() -> PathBuf {
    assets_dir().join("objects")
}

/// Content-addressed object path: `objects/<first two hex chars>/<hash>`.
pub fn asset_object_path(hash: &str) -> PathBuf {
    asset_objects_dir().join(&hash[..2]).join(hash)
}

/// Mirror used by pre-1.7.3 asset index formats.
pub fn legacy_assets_dir() -> PathBuf {
    assets_dir().join("virtual").join("legacy")
}

pub fn cache_dir() -> PathBuf {
    data_root().join("cache")
}

pub fn manifest_cache_path() -> PathBuf {
    cache_dir().join("manifest.json")
}

pub fn settings_path() -> PathBuf {
    data_root().join("settings.json")
}

/// Maps Maven coordinates (`group:artifact:version[:classifier]`) to the
/// repository-relative artifact path.
pub fn maven_coords_to_path(coords: &str, classifier: Option<&str>) -> Result<String> {
    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(AppError::InvalidInput(format!(
            "Invalid Maven coordinates: {}",
            coords
        )));
    }

    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];
    let classifier = classifier.or_else(|| parts.get(3).copied());

    let file_name = match classifier {
        Some(c) => format!("{}-{}-{}.jar", artifact, version, c),
        None => format!("{}-{}.jar", artifact, version),
    };

    Ok(format!("{}/{}/{}/{}", group, artifact, version, file_name))
}

/// Absolute path of a library artifact in the shared store.
pub fn library_path(coords: &str, classifier: Option<&str>) -> Result<PathBuf> {
    Ok(libraries_dir().join(maven_coords_to_path(coords, classifier)?))
}

/// Writes `bytes` to `<path>.tmp`, fsyncs, then renames over `path`. An
/// interrupted write leaves the previous contents intact.
pub async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp_path = tmp_sibling(path);
    let result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub async fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json).await
}

pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maven_coords_map_to_repository_layout() {
        assert_eq!(
            maven_coords_to_path("net.fabricmc:fabric-loader:0.15.11", None).unwrap(),
            "net/fabricmc/fabric-loader/0.15.11/fabric-loader-0.15.11.jar"
        );
        assert_eq!(
            maven_coords_to_path("org.lwjgl:lwjgl:3.3.3", Some("natives-linux")).unwrap(),
            "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar"
        );
        // Classifier embedded in the coordinates themselves.
        assert_eq!(
            maven_coords_to_path("org.lwjgl:lwjgl:3.3.3:natives-macos", None).unwrap(),
            "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-macos.jar"
        );
        assert!(maven_coords_to_path("broken", None).is_err());
    }

    #[tokio::test]
    async fn atomic_write_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("instance.json");

        atomic_write(&target, b"{\"v\":1}").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"{\"v\":1}");

        atomic_write(&target, b"{\"v\":2,\"more\":true}").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"{\"v\":2,\"more\":true}");

        // No temp file left behind.
        assert!(!tmp_sibling(&target).exists());
    }
}
