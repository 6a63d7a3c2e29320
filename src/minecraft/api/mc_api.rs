use crate::error::{AppError, Result};
use crate::minecraft::dto::piston_meta::VersionJson;
use crate::minecraft::dto::version_manifest::VersionManifest;
use crate::utils::download_utils::{self, DownloadConfig, DownloadUtils};
use crate::utils::path_utils;
use log::{debug, info};
use tokio::fs;

const VERSION_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest_v2.json";

/// Returns the Mojang version manifest. The on-disk cache at
/// `cache/manifest.json` is used until the caller explicitly asks for a
/// refresh; there is no TTL and no background update.
pub async fn get_version_manifest(force_refresh: bool) -> Result<VersionManifest> {
    let cache_path = path_utils::manifest_cache_path();

    if !force_refresh && cache_path.exists() {
        match fs::read_to_string(&cache_path).await {
            Ok(cached) => match serde_json::from_str::<VersionManifest>(&cached) {
                Ok(manifest) => {
                    debug!("Using cached version manifest: {:?}", cache_path);
                    return Ok(manifest);
                }
                Err(e) => debug!("Cached manifest unreadable ({}), refetching", e),
            },
            Err(e) => debug!("Failed to read manifest cache ({}), refetching", e),
        }
    }

    info!("Fetching version manifest from {}", VERSION_MANIFEST_URL);
    let text = download_utils::get_text(VERSION_MANIFEST_URL).await?;
    let manifest: VersionManifest = serde_json::from_str(&text)?;
    path_utils::atomic_write(&cache_path, text.as_bytes()).await?;
    Ok(manifest)
}

/// Loads the version JSON for `version_id`, fetching and persisting it under
/// `versions/<id>/<id>.json` when it is not on disk yet. Derived loader
/// versions are only ever found on disk; everything else falls back to the
/// manifest.
pub async fn load_version_json(version_id: &str) -> Result<VersionJson> {
    let json_path = path_utils::version_json_path(version_id);

    if json_path.exists() {
        let text = fs::read_to_string(&json_path).await?;
        return serde_json::from_str(&text).map_err(AppError::Json);
    }

    let manifest = get_version_manifest(false).await?;
    let entry = manifest
        .find(version_id)
        .ok_or_else(|| AppError::VersionNotFound(version_id.to_string()))?;

    info!("Downloading version JSON for {}", version_id);
    let mut config = DownloadConfig::new();
    if let Some(sha1) = &entry.sha1 {
        config = config.with_sha1(sha1);
    }
    DownloadUtils::download_file(&entry.url, &json_path, config).await?;

    let text = fs::read_to_string(&json_path).await?;
    serde_json::from_str(&text).map_err(AppError::Json)
}
