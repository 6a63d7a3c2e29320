use crate::error::{AppError, Result};
use crate::minecraft::launch::version::EffectiveVersion;
use crate::utils::download_utils::{DownloadConfig, DownloadUtils};
use crate::utils::path_utils;
use log::info;

/// Downloads the vanilla client jar for the effective version, verifying its
/// SHA-1. Derived loader versions share the vanilla jar; it is stored once
/// under the vanilla id.
pub async fn ensure_client_jar(effective: &EffectiveVersion) -> Result<()> {
    let download = effective.client_download.as_ref().ok_or_else(|| {
        AppError::SchemaInvalid(format!("version {} has no client download", effective.id))
    })?;

    let jar_path = path_utils::version_jar_path(&effective.vanilla_id);
    let config = DownloadConfig::new()
        .with_sha1(&download.sha1)
        .with_size(download.size);

    if DownloadUtils::verify_existing(&jar_path, &config).await? {
        return Ok(());
    }

    info!("Downloading client jar for {}", effective.vanilla_id);
    DownloadUtils::download_file(&download.url, &jar_path, config).await
}
