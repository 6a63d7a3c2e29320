use crate::error::{AppError, Result};
use crate::minecraft::dto::piston_meta::AssetIndexContent;
use crate::minecraft::launch::version::EffectiveVersion;
use crate::state::event_state::EventState;
use crate::utils::download_utils::{DownloadConfig, DownloadUtils};
use crate::utils::{file_utils, path_utils};
use futures::stream::{self, TryStreamExt};
use log::{info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;

const ASSET_BASE_URL: &str = "https://resources.download.minecraft.net";
const DOWNLOAD_FANOUT: usize = 8;
const PROGRESS_EVERY: usize = 50;

/// Materialises the asset index and the content-addressed object store for
/// an effective version. Legacy index formats additionally mirror each
/// object under `assets/virtual/legacy/` at its original path.
pub async fn install_assets(effective: &EffectiveVersion, events: &EventState) -> Result<()> {
    let Some(index_ref) = &effective.asset_index else {
        warn!("Version {} has no asset index, skipping assets", effective.id);
        return Ok(());
    };

    let index_path = path_utils::asset_indexes_dir().join(format!("{}.json", index_ref.id));
    DownloadUtils::download_file(
        &index_ref.url,
        &index_path,
        DownloadConfig::new()
            .with_sha1(&index_ref.sha1)
            .with_size(index_ref.size),
    )
    .await?;

    let index_text = fs::read_to_string(&index_path).await?;
    let index: AssetIndexContent = serde_json::from_str(&index_text)?;

    let needs_mirror = index.needs_legacy_mirror();
    let objects: Vec<(String, String, u64)> = index
        .objects
        .into_iter()
        .map(|(original_path, object)| (original_path, object.hash, object.size))
        .collect();

    let total = objects.len();
    info!(
        "Ensuring {} asset objects for index {} (legacy mirror: {})",
        total, index_ref.id, needs_mirror
    );
    let done = AtomicUsize::new(0);

    stream::iter(objects.into_iter().map(Ok::<_, AppError>))
        .try_for_each_concurrent(DOWNLOAD_FANOUT, |(original_path, hash, size)| {
            let done = &done;
            async move {
                let target = path_utils::asset_object_path(&hash);
                let url = format!("{}/{}/{}", ASSET_BASE_URL, &hash[..2], &hash);
                DownloadUtils::download_file(
                    &url,
                    &target,
                    DownloadConfig::new().with_sha1(&hash).with_size(size),
                )
                .await?;

                if needs_mirror {
                    let relative = file_utils::sanitize_archive_path(&original_path)
                        .ok_or_else(|| AppError::PathTraversal(original_path.clone().into()))?;
                    let mirror = path_utils::legacy_assets_dir().join(relative);
                    file_utils::hard_link_or_copy(&target, &mirror).await?;
                }

                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if finished % PROGRESS_EVERY == 0 || finished == total {
                    events.emit_download_progress("assets", finished, total);
                }
                Ok::<(), AppError>(())
            }
        })
        .await?;

    Ok(())
}
