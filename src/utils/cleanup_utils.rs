use crate::error::Result;
use crate::state::instance_state::Instance;
use crate::utils::path_utils;
use log::info;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Clone)]
pub struct UnusedVersion {
    pub version_id: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Clone)]
pub struct CleanupInfo {
    pub unused_versions: Vec<UnusedVersion>,
    pub asset_cache_bytes: u64,
}

#[derive(Debug, Serialize, Clone)]
pub struct CleanupResult {
    pub removed_versions: Vec<String>,
    pub freed_bytes: u64,
}

/// Version ids still referenced by any instance, either as the
/// launcher-visible id or as the underlying vanilla id.
fn referenced_versions(instances: &[Instance]) -> HashSet<String> {
    let mut used = HashSet::new();
    for instance in instances {
        used.insert(instance.version.clone());
        if let Some(mc) = &instance.mc_version {
            used.insert(mc.clone());
        }
    }
    used
}

async fn unused_version_dirs(instances: &[Instance]) -> Result<Vec<UnusedVersion>> {
    let used = referenced_versions(instances);
    let versions_root = path_utils::versions_dir();
    let mut unused = Vec::new();
    if !versions_root.exists() {
        return Ok(unused);
    }

    let mut entries = fs::read_dir(&versions_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.metadata().await?.is_dir() {
            continue;
        }
        let version_id = entry.file_name().to_string_lossy().to_string();
        if used.contains(&version_id) {
            continue;
        }
        unused.push(UnusedVersion {
            size_bytes: dir_size(&entry.path()).await?,
            version_id,
        });
    }

    unused.sort_by(|a, b| a.version_id.cmp(&b.version_id));
    Ok(unused)
}

pub async fn get_cleanup_info(instances: &[Instance]) -> Result<CleanupInfo> {
    Ok(CleanupInfo {
        unused_versions: unused_version_dirs(instances).await?,
        asset_cache_bytes: dir_size(&path_utils::assets_dir()).await?,
    })
}

/// Deletes version directories no instance references. Shared libraries and
/// assets are left alone; they are content-addressed and cheap to keep.
pub async fn cleanup_unused_versions(instances: &[Instance]) -> Result<CleanupResult> {
    let unused = unused_version_dirs(instances).await?;
    let mut removed = Vec::with_capacity(unused.len());
    let mut freed = 0u64;

    for version in unused {
        let dir = path_utils::version_dir(&version.version_id);
        info!("Removing unused version {}", version.version_id);
        fs::remove_dir_all(&dir).await?;
        freed += version.size_bytes;
        removed.push(version.version_id);
    }

    Ok(CleanupResult {
        removed_versions: removed,
        freed_bytes: freed,
    })
}

/// Clears the content-addressed asset store, the indexes and the legacy
/// mirror. The next install re-downloads what it needs.
pub async fn clear_asset_cache() -> Result<u64> {
    let assets = path_utils::assets_dir();
    let freed = dir_size(&assets).await?;
    if assets.exists() {
        fs::remove_dir_all(&assets).await?;
    }
    info!("Cleared asset cache ({} bytes)", freed);
    Ok(freed)
}

/// Recursive directory size; 0 for missing paths.
pub async fn dir_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dir_size_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 10]).unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b"), vec![0u8; 32]).unwrap();

        assert_eq!(dir_size(dir.path()).await.unwrap(), 42);
        assert_eq!(dir_size(&dir.path().join("missing")).await.unwrap(), 0);
    }
}
