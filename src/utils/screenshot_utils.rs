use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Clone)]
pub struct ScreenshotInfo {
    pub file_name: String,
    pub path: String,
    pub size: u64,
    pub taken_at: Option<i64>,
}

/// Scans `screenshots/` below the game directory, newest first.
pub async fn list_screenshots(minecraft_dir: &Path) -> Result<Vec<ScreenshotInfo>> {
    let dir = minecraft_dir.join("screenshots");
    let mut shots = Vec::new();
    if !dir.exists() {
        return Ok(shots);
    }

    let mut entries = fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.to_lowercase().ends_with(".png") {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        shots.push(ScreenshotInfo {
            path: entry.path().to_string_lossy().to_string(),
            file_name: name,
            size: metadata.len(),
            taken_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
        });
    }

    shots.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    Ok(shots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_png_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let shots_dir = dir.path().join("screenshots");
        std::fs::create_dir_all(&shots_dir).unwrap();
        std::fs::write(shots_dir.join("2024-05-01_12.00.00.png"), b"png").unwrap();
        std::fs::write(shots_dir.join("README.txt"), b"txt").unwrap();

        let shots = list_screenshots(dir.path()).await.unwrap();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].file_name, "2024-05-01_12.00.00.png");
    }
}
