use crate::error::{AppError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extracts a zip archive into `dest`. Entries whose normalised path would
/// escape `dest` are rejected with `PathTraversal`. `strip_meta_inf` drops
/// `META-INF/` (native jars carry signatures there); `exclude` drops entries
/// matching any listed prefix.
pub async fn extract_zip(
    archive: PathBuf,
    dest: PathBuf,
    strip_meta_inf: bool,
    exclude: Vec<String>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        extract_zip_blocking(&archive, &dest, strip_meta_inf, &exclude)
    })
    .await?
}

fn extract_zip_blocking(
    archive: &Path,
    dest: &Path,
    strip_meta_inf: bool,
    exclude: &[String],
) -> Result<()> {
    let file = fs::File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    fs::create_dir_all(dest)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();

        if strip_meta_inf && name.starts_with("META-INF/") {
            continue;
        }
        if exclude.iter().any(|prefix| name.starts_with(prefix)) {
            continue;
        }

        // enclosed_name() is None for absolute paths and `..` components.
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| AppError::PathTraversal(PathBuf::from(&name)))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
        }
    }

    Ok(())
}

/// Extracts every entry below `prefix/` in the archive into `dest`,
/// preserving the directory structure beneath the prefix. Used for
/// modpack `overrides/` trees.
pub async fn extract_zip_subtree(archive: PathBuf, prefix: String, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let file = fs::File::open(&archive)?;
        let mut zip = ZipArchive::new(file)?;
        let prefix = if prefix.ends_with('/') {
            prefix
        } else {
            format!("{}/", prefix)
        };

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            let Some(stripped) = name.strip_prefix(&prefix) else {
                continue;
            };
            if stripped.is_empty() {
                continue;
            }

            let relative = sanitize_archive_path(stripped)
                .ok_or_else(|| AppError::PathTraversal(PathBuf::from(&name)))?;
            let out_path = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out_file = fs::File::create(&out_path)?;
                std::io::copy(&mut entry, &mut out_file)?;
            }
        }
        Ok(())
    })
    .await?
}

/// Validates a slash-separated relative path from an archive or manifest.
/// Returns None for absolute paths, drive prefixes and `..` components.
pub fn sanitize_archive_path(raw: &str) -> Option<PathBuf> {
    use std::path::Component;

    let path = Path::new(raw);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(clean)
}

/// Hard-links `src` to `dst`, copying when the filesystem refuses the link.
pub async fn hard_link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::hard_link(src, dst).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(src, dst).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.zip");
        let file = fs::File::create(&path).unwrap();
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
    async fn extracts_and_strips_meta_inf() {
        let (_dir, archive) = build_zip(&[
            ("libtest.so", b"elf"),
            ("META-INF/MANIFEST.MF", b"sig"),
            ("sub/data.bin", b"x"),
        ]);
        let dest = tempfile::tempdir().unwrap();

        extract_zip(archive, dest.path().to_path_buf(), true, vec![])
            .await
            .unwrap();

        assert!(dest.path().join("libtest.so").exists());
        assert!(dest.path().join("sub/data.bin").exists());
        assert!(!dest.path().join("META-INF").exists());
    }

    #[tokio::test]
    async fn honours_exclude_prefixes() {
        let (_dir, archive) = build_zip(&[("keep.txt", b"a"), ("skip/me.txt", b"b")]);
        let dest = tempfile::tempdir().unwrap();

        extract_zip(
            archive,
            dest.path().to_path_buf(),
            false,
            vec!["skip/".to_string()],
        )
        .await
        .unwrap();

        assert!(dest.path().join("keep.txt").exists());
        assert!(!dest.path().join("skip").exists());
    }

    #[tokio::test]
    async fn subtree_extraction_strips_prefix() {
        let (_dir, archive) = build_zip(&[
            ("overrides/config/options.txt", b"fov:90"),
            ("overrides/mods/a.jar", b"jar"),
            ("other/ignored.txt", b"no"),
        ]);
        let dest = tempfile::tempdir().unwrap();

        extract_zip_subtree(archive, "overrides".to_string(), dest.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(
            fs::read(dest.path().join("config/options.txt")).unwrap(),
            b"fov:90"
        );
        assert!(!dest.path().join("other").exists());
    }

    #[test]
    fn sanitize_rejects_escapes() {
        assert!(sanitize_archive_path("mods/sodium.jar").is_some());
        assert!(sanitize_archive_path("a/./b.txt").is_some());
        assert!(sanitize_archive_path("../evil.jar").is_none());
        assert!(sanitize_archive_path("mods/../../evil.jar").is_none());
        assert!(sanitize_archive_path("/etc/passwd").is_none());
        assert!(sanitize_archive_path("").is_none());
    }
}
