use crate::error::{AppError, Result};
use crate::minecraft::dto::piston_meta::Library;
use crate::minecraft::launch::rules::RuleProcessor;
use crate::minecraft::launch::version::EffectiveVersion;
use crate::state::event_state::EventState;
use crate::utils::download_utils::{DownloadConfig, DownloadUtils};
use crate::utils::system_info::{ARCHITECTURE, OS};
use crate::utils::{file_utils, path_utils};
use futures::stream::{self, TryStreamExt};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use uuid::Uuid;

const MOJANG_LIBRARIES_BASE: &str = "https://libraries.minecraft.net/";
const DOWNLOAD_FANOUT: usize = 8;
const PROGRESS_EVERY: usize = 10;

struct LibraryJob {
    url: String,
    dest: PathBuf,
    sha1: Option<String>,
    size: Option<u64>,
}

/// Natives classifier for the current platform, with `${arch}` expanded.
pub fn native_classifier(library: &Library) -> Option<String> {
    let natives = library.natives.as_ref()?;
    let os_key = OS.rule_name()?;
    natives
        .get(os_key)
        .map(|classifier| classifier.replace("${arch}", ARCHITECTURE.bits()))
}

fn artifact_job(library: &Library) -> Result<Option<LibraryJob>> {
    if let Some(downloads) = &library.downloads {
        if let Some(artifact) = &downloads.artifact {
            let relative = match &artifact.path {
                Some(path) => path.clone(),
                None => path_utils::maven_coords_to_path(&library.name, None)?,
            };
            return Ok(Some(LibraryJob {
                url: artifact.url.clone(),
                dest: path_utils::libraries_dir().join(relative),
                sha1: Some(artifact.sha1.clone()),
                size: Some(artifact.size),
            }));
        }
        if downloads.classifiers.is_some() {
            return Ok(None);
        }
    }

    // Loader-profile form: Maven coordinates plus a repository base URL.
    let relative = path_utils::maven_coords_to_path(&library.name, None)?;
    let base = library.url.as_deref().unwrap_or(MOJANG_LIBRARIES_BASE);
    let url = if base.ends_with('/') {
        format!("{}{}", base, relative)
    } else {
        format!("{}/{}", base, relative)
    };
    Ok(Some(LibraryJob {
        url,
        dest: path_utils::libraries_dir().join(relative),
        sha1: library.sha1.clone(),
        size: library.size,
    }))
}

fn native_job(library: &Library, classifier: &str) -> Result<Option<LibraryJob>> {
    if let Some(downloads) = &library.downloads {
        if let Some(classifiers) = &downloads.classifiers {
            if let Some(artifact) = classifiers.get(classifier) {
                let relative = match &artifact.path {
                    Some(path) => path.clone(),
                    None => path_utils::maven_coords_to_path(&library.name, Some(classifier))?,
                };
                return Ok(Some(LibraryJob {
                    url: artifact.url.clone(),
                    dest: path_utils::libraries_dir().join(relative),
                    sha1: Some(artifact.sha1.clone()),
                    size: Some(artifact.size),
                }));
            }
        }
    }
    debug!(
        "Library {} declares natives but ships no {} classifier",
        library.name, classifier
    );
    Ok(None)
}

/// Path of the downloaded native jar for a library, mirroring `native_job`.
fn native_jar_path(library: &Library, classifier: &str) -> Result<Option<PathBuf>> {
    Ok(native_job(library, classifier)?.map(|job| job.dest))
}

/// Downloads every rule-allowed library artifact and native classifier
/// through the bounded download pool.
pub async fn install_libraries(effective: &EffectiveVersion, events: &EventState) -> Result<()> {
    let mut jobs = Vec::new();
    for library in &effective.libraries {
        if !RuleProcessor::library_allowed(&library.rules) {
            debug!("Excluding library by rules: {}", library.name);
            continue;
        }
        if let Some(job) = artifact_job(library)? {
            jobs.push(job);
        }
        if let Some(classifier) = native_classifier(library) {
            if let Some(job) = native_job(library, &classifier)? {
                jobs.push(job);
            }
        }
    }

    let total = jobs.len();
    info!("Ensuring {} library artifacts for {}", total, effective.id);
    let done = AtomicUsize::new(0);

    stream::iter(jobs.into_iter().map(Ok::<_, AppError>))
        .try_for_each_concurrent(DOWNLOAD_FANOUT, |job| {
            let done = &done;
            async move {
                let mut config = DownloadConfig::new();
                if let Some(sha1) = job.sha1 {
                    config = config.with_sha1(sha1);
                }
                if let Some(size) = job.size {
                    config = config.with_size(size);
                }
                DownloadUtils::download_file(&job.url, &job.dest, config).await?;

                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if finished % PROGRESS_EVERY == 0 || finished == total {
                    events.emit_download_progress("libraries", finished, total);
                }
                Ok(())
            }
        })
        .await?;

    Ok(())
}

/// Wipes the per-instance natives directory and re-extracts every allowed
/// native jar into it, dropping `META-INF/` and the version's exclude list.
/// Re-populating on each launch defeats stale natives from previous
/// versions.
pub async fn extract_natives(effective: &EffectiveVersion, instance_id: Uuid) -> Result<()> {
    let natives_dir = path_utils::natives_dir(instance_id);
    if natives_dir.exists() {
        fs::remove_dir_all(&natives_dir).await?;
    }
    fs::create_dir_all(&natives_dir).await?;

    for library in &effective.libraries {
        if !RuleProcessor::library_allowed(&library.rules) {
            continue;
        }
        let Some(classifier) = native_classifier(library) else {
            continue;
        };
        let Some(jar_path) = native_jar_path(library, &classifier)? else {
            continue;
        };

        let exclude = library
            .extract
            .as_ref()
            .and_then(|e| e.exclude.clone())
            .unwrap_or_default();

        debug!("Extracting natives from {}", library.name);
        file_utils::extract_zip(jar_path, natives_dir.clone(), true, exclude).await?;
    }

    Ok(())
}
