use crate::error::{AppError, Result};
use crate::state::instance_state::Instance;
use crate::utils::download_utils::{self, DownloadConfig, DownloadUtils};
use crate::utils::{file_utils, path_utils};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

const MODRINTH_API: &str = "https://api.modrinth.com/v2";
const SEARCH_LIMIT_MAX: u32 = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrinthSearchResult {
    pub hits: Vec<ModrinthSearchHit>,
    pub offset: u32,
    pub limit: u32,
    pub total_hits: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrinthSearchHit {
    pub project_id: String,
    pub slug: Option<String>,
    pub title: String,
    pub description: String,
    pub author: String,
    pub icon_url: Option<String>,
    pub downloads: u64,
    pub project_type: String,
    pub categories: Vec<String>,
    pub latest_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrinthVersion {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub version_number: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    pub date_published: DateTime<Utc>,
    pub files: Vec<ModrinthFile>,
    #[serde(default)]
    pub dependencies: Vec<ModrinthDependency>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrinthFile {
    pub url: String,
    pub filename: String,
    pub primary: bool,
    pub size: u64,
    #[serde(default)]
    pub hashes: ModrinthHashes,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModrinthHashes {
    pub sha1: Option<String>,
    pub sha512: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModrinthDependency {
    pub version_id: Option<String>,
    pub project_id: Option<String>,
    pub dependency_type: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct LoaderCandidate {
    pub project_id: String,
    pub project_title: String,
    pub version_id: String,
    pub version_number: String,
    pub game_versions: Vec<String>,
}

pub async fn search_projects(
    query: &str,
    project_type: &str,
    limit: u32,
) -> Result<ModrinthSearchResult> {
    let facets = format!("[[\"project_type:{}\"]]", project_type);
    let url = format!(
        "{}/search?query={}&facets={}&limit={}",
        MODRINTH_API,
        urlencoding::encode(query),
        urlencoding::encode(&facets),
        limit.min(SEARCH_LIMIT_MAX)
    );
    download_utils::get_json(&url).await
}

/// Discovery listing, sorted by total downloads.
pub async fn get_popular_mods(limit: u32) -> Result<ModrinthSearchResult> {
    let facets = "[[\"project_type:mod\"]]";
    let url = format!(
        "{}/search?facets={}&limit={}&index=downloads",
        MODRINTH_API,
        urlencoding::encode(facets),
        limit.min(SEARCH_LIMIT_MAX)
    );
    download_utils::get_json(&url).await
}

pub async fn get_project_versions(project_id: &str) -> Result<Vec<ModrinthVersion>> {
    let url = format!(
        "{}/project/{}/version",
        MODRINTH_API,
        urlencoding::encode(project_id)
    );
    download_utils::get_json(&url).await
}

pub async fn get_version(version_id: &str) -> Result<ModrinthVersion> {
    let url = format!(
        "{}/version/{}",
        MODRINTH_API,
        urlencoding::encode(version_id)
    );
    download_utils::get_json(&url).await
}

/// Reverse lookup by the SHA-1 of an installed file.
pub async fn get_version_by_hash(sha1: &str) -> Result<ModrinthVersion> {
    let url = format!("{}/version_file/{}", MODRINTH_API, sha1);
    download_utils::get_json(&url).await
}

/// Compatibility filter for an instance: the version must list the
/// instance's loader and its vanilla Minecraft version. Results are sorted
/// newest-published first, with each version's primary file moved to the
/// front of its file list.
pub fn filter_compatible(versions: Vec<ModrinthVersion>, instance: &Instance) -> Vec<ModrinthVersion> {
    let Some(loader) = instance.loader else {
        return Vec::new();
    };
    let mc_version = instance.effective_mc_version().to_string();

    let mut compatible: Vec<ModrinthVersion> = versions
        .into_iter()
        .filter(|v| {
            v.loaders.iter().any(|l| l == loader.as_str())
                && v.game_versions.iter().any(|g| g == &mc_version)
        })
        .collect();

    compatible.sort_by(|a, b| b.date_published.cmp(&a.date_published));
    for version in &mut compatible {
        version.files.sort_by_key(|f| !f.primary);
    }
    compatible
}

/// The file flagged primary, or the only file.
pub fn primary_file(version: &ModrinthVersion) -> Result<&ModrinthFile> {
    version
        .files
        .iter()
        .find(|f| f.primary)
        .or_else(|| (version.files.len() == 1).then(|| &version.files[0]))
        .ok_or_else(|| AppError::ModrinthPrimaryFileNotFound {
            version_id: version.id.clone(),
        })
}

/// Installs a mod into the instance's mods directory. With no explicit
/// version the newest compatible one is picked.
pub async fn install_mod(
    instance: &Instance,
    project_id: &str,
    version_id: Option<String>,
) -> Result<String> {
    let version = match version_id {
        Some(id) => get_version(&id).await?,
        None => {
            let versions = get_project_versions(project_id).await?;
            filter_compatible(versions, instance)
                .into_iter()
                .next()
                .ok_or_else(|| {
                    AppError::VersionNotFound(format!(
                        "no compatible version of {} for {} on {}",
                        project_id,
                        instance.loader.map(|l| l.as_str()).unwrap_or("vanilla"),
                        instance.effective_mc_version()
                    ))
                })?
        }
    };

    let file = primary_file(&version)?;
    let relative = file_utils::sanitize_archive_path(&file.filename)
        .ok_or_else(|| AppError::PathTraversal(file.filename.clone().into()))?;
    let dest = path_utils::mods_dir(instance.id).join(relative);

    let mut config = DownloadConfig::new().with_size(file.size);
    if let Some(sha1) = &file.hashes.sha1 {
        config = config.with_sha1(sha1);
    }
    DownloadUtils::download_file(&file.url, &dest, config).await?;

    info!(
        "Installed {} {} into instance {}",
        project_id, version.version_number, instance.name
    );
    Ok(file.filename.clone())
}

/// Searches Modrinth for loader projects whose versions cover the
/// instance's Minecraft version. Feeds the UI picker when a modpack's
/// loader could not be resolved automatically.
pub async fn find_loader_candidates(instance: &Instance, loader: &str) -> Result<Vec<LoaderCandidate>> {
    let mc_version = instance.effective_mc_version().to_string();
    let search = search_projects(loader, "mod", 10).await?;

    let mut candidates = Vec::new();
    for hit in &search.hits {
        let Ok(versions) = get_project_versions(&hit.project_id).await else {
            continue;
        };
        for version in versions {
            if version.game_versions.iter().any(|g| g == &mc_version) {
                candidates.push(LoaderCandidate {
                    project_id: hit.project_id.clone(),
                    project_title: hit.title.clone(),
                    version_id: version.id,
                    version_number: version.version_number,
                    game_versions: version.game_versions,
                });
            }
        }
    }

    candidates.sort_by(|a, b| a.project_id.cmp(&b.project_id).then(a.version_id.cmp(&b.version_id)));
    candidates.dedup_by(|a, b| a.project_id == b.project_id && a.version_id == b.version_id);
    Ok(candidates)
}

/// Convenience wrapper keeping the compatibility query in one place.
pub async fn compatible_mod_versions(
    instance: &Instance,
    project_id: &str,
) -> Result<Vec<ModrinthVersion>> {
    let versions = get_project_versions(project_id).await?;
    Ok(filter_compatible(versions, instance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::instance_state::ModLoader;
    use chrono::TimeZone;

    fn version(
        id: &str,
        loaders: &[&str],
        game_versions: &[&str],
        published_secs: i64,
        files: Vec<ModrinthFile>,
    ) -> ModrinthVersion {
        ModrinthVersion {
            id: id.to_string(),
            project_id: "AANobbMI".to_string(),
            name: id.to_string(),
            version_number: id.to_string(),
            game_versions: game_versions.iter().map(|s| s.to_string()).collect(),
            loaders: loaders.iter().map(|s| s.to_string()).collect(),
            date_published: Utc.timestamp_opt(published_secs, 0).single().unwrap(),
            files,
            dependencies: vec![],
        }
    }

    fn file(name: &str, primary: bool) -> ModrinthFile {
        ModrinthFile {
            url: format!("https://cdn.modrinth.com/{}", name),
            filename: name.to_string(),
            primary,
            size: 1,
            hashes: ModrinthHashes::default(),
        }
    }

    fn fabric_instance() -> Instance {
        let mut instance = Instance::new("T".into(), "fabric-loader-0.15.11-1.20.4".into(), None);
        instance.mc_version = Some("1.20.4".into());
        instance.loader = Some(ModLoader::Fabric);
        instance.loader_version = Some("0.15.11".into());
        instance
    }

    #[test]
    fn filters_by_loader_and_game_version_sorted_newest_first() {
        let versions = vec![
            version("old", &["fabric"], &["1.20.4"], 100, vec![file("old.jar", true)]),
            version("forge-only", &["forge"], &["1.20.4"], 300, vec![file("f.jar", true)]),
            version("wrong-mc", &["fabric"], &["1.19.2"], 300, vec![file("w.jar", true)]),
            version("new", &["fabric"], &["1.20.4"], 200, vec![file("new.jar", true)]),
        ];

        let compatible = filter_compatible(versions, &fabric_instance());
        let ids: Vec<&str> = compatible.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn primary_file_is_moved_first() {
        let versions = vec![version(
            "v1",
            &["fabric"],
            &["1.20.4"],
            100,
            vec![file("sources.jar", false), file("mod.jar", true)],
        )];
        let compatible = filter_compatible(versions, &fabric_instance());
        assert_eq!(compatible[0].files[0].filename, "mod.jar");
    }

    #[test]
    fn vanilla_instance_has_no_compatible_mods() {
        let instance = Instance::new("V".into(), "1.20.4".into(), None);
        let versions = vec![version("v1", &["fabric"], &["1.20.4"], 1, vec![])];
        assert!(filter_compatible(versions, &instance).is_empty());
    }

    #[test]
    fn primary_file_selection() {
        let only = version("v", &["fabric"], &["1.20.4"], 1, vec![file("a.jar", false)]);
        assert_eq!(primary_file(&only).unwrap().filename, "a.jar");

        let flagged = version(
            "v",
            &["fabric"],
            &["1.20.4"],
            1,
            vec![file("a.jar", false), file("b.jar", true)],
        );
        assert_eq!(primary_file(&flagged).unwrap().filename, "b.jar");

        let ambiguous = version(
            "v",
            &["fabric"],
            &["1.20.4"],
            1,
            vec![file("a.jar", false), file("b.jar", false)],
        );
        assert!(primary_file(&ambiguous).is_err());
    }
}
