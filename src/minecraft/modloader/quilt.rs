use crate::error::Result;
use crate::minecraft::modloader::LoaderVersionEntry;
use crate::utils::download_utils;
use serde::Deserialize;

const QUILT_META_BASE: &str = "https://meta.quiltmc.org/v3";

#[derive(Debug, Deserialize)]
struct QuiltLoaderEntry {
    loader: QuiltLoaderVersion,
}

#[derive(Debug, Deserialize)]
struct QuiltLoaderVersion {
    version: String,
}

pub async fn loader_versions(mc_version: &str) -> Result<Vec<LoaderVersionEntry>> {
    let url = format!(
        "{}/versions/loader/{}",
        QUILT_META_BASE,
        urlencoding::encode(mc_version)
    );
    let entries: Vec<QuiltLoaderEntry> = download_utils::get_json(&url).await?;
    Ok(entries
        .into_iter()
        .map(|e| {
            // Quilt meta carries no stable flag; pre-releases mark
            // themselves in the version string.
            let stable = !e.loader.version.contains("-beta")
                && !e.loader.version.contains("-rc")
                && !e.loader.version.contains("-pre");
            LoaderVersionEntry {
                version: e.loader.version,
                stable,
            }
        })
        .collect())
}

pub fn profile_url(mc_version: &str, loader_version: &str) -> String {
    format!(
        "{}/versions/loader/{}/{}/profile/json",
        QUILT_META_BASE,
        urlencoding::encode(mc_version),
        urlencoding::encode(loader_version)
    )
}
