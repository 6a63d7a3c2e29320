use crate::error::Result;
use crate::minecraft::modloader::LoaderVersionEntry;
use crate::utils::download_utils;
use serde::Deserialize;

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";

#[derive(Debug, Deserialize)]
struct FabricLoaderEntry {
    loader: FabricLoaderVersion,
}

#[derive(Debug, Deserialize)]
struct FabricLoaderVersion {
    version: String,
    #[serde(default)]
    stable: bool,
}

pub async fn loader_versions(mc_version: &str) -> Result<Vec<LoaderVersionEntry>> {
    let url = format!(
        "{}/versions/loader/{}",
        FABRIC_META_BASE,
        urlencoding::encode(mc_version)
    );
    let entries: Vec<FabricLoaderEntry> = download_utils::get_json(&url).await?;
    Ok(entries
        .into_iter()
        .map(|e| LoaderVersionEntry {
            version: e.loader.version,
            stable: e.loader.stable,
        })
        .collect())
}

pub fn profile_url(mc_version: &str, loader_version: &str) -> String {
    format!(
        "{}/versions/loader/{}/{}/profile/json",
        FABRIC_META_BASE,
        urlencoding::encode(mc_version),
        urlencoding::encode(loader_version)
    )
}
