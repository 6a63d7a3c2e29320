pub mod fabric;
pub mod quilt;

use crate::error::{AppError, Result};
use crate::state::instance_state::ModLoader;
use crate::utils::{download_utils, path_utils};
use log::info;

/// One loader release as reported by the loader's meta endpoint.
#[derive(Debug, Clone)]
pub struct LoaderVersionEntry {
    pub version: String,
    pub stable: bool,
}

/// Launcher-visible id of a loader-backed version:
/// `<loader>-loader-<loaderVersion>-<mcVersion>`.
pub fn derived_version_id(loader: ModLoader, loader_version: &str, mc_version: &str) -> String {
    format!("{}-loader-{}-{}", loader.as_str(), loader_version, mc_version)
}

/// Loader versions available for `mc_version`, stable releases first.
pub async fn list_loader_versions(
    loader: ModLoader,
    mc_version: &str,
    include_beta: bool,
) -> Result<Vec<String>> {
    let entries = match loader {
        ModLoader::Fabric => fabric::loader_versions(mc_version).await?,
        ModLoader::Quilt => quilt::loader_versions(mc_version).await?,
        other => {
            return Err(AppError::InvalidModLoader(format!(
                "{} has no version listing yet",
                other.as_str()
            )))
        }
    };

    let (stable, beta): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.stable);
    let mut versions: Vec<String> = stable.into_iter().map(|e| e.version).collect();
    if include_beta || versions.is_empty() {
        versions.extend(beta.into_iter().map(|e| e.version));
    }
    Ok(versions)
}

/// Fetches the loader's launcher profile for `(mc_version, loader_version)`
/// and persists it as a derived version JSON under the shared versions
/// directory. Returns the derived id. Fabric and Quilt profiles already
/// conform to the Mojang version-JSON schema with `inheritsFrom` set.
///
/// Forge and NeoForge are a reserved extension point: any installer that
/// writes a synthesised version JSON under the same directory convention
/// will resolve and launch through the normal inheritance merge.
pub async fn install_loader_version(
    loader: ModLoader,
    mc_version: &str,
    loader_version: &str,
) -> Result<String> {
    let profile_url = match loader {
        ModLoader::Fabric => fabric::profile_url(mc_version, loader_version),
        ModLoader::Quilt => quilt::profile_url(mc_version, loader_version),
        other => {
            return Err(AppError::InvalidModLoader(format!(
                "No installer for {} yet",
                other.as_str()
            )))
        }
    };

    let derived_id = derived_version_id(loader, loader_version, mc_version);
    let json_path = path_utils::version_json_path(&derived_id);
    if json_path.exists() {
        info!("Derived version {} already present", derived_id);
        return Ok(derived_id);
    }

    let profile_text = download_utils::get_text(&profile_url).await?;
    let mut profile: serde_json::Value = serde_json::from_str(&profile_text).map_err(|e| {
        let snippet: String = profile_text.chars().take(200).collect();
        AppError::LoaderError(format!("{} - response (truncated): {}", e, snippet))
    })?;

    let inherits = profile
        .get("inheritsFrom")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::LoaderError("profile missing inheritsFrom".to_string()))?;
    if inherits != mc_version {
        return Err(AppError::LoaderError(format!(
            "profile inheritsFrom mismatch: expected {}, found {}",
            mc_version, inherits
        )));
    }

    // The upstream profile names itself; pin it to our derived id so the
    // on-disk layout and the resolver agree.
    profile["id"] = serde_json::Value::String(derived_id.clone());
    path_utils::atomic_write_json(&json_path, &profile).await?;

    info!(
        "Installed {} loader {} for {} as {}",
        loader.as_str(),
        loader_version,
        mc_version,
        derived_id
    );
    Ok(derived_id)
}
