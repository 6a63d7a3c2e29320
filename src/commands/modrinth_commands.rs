use crate::error::CommandError;
use crate::integrations::modrinth::{self, LoaderCandidate, ModrinthSearchResult, ModrinthVersion};
use crate::integrations::mrpack;
use crate::state::State;
use uuid::Uuid;

const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[tauri::command]
pub async fn search_projects(
    query: String,
    project_type: String,
    limit: Option<u32>,
) -> Result<ModrinthSearchResult, CommandError> {
    Ok(modrinth::search_projects(
        &query,
        &project_type,
        limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
    )
    .await?)
}

#[tauri::command]
pub async fn get_project_versions(
    project_id: String,
) -> Result<Vec<ModrinthVersion>, CommandError> {
    Ok(modrinth::get_project_versions(&project_id).await?)
}

#[tauri::command]
pub async fn get_compatible_mod_versions(
    instance_id: Uuid,
    project_id: String,
) -> Result<Vec<ModrinthVersion>, CommandError> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    Ok(modrinth::compatible_mod_versions(&instance, &project_id).await?)
}

#[tauri::command]
pub async fn get_popular_mods(limit: Option<u32>) -> Result<ModrinthSearchResult, CommandError> {
    Ok(modrinth::get_popular_mods(limit.unwrap_or(DEFAULT_SEARCH_LIMIT)).await?)
}

#[tauri::command]
pub async fn install_modrinth_mod(
    instance_id: Uuid,
    project_id: String,
    version_id: Option<String>,
) -> Result<String, CommandError> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    Ok(modrinth::install_mod(&instance, &project_id, version_id).await?)
}

/// Installs a `.mrpack` modpack version as a brand-new instance.
#[tauri::command]
pub async fn install_modpack_version(
    name: String,
    version_id: String,
) -> Result<Uuid, CommandError> {
    Ok(mrpack::install_modpack(&name, &version_id).await?)
}

#[tauri::command]
pub async fn find_loader_candidates(
    instance_id: Uuid,
    loader: String,
) -> Result<Vec<LoaderCandidate>, CommandError> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    Ok(modrinth::find_loader_candidates(&instance, &loader).await?)
}

/// Installs the loader version the user picked from the candidate list.
#[tauri::command]
pub async fn download_loader_version(
    instance_id: Uuid,
    project_id: String,
    version_id: String,
) -> Result<(), CommandError> {
    mrpack::install_loader_from_modrinth(instance_id, &project_id, &version_id).await?;
    Ok(())
}
