use crate::error::CommandError;
use crate::state::State;
use crate::utils::mod_utils::{self, InstanceModInfo, ModUpdateInfo};
use crate::utils::path_utils;
use uuid::Uuid;

#[tauri::command]
pub async fn list_instance_mods(instance_id: Uuid) -> Result<Vec<InstanceModInfo>, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    Ok(mod_utils::list_mods(&path_utils::mods_dir(instance_id)).await?)
}

#[tauri::command]
pub async fn toggle_mod(
    instance_id: Uuid,
    filename: String,
    enabled: bool,
) -> Result<(), CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    mod_utils::toggle_mod(&path_utils::mods_dir(instance_id), &filename, enabled).await?;
    Ok(())
}

#[tauri::command]
pub async fn remove_mod(instance_id: Uuid, filename: String) -> Result<(), CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    mod_utils::remove_mod(&path_utils::mods_dir(instance_id), &filename).await?;
    Ok(())
}

#[tauri::command]
pub async fn check_mod_updates(instance_id: Uuid) -> Result<Vec<ModUpdateInfo>, CommandError> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    Ok(mod_utils::check_updates(&instance, &path_utils::mods_dir(instance_id)).await?)
}
