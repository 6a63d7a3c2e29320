use crate::error::CommandError;
use crate::state::instance_state::Instance;
use crate::state::process_state::CrashLogEntry;
use crate::state::State;
use crate::utils::screenshot_utils::{self, ScreenshotInfo};
use crate::utils::world_utils::{self, ServerInfo, WorldInfo};
use crate::utils::path_utils;
use uuid::Uuid;

#[tauri::command]
pub async fn list_instances() -> Result<Vec<Instance>, CommandError> {
    let state = State::get().await?;
    Ok(state.instance_manager.list().await)
}

#[tauri::command]
pub async fn create_instance(name: String, version: String) -> Result<Uuid, CommandError> {
    let state = State::get().await?;
    let instance = state
        .instance_manager
        .create(&name, &version, Some(version.clone()))
        .await?;
    state.event_state.emit_instance_state(&instance);
    Ok(instance.id)
}

/// Persists user-editable overrides; lifecycle fields stay store-owned.
#[tauri::command]
pub async fn save_instance(instance: Instance) -> Result<Instance, CommandError> {
    let state = State::get().await?;
    let updated = state.instance_manager.save_overrides(instance).await?;
    state.event_state.emit_instance_state(&updated);
    Ok(updated)
}

#[tauri::command]
pub async fn delete_instance(
    instance_id: Uuid,
    delete_version: bool,
) -> Result<(), CommandError> {
    let state = State::get().await?;
    state
        .instance_manager
        .delete(instance_id, delete_version)
        .await?;
    Ok(())
}

/// True when no other instance still needs `version_id`.
#[tauri::command]
pub async fn check_version_usage(
    instance_id: Uuid,
    version_id: String,
) -> Result<bool, CommandError> {
    let state = State::get().await?;
    Ok(state
        .instance_manager
        .is_only_user_of(&version_id, Some(instance_id))
        .await)
}

#[tauri::command]
pub async fn get_instance_minecraft_dir(instance_id: Uuid) -> Result<String, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    Ok(path_utils::minecraft_dir(instance_id)
        .to_string_lossy()
        .to_string())
}

#[tauri::command]
pub async fn get_instance_screenshots_dir(instance_id: Uuid) -> Result<String, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    Ok(path_utils::minecraft_dir(instance_id)
        .join("screenshots")
        .to_string_lossy()
        .to_string())
}

#[tauri::command]
pub async fn get_instance_saves_dir(instance_id: Uuid) -> Result<String, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    Ok(path_utils::minecraft_dir(instance_id)
        .join("saves")
        .to_string_lossy()
        .to_string())
}

#[tauri::command]
pub async fn list_instance_screenshots(
    instance_id: Uuid,
) -> Result<Vec<ScreenshotInfo>, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    let shots = screenshot_utils::list_screenshots(&path_utils::minecraft_dir(instance_id)).await?;
    Ok(shots)
}

#[tauri::command]
pub async fn list_instance_worlds(instance_id: Uuid) -> Result<Vec<WorldInfo>, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    let worlds = world_utils::list_worlds(&path_utils::minecraft_dir(instance_id)).await?;
    Ok(worlds)
}

#[tauri::command]
pub async fn list_instance_servers(instance_id: Uuid) -> Result<Vec<ServerInfo>, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    let servers = world_utils::list_servers(&path_utils::minecraft_dir(instance_id)).await?;
    Ok(servers)
}

#[tauri::command]
pub async fn get_instance_crash_logs(
    instance_id: Uuid,
) -> Result<Vec<CrashLogEntry>, CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    Ok(state.process_manager.crash_logs(instance_id).await?)
}

#[tauri::command]
pub async fn clear_instance_logs(instance_id: Uuid) -> Result<(), CommandError> {
    let state = State::get().await?;
    state.instance_manager.get(instance_id).await?;
    state.process_manager.clear_logs(instance_id).await?;
    Ok(())
}
