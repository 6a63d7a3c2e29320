use crate::error::{AppError, CommandError};
use crate::state::config_state::Settings;
use crate::state::State;
use crate::utils::cleanup_utils::{self, CleanupInfo, CleanupResult};
use crate::utils::system_info::{self, SystemInfo};
use tauri_plugin_opener::OpenerExt;

#[tauri::command]
pub async fn get_settings() -> Result<Settings, CommandError> {
    let state = State::get().await?;
    Ok(state.settings_manager.get().await)
}

#[tauri::command]
pub async fn save_settings(settings: Settings) -> Result<(), CommandError> {
    let state = State::get().await?;
    state.settings_manager.set(settings).await?;
    Ok(())
}

#[tauri::command]
pub async fn get_system_info() -> Result<SystemInfo, CommandError> {
    Ok(tokio::task::spawn_blocking(system_info::collect_system_info)
        .await
        .map_err(AppError::Task)?)
}

#[tauri::command]
pub async fn get_cleanup_info() -> Result<CleanupInfo, CommandError> {
    let state = State::get().await?;
    let instances = state.instance_manager.list().await;
    Ok(cleanup_utils::get_cleanup_info(&instances).await?)
}

/// Deletes version directories no instance references anymore.
#[tauri::command]
pub async fn cleanup_unused_versions() -> Result<CleanupResult, CommandError> {
    let state = State::get().await?;
    let instances = state.instance_manager.list().await;
    Ok(cleanup_utils::cleanup_unused_versions(&instances).await?)
}

#[tauri::command]
pub async fn clear_asset_cache() -> Result<u64, CommandError> {
    Ok(cleanup_utils::clear_asset_cache().await?)
}

#[tauri::command]
pub async fn open_path(app: tauri::AppHandle, path: String) -> Result<(), CommandError> {
    app.opener()
        .open_path(path, None::<&str>)
        .map_err(|e| CommandError::from(AppError::Other(e.to_string())))
}
