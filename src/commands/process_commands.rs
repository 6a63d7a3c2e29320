use crate::error::CommandError;
use crate::minecraft::launch::launcher;
use crate::state::State;
use uuid::Uuid;

#[tauri::command]
pub async fn launch_instance(app: tauri::AppHandle, instance_id: Uuid) -> Result<(), CommandError> {
    let state = State::get().await?;
    launcher::launch_instance(instance_id).await?;

    let settings = state.settings_manager.get().await;
    if settings.close_on_launch {
        app.exit(0);
    }
    Ok(())
}

/// Stops a running instance. The supervisor records the exit as
/// user-initiated, so no crash is reported.
#[tauri::command]
pub async fn kill_instance(instance_id: Uuid) -> Result<(), CommandError> {
    let state = State::get().await?;
    state.process_manager.kill(instance_id).await?;
    Ok(())
}
