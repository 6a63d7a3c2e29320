use crate::error::CommandError;
use crate::minecraft::api::mc_api;
use crate::minecraft::dto::version_manifest::VersionManifest;
use crate::minecraft::installer;
use crate::minecraft::launch::launcher;
use crate::minecraft::modloader;
use crate::state::event_state::LoaderInstalledPayload;
use crate::state::instance_state::{InstanceState, ModLoader};
use crate::state::State;
use crate::utils::java_utils::{self, JavaCompatibility};
use log::warn;
use uuid::Uuid;

#[tauri::command]
pub async fn get_version_manifest(
    force_refresh: Option<bool>,
) -> Result<VersionManifest, CommandError> {
    Ok(mc_api::get_version_manifest(force_refresh.unwrap_or(false)).await?)
}

/// Resolves and materialises a version for an instance; progress and state
/// changes arrive as events. A second call while one is running returns
/// `Busy` immediately.
#[tauri::command]
pub async fn download_version(
    instance_id: Uuid,
    version_id: String,
) -> Result<(), CommandError> {
    installer::run_exclusive(instance_id, installer::run_install(instance_id, Some(version_id)))
        .await?;
    Ok(())
}

/// Cancels an in-flight install. Already-written content-addressed files
/// stay valid for the next run.
#[tauri::command]
pub async fn abort_install(instance_id: Uuid) -> Result<bool, CommandError> {
    let state = State::get().await?;
    let aborted = state.instance_manager.abort_install(instance_id);
    if aborted {
        match state
            .instance_manager
            .set_state(instance_id, InstanceState::Ready)
            .await
        {
            Ok(updated) => state.event_state.emit_instance_state(&updated),
            Err(e) => warn!("Post-abort state settle for {} failed: {}", instance_id, e),
        }
    }
    Ok(aborted)
}

#[tauri::command]
pub async fn get_loader_versions(
    loader_type: String,
    mc_version: String,
    include_beta: bool,
) -> Result<Vec<String>, CommandError> {
    let loader = ModLoader::from_str(&loader_type)?;
    Ok(modloader::list_loader_versions(loader, &mc_version, include_beta).await?)
}

/// Installs a Fabric/Quilt loader as a derived version and rewires the
/// instance onto it; `mc_version` stays the vanilla id.
#[tauri::command]
pub async fn install_loader(
    loader_type: String,
    mc_version: String,
    loader_version: String,
    instance_id: Uuid,
) -> Result<String, CommandError> {
    let state = State::get().await?;
    let loader = ModLoader::from_str(&loader_type)?;

    let derived_id =
        modloader::install_loader_version(loader, &mc_version, &loader_version).await?;
    let updated = state
        .instance_manager
        .apply_loader(instance_id, loader, &loader_version, &derived_id)
        .await?;
    state.event_state.emit_instance_state(&updated);
    state.event_state.emit_loader_installed(LoaderInstalledPayload {
        instance_id,
        project_id: loader.as_str().to_string(),
        version_id: loader_version,
    });

    Ok(derived_id)
}

#[tauri::command]
pub async fn check_java_compatibility(
    instance_id: Uuid,
) -> Result<JavaCompatibility, CommandError> {
    let state = State::get().await?;
    let instance = state.instance_manager.get(instance_id).await?;
    let settings = state.settings_manager.get().await;

    let required = java_utils::default_required_java(instance.effective_mc_version());
    let path = launcher::resolve_java_path(&instance, settings.global_java_path.as_deref());
    let actual = java_utils::probe_java_major(&path).await;

    let compatible = if settings.skip_java_check || instance.java_warning_ignored {
        true
    } else {
        actual == Some(required)
    };

    Ok(JavaCompatibility {
        compatible,
        actual_version: actual,
        required_version: required,
        path,
    })
}

