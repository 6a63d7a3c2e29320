use crate::error::{AppError, Result};
use crate::minecraft::downloads::{assets_download, client_download, libraries_download};
use crate::minecraft::launch::version::{self, EffectiveVersion};
use crate::state::event_state::EventState;
use crate::state::instance_state::InstanceState;
use crate::state::State;
use log::info;
use std::future::Future;
use uuid::Uuid;

/// Runs `operation` holding the instance's exclusive install slot. A second
/// caller gets `Busy` immediately. The operation runs in its own task so
/// `abort_install` can cancel it and an internal panic surfaces as a typed
/// error instead of crossing the command boundary.
pub async fn run_exclusive<F, T>(instance_id: Uuid, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let state = State::get().await?;
    state.instance_manager.try_begin_install(instance_id)?;

    let task = tokio::spawn(operation);
    state
        .instance_manager
        .set_install_handle(instance_id, task.abort_handle());

    let result = match task.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(AppError::Cancelled),
        Err(e) => Err(AppError::Task(e)),
    };

    state.instance_manager.finish_install(instance_id);
    result
}

/// Deterministic, idempotent materialisation of one version: resolve the
/// effective version (fetching version JSONs as needed), then libraries and
/// assets in parallel, then the client jar. Content already on disk with a
/// matching hash is never re-downloaded.
pub async fn install_version(version_id: &str, events: &EventState) -> Result<EffectiveVersion> {
    let effective = version::resolve_effective(version_id).await?;
    info!(
        "Installing {} (vanilla {}, {} libraries)",
        effective.id,
        effective.vanilla_id,
        effective.libraries.len()
    );

    tokio::try_join!(
        libraries_download::install_libraries(&effective, events),
        assets_download::install_assets(&effective, events),
    )?;
    client_download::ensure_client_jar(&effective).await?;

    Ok(effective)
}

/// The `download_version` flow: puts the instance through
/// `installing -> ready|error`, persisting before each event.
pub async fn run_install(instance_id: Uuid, version_id: Option<String>) -> Result<()> {
    let state = State::get().await?;
    let store = &state.instance_manager;
    let events = &state.event_state;

    if let Some(version_id) = version_id {
        let current = store.get(instance_id).await?;
        if current.version != version_id {
            store.set_version(instance_id, &version_id).await?;
        }
    }
    let instance = store.get(instance_id).await?;

    let updated = store.set_state(instance_id, InstanceState::Installing).await?;
    events.emit_instance_state(&updated);

    match install_version(&instance.version, events).await {
        Ok(_) => {
            let updated = store.set_state(instance_id, InstanceState::Ready).await?;
            events.emit_instance_state(&updated);
            Ok(())
        }
        Err(e) => {
            if let Ok(updated) = store.set_state(instance_id, InstanceState::Error).await {
                events.emit_instance_state(&updated);
            }
            Err(e)
        }
    }
}
