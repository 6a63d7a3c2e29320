use crate::error::{AppError, Result};
use crate::minecraft::downloads::libraries_download;
use crate::minecraft::installer;
use crate::minecraft::launch::classpath;
use crate::minecraft::launch::game_arguments::GameArguments;
use crate::minecraft::launch::jvm_arguments::JvmArguments;
use crate::state::instance_state::{Instance, InstanceState};
use crate::state::State;
use crate::utils::{java_utils, path_utils};
use log::{info, warn};
use uuid::Uuid;

/// Offline mode plays under a fixed name; the UUID derived from it keeps
/// per-player data stable across launches.
const OFFLINE_PLAYER_NAME: &str = "Player";

/// Full launch algorithm for one instance: materialise the version, check
/// Java, rebuild natives, assemble argv and hand the child to the
/// supervisor. Holds the instance's exclusive install slot throughout.
pub async fn launch_instance(instance_id: Uuid) -> Result<()> {
    let state = State::get().await?;
    if state.process_manager.is_running(instance_id) {
        return Err(AppError::Busy(instance_id));
    }
    installer::run_exclusive(instance_id, launch_inner(instance_id)).await
}

async fn launch_inner(instance_id: Uuid) -> Result<()> {
    let state = State::get().await?;
    let store = &state.instance_manager;
    let events = &state.event_state;
    let settings = state.settings_manager.get().await;
    let instance = store.get(instance_id).await?;

    // Phase 1: install. The dependency order is strict: version JSON, then
    // libraries and assets in parallel, then the client jar.
    let updated = store.set_state(instance_id, InstanceState::Installing).await?;
    events.emit_instance_state(&updated);

    let effective = match installer::install_version(&instance.version, events).await {
        Ok(effective) => effective,
        Err(e) => {
            if let Ok(updated) = store.set_state(instance_id, InstanceState::Error).await {
                events.emit_instance_state(&updated);
            }
            return Err(e);
        }
    };

    let updated = store.set_state(instance_id, InstanceState::Ready).await?;
    events.emit_instance_state(&updated);

    // Phase 2: Java probe. Failure leaves the instance ready; the user can
    // fix the path or opt out of the warning.
    let java_path = resolve_java_path(&instance, settings.global_java_path.as_deref());
    let required = effective.required_java();
    if settings.skip_java_check || instance.java_warning_ignored {
        warn!(
            "Skipping Java check for {} (required {})",
            instance.name, required
        );
    } else {
        java_utils::assert_java_compatible(&java_path, required).await?;
    }

    // Phase 3: argv. Natives are wiped and re-extracted on every launch.
    libraries_download::extract_natives(&effective, instance_id).await?;

    let classpath_entries = classpath::resolve_classpath(&effective)?;
    let classpath_str = classpath::join_classpath(&classpath_entries);
    let natives_dir = path_utils::natives_dir(instance_id);
    let game_dir = path_utils::minecraft_dir(instance_id);

    let mut args = JvmArguments::new(natives_dir.clone(), classpath_str.clone()).build(&effective)?;
    if !args.iter().any(|a| a == "-cp" || a == "-classpath") {
        args.push("-cp".to_string());
        args.push(classpath_str);
    }
    if !args.iter().any(|a| a.starts_with("-Djava.library.path=")) {
        args.push(format!(
            "-Djava.library.path={}",
            natives_dir.to_string_lossy().replace('\\', "/")
        ));
    }

    let min_memory = instance.min_memory.unwrap_or(settings.min_memory);
    let max_memory = instance.max_memory.unwrap_or(settings.max_memory);
    args.push(format!("-Xms{}M", min_memory));
    args.push(format!("-Xmx{}M", max_memory));

    for arg in settings.global_java_args.split_whitespace() {
        args.push(arg.to_string());
    }
    if let Some(extra) = &instance.java_args {
        for arg in extra.split_whitespace() {
            args.push(arg.to_string());
        }
    }

    args.push(effective.main_class.clone());

    let legacy_assets = matches!(effective.asset_index_id(), Some("legacy") | Some("pre-1.6"));
    let game_args = GameArguments::new(OFFLINE_PLAYER_NAME.to_string(), &effective, game_dir.clone())
        .with_legacy_assets(legacy_assets)
        .build(&effective)?;
    args.extend(game_args);

    // Phase 4: spawn. Running is persisted before the child starts so the
    // monitor's exit transition always sees a consistent state.
    let updated = store.mark_running(instance_id).await?;
    events.emit_instance_state(&updated);

    match state
        .process_manager
        .spawn(instance_id, &java_path, args, game_dir)
        .await
    {
        Ok(pid) => {
            info!("Instance {} launched (pid {})", instance.name, pid);
            Ok(())
        }
        Err(e) => {
            if let Ok(updated) = store.mark_exited(instance_id, false, None, 0).await {
                events.emit_instance_state(&updated);
            }
            Err(e)
        }
    }
}

/// Java selection: instance override, then global setting, then whatever
/// `java` resolves to on PATH.
pub fn resolve_java_path(instance: &Instance, global_java_path: Option<&str>) -> String {
    instance
        .java_path_override
        .as_deref()
        .or(global_java_path)
        .unwrap_or("java")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_path_priority() {
        let mut instance = Instance::new("T".into(), "1.20.4".into(), None);
        assert_eq!(resolve_java_path(&instance, None), "java");
        assert_eq!(
            resolve_java_path(&instance, Some("/opt/java17/bin/java")),
            "/opt/java17/bin/java"
        );
        instance.java_path_override = Some("/custom/java".into());
        assert_eq!(
            resolve_java_path(&instance, Some("/opt/java17/bin/java")),
            "/custom/java"
        );
    }
}
