use crate::error::{AppError, Result};
use crate::state::config_state::SettingsManager;
use crate::state::event_state::EventState;
use crate::state::instance_state::InstanceManager;
use crate::state::process_state::ProcessManager;
use crate::utils::download_utils;
use std::sync::Arc;
use tokio::sync::OnceCell;

static LAUNCHER_STATE: OnceCell<Arc<State>> = OnceCell::const_new();

/// Global launcher state, initialized once at startup.
pub struct State {
    pub instance_manager: InstanceManager,
    pub process_manager: ProcessManager,
    pub settings_manager: SettingsManager,
    pub event_state: EventState,
}

impl State {
    pub async fn init(app: Arc<tauri::AppHandle>) -> Result<()> {
        LAUNCHER_STATE
            .get_or_try_init(|| async {
                log::info!("Initializing launcher state...");
                let settings_manager = SettingsManager::new()?;
                let settings = settings_manager.get().await;
                download_utils::configure_concurrency(settings.concurrent_downloads);

                let instance_manager = InstanceManager::new();
                instance_manager.load_all().await?;

                let state = Arc::new(Self {
                    instance_manager,
                    process_manager: ProcessManager::new(),
                    settings_manager,
                    event_state: EventState::new(Some(app)),
                });
                log::info!("Launcher state initialized");
                Ok::<Arc<State>, AppError>(state)
            })
            .await?;
        Ok(())
    }

    /// Headless initialization without an app handle; events become no-ops.
    /// Used by integration tests driving the core directly.
    pub async fn init_headless() -> Result<()> {
        LAUNCHER_STATE
            .get_or_try_init(|| async {
                let settings_manager = SettingsManager::new()?;
                let instance_manager = InstanceManager::new();
                instance_manager.load_all().await?;
                Ok::<Arc<State>, AppError>(Arc::new(Self {
                    instance_manager,
                    process_manager: ProcessManager::new(),
                    settings_manager,
                    event_state: EventState::new(None),
                }))
            })
            .await?;
        Ok(())
    }

    pub async fn get() -> Result<Arc<Self>> {
        // Commands only fire after setup, but guard against early calls.
        for _ in 0..50 {
            if let Some(state) = LAUNCHER_STATE.get() {
                return Ok(Arc::clone(state));
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        Err(AppError::Other(
            "Launcher state was not initialized".to_string(),
        ))
    }

    pub fn initialized() -> bool {
        LAUNCHER_STATE.initialized()
    }
}
