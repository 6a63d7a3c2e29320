use crate::state::instance_state::Instance;
use log::error;
use serde::Serialize;
use std::sync::Arc;
use tauri::Emitter;
use uuid::Uuid;

#[derive(Debug, Serialize, Clone)]
pub struct InstanceLogPayload {
    pub instance_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct LoaderInstalledPayload {
    pub instance_id: Uuid,
    pub project_id: String,
    pub version_id: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct DownloadProgressPayload {
    pub phase: String,
    pub done: usize,
    pub total: usize,
}

/// Fire-and-forget event bus towards the frontend. Without an app handle
/// (tests, headless runs) every emit is a no-op.
#[derive(Clone)]
pub struct EventState {
    app: Option<Arc<tauri::AppHandle>>,
}

impl EventState {
    pub fn new(app: Option<Arc<tauri::AppHandle>>) -> Self {
        Self { app }
    }

    fn emit<P: Serialize + Clone>(&self, event: &str, payload: P) {
        if let Some(app) = &self.app {
            if let Err(e) = app.emit(event, payload) {
                error!("Failed to emit {} event: {}", event, e);
            }
        }
    }

    /// Emitted after every persisted state change; carries the full record.
    pub fn emit_instance_state(&self, instance: &Instance) {
        self.emit("instance-state-changed", instance.clone());
    }

    /// One UTF-8 line of game output; invalid bytes already replaced.
    pub fn emit_instance_log(&self, instance_id: Uuid, message: &str) {
        self.emit(
            "instance-log",
            InstanceLogPayload {
                instance_id,
                message: message.to_string(),
            },
        );
    }

    pub fn emit_modpack_loader_detected(&self, loader: &str) {
        self.emit("modpack-loader-detected", loader.to_string());
    }

    pub fn emit_loader_installed(&self, payload: LoaderInstalledPayload) {
        self.emit("loader-installed", payload);
    }

    pub fn emit_download_progress(&self, phase: &str, done: usize, total: usize) {
        self.emit(
            "download-progress",
            DownloadProgressPayload {
                phase: phase.to_string(),
                done,
                total,
            },
        );
    }
}
