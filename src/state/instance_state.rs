use crate::error::{AppError, Result};
use crate::utils::path_utils;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use uuid::Uuid;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModLoader {
    Fabric,
    Quilt,
    Forge,
    NeoForge,
}

impl ModLoader {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Fabric => "fabric",
            Self::Quilt => "quilt",
            Self::Forge => "forge",
            Self::NeoForge => "neoforge",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fabric" => Ok(ModLoader::Fabric),
            "quilt" => Ok(ModLoader::Quilt),
            "forge" => Ok(ModLoader::Forge),
            "neoforge" => Ok(ModLoader::NeoForge),
            other => Err(AppError::InvalidModLoader(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Ready,
    Installing,
    Running,
    Crashed,
    Error,
}

/// The legal state machine. Everything else is a launcher bug.
pub fn can_transition(from: InstanceState, to: InstanceState) -> bool {
    use InstanceState::*;
    matches!(
        (from, to),
        (Ready, Installing)
            | (Installing, Ready)
            | (Installing, Error)
            | (Ready, Running)
            | (Running, Ready)
            | (Running, Crashed)
            | (Crashed, Installing)
            | (Crashed, Running)
    )
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Instance {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    pub id: Uuid,
    pub name: String,
    /// Launcher-visible version id; a derived loader id once a loader is
    /// installed.
    pub version: String,
    /// The pure vanilla id backing `version`.
    pub mc_version: Option<String>,
    pub loader: Option<ModLoader>,
    pub loader_version: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub playtime_minutes: u64,
    pub last_crash: Option<String>,
    pub state: InstanceState,
    pub min_memory: Option<u32>,
    pub max_memory: Option<u32>,
    pub java_path_override: Option<String>,
    pub java_args: Option<String>,
    #[serde(default)]
    pub java_warning_ignored: bool,
}

impl Instance {
    pub fn new(name: String, version: String, mc_version: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: Uuid::new_v4(),
            name,
            version,
            mc_version,
            loader: None,
            loader_version: None,
            icon: None,
            created_at: Utc::now(),
            last_played: None,
            playtime_minutes: 0,
            last_crash: None,
            state: InstanceState::Ready,
            min_memory: None,
            max_memory: None,
            java_path_override: None,
            java_args: None,
            java_warning_ignored: false,
        }
    }

    /// The vanilla id used for compatibility checks and Java requirements.
    pub fn effective_mc_version(&self) -> &str {
        self.mc_version.as_deref().unwrap_or(&self.version)
    }
}

/// Picks the first free name: `base`, then `base (2)`, `base (3)`…
pub fn unique_instance_name(existing: &[String], base: &str) -> String {
    if !existing.iter().any(|n| n == base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", base, n);
        if !existing.iter().any(|name| name == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// True when no other instance references `version_id` through either its
/// launcher-visible or vanilla version id.
pub fn version_unused(instances: &[Instance], version_id: &str, excluding: Option<Uuid>) -> bool {
    !instances.iter().any(|i| {
        if Some(i.id) == excluding {
            return false;
        }
        i.version == version_id || i.mc_version.as_deref() == Some(version_id)
    })
}

/// Parses an `instance.json` document. Documents without a `schemaVersion`
/// are treated as the pre-versioning layout and migrated forward; documents
/// from a newer launcher are refused with `SchemaTooNew`, never reset.
/// Returns the instance plus whether a migration happened (the caller
/// re-persists migrated instances immediately).
pub fn instance_from_json(text: &str, source_name: &str) -> Result<(Instance, bool)> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| AppError::SchemaInvalid(format!("{}: {}", source_name, e)))?;

    match value.get("schemaVersion").and_then(|v| v.as_u64()) {
        None => {
            let migrated = migrate_v0(&value, source_name)?;
            Ok((migrated, true))
        }
        Some(found) if found as u32 > SCHEMA_VERSION => Err(AppError::SchemaTooNew {
            instance: source_name.to_string(),
            found: found as u32,
            supported: SCHEMA_VERSION,
        }),
        Some(_) => {
            let instance: Instance = serde_json::from_value(value)
                .map_err(|e| AppError::SchemaInvalid(format!("{}: {}", source_name, e)))?;
            Ok((instance, false))
        }
    }
}

/// Pre-versioning layout: string states including `not_installed`, unix
/// timestamps, a free-form loader string and an auto-detected `java_path`
/// field that no longer exists.
fn migrate_v0(value: &serde_json::Value, source_name: &str) -> Result<Instance> {
    let str_field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(String::from);

    let id = str_field("id")
        .and_then(|s| Uuid::parse_str(&s).ok())
        .ok_or_else(|| AppError::SchemaInvalid(format!("{}: missing or invalid id", source_name)))?;
    let name = str_field("name")
        .ok_or_else(|| AppError::SchemaInvalid(format!("{}: missing name", source_name)))?;
    let version = str_field("version")
        .ok_or_else(|| AppError::SchemaInvalid(format!("{}: missing version", source_name)))?;

    let state = match value.get("state").and_then(|v| v.as_str()) {
        Some("running") => InstanceState::Running,
        Some("installing") => InstanceState::Installing,
        Some("error") => InstanceState::Error,
        // `not_installed` collapses into ready; the installer is idempotent.
        _ => InstanceState::Ready,
    };

    let timestamp = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_i64())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    };

    Ok(Instance {
        schema_version: SCHEMA_VERSION,
        id,
        mc_version: str_field("mc_version").or_else(|| Some(version.clone())),
        loader: str_field("loader").and_then(|s| ModLoader::from_str(&s).ok()),
        loader_version: str_field("loader_version"),
        icon: str_field("icon"),
        created_at: timestamp("created_at").unwrap_or_else(Utc::now),
        last_played: timestamp("last_played"),
        playtime_minutes: value
            .get("playtime_minutes")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        last_crash: str_field("last_crash"),
        state,
        min_memory: value.get("min_memory").and_then(|v| v.as_u64()).map(|v| v as u32),
        max_memory: value.get("max_memory").and_then(|v| v.as_u64()).map(|v| v as u32),
        java_path_override: str_field("java_path_override"),
        java_args: str_field("java_args"),
        java_warning_ignored: value
            .get("java_warning_ignored")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        name,
        version,
    })
}

pub async fn load_instance_file(path: &Path) -> Result<(Instance, bool)> {
    let text = fs::read_to_string(path).await?;
    let source_name = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    instance_from_json(&text, &source_name)
}

/// Single source of truth for instances across restarts. Owns
/// `instance.json` exclusively; everything else mutates instances through
/// this store so every write is atomic and every state change is validated.
pub struct InstanceManager {
    instances: Arc<RwLock<HashMap<Uuid, Instance>>>,
    installing: DashMap<Uuid, Option<AbortHandle>>,
}

impl InstanceManager {
    pub fn new() -> Self {
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
            installing: DashMap::new(),
        }
    }

    /// Loads every instance from disk. Instances persisted mid-transition by
    /// a dead session (`running`, `installing`) are repaired to `ready`;
    /// migrated instances are re-persisted; `SchemaTooNew` instances are
    /// left on disk untouched and excluded from the session.
    pub async fn load_all(&self) -> Result<()> {
        let root = path_utils::instances_dir();
        if !root.exists() {
            fs::create_dir_all(&root).await?;
            return Ok(());
        }

        let mut loaded = 0usize;
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta_path = entry.path().join("instance.json");
            if !meta_path.exists() {
                continue;
            }

            match load_instance_file(&meta_path).await {
                Ok((mut instance, migrated)) => {
                    let mut dirty = migrated;
                    if matches!(
                        instance.state,
                        InstanceState::Running | InstanceState::Installing
                    ) {
                        warn!(
                            "Instance '{}' was {:?} when the launcher died, repairing to ready",
                            instance.name, instance.state
                        );
                        instance.state = InstanceState::Ready;
                        dirty = true;
                    }
                    if dirty {
                        persist_instance(&instance).await?;
                    }
                    self.instances.write().await.insert(instance.id, instance);
                    loaded += 1;
                }
                Err(e) => {
                    // Never silently reset: the file stays as-is and the
                    // instance is simply not part of this session.
                    error!("Refusing to load {:?}: {}", meta_path, e);
                }
            }
        }

        info!("Loaded {} instances", loaded);
        Ok(())
    }

    pub async fn list(&self) -> Vec<Instance> {
        let mut all: Vec<Instance> = self.instances.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub async fn get(&self, id: Uuid) -> Result<Instance> {
        self.instances
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::InstanceNotFound(id))
    }

    pub async fn create(
        &self,
        name: &str,
        version: &str,
        mc_version: Option<String>,
    ) -> Result<Instance> {
        let mut instances = self.instances.write().await;

        let existing: Vec<String> = instances.values().map(|i| i.name.clone()).collect();
        let unique = unique_instance_name(&existing, name.trim());

        let instance = Instance::new(
            unique,
            version.to_string(),
            mc_version.or_else(|| Some(version.to_string())),
        );

        fs::create_dir_all(path_utils::minecraft_dir(instance.id)).await?;
        persist_instance(&instance).await?;
        info!("Created instance '{}' ({})", instance.name, instance.id);

        instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    /// Applies the user-editable fields of `incoming` onto the stored
    /// instance. Lifecycle fields (state, playtime, crash info) are owned by
    /// the store and ignored here. Changing the Java override clears the
    /// user's compatibility-warning opt-out.
    pub async fn save_overrides(&self, incoming: Instance) -> Result<Instance> {
        self.update_with(incoming.id, |current| {
            if current.java_path_override != incoming.java_path_override {
                current.java_warning_ignored = false;
            } else {
                current.java_warning_ignored = incoming.java_warning_ignored;
            }
            current.name = incoming.name.clone();
            current.icon = incoming.icon.clone();
            current.min_memory = incoming.min_memory;
            current.max_memory = incoming.max_memory;
            current.java_path_override = incoming.java_path_override.clone();
            current.java_args = incoming.java_args.clone();
            Ok(())
        })
        .await
    }

    /// Validated state transition, fsynced to disk before the caller emits
    /// the change.
    pub async fn set_state(&self, id: Uuid, new_state: InstanceState) -> Result<Instance> {
        self.update_with(id, |instance| {
            if !can_transition(instance.state, new_state) {
                return Err(AppError::InvalidStateTransition(format!(
                    "{:?} -> {:?} for instance {}",
                    instance.state, new_state, id
                )));
            }
            instance.state = new_state;
            Ok(())
        })
        .await
    }

    /// `ready|crashed -> running` plus the launch bookkeeping, one persist.
    pub async fn mark_running(&self, id: Uuid) -> Result<Instance> {
        self.update_with(id, |instance| {
            if !can_transition(instance.state, InstanceState::Running) {
                return Err(AppError::InvalidStateTransition(format!(
                    "{:?} -> Running for instance {}",
                    instance.state, id
                )));
            }
            instance.state = InstanceState::Running;
            instance.last_played = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// `running -> ready|crashed` plus playtime accounting, one persist.
    pub async fn mark_exited(
        &self,
        id: Uuid,
        crashed: bool,
        crash_summary: Option<String>,
        playtime_minutes: u64,
    ) -> Result<Instance> {
        let target = if crashed {
            InstanceState::Crashed
        } else {
            InstanceState::Ready
        };
        self.update_with(id, |instance| {
            if !can_transition(instance.state, target) {
                return Err(AppError::InvalidStateTransition(format!(
                    "{:?} -> {:?} for instance {}",
                    instance.state, target, id
                )));
            }
            instance.state = target;
            instance.playtime_minutes += playtime_minutes;
            if crashed {
                instance.last_crash = crash_summary.clone();
            }
            Ok(())
        })
        .await
    }

    /// Records a freshly installed loader: the launcher-visible version
    /// becomes the derived id while `mc_version` keeps the vanilla id.
    pub async fn apply_loader(
        &self,
        id: Uuid,
        loader: ModLoader,
        loader_version: &str,
        derived_version_id: &str,
    ) -> Result<Instance> {
        self.update_with(id, |instance| {
            if instance.mc_version.is_none() {
                instance.mc_version = Some(instance.version.clone());
            }
            instance.version = derived_version_id.to_string();
            instance.loader = Some(loader);
            instance.loader_version = Some(loader_version.to_string());
            Ok(())
        })
        .await
    }

    /// Records which loader a modpack wants before it is installed. With no
    /// concrete loader version the UI surfaces candidate picking later.
    pub async fn set_loader_fields(
        &self,
        id: Uuid,
        loader: Option<ModLoader>,
        loader_version: Option<String>,
    ) -> Result<Instance> {
        self.update_with(id, |instance| {
            instance.loader = loader;
            instance.loader_version = loader_version.clone();
            Ok(())
        })
        .await
    }

    pub async fn set_version(&self, id: Uuid, version_id: &str) -> Result<Instance> {
        self.update_with(id, |instance| {
            if instance.loader.is_none() {
                instance.version = version_id.to_string();
                instance.mc_version = Some(version_id.to_string());
            }
            Ok(())
        })
        .await
    }

    async fn update_with<F>(&self, id: Uuid, mutate: F) -> Result<Instance>
    where
        F: FnOnce(&mut Instance) -> Result<()>,
    {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(&id)
            .ok_or(AppError::InstanceNotFound(id))?;

        // Mutate a copy so a failed persist leaves memory and disk agreeing.
        let mut updated = instance.clone();
        mutate(&mut updated)?;
        persist_instance(&updated).await?;
        *instance = updated.clone();
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, delete_version: bool) -> Result<()> {
        let removed = {
            let mut instances = self.instances.write().await;
            instances
                .remove(&id)
                .ok_or(AppError::InstanceNotFound(id))?
        };

        if delete_version {
            let all = self.list().await;
            if version_unused(&all, &removed.version, None) {
                let version_dir = path_utils::version_dir(&removed.version);
                if version_dir.exists() {
                    info!("Deleting now-unused version {}", removed.version);
                    fs::remove_dir_all(&version_dir).await?;
                }
            }
        }

        let dir = path_utils::instance_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
        }
        info!("Deleted instance '{}' ({})", removed.name, id);
        Ok(())
    }

    pub async fn is_only_user_of(&self, version_id: &str, excluding: Option<Uuid>) -> bool {
        let instances = self.list().await;
        version_unused(&instances, version_id, excluding)
    }

    // --- install exclusivity -------------------------------------------

    /// Claims the per-instance install slot. A second install while one is
    /// in flight fails immediately with `Busy`; nothing is ever queued.
    pub fn try_begin_install(&self, id: Uuid) -> Result<()> {
        match self.installing.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Busy(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(())
            }
        }
    }

    pub fn set_install_handle(&self, id: Uuid, handle: AbortHandle) {
        if let Some(mut entry) = self.installing.get_mut(&id) {
            *entry = Some(handle);
        }
    }

    pub fn finish_install(&self, id: Uuid) {
        self.installing.remove(&id);
    }

    /// Aborts an in-flight install. Content-addressed files already written
    /// stay valid for future installs.
    pub fn abort_install(&self, id: Uuid) -> bool {
        if let Some((_, Some(handle))) = self.installing.remove(&id) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn is_installing(&self, id: Uuid) -> bool {
        self.installing.contains_key(&id)
    }
}

async fn persist_instance(instance: &Instance) -> Result<()> {
    path_utils::atomic_write_json(&path_utils::instance_meta_path(instance.id), instance).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_uniqueness_suffixes_minimally() {
        let mut existing: Vec<String> = vec![];
        for expected in ["X", "X (2)", "X (3)", "X (4)"] {
            let name = unique_instance_name(&existing, "X");
            assert_eq!(name, expected);
            existing.push(name);
        }
        // A freed slot is reused.
        existing.retain(|n| n != "X (3)");
        assert_eq!(unique_instance_name(&existing, "X"), "X (3)");
    }

    #[test]
    fn state_machine_allows_exactly_the_documented_transitions() {
        use InstanceState::*;
        let all = [Ready, Installing, Running, Crashed, Error];
        let allowed = [
            (Ready, Installing),
            (Installing, Ready),
            (Installing, Error),
            (Ready, Running),
            (Running, Ready),
            (Running, Crashed),
            (Crashed, Installing),
            (Crashed, Running),
        ];

        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "transition {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn current_schema_round_trips() {
        let instance = Instance::new("Test".into(), "1.20.4".into(), None);
        let json = serde_json::to_string_pretty(&instance).unwrap();
        assert!(json.contains("\"schemaVersion\": 1"));

        let (parsed, migrated) = instance_from_json(&json, "test").unwrap();
        assert!(!migrated);
        assert_eq!(parsed.id, instance.id);
        assert_eq!(parsed.version, "1.20.4");
    }

    #[test]
    fn newer_schema_is_refused() {
        let json = r#"{"schemaVersion": 2, "id": "5f2c9d8e-5b1a-4e8f-9df2-aaaaaaaaaaaa", "name": "Future"}"#;
        match instance_from_json(json, "future") {
            Err(AppError::SchemaTooNew {
                found, supported, ..
            }) => {
                assert_eq!(found, 2);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("expected SchemaTooNew, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn v0_documents_migrate_forward() {
        let json = r#"{
            "id": "5f2c9d8e-5b1a-4e8f-9df2-bbbbbbbbbbbb",
            "name": "Old",
            "version": "1.19.2",
            "state": "not_installed",
            "created_at": 1700000000,
            "last_played": 1700003600,
            "java_path": "/old/java",
            "loader": "fabric",
            "loader_version": "0.14.0",
            "java_warning_ignored": true
        }"#;

        let (instance, migrated) = instance_from_json(json, "old").unwrap();
        assert!(migrated);
        assert_eq!(instance.schema_version, SCHEMA_VERSION);
        assert_eq!(instance.state, InstanceState::Ready);
        assert_eq!(instance.loader, Some(ModLoader::Fabric));
        assert_eq!(instance.mc_version.as_deref(), Some("1.19.2"));
        assert_eq!(instance.created_at.timestamp(), 1_700_000_000);
        assert!(instance.java_warning_ignored);
        assert_eq!(instance.playtime_minutes, 0);
    }

    #[test]
    fn version_usage_considers_both_ids() {
        let mut fabric = Instance::new("A".into(), "fabric-loader-0.15.11-1.20.4".into(), None);
        fabric.mc_version = Some("1.20.4".into());
        let vanilla = Instance::new("B".into(), "1.19.2".into(), Some("1.19.2".into()));
        let instances = vec![fabric.clone(), vanilla.clone()];

        assert!(!version_unused(&instances, "1.20.4", None));
        assert!(!version_unused(&instances, "fabric-loader-0.15.11-1.20.4", None));
        assert!(version_unused(&instances, "1.16.5", None));
        // Excluding the only user frees the version.
        assert!(version_unused(&instances, "1.19.2", Some(vanilla.id)));
    }
}
