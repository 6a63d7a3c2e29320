use crate::error::{AppError, Result};
use crate::minecraft::api::mc_api;
use crate::minecraft::dto::piston_meta::{
    AssetIndexRef, DownloadInfo, GameArgument, Library, VersionJson,
};
use log::debug;
use std::collections::HashMap;

const MAX_INHERITANCE_DEPTH: usize = 8;

/// The merged view of a version after following `inheritsFrom` to its root.
/// Held in memory only; the raw JSON files on disk are never modified.
#[derive(Debug, Clone)]
pub struct EffectiveVersion {
    /// Leaf id (a derived loader id when a loader is installed).
    pub id: String,
    /// Root of the inheritance chain, the pure vanilla id.
    pub vanilla_id: String,
    pub main_class: String,
    pub version_type: String,
    pub asset_index: Option<AssetIndexRef>,
    pub libraries: Vec<Library>,
    pub jvm_arguments: Vec<GameArgument>,
    pub game_arguments: Vec<GameArgument>,
    pub minecraft_arguments: Option<String>,
    pub client_download: Option<DownloadInfo>,
    pub java_major: Option<u32>,
}

impl EffectiveVersion {
    pub fn required_java(&self) -> u32 {
        self.java_major
            .unwrap_or_else(|| crate::utils::java_utils::default_required_java(&self.vanilla_id))
    }

    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index.as_ref().map(|ai| ai.id.as_str())
    }
}

/// Resolves `version_id` into its effective version: loads the leaf JSON,
/// follows `inheritsFrom` (fetching vanilla parents on demand) and folds the
/// chain root-first.
pub async fn resolve_effective(version_id: &str) -> Result<EffectiveVersion> {
    let mut chain = Vec::new();
    let mut current = version_id.to_string();

    loop {
        if chain.len() >= MAX_INHERITANCE_DEPTH {
            return Err(AppError::SchemaInvalid(format!(
                "inheritsFrom chain for {} exceeds depth {}",
                version_id, MAX_INHERITANCE_DEPTH
            )));
        }
        let version = mc_api::load_version_json(&current).await?;
        let parent = version.inherits_from.clone();
        chain.push(version);
        match parent {
            Some(parent_id) => current = parent_id,
            None => break,
        }
    }

    chain.reverse();
    debug!(
        "Resolved inheritance chain for {}: {:?}",
        version_id,
        chain.iter().map(|v| v.id.as_str()).collect::<Vec<_>>()
    );
    merge_chain(chain)
}

/// Folds an inheritance chain ordered root-first into one record. Libraries
/// merge by `group:artifact` with later entries overriding earlier ones,
/// argument lists concatenate, scalar fields take the value nearest the
/// leaf.
pub fn merge_chain(chain: Vec<VersionJson>) -> Result<EffectiveVersion> {
    let mut iter = chain.into_iter();
    let root = iter
        .next()
        .ok_or_else(|| AppError::SchemaInvalid("empty inheritance chain".to_string()))?;

    let vanilla_id = root.id.clone();
    let mut id = root.id.clone();
    let mut main_class = root.main_class;
    let mut version_type = root.version_type;
    let mut asset_index = root.asset_index;
    let mut minecraft_arguments = root.minecraft_arguments;
    let mut client_download = root.downloads.map(|d| d.client);
    let mut java_major = root.java_version.map(|j| j.major_version);
    let mut libraries = root.libraries;
    let (mut jvm_arguments, mut game_arguments) = match root.arguments {
        Some(args) => (args.jvm, args.game),
        None => (Vec::new(), Vec::new()),
    };

    for overlay in iter {
        id = overlay.id;
        main_class = overlay.main_class.or(main_class);
        version_type = overlay.version_type.or(version_type);
        asset_index = overlay.asset_index.or(asset_index);
        minecraft_arguments = overlay.minecraft_arguments.or(minecraft_arguments);
        client_download = overlay.downloads.map(|d| d.client).or(client_download);
        java_major = overlay.java_version.map(|j| j.major_version).or(java_major);
        libraries = merge_libraries(libraries, overlay.libraries);
        if let Some(args) = overlay.arguments {
            jvm_arguments.extend(args.jvm);
            game_arguments.extend(args.game);
        }
    }

    Ok(EffectiveVersion {
        main_class: main_class
            .ok_or_else(|| AppError::SchemaInvalid(format!("version {} has no mainClass", id)))?,
        version_type: version_type.unwrap_or_else(|| "release".to_string()),
        id,
        vanilla_id,
        asset_index,
        libraries,
        jvm_arguments,
        game_arguments,
        minecraft_arguments,
        client_download,
        java_major,
    })
}

fn merge_libraries(base: Vec<Library>, overlay: Vec<Library>) -> Vec<Library> {
    let mut merged = base;
    let mut index_by_key: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, lib)| (lib.coordinate_key(), i))
        .collect();

    for library in overlay {
        let key = library.coordinate_key();
        match index_by_key.get(&key) {
            Some(&i) => merged[i] = library,
            None => {
                index_by_key.insert(key, merged.len());
                merged.push(library);
            }
        }
    }
    merged
}
