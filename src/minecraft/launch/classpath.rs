use crate::error::Result;
use crate::minecraft::dto::piston_meta::Library;
use crate::minecraft::launch::rules::RuleProcessor;
use crate::minecraft::launch::version::EffectiveVersion;
use crate::utils::path_utils;
use crate::utils::system_info::{Architecture, OperatingSystem, ARCHITECTURE, OS};
use std::collections::HashMap;
use std::path::PathBuf;

/// Resolves the ordered classpath for an effective version: every allowed
/// library artifact (duplicates deduplicated keeping the last-seen entry)
/// followed by the client jar. Pure over `(effective, os, arch)`.
pub fn resolve_classpath(effective: &EffectiveVersion) -> Result<Vec<PathBuf>> {
    resolve_classpath_for(effective, OS, ARCHITECTURE)
}

pub fn resolve_classpath_for(
    effective: &EffectiveVersion,
    os: OperatingSystem,
    arch: Architecture,
) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for library in &effective.libraries {
        if !RuleProcessor::library_allowed_for(&library.rules, os, arch) {
            continue;
        }
        let Some(path) = artifact_path(library)? else {
            continue;
        };

        let key = library.coordinate_key();
        match index_by_key.get(&key) {
            Some(&i) => entries[i] = (key, path),
            None => {
                index_by_key.insert(key.clone(), entries.len());
                entries.push((key, path));
            }
        }
    }

    let mut classpath: Vec<PathBuf> = entries.into_iter().map(|(_, path)| path).collect();
    classpath.push(path_utils::version_jar_path(&effective.vanilla_id));
    Ok(classpath)
}

/// Shared-store location of a library's main artifact. None for
/// natives-only entries that ship no artifact.
pub fn artifact_path(library: &Library) -> Result<Option<PathBuf>> {
    if let Some(downloads) = &library.downloads {
        if let Some(artifact) = &downloads.artifact {
            let relative = match &artifact.path {
                Some(path) => path.clone(),
                None => path_utils::maven_coords_to_path(&library.name, None)?,
            };
            return Ok(Some(path_utils::libraries_dir().join(relative)));
        }
        if downloads.classifiers.is_some() && downloads.artifact.is_none() {
            return Ok(None);
        }
    }
    // Loader-profile form: name + Maven repository base.
    Ok(Some(path_utils::library_path(&library.name, None)?))
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect::<Vec<_>>()
        .join(OS.classpath_separator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minecraft::dto::piston_meta::{OsRule, Rule};

    fn lib(name: &str, rules: Option<Vec<Rule>>) -> Library {
        Library {
            name: name.to_string(),
            downloads: None,
            url: None,
            sha1: None,
            size: None,
            rules,
            natives: None,
            extract: None,
        }
    }

    fn osx_only() -> Option<Vec<Rule>> {
        Some(vec![Rule {
            action: "allow".to_string(),
            os: Some(OsRule {
                name: Some("osx".to_string()),
                arch: None,
                version: None,
            }),
            features: None,
        }])
    }

    fn effective(libraries: Vec<Library>) -> EffectiveVersion {
        EffectiveVersion {
            id: "1.20.4".into(),
            vanilla_id: "1.20.4".into(),
            main_class: "Main".into(),
            version_type: "release".into(),
            asset_index: None,
            libraries,
            jvm_arguments: vec![],
            game_arguments: vec![],
            minecraft_arguments: None,
            client_download: None,
            java_major: None,
        }
    }

    #[test]
    fn classpath_is_deterministic_per_platform() {
        let effective = effective(vec![
            lib("com.mojang:brigadier:1.2.9", None),
            lib("ca.weblite:java-objc-bridge:1.1", osx_only()),
        ]);

        let linux =
            resolve_classpath_for(&effective, OperatingSystem::Linux, Architecture::X64).unwrap();
        let osx =
            resolve_classpath_for(&effective, OperatingSystem::Osx, Architecture::Aarch64).unwrap();

        // brigadier + client jar on linux; objc bridge joins on osx.
        assert_eq!(linux.len(), 2);
        assert_eq!(osx.len(), 3);

        // Client jar is always the last entry.
        assert!(linux
            .last()
            .unwrap()
            .to_string_lossy()
            .ends_with("1.20.4.jar"));

        // Same inputs, same output.
        let again =
            resolve_classpath_for(&effective, OperatingSystem::Linux, Architecture::X64).unwrap();
        assert_eq!(linux, again);
    }

    #[test]
    fn duplicate_coordinates_keep_last_seen() {
        let effective = effective(vec![
            lib("com.mojang:brigadier:1.2.9", None),
            lib("org.ow2.asm:asm:9.6", None),
            lib("com.mojang:brigadier:1.3.10", None),
        ]);

        let classpath =
            resolve_classpath_for(&effective, OperatingSystem::Linux, Architecture::X64).unwrap();
        // Two libraries + client jar; brigadier resolved to the later version
        // in its original position.
        assert_eq!(classpath.len(), 3);
        assert!(classpath[0].to_string_lossy().contains("1.3.10"));
        assert!(classpath[1].to_string_lossy().contains("asm"));
    }
}
