use crate::error::Result;
use crate::minecraft::launch::substitutor::ArgumentSubstitutor;
use crate::minecraft::launch::version::EffectiveVersion;
use crate::utils::{mc_utils, path_utils};
use std::collections::HashMap;
use std::path::PathBuf;

/// Builds the game-argument substitutions for an offline-mode session.
pub struct GameArguments {
    player_name: String,
    version_id: String,
    version_type: String,
    game_directory: PathBuf,
    asset_index_id: String,
    legacy_assets: bool,
}

impl GameArguments {
    pub fn new(player_name: String, effective: &EffectiveVersion, game_directory: PathBuf) -> Self {
        Self {
            player_name,
            version_id: effective.id.clone(),
            version_type: effective.version_type.clone(),
            game_directory,
            asset_index_id: effective
                .asset_index_id()
                .unwrap_or("legacy")
                .to_string(),
            legacy_assets: false,
        }
    }

    /// Legacy asset indexes point `${game_assets}` at the virtual mirror.
    pub fn with_legacy_assets(mut self, legacy: bool) -> Self {
        self.legacy_assets = legacy;
        self
    }

    pub fn substitutor(&self) -> ArgumentSubstitutor {
        let offline_uuid = mc_utils::offline_player_uuid(&self.player_name);
        let assets_root = path_utils::assets_dir();
        let game_assets = if self.legacy_assets {
            path_utils::legacy_assets_dir()
        } else {
            assets_root.clone()
        };

        ArgumentSubstitutor::new(HashMap::from([
            ("auth_player_name".into(), self.player_name.clone()),
            ("version_name".into(), self.version_id.clone()),
            (
                "game_directory".into(),
                self.game_directory.to_string_lossy().to_string(),
            ),
            ("assets_root".into(), assets_root.to_string_lossy().to_string()),
            ("game_assets".into(), game_assets.to_string_lossy().to_string()),
            ("assets_index_name".into(), self.asset_index_id.clone()),
            ("auth_uuid".into(), offline_uuid.to_string()),
            ("auth_access_token".into(), "0".into()),
            ("auth_session".into(), "0".into()),
            ("user_type".into(), "offline".into()),
            ("user_properties".into(), "{}".into()),
            ("version_type".into(), self.version_type.clone()),
            ("auth_xuid".into(), "0".into()),
            ("clientid".into(), "0".into()),
        ]))
    }

    /// Expands either the modern argument list or the legacy
    /// `minecraftArguments` string.
    pub fn build(&self, effective: &EffectiveVersion) -> Result<Vec<String>> {
        let substitutor = self.substitutor();

        if !effective.game_arguments.is_empty() {
            return substitutor.process(&effective.game_arguments);
        }

        let mut args = Vec::new();
        if let Some(legacy) = &effective.minecraft_arguments {
            for token in mc_utils::split_legacy_arguments(legacy) {
                args.push(substitutor.substitute(&token)?);
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minecraft::dto::piston_meta::GameArgument;

    fn effective(game_args: Vec<GameArgument>, legacy: Option<&str>) -> EffectiveVersion {
        EffectiveVersion {
            id: "1.20.4".to_string(),
            vanilla_id: "1.20.4".to_string(),
            main_class: "net.minecraft.client.main.Main".to_string(),
            version_type: "release".to_string(),
            asset_index: None,
            libraries: vec![],
            jvm_arguments: vec![],
            game_arguments: game_args,
            minecraft_arguments: legacy.map(String::from),
            client_download: None,
            java_major: None,
        }
    }

    #[test]
    fn expands_modern_arguments() {
        let effective = effective(
            vec![
                GameArgument::Simple("--username".into()),
                GameArgument::Simple("${auth_player_name}".into()),
                GameArgument::Simple("--userType".into()),
                GameArgument::Simple("${user_type}".into()),
            ],
            None,
        );
        let args = GameArguments::new("Steve".into(), &effective, PathBuf::from("/tmp/mc"))
            .build(&effective)
            .unwrap();
        assert_eq!(args, vec!["--username", "Steve", "--userType", "offline"]);
    }

    #[test]
    fn expands_legacy_argument_string() {
        let effective = effective(
            vec![],
            Some("--username ${auth_player_name} --session ${auth_session}"),
        );
        let args = GameArguments::new("Alex".into(), &effective, PathBuf::from("/tmp/mc"))
            .build(&effective)
            .unwrap();
        assert_eq!(args, vec!["--username", "Alex", "--session", "0"]);
    }

    #[test]
    fn offline_uuid_is_stable_per_player() {
        let effective = effective(vec![GameArgument::Simple("${auth_uuid}".into())], None);
        let run = |name: &str| {
            GameArguments::new(name.into(), &effective, PathBuf::from("/tmp/mc"))
                .build(&effective)
                .unwrap()
        };
        assert_eq!(run("Steve"), run("Steve"));
        assert_ne!(run("Steve"), run("Alex"));
    }
}
