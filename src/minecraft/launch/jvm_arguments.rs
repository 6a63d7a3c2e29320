use crate::error::Result;
use crate::minecraft::launch::substitutor::ArgumentSubstitutor;
use crate::minecraft::launch::version::EffectiveVersion;
use std::collections::HashMap;
use std::path::PathBuf;

const LAUNCHER_NAME: &str = env!("CARGO_PKG_NAME");
const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct JvmArguments {
    natives_directory: PathBuf,
    classpath: String,
}

impl JvmArguments {
    pub fn new(natives_directory: PathBuf, classpath: String) -> Self {
        Self {
            natives_directory,
            classpath,
        }
    }

    fn substitutor(&self) -> ArgumentSubstitutor {
        ArgumentSubstitutor::new(HashMap::from([
            (
                "natives_directory".to_string(),
                self.natives_directory.to_string_lossy().replace('\\', "/"),
            ),
            ("launcher_name".to_string(), LAUNCHER_NAME.to_string()),
            ("launcher_version".to_string(), LAUNCHER_VERSION.to_string()),
            ("classpath".to_string(), self.classpath.clone()),
            // Separator used by some loader profiles in -DlibraryDirectory style args.
            (
                "classpath_separator".to_string(),
                crate::utils::system_info::OS.classpath_separator().to_string(),
            ),
        ]))
    }

    /// Expands the version's JVM argument list, or the classic fallback for
    /// versions predating `arguments.jvm`.
    pub fn build(&self, effective: &EffectiveVersion) -> Result<Vec<String>> {
        let substitutor = self.substitutor();

        if !effective.jvm_arguments.is_empty() {
            return substitutor.process(&effective.jvm_arguments);
        }

        Ok(vec![
            format!(
                "-Djava.library.path={}",
                self.natives_directory.to_string_lossy().replace('\\', "/")
            ),
            "-cp".to_string(),
            self.classpath.clone(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minecraft::dto::piston_meta::GameArgument;

    #[test]
    fn expands_jvm_variables() {
        let effective = EffectiveVersion {
            id: "1.20.4".into(),
            vanilla_id: "1.20.4".into(),
            main_class: "Main".into(),
            version_type: "release".into(),
            asset_index: None,
            libraries: vec![],
            jvm_arguments: vec![
                GameArgument::Simple("-Djava.library.path=${natives_directory}".into()),
                GameArgument::Simple("-cp".into()),
                GameArgument::Simple("${classpath}".into()),
            ],
            game_arguments: vec![],
            minecraft_arguments: None,
            client_download: None,
            java_major: None,
        };

        let args = JvmArguments::new(PathBuf::from("/inst/natives"), "a.jar:b.jar".into())
            .build(&effective)
            .unwrap();
        assert_eq!(
            args,
            vec!["-Djava.library.path=/inst/natives", "-cp", "a.jar:b.jar"]
        );
    }

    #[test]
    fn legacy_fallback_provides_classpath_and_natives() {
        let effective = EffectiveVersion {
            id: "1.8.9".into(),
            vanilla_id: "1.8.9".into(),
            main_class: "Main".into(),
            version_type: "release".into(),
            asset_index: None,
            libraries: vec![],
            jvm_arguments: vec![],
            game_arguments: vec![],
            minecraft_arguments: Some("--username ${auth_player_name}".into()),
            client_download: None,
            java_major: None,
        };

        let args = JvmArguments::new(PathBuf::from("/inst/natives"), "cp".into())
            .build(&effective)
            .unwrap();
        assert_eq!(args[0], "-Djava.library.path=/inst/natives");
        assert_eq!(args[1], "-cp");
    }
}
