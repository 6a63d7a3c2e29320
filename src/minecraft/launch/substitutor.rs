use crate::error::{AppError, Result};
use crate::minecraft::dto::piston_meta::GameArgument;
use crate::minecraft::launch::rules::RuleProcessor;
use std::collections::HashMap;

/// Pure `${var}` substitution over argument tokens. A variable without a
/// binding is an error, never an empty string.
pub struct ArgumentSubstitutor {
    bindings: HashMap<String, String>,
}

impl ArgumentSubstitutor {
    pub fn new(bindings: HashMap<String, String>) -> Self {
        Self { bindings }
    }

    pub fn substitute(&self, token: &str) -> Result<String> {
        let mut out = token.to_string();
        for (key, value) in &self.bindings {
            let pattern = format!("${{{}}}", key);
            if out.contains(&pattern) {
                out = out.replace(&pattern, value);
            }
        }

        if let Some(start) = out.find("${") {
            let rest = &out[start..];
            let variable = rest
                .find('}')
                .map(|end| &rest[..=end])
                .unwrap_or(rest);
            return Err(AppError::MissingArgument(variable.to_string()));
        }

        Ok(out)
    }

    /// Expands an upstream argument list: simple tokens are substituted,
    /// complex entries are dropped unless their rules allow them.
    pub fn process(&self, arguments: &[GameArgument]) -> Result<Vec<String>> {
        let mut processed = Vec::new();
        for argument in arguments {
            match argument {
                GameArgument::Simple(token) => processed.push(self.substitute(token)?),
                GameArgument::Complex(complex) => {
                    if RuleProcessor::argument_allowed(&complex.rules) {
                        for token in complex.value.to_vec() {
                            processed.push(self.substitute(&token)?);
                        }
                    }
                }
            }
        }
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitutor() -> ArgumentSubstitutor {
        ArgumentSubstitutor::new(HashMap::from([
            ("auth_player_name".to_string(), "Steve".to_string()),
            ("game_directory".to_string(), "/data/.minecraft".to_string()),
        ]))
    }

    #[test]
    fn replaces_known_variables() {
        let s = substitutor();
        assert_eq!(s.substitute("${auth_player_name}").unwrap(), "Steve");
        assert_eq!(
            s.substitute("--gameDir=${game_directory}").unwrap(),
            "--gameDir=/data/.minecraft"
        );
        assert_eq!(s.substitute("--demo").unwrap(), "--demo");
    }

    #[test]
    fn unresolved_variable_is_an_error() {
        let err = substitutor().substitute("${auth_access_token}").unwrap_err();
        match err {
            AppError::MissingArgument(var) => assert_eq!(var, "${auth_access_token}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn processes_simple_argument_list() {
        let args = vec![
            GameArgument::Simple("--username".to_string()),
            GameArgument::Simple("${auth_player_name}".to_string()),
        ];
        assert_eq!(
            substitutor().process(&args).unwrap(),
            vec!["--username", "Steve"]
        );
    }
}
