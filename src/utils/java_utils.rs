use crate::error::{AppError, Result};
use log::{debug, warn};
use serde::Serialize;
use std::time::Duration;

const JAVA_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Java requirement when the effective version JSON does not carry one:
/// 8 up to 1.16, 17 for 1.17–1.20.4, 21 for everything newer (and for
/// ids we cannot parse, which are snapshots of recent versions).
pub fn default_required_java(mc_version: &str) -> u32 {
    match parse_release(mc_version) {
        Some((1, minor, _)) if minor <= 16 => 8,
        Some((1, minor, patch)) if minor < 20 || (minor == 20 && patch <= 4) => 17,
        _ => 21,
    }
}

fn parse_release(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

/// Parses the major version out of `java -version` stderr output.
///
/// Handles both modern (`openjdk version "17.0.1" ...`) and legacy
/// (`java version "1.8.0_311"`) formats.
pub fn parse_java_major(version_output: &str) -> Option<u32> {
    let first_line = version_output.lines().next()?;
    let quoted = first_line.split('"').nth(1)?;
    let mut parts = quoted.split('.');
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.split('_').next()?.parse().ok()
    } else {
        Some(first)
    }
}

/// Runs `<java_path> -version` with a 3 s timeout and returns the reported
/// major version. None when the binary is missing, times out, or prints
/// something unrecognisable.
pub async fn probe_java_major(java_path: &str) -> Option<u32> {
    let mut command = tokio::process::Command::new(java_path);
    command.arg("-version");
    let output = tokio::time::timeout(JAVA_PROBE_TIMEOUT, command.output()).await;

    match output {
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            parse_java_major(&stderr).or_else(|| {
                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_java_major(&stdout)
            })
        }
        Ok(Err(e)) => {
            debug!("Java probe failed for {}: {}", java_path, e);
            None
        }
        Err(_) => {
            warn!("Java probe timed out for {}", java_path);
            None
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct JavaCompatibility {
    pub compatible: bool,
    pub actual_version: Option<u32>,
    pub required_version: u32,
    pub path: String,
}

/// Probes `java_path` against `required` and errors with the full context
/// when the versions disagree.
pub async fn assert_java_compatible(java_path: &str, required: u32) -> Result<u32> {
    let actual = probe_java_major(java_path).await;
    match actual {
        Some(version) if version == required => Ok(version),
        _ => Err(AppError::JavaIncompatible {
            actual,
            required,
            path: java_path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_java_follows_release_bands() {
        assert_eq!(default_required_java("1.8.9"), 8);
        assert_eq!(default_required_java("1.12.2"), 8);
        assert_eq!(default_required_java("1.16.5"), 8);
        assert_eq!(default_required_java("1.17"), 17);
        assert_eq!(default_required_java("1.18.2"), 17);
        assert_eq!(default_required_java("1.20.4"), 17);
        assert_eq!(default_required_java("1.20.5"), 21);
        assert_eq!(default_required_java("1.21"), 21);
        // Snapshot ids fall through to the newest band.
        assert_eq!(default_required_java("24w14a"), 21);
    }

    #[test]
    fn parses_modern_and_legacy_version_strings() {
        assert_eq!(
            parse_java_major("openjdk version \"17.0.1\" 2021-10-19"),
            Some(17)
        );
        assert_eq!(parse_java_major("java version \"1.8.0_311\""), Some(8));
        assert_eq!(
            parse_java_major("openjdk version \"21\" 2023-09-19"),
            Some(21)
        );
        assert_eq!(parse_java_major("not java at all"), None);
    }
}
