use md5::{Digest, Md5};
use uuid::Uuid;

/// Deterministic offline-mode UUID: the md5 of `OfflinePlayer:<name>` with
/// the version-3 and RFC 4122 variant bits set, matching the value vanilla
/// servers assign in offline mode.
pub fn offline_player_uuid(player_name: &str) -> Uuid {
    let digest = Md5::digest(format!("OfflinePlayer:{}", player_name).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    uuid::Builder::from_md5_bytes(bytes).into_uuid()
}

/// Splits a legacy `minecraftArguments` string into tokens. The launcher
/// never quotes inside this string upstream, so whitespace splitting is the
/// documented behaviour.
pub fn split_legacy_arguments(arguments: &str) -> Vec<String> {
    arguments.split_whitespace().map(str::to_string).collect()
}
