use crate::error::Result;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Clone)]
pub struct WorldInfo {
    pub folder_name: String,
    pub icon_path: Option<String>,
    pub last_modified: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub ip: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServersDat {
    #[serde(default)]
    servers: Vec<ServerEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

/// Scans `saves/` below the game directory for world folders.
pub async fn list_worlds(minecraft_dir: &Path) -> Result<Vec<WorldInfo>> {
    let saves = minecraft_dir.join("saves");
    let mut worlds = Vec::new();
    if !saves.exists() {
        return Ok(worlds);
    }

    let mut entries = fs::read_dir(&saves).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_dir() {
            continue;
        }
        let folder = entry.path();
        // A world folder carries level.dat; anything else is clutter.
        if !folder.join("level.dat").exists() {
            continue;
        }

        let icon = folder.join("icon.png");
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        worlds.push(WorldInfo {
            folder_name: entry.file_name().to_string_lossy().to_string(),
            icon_path: icon.exists().then(|| icon.to_string_lossy().to_string()),
            last_modified,
        });
    }

    worlds.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(worlds)
}

/// Parses `servers.dat` (NBT, gzip-optional) and returns the server list.
pub async fn list_servers(minecraft_dir: &Path) -> Result<Vec<ServerInfo>> {
    let path = minecraft_dir.join("servers.dat");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(&path).await?;
    parse_servers_dat(&bytes)
}

pub fn parse_servers_dat(bytes: &[u8]) -> Result<Vec<ServerInfo>> {
    // Gzip magic; vanilla writes servers.dat uncompressed, but older tooling
    // sometimes gzips it.
    let payload: Vec<u8> = if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        out
    } else {
        bytes.to_vec()
    };

    let parsed: ServersDat = fastnbt::from_bytes(&payload)?;
    Ok(parsed
        .servers
        .into_iter()
        .map(|entry| ServerInfo {
            name: entry.name.unwrap_or_else(|| "Unnamed server".to_string()),
            ip: entry.ip.unwrap_or_default(),
            icon: entry.icon,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestServersDat {
        servers: Vec<TestServer>,
    }

    #[derive(Serialize)]
    struct TestServer {
        name: String,
        ip: String,
    }

    fn fixture_bytes() -> Vec<u8> {
        fastnbt::to_bytes(&TestServersDat {
            servers: vec![
                TestServer {
                    name: "Hypixel".to_string(),
                    ip: "mc.hypixel.net".to_string(),
                },
                TestServer {
                    name: "Local".to_string(),
                    ip: "127.0.0.1:25565".to_string(),
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn parses_plain_servers_dat() {
        let servers = parse_servers_dat(&fixture_bytes()).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "Hypixel");
        assert_eq!(servers[1].ip, "127.0.0.1:25565");
        assert!(servers[0].icon.is_none());
    }

    #[test]
    fn parses_gzipped_servers_dat() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&fixture_bytes()).unwrap();
        let gzipped = encoder.finish().unwrap();

        let servers = parse_servers_dat(&gzipped).unwrap();
        assert_eq!(servers.len(), 2);
    }

    #[tokio::test]
    async fn lists_only_real_world_folders() {
        let dir = tempfile::tempdir().unwrap();
        let saves = dir.path().join("saves");
        std::fs::create_dir_all(saves.join("My World")).unwrap();
        std::fs::write(saves.join("My World/level.dat"), b"nbt").unwrap();
        std::fs::create_dir_all(saves.join("not-a-world")).unwrap();

        let worlds = list_worlds(dir.path()).await.unwrap();
        assert_eq!(worlds.len(), 1);
        assert_eq!(worlds[0].folder_name, "My World");
    }
}
