use kiln_launcher_lib::minecraft::dto::piston_meta::VersionJson;
use kiln_launcher_lib::minecraft::launch::classpath;
use kiln_launcher_lib::minecraft::launch::version::merge_chain;

const VANILLA_1_20_4: &str = r#"{
    "id": "1.20.4",
    "type": "release",
    "mainClass": "net.minecraft.client.main.Main",
    "assetIndex": {
        "id": "12",
        "sha1": "ad635e011c664a4b46f2705adc4dd0f195e0d906",
        "size": 429137,
        "totalSize": 624576012,
        "url": "https://piston-meta.mojang.com/v1/packages/ad63/12.json"
    },
    "assets": "12",
    "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17},
    "downloads": {
        "client": {
            "sha1": "fd19469fed4a4b4c15b2d5133985f0e3e7816a8a",
            "size": 26836080,
            "url": "https://piston-data.mojang.com/v1/objects/fd19/client.jar"
        }
    },
    "libraries": [
        {
            "downloads": {
                "artifact": {
                    "path": "com/mojang/brigadier/1.2.9/brigadier-1.2.9.jar",
                    "sha1": "9de9a1cd5a1a4e3e0f9ac18271f4c5da0a5d2e1f",
                    "size": 77392,
                    "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.2.9/brigadier-1.2.9.jar"
                }
            },
            "name": "com.mojang:brigadier:1.2.9"
        },
        {
            "downloads": {
                "artifact": {
                    "path": "ca/weblite/java-objc-bridge/1.1/java-objc-bridge-1.1.jar",
                    "sha1": "1227f9e0666314f9de41477e3ec277e542ed7f7b",
                    "size": 1330045,
                    "url": "https://libraries.minecraft.net/ca/weblite/java-objc-bridge/1.1/java-objc-bridge-1.1.jar"
                }
            },
            "name": "ca.weblite:java-objc-bridge:1.1",
            "rules": [{"action": "allow", "os": {"name": "osx"}}]
        }
    ],
    "arguments": {
        "game": ["--username", "${auth_player_name}", "--version", "${version_name}"],
        "jvm": [
            {
                "rules": [{"action": "allow", "os": {"name": "osx"}}],
                "value": ["-XstartOnFirstThread"]
            },
            "-Djava.library.path=${natives_directory}",
            "-cp",
            "${classpath}"
        ]
    }
}"#;

const FABRIC_PROFILE: &str = r#"{
    "id": "fabric-loader-0.15.11-1.20.4",
    "inheritsFrom": "1.20.4",
    "type": "release",
    "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
    "libraries": [
        {
            "name": "net.fabricmc:fabric-loader:0.15.11",
            "url": "https://maven.fabricmc.net/",
            "sha1": "a6f31dbb192d5c2750ebb0e7a6ee2bd2f5c16aa5",
            "size": 1556497
        },
        {
            "name": "net.fabricmc:intermediary:1.20.4",
            "url": "https://maven.fabricmc.net/"
        }
    ],
    "arguments": {
        "game": [],
        "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]
    }
}"#;

const LEGACY_1_8_9: &str = r#"{
    "id": "1.8.9",
    "type": "release",
    "mainClass": "net.minecraft.client.main.Main",
    "minecraftArguments": "--username ${auth_player_name} --gameDir ${game_directory} --assetsDir ${game_assets}",
    "assets": "1.8",
    "libraries": []
}"#;

fn parse(json: &str) -> VersionJson {
    serde_json::from_str(json).expect("fixture parses")
}

#[test]
fn vanilla_resolves_standalone() {
    let effective = merge_chain(vec![parse(VANILLA_1_20_4)]).unwrap();

    assert_eq!(effective.id, "1.20.4");
    assert_eq!(effective.vanilla_id, "1.20.4");
    assert_eq!(effective.main_class, "net.minecraft.client.main.Main");
    assert_eq!(effective.java_major, Some(17));
    assert_eq!(effective.asset_index_id(), Some("12"));
    assert_eq!(effective.required_java(), 17);
    assert_eq!(effective.libraries.len(), 2);
}

#[test]
fn fabric_overlay_keeps_vanilla_scalars_and_adds_libraries() {
    let effective = merge_chain(vec![parse(VANILLA_1_20_4), parse(FABRIC_PROFILE)]).unwrap();

    // The overlay wins the main class, the parent fills everything it left out.
    assert_eq!(
        effective.main_class,
        "net.fabricmc.loader.impl.launch.knot.KnotClient"
    );
    assert_eq!(effective.id, "fabric-loader-0.15.11-1.20.4");
    assert_eq!(effective.vanilla_id, "1.20.4");
    assert_eq!(effective.java_major, Some(17));
    assert!(effective.client_download.is_some());
    assert_eq!(effective.asset_index_id(), Some("12"));

    // 2 vanilla + 2 fabric libraries, no coordinate collisions.
    assert_eq!(effective.libraries.len(), 4);

    // JVM arguments concatenate parent-first: 4 vanilla entries + 1 fabric.
    assert_eq!(effective.jvm_arguments.len(), 5);
}

#[test]
fn fabric_classpath_contains_loader_and_ends_with_client_jar() {
    let effective = merge_chain(vec![parse(VANILLA_1_20_4), parse(FABRIC_PROFILE)]).unwrap();
    let entries = classpath::resolve_classpath(&effective).unwrap();

    let rendered: Vec<String> = entries
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    assert!(rendered
        .iter()
        .any(|p| p.contains("net/fabricmc/fabric-loader/0.15.11/fabric-loader-0.15.11.jar")));
    assert!(rendered.last().unwrap().ends_with("1.20.4.jar"));

    // Deterministic over repeated resolution.
    assert_eq!(entries, classpath::resolve_classpath(&effective).unwrap());
}

#[test]
fn legacy_versions_keep_minecraft_arguments() {
    let effective = merge_chain(vec![parse(LEGACY_1_8_9)]).unwrap();
    assert!(effective.game_arguments.is_empty());
    assert!(effective
        .minecraft_arguments
        .as_deref()
        .unwrap()
        .contains("${game_assets}"));
    assert_eq!(effective.required_java(), 8);
}
