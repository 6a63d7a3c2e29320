//! End-to-end scenarios against the live Mojang and Fabric endpoints.
//! They download real files into the launcher data root, so they are
//! ignored by default:
//!
//! `cargo test --test e2e_install_tests -- --ignored --show-output`

use kiln_launcher_lib::minecraft::installer;
use kiln_launcher_lib::minecraft::launch::version::resolve_effective;
use kiln_launcher_lib::minecraft::modloader;
use kiln_launcher_lib::state::instance_state::ModLoader;
use kiln_launcher_lib::state::State;
use kiln_launcher_lib::utils::path_utils;

#[tokio::test]
#[ignore] // network + disk
async fn fresh_vanilla_1_20_4_materialises_and_is_idempotent() {
    State::init_headless().await.unwrap();
    let state = State::get().await.unwrap();

    let instance = state
        .instance_manager
        .create("Minecraft 1.20.4", "1.20.4", Some("1.20.4".to_string()))
        .await
        .unwrap();

    installer::run_exclusive(
        instance.id,
        installer::run_install(instance.id, Some("1.20.4".to_string())),
    )
    .await
    .unwrap();

    assert!(path_utils::version_json_path("1.20.4").exists());
    assert!(path_utils::version_jar_path("1.20.4").exists());

    let effective = resolve_effective("1.20.4").await.unwrap();
    assert_eq!(effective.main_class, "net.minecraft.client.main.Main");

    // Second run: identical filesystem, everything verified in place.
    installer::run_exclusive(
        instance.id,
        installer::run_install(instance.id, Some("1.20.4".to_string())),
    )
    .await
    .unwrap();

    state.instance_manager.delete(instance.id, false).await.unwrap();
}

#[tokio::test]
#[ignore] // network + disk
async fn fabric_loader_derives_a_launchable_version() {
    State::init_headless().await.unwrap();

    let derived = modloader::install_loader_version(ModLoader::Fabric, "1.20.4", "0.15.11")
        .await
        .unwrap();
    assert_eq!(derived, "fabric-loader-0.15.11-1.20.4");
    assert!(path_utils::version_json_path(&derived).exists());

    let effective = resolve_effective(&derived).await.unwrap();
    assert_eq!(
        effective.main_class,
        "net.fabricmc.loader.impl.launch.knot.KnotClient"
    );
    assert_eq!(effective.vanilla_id, "1.20.4");
}

#[tokio::test]
#[ignore] // network
async fn loader_version_listing_has_stable_entries() {
    let versions = modloader::list_loader_versions(ModLoader::Fabric, "1.20.4", false)
        .await
        .unwrap();
    assert!(!versions.is_empty());
}
