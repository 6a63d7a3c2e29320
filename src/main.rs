// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod commands;
mod config;
mod error;
mod integrations;
mod logging;
mod minecraft;
mod state;
mod utils;

use log::{error, info};
use std::sync::Arc;

use commands::config_commands::{
    clear_asset_cache, cleanup_unused_versions, get_cleanup_info, get_settings, get_system_info,
    open_path, save_settings,
};
use commands::instance_commands::{
    check_version_usage, clear_instance_logs, create_instance, delete_instance,
    get_instance_crash_logs, get_instance_minecraft_dir, get_instance_saves_dir,
    get_instance_screenshots_dir, list_instance_screenshots, list_instance_servers,
    list_instance_worlds, list_instances, save_instance,
};
use commands::minecraft_commands::{
    abort_install, check_java_compatibility, download_version, get_loader_versions,
    get_version_manifest, install_loader,
};
use commands::mod_commands::{check_mod_updates, list_instance_mods, remove_mod, toggle_mod};
use commands::modrinth_commands::{
    download_loader_version, find_loader_candidates, get_compatible_mod_versions,
    get_popular_mods, get_project_versions, install_modpack_version, install_modrinth_mod,
    search_projects,
};
use commands::process_commands::{kill_instance, launch_instance};

fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let app_handle = Arc::new(app.handle().clone());
            tauri::async_runtime::spawn(async move {
                if let Err(e) = logging::setup_logging().await {
                    eprintln!("Failed to initialize logging: {}", e);
                }
                info!("Starting Kiln Launcher core...");
                if let Err(e) = state::State::init(app_handle).await {
                    error!("Launcher state initialization failed: {}", e);
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_version_manifest,
            download_version,
            abort_install,
            install_loader,
            get_loader_versions,
            check_java_compatibility,
            list_instances,
            create_instance,
            save_instance,
            delete_instance,
            check_version_usage,
            get_instance_minecraft_dir,
            get_instance_screenshots_dir,
            get_instance_saves_dir,
            list_instance_screenshots,
            list_instance_worlds,
            list_instance_servers,
            get_instance_crash_logs,
            clear_instance_logs,
            launch_instance,
            kill_instance,
            search_projects,
            get_project_versions,
            get_compatible_mod_versions,
            get_popular_mods,
            install_modrinth_mod,
            install_modpack_version,
            find_loader_candidates,
            download_loader_version,
            list_instance_mods,
            toggle_mod,
            remove_mod,
            check_mod_updates,
            get_settings,
            save_settings,
            get_system_info,
            get_cleanup_info,
            cleanup_unused_versions,
            clear_asset_cache,
            open_path,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
