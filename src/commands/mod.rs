pub mod config_commands;
pub mod instance_commands;
pub mod minecraft_commands;
pub mod mod_commands;
pub mod modrinth_commands;
pub mod process_commands;
