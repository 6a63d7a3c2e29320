pub mod modrinth;
pub mod mrpack;
