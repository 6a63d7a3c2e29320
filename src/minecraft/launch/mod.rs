pub mod classpath;
pub mod game_arguments;
pub mod jvm_arguments;
pub mod launcher;
pub mod rules;
pub mod substitutor;
pub mod version;
