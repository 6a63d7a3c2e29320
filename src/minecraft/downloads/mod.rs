pub mod assets_download;
pub mod client_download;
pub mod libraries_download;
