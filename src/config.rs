use directories::ProjectDirs;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

pub static LAUNCHER_DIRECTORY: Lazy<ProjectDirs> =
    Lazy::new(|| match ProjectDirs::from("dev", "kiln", "KilnLauncher") {
        Some(proj_dirs) => proj_dirs,
        None => panic!("Failed to resolve launcher data directory"),
    });

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared HTTP client with the launcher user agent and the global timeouts.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    reqwest::ClientBuilder::new()
        .user_agent(APP_USER_AGENT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
});
