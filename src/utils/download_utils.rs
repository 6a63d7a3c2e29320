use crate::config::HTTP_CLIENT;
use crate::error::{strip_query, AppError, Result};
use crate::utils::{hash_utils, path_utils};
use futures::stream::StreamExt;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 8;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_MS: [u64; 3] = [250, 1000, 4000];

static DOWNLOAD_SEMAPHORE: OnceCell<Semaphore> = OnceCell::new();

/// Sets the global download bound. Only the first call wins; later calls are
/// ignored so the limit stays stable for the process lifetime.
pub fn configure_concurrency(limit: usize) {
    let limit = limit.clamp(1, 64);
    if DOWNLOAD_SEMAPHORE.set(Semaphore::new(limit)).is_err() {
        debug!("Download concurrency already configured, ignoring new limit {}", limit);
    }
}

fn semaphore() -> &'static Semaphore {
    DOWNLOAD_SEMAPHORE.get_or_init(|| Semaphore::new(DEFAULT_CONCURRENT_DOWNLOADS))
}

/// Expected properties of a download target.
#[derive(Debug, Clone, Default)]
pub struct DownloadConfig {
    pub expected_sha1: Option<String>,
    pub expected_size: Option<u64>,
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sha1<S: Into<String>>(mut self, sha1: S) -> Self {
        self.expected_sha1 = Some(sha1.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }
}

fn retriable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

/// Typed GET with the shared retry policy.
pub async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    let text = get_text(url).await?;
    serde_json::from_str(&text).map_err(AppError::Json)
}

pub async fn get_text(url: &str) -> Result<String> {
    let mut last_error: Option<AppError> = None;

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(BACKOFF_MS[attempt as usize - 1])).await;
            warn!("Retry {}/{} for {}", attempt, MAX_ATTEMPTS - 1, strip_query(url));
        }

        match HTTP_CLIENT.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.text().await.map_err(AppError::Request);
                }
                let error = AppError::HttpStatus {
                    status: status.as_u16(),
                    url: strip_query(url),
                };
                if !retriable_status(status) {
                    return Err(error);
                }
                last_error = Some(error);
            }
            Err(e) => last_error = Some(AppError::Request(e)),
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::Download(strip_query(url))))
}

pub struct DownloadUtils;

impl DownloadUtils {
    /// Downloads `url` to `dest`, gated by the global semaphore.
    ///
    /// The body is streamed into `<dest>.tmp` while hashing and only renamed
    /// over `dest` once the expected SHA-1 and size hold, so a crash or
    /// mismatch never leaves a corrupt file at the final path. A pre-existing
    /// destination that already passes verification short-circuits without
    /// network I/O.
    pub async fn download_file<P: AsRef<Path>>(
        url: &str,
        dest: P,
        config: DownloadConfig,
    ) -> Result<()> {
        let dest = dest.as_ref();

        if Self::verify_existing(dest, &config).await? {
            debug!("Already present and verified: {:?}", dest);
            return Ok(());
        }

        let _permit = semaphore().acquire().await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut last_error: Option<AppError> = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(BACKOFF_MS[attempt as usize - 1])).await;
                warn!(
                    "Retry {}/{} for {}",
                    attempt,
                    MAX_ATTEMPTS - 1,
                    strip_query(url)
                );
            }

            match Self::attempt(url, dest, &config).await {
                Ok(()) => return Ok(()),
                // 4xx (except 429) and checksum mismatches are terminal.
                Err(e @ AppError::ChecksumMismatch { .. }) => return Err(e),
                Err(AppError::HttpStatus { status, url }) if status != 429 && status < 500 => {
                    return Err(AppError::HttpStatus { status, url })
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Download(strip_query(url))))
    }

    async fn attempt(url: &str, dest: &Path, config: &DownloadConfig) -> Result<()> {
        let response = HTTP_CLIENT.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: strip_query(url),
            });
        }

        let tmp_path = path_utils::tmp_sibling(dest);
        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            let mut hasher = Sha1::new();
            let mut written: u64 = 0;
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(AppError::Request)?;
                hasher.update(&chunk);
                written += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }

            file.sync_all().await?;
            drop(file);

            if let Some(expected) = config.expected_size {
                if written != expected {
                    return Err(AppError::SizeMismatch {
                        path: dest.to_path_buf(),
                        expected,
                        actual: written,
                    });
                }
            }

            if let Some(expected) = &config.expected_sha1 {
                let actual = format!("{:x}", hasher.finalize());
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(AppError::ChecksumMismatch {
                        url: strip_query(url),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }

            fs::rename(&tmp_path, dest).await?;
            Ok(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }

    /// True when `dest` exists and matches every expectation in `config`.
    pub async fn verify_existing(dest: &Path, config: &DownloadConfig) -> Result<bool> {
        if !dest.exists() {
            return Ok(false);
        }

        if let Some(expected) = config.expected_size {
            let metadata = fs::metadata(dest).await?;
            if metadata.len() != expected {
                debug!(
                    "Size mismatch for existing {:?}: expected {}, got {}",
                    dest,
                    expected,
                    metadata.len()
                );
                return Ok(false);
            }
        }

        if let Some(expected) = &config.expected_sha1 {
            let actual = hash_utils::sha1_file(dest).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                debug!("SHA1 mismatch for existing {:?}", dest);
                return Ok(false);
            }
        }

        Ok(true)
    }
}
