use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ingredient_installer::{ArtifactFetcher, FetchStatus};
use reqwest::blocking::Client;
use tracing::{debug, info};

const STREAM_BUFFER_SIZE: usize = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Downloads over HTTP(S) into the cache. `file://` URLs are copied.
pub struct HttpFetcher {
    client: Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(show_progress: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ingredient/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            show_progress,
        })
    }

    fn download(&self, url: &str, out_path: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} from {url}", response.status()));
        }

        let total = response.content_length().unwrap_or(0);
        let progress_bar = self.show_progress.then(|| start_progress(url, total));
        let mut file = File::create(out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;

        let mut downloaded: u64 = 0;
        let mut buffer = [0u8; STREAM_BUFFER_SIZE];
        loop {
            let read = response
                .read(&mut buffer)
                .with_context(|| format!("failed to read response from {url}"))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .with_context(|| format!("failed to write {}", out_path.display()))?;
            downloaded += read as u64;
            if let Some(progress_bar) = &progress_bar {
                progress_bar.set_position(downloaded);
            }
        }
        file.flush()
            .with_context(|| format!("failed to flush {}", out_path.display()))?;

        if let Some(progress_bar) = progress_bar {
            progress_bar.finish_and_clear();
        }
        debug!(url, bytes = downloaded, "download complete");
        Ok(())
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<FetchStatus> {
        if destination.exists() {
            return Ok(FetchStatus::CacheHit);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache dir: {}", parent.display()))?;
        }

        let part_path = part_path(destination);
        let result = match url.strip_prefix("file://") {
            Some(local) => fs::copy(local, &part_path)
                .map(|_| ())
                .with_context(|| format!("failed to copy {local}")),
            None => self.download(url, &part_path),
        };
        if let Err(err) = result {
            let _ = fs::remove_file(&part_path);
            return Err(err);
        }

        fs::rename(&part_path, destination).with_context(|| {
            format!(
                "failed to move downloaded artifact into cache: {}",
                destination.display()
            )
        })?;
        info!(url, path = %destination.display(), "artifact downloaded");
        Ok(FetchStatus::Downloaded)
    }
}

pub(crate) fn part_path(destination: &Path) -> PathBuf {
    destination.with_file_name(format!(
        "{}.part",
        destination
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("artifact")
    ))
}

fn start_progress(url: &str, total: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(total.max(1));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan.bold} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {elapsed_precise}",
    ) {
        progress_bar.set_style(style.progress_chars("=>-"));
    }
    progress_bar.set_message(ingredient_core::filename_from_url(url));
    progress_bar
}
