//! Downloading tools that are not present locally

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{PatchError, Result};
use crate::ui;

/// Acquires a tool from a remote location
pub trait Fetcher {
    /// Download `url` to `dest`
    ///
    /// `dest` must only appear once the whole download has succeeded.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP(S) download
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let failed = |reason: String| PatchError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        tracing::info!("downloading {url}");
        let mut response = reqwest::blocking::get(url).map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP status {}", response.status())));
        }

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut partial = NamedTempFile::new_in(dir).map_err(|e| failed(e.to_string()))?;

        let name = dest
            .file_name()
            .map_or_else(|| url.to_string(), |n| n.to_string_lossy().into_owned());
        let pb = ui::download_bar(&name, response.content_length());

        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = response
                .read(&mut buf)
                .map_err(|e| failed(e.to_string()))?;
            if read == 0 {
                break;
            }
            partial
                .write_all(&buf[..read])
                .map_err(|e| failed(e.to_string()))?;
            pb.inc(read as u64);
        }
        pb.finish_and_clear();

        partial
            .as_file()
            .sync_all()
            .map_err(|e| failed(e.to_string()))?;
        partial
            .persist(dest)
            .map_err(|e| failed(e.error.to_string()))?;

        let size = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
        tracing::debug!("saved {} ({size} bytes)", dest.display());
        Ok(())
    }
}
