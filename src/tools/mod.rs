//! Locating the external tools a run needs
//!
//! Jar tools are looked up by glob pattern in the working directory. When no
//! file matches and the tool has a download source, it is fetched once under
//! its default name; later runs find that file through the same pattern.

pub mod fetch;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wax::{CandidatePath, Glob, Pattern};

use crate::error::{PatchError, Result, io_error};
use fetch::Fetcher;

/// How to find one jar tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    /// File name glob, matched against entries of the working directory
    pub pattern: String,

    /// Where to download the tool from when nothing matches
    #[serde(default)]
    pub download_url: Option<String>,

    /// File name to store a downloaded tool under
    #[serde(default)]
    pub default_name: Option<String>,
}

impl ToolSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            download_url: None,
            default_name: None,
        }
    }

    #[must_use]
    pub fn with_download(mut self, url: impl Into<String>, default_name: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self.default_name = Some(default_name.into());
        self
    }

    /// Pinned apktool release
    pub fn apktool() -> Self {
        Self::new("apktool*.jar").with_download(
            "https://github.com/iBotPeaches/Apktool/releases/download/v2.9.3/apktool_2.9.3.jar",
            "apktool_2.9.3.jar",
        )
    }

    /// Pinned uber-apk-signer release
    pub fn uber_apk_signer() -> Self {
        Self::new("uber-apk-signer*.jar").with_download(
            "https://github.com/patrickfav/uber-apk-signer/releases/download/v1.3.0/uber-apk-signer-1.3.0.jar",
            "uber-apk-signer-1.3.0.jar",
        )
    }
}

/// A resolved tool location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    pub path: PathBuf,
    /// Whether this run downloaded it
    pub fetched: bool,
}

/// Resolves [`ToolSpec`]s, caching results for the run
pub struct ToolResolver<F: Fetcher> {
    root: PathBuf,
    fetcher: F,
    offline: bool,
    resolved: HashMap<String, ToolHandle>,
}

impl<F: Fetcher> ToolResolver<F> {
    pub fn new(root: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            root: root.into(),
            fetcher,
            offline: false,
            resolved: HashMap::new(),
        }
    }

    /// Never download; unmatched tools fail with [`PatchError::ToolNotFound`]
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Return a usable local path for `spec`
    pub fn resolve(&mut self, spec: &ToolSpec) -> Result<ToolHandle> {
        if let Some(handle) = self.resolved.get(&spec.pattern) {
            return Ok(handle.clone());
        }

        let handle = self.locate(spec)?;
        tracing::debug!(
            "resolved '{}' to {}{}",
            spec.pattern,
            handle.path.display(),
            if handle.fetched { " (downloaded)" } else { "" }
        );
        self.resolved.insert(spec.pattern.clone(), handle.clone());
        Ok(handle)
    }

    fn locate(&self, spec: &ToolSpec) -> Result<ToolHandle> {
        if let Some(path) = find_match(&self.root, &spec.pattern)? {
            return Ok(ToolHandle {
                path,
                fetched: false,
            });
        }

        let not_found = || PatchError::ToolNotFound {
            pattern: spec.pattern.clone(),
        };
        if self.offline {
            return Err(not_found());
        }
        let (Some(url), Some(name)) = (&spec.download_url, &spec.default_name) else {
            return Err(not_found());
        };

        let dest = self.root.join(name);
        if dest.is_file() {
            return Ok(ToolHandle {
                path: dest,
                fetched: false,
            });
        }

        crate::ui::stage(&format!("Downloading {name}..."));
        self.fetcher.fetch(url, &dest)?;
        Ok(ToolHandle {
            path: dest,
            fetched: true,
        })
    }
}

/// First file in `dir`, by sorted file name, whose name matches `pattern`
pub fn find_match(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    let glob = Glob::new(pattern).map_err(|e| PatchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(dir, &e)),
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            glob.matched(&CandidatePath::from(name.as_ref())).is_some()
        })
        .map(|entry| entry.path())
        .collect();

    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Writes a placeholder jar and counts calls
    #[derive(Default)]
    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl Fetcher for &CountingFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            fs::write(dest, b"PK\x03\x04")?;
            Ok(())
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str, _dest: &Path) -> Result<()> {
            Err(PatchError::DownloadFailed {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    #[test]
    fn test_existing_match_is_used() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("apktool_2.7.0.jar"), "").unwrap();
        let fetcher = CountingFetcher::default();

        let mut resolver = ToolResolver::new(temp.path(), &fetcher);
        let handle = resolver.resolve(&ToolSpec::apktool()).unwrap();

        assert_eq!(handle.path, temp.path().join("apktool_2.7.0.jar"));
        assert!(!handle.fetched);
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_first_match_is_deterministic() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("apktool_2.9.3.jar"), "").unwrap();
        fs::write(temp.path().join("apktool_2.7.0.jar"), "").unwrap();
        fs::write(temp.path().join("apktool.txt"), "").unwrap();

        let found = find_match(temp.path(), "apktool*.jar").unwrap();
        assert_eq!(found, Some(temp.path().join("apktool_2.7.0.jar")));
    }

    #[test]
    fn test_directories_do_not_match() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("apktool.jar")).unwrap();

        assert_eq!(find_match(temp.path(), "apktool*.jar").unwrap(), None);
    }

    #[test]
    fn test_missing_tool_is_downloaded_once() {
        let temp = TempDir::new().unwrap();
        let fetcher = CountingFetcher::default();
        let spec = ToolSpec::uber_apk_signer();

        let first = ToolResolver::new(temp.path(), &fetcher)
            .resolve(&spec)
            .unwrap();
        assert!(first.fetched);
        assert_eq!(first.path, temp.path().join("uber-apk-signer-1.3.0.jar"));
        assert_eq!(fetcher.calls.get(), 1);

        // A second run reuses the downloaded file
        let second = ToolResolver::new(temp.path(), &fetcher)
            .resolve(&spec)
            .unwrap();
        assert!(!second.fetched);
        assert_eq!(second.path, first.path);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_resolution_is_cached_within_a_run() {
        let temp = TempDir::new().unwrap();
        let fetcher = CountingFetcher::default();
        let mut resolver = ToolResolver::new(temp.path(), &fetcher);

        let first = resolver.resolve(&ToolSpec::apktool()).unwrap();
        let second = resolver.resolve(&ToolSpec::apktool()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_default_name_outside_pattern_is_not_refetched() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("signer.jar"), "").unwrap();
        let fetcher = CountingFetcher::default();
        let spec = ToolSpec::new("uber-apk-signer*.jar")
            .with_download("https://example.invalid/signer.jar", "signer.jar");

        let handle = ToolResolver::new(temp.path(), &fetcher)
            .resolve(&spec)
            .unwrap();

        assert_eq!(handle.path, temp.path().join("signer.jar"));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_no_source_is_tool_not_found() {
        let temp = TempDir::new().unwrap();
        let mut resolver = ToolResolver::new(temp.path(), FailingFetcher);

        let err = resolver.resolve(&ToolSpec::new("apktool*.jar")).unwrap_err();
        assert!(matches!(err, PatchError::ToolNotFound { ref pattern } if pattern == "apktool*.jar"));
    }

    #[test]
    fn test_offline_skips_download() {
        let temp = TempDir::new().unwrap();
        let fetcher = CountingFetcher::default();
        let mut resolver = ToolResolver::new(temp.path(), &fetcher).offline(true);

        let err = resolver.resolve(&ToolSpec::apktool()).unwrap_err();
        assert!(matches!(err, PatchError::ToolNotFound { .. }));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_download_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let mut resolver = ToolResolver::new(temp.path(), FailingFetcher);

        let err = resolver.resolve(&ToolSpec::apktool()).unwrap_err();
        assert!(matches!(err, PatchError::DownloadFailed { .. }));
    }
}
