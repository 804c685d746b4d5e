//! Run configuration
//!
//! Built-in defaults, optionally overlaid by a YAML file, then by command
//! line flags. The result is passed to the pipeline at construction.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{PatchError, Result};
use crate::tools::ToolSpec;

/// What to do when the instrumentation tool is not installed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingToolPolicy {
    /// Warn and sign the rebuilt package as is
    #[default]
    Skip,
    /// Abort the run
    Fail,
}

/// Everything the pipeline needs to know about its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// Tool discovery root and location of all artifacts
    pub working_dir: PathBuf,
    /// Launcher for jar tools
    pub java: String,
    pub apktool: ToolSpec,
    pub signer: ToolSpec,
    /// Instrumentation command, looked up on PATH
    pub instrumenter: String,
    /// Fixed name of the file the instrumenter writes
    pub instrumented_output: String,
    pub missing_instrumenter: MissingToolPolicy,
    /// Never download tools
    pub offline: bool,
}

impl PatchConfig {
    /// Defaults rooted at `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            java: "java".to_string(),
            apktool: ToolSpec::apktool(),
            signer: ToolSpec::uber_apk_signer(),
            instrumenter: "reflutter".to_string(),
            instrumented_output: "release.RE.apk".to_string(),
            missing_instrumenter: MissingToolPolicy::Skip,
            offline: false,
        }
    }

    /// Overlay values from a YAML file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| PatchError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: ConfigFile =
            serde_yaml::from_str(&content).map_err(|e| PatchError::ConfigParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        self.apply(file);
        Ok(())
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(dir) = file.working_dir {
            self.working_dir = dir;
        }
        if let Some(java) = file.java {
            self.java = java;
        }
        if let Some(spec) = file.apktool {
            self.apktool = spec;
        }
        if let Some(spec) = file.signer {
            self.signer = spec;
        }
        if let Some(cmd) = file.instrumenter {
            self.instrumenter = cmd;
        }
        if let Some(name) = file.instrumented_output {
            self.instrumented_output = name;
        }
        if let Some(policy) = file.missing_instrumenter {
            self.missing_instrumenter = policy;
        }
        if let Some(offline) = file.offline {
            self.offline = offline;
        }
    }

    /// Build the configuration for a command line invocation
    ///
    /// `cwd` is the directory used when neither the file nor the flags name one.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut config = Self::new(cwd);
        if let Some(ref path) = cli.config {
            config.merge_file(path)?;
        }

        if let Some(ref dir) = cli.workdir {
            config.working_dir.clone_from(dir);
        }
        if let Some(ref java) = cli.java {
            config.java.clone_from(java);
        }
        if let Some(ref cmd) = cli.instrumenter {
            config.instrumenter.clone_from(cmd);
        }
        if cli.require_instrumenter {
            config.missing_instrumenter = MissingToolPolicy::Fail;
        }
        if cli.offline {
            config.offline = true;
        }

        if config.working_dir.is_relative() {
            config.working_dir = cwd.join(&config.working_dir);
        }
        Ok(config)
    }
}

/// On-disk form; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    working_dir: Option<PathBuf>,
    java: Option<String>,
    apktool: Option<ToolSpec>,
    signer: Option<ToolSpec>,
    instrumenter: Option<String>,
    instrumented_output: Option<String>,
    missing_instrumenter: Option<MissingToolPolicy>,
    offline: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("flutterpatch.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = PatchConfig::new("/work");
        assert_eq!(config.java, "java");
        assert_eq!(config.apktool.pattern, "apktool*.jar");
        assert_eq!(config.signer.pattern, "uber-apk-signer*.jar");
        assert_eq!(config.instrumenter, "reflutter");
        assert_eq!(config.instrumented_output, "release.RE.apk");
        assert_eq!(config.missing_instrumenter, MissingToolPolicy::Skip);
        assert!(!config.offline);
    }

    #[test]
    fn test_file_overrides_selected_keys() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            "java: /opt/jdk/bin/java\n\
             missing_instrumenter: fail\n\
             apktool:\n  pattern: \"apktool-*.jar\"\n",
        );

        let mut config = PatchConfig::new(temp.path());
        config.merge_file(&path).unwrap();

        assert_eq!(config.java, "/opt/jdk/bin/java");
        assert_eq!(config.missing_instrumenter, MissingToolPolicy::Fail);
        assert_eq!(config.apktool.pattern, "apktool-*.jar");
        assert_eq!(config.apktool.download_url, None);
        assert_eq!(config.signer, ToolSpec::uber_apk_signer());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "jav: java\n");

        let err = PatchConfig::new(temp.path()).merge_file(&path).unwrap_err();
        assert!(matches!(err, PatchError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = PatchConfig::new(temp.path())
            .merge_file(&temp.path().join("absent.yaml"))
            .unwrap_err();
        assert!(matches!(err, PatchError::ConfigReadFailed { .. }));
    }

    #[test]
    fn test_flags_override_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "instrumenter: from-file\noffline: false\n");

        let cli = Cli::parse_from([
            "flutterpatch",
            "app.apk",
            "--config",
            path.to_str().unwrap(),
            "--instrumenter",
            "from-flag",
            "--offline",
            "--require-instrumenter",
            "--workdir",
            "out",
        ]);
        let config = PatchConfig::from_cli(&cli, temp.path()).unwrap();

        assert_eq!(config.instrumenter, "from-flag");
        assert!(config.offline);
        assert_eq!(config.missing_instrumenter, MissingToolPolicy::Fail);
        assert_eq!(config.working_dir, temp.path().join("out"));
    }
}
