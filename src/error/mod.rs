//! Error types and handling for flutterpatch
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Every variant belongs to one [`ErrorKind`], which is how callers decide
//! whether a failure is a usage problem, a missing tool, a failed tool run,
//! or a broken precondition between stages.

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`PatchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing command line input
    Usage,
    /// A tool could not be located or acquired
    ToolNotFound,
    /// A tool executable is not installed
    ToolMissing,
    /// A tool ran and exited with a non-zero status
    ToolExecution,
    /// An artifact a stage depends on is absent or wrong
    Precondition,
    /// File system failure
    Io,
    /// Configuration could not be loaded
    Config,
}

/// Main error type for flutterpatch operations
#[derive(Error, Diagnostic, Debug)]
pub enum PatchError {
    // Usage errors
    #[error("Please provide APK file path.")]
    #[diagnostic(
        code(flutterpatch::usage::missing_input),
        help("Example: flutterpatch /home/user/myapp.apk")
    )]
    MissingInput,

    #[error("APK not found: {path}")]
    #[diagnostic(code(flutterpatch::usage::input_not_found))]
    InputNotFound { path: String },

    // Tool resolution errors
    #[error("No tool matching '{pattern}' found")]
    #[diagnostic(
        code(flutterpatch::tool::not_found),
        help("Place a matching jar in the working directory or allow it to be downloaded")
    )]
    ToolNotFound { pattern: String },

    #[error("Failed to download {url}: {reason}")]
    #[diagnostic(code(flutterpatch::tool::download_failed))]
    DownloadFailed { url: String, reason: String },

    #[error("Tool '{program}' is not installed")]
    #[diagnostic(
        code(flutterpatch::tool::missing),
        help("Make sure '{program}' is installed and on PATH")
    )]
    ToolMissing { program: String },

    // Tool execution errors
    #[error("{description}: {stderr}")]
    #[diagnostic(code(flutterpatch::tool::execution_failed))]
    ToolExecutionFailed { description: String, stderr: String },

    #[error("Decompiling APK failed: {reason}")]
    #[diagnostic(code(flutterpatch::stage::decompile_failed))]
    DecompileFailed { reason: String },

    #[error("Rebuilding APK failed: {reason}")]
    #[diagnostic(code(flutterpatch::stage::rebuild_failed))]
    RebuildFailed { reason: String },

    #[error("Instrumenting APK failed: {reason}")]
    #[diagnostic(code(flutterpatch::stage::instrument_failed))]
    InstrumentationFailed { reason: String },

    #[error("Signing APK failed: {reason}")]
    #[diagnostic(code(flutterpatch::stage::sign_failed))]
    SignFailed { reason: String },

    // Precondition errors
    #[error("libflutter.so not found in armeabi-v7a folder: {path}")]
    #[diagnostic(
        code(flutterpatch::precondition::missing_arch_library),
        help("Only Flutter APKs that ship an armeabi-v7a engine can be patched")
    )]
    MissingArchLibrary { path: String },

    #[error("Rebuild did not produce {path}")]
    #[diagnostic(code(flutterpatch::precondition::rebuild_output_missing))]
    RebuildOutputMissing { path: String },

    #[error("Instrumenter did not produce {artifact}")]
    #[diagnostic(code(flutterpatch::precondition::instrumentation_output_missing))]
    InstrumentationOutputMissing { artifact: String },

    #[error("Input {path} has the instrumenter's output name and would be overwritten")]
    #[diagnostic(
        code(flutterpatch::precondition::input_would_be_overwritten),
        help("Rename the APK or run with a different --workdir")
    )]
    InputWouldBeOverwritten { path: String },

    #[error("Duplicated library differs from its source: {path}")]
    #[diagnostic(code(flutterpatch::precondition::library_copy_mismatch))]
    LibraryCopyMismatch { path: String },

    // Configuration errors
    #[error("Failed to read configuration file '{path}': {reason}")]
    #[diagnostic(code(flutterpatch::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file '{path}': {reason}")]
    #[diagnostic(code(flutterpatch::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid tool pattern '{pattern}': {reason}")]
    #[diagnostic(code(flutterpatch::config::invalid_pattern))]
    InvalidPattern { pattern: String, reason: String },

    // File system errors
    #[error("IO error: {message}")]
    #[diagnostic(code(flutterpatch::fs::io_error))]
    IoError { message: String },
}

impl PatchError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput | Self::InputNotFound { .. } => ErrorKind::Usage,
            Self::ToolNotFound { .. } | Self::DownloadFailed { .. } => ErrorKind::ToolNotFound,
            Self::ToolMissing { .. } => ErrorKind::ToolMissing,
            Self::ToolExecutionFailed { .. }
            | Self::DecompileFailed { .. }
            | Self::RebuildFailed { .. }
            | Self::InstrumentationFailed { .. }
            | Self::SignFailed { .. } => ErrorKind::ToolExecution,
            Self::MissingArchLibrary { .. }
            | Self::RebuildOutputMissing { .. }
            | Self::InstrumentationOutputMissing { .. }
            | Self::InputWouldBeOverwritten { .. }
            | Self::LibraryCopyMismatch { .. } => ErrorKind::Precondition,
            Self::ConfigReadFailed { .. }
            | Self::ConfigParseFailed { .. }
            | Self::InvalidPattern { .. } => ErrorKind::Config,
            Self::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Whether this is a usage error (reported on stdout)
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    /// Human readable reason, used when re-tagging runner errors per stage
    pub fn reason(&self) -> String {
        match self {
            Self::ToolExecutionFailed {
                description,
                stderr,
            } if stderr.is_empty() => description.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for PatchError {
    fn from(err: std::io::Error) -> Self {
        PatchError::IoError {
            message: err.to_string(),
        }
    }
}

/// Creates an IO error with the path it concerns
pub fn io_error(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> PatchError {
    PatchError::IoError {
        message: format!("{}: {err}", path.as_ref().display()),
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, PatchError>;
