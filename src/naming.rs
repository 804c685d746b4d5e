//! Artifact names derived from the input package
//!
//! All intermediate and final names are fixed suffixes on the package's
//! base name (file name without extension).

use std::path::{Path, PathBuf};

/// Library shipped by the package, relative to the decompiled tree
pub const ARM_LIBRARY: &str = "lib/armeabi-v7a/libflutter.so";

/// Where the duplicated library goes, relative to the decompiled tree
pub const X86_LIBRARY: &str = "lib/x86/libflutter.so";

/// Names of every artifact a run produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    base: String,
}

impl ArtifactNames {
    /// Derive names from a base name such as `app`
    pub fn from_base(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Derive names from a package path such as `/tmp/app.apk`
    ///
    /// Returns `None` when the path has no file name.
    pub fn from_package(path: &Path) -> Option<Self> {
        path.file_stem()
            .map(|stem| Self::from_base(stem.to_string_lossy().into_owned()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>_src`
    pub fn decompiled_tree(&self) -> String {
        format!("{}_src", self.base)
    }

    /// `<base>_patched.apk`
    pub fn rebuilt_package(&self) -> String {
        format!("{}_patched.apk", self.base)
    }

    /// `<base>_patched-aligned-signed.apk`
    pub fn signed_package(&self) -> String {
        format!("{}_patched-aligned-signed.apk", self.base)
    }

    /// Absolute locations of the artifacts inside `working_dir`
    pub fn in_dir(&self, working_dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            decompiled_tree: working_dir.join(self.decompiled_tree()),
            rebuilt_package: working_dir.join(self.rebuilt_package()),
            signed_package: working_dir.join(self.signed_package()),
        }
    }
}

/// Artifact names resolved against a working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub decompiled_tree: PathBuf,
    pub rebuilt_package: PathBuf,
    pub signed_package: PathBuf,
}
