//! Duplicating the ARM Flutter engine under the x86 ABI directory

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result, io_error};
use crate::naming::{ARM_LIBRARY, X86_LIBRARY};

/// Copy `lib/armeabi-v7a/libflutter.so` to `lib/x86/libflutter.so` inside `tree`
///
/// Permissions and modification time are carried over, and the copy is
/// checked to be byte-identical. Returns the path of the copy.
pub fn duplicate_arm_library(tree: &Path) -> Result<PathBuf> {
    let arm = tree.join(ARM_LIBRARY);
    if !arm.is_file() {
        return Err(PatchError::MissingArchLibrary {
            path: arm.display().to_string(),
        });
    }

    let x86 = tree.join(X86_LIBRARY);
    if let Some(dir) = x86.parent() {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;
    }

    fs::copy(&arm, &x86).map_err(|e| io_error(&x86, &e))?;
    preserve_mtime(&arm, &x86)?;

    let source = digest(&arm)?;
    let copy = digest(&x86)?;
    if source != copy {
        return Err(PatchError::LibraryCopyMismatch {
            path: x86.display().to_string(),
        });
    }
    tracing::debug!("duplicated {} (blake3 {})", ARM_LIBRARY, source.to_hex());

    Ok(x86)
}

fn preserve_mtime(from: &Path, to: &Path) -> Result<()> {
    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .map_err(|e| io_error(from, &e))?;
    File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| io_error(to, &e))
}

fn digest(path: &Path) -> Result<blake3::Hash> {
    let bytes = fs::read(path).map_err(|e| io_error(path, &e))?;
    Ok(blake3::hash(&bytes))
}
