//! Common test utilities for flutterpatch integration tests

use std::path::PathBuf;
use tempfile::TempDir;

/// Fake `java` that understands the apktool and uber-apk-signer command lines
///
/// Set `FAKE_NO_LIB=1` to decompile without the armeabi-v7a engine.
#[allow(dead_code)]
pub const FAKE_JAVA: &str = r#"#!/bin/sh
shift 2
case "$1" in
  d)
    out="$5"
    mkdir -p "$out/lib/armeabi-v7a"
    if [ -z "$FAKE_NO_LIB" ]; then
      printf 'arm engine' > "$out/lib/armeabi-v7a/libflutter.so"
    fi
    ;;
  b)
    tree="$2"
    out="$4"
    cmp -s "$tree/lib/armeabi-v7a/libflutter.so" "$tree/lib/x86/libflutter.so" || exit 7
    printf 'rebuilt' > "$out"
    ;;
  -a)
    in="$2"
    cp "$in" "${in%.apk}-aligned-signed.apk"
    ;;
  *)
    echo "unexpected arguments: $*" >&2
    exit 9
    ;;
esac
"#;

/// Fake instrumenter writing its fixed-name output into the working directory
#[allow(dead_code)]
pub const FAKE_REFLUTTER: &str = "#!/bin/sh\nprintf 'instrumented' > release.RE.apk\n";

/// A test workspace for integration tests
pub struct TestWorkspace {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

impl TestWorkspace {
    /// Create a new test workspace
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Write an executable script in workspace
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn write_script(&self, path: &str, content: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let file_path = self.write_file(path, content);
        std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        file_path
    }

    /// Read a file from workspace
    #[allow(dead_code)]
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists in workspace
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Input APK plus placeholder jars so no download is attempted
    #[allow(dead_code)]
    pub fn with_tools(self) -> Self {
        self.write_file("app.apk", "original apk");
        self.write_file("apktool_2.9.3.jar", "");
        self.write_file("uber-apk-signer-1.3.0.jar", "");
        self
    }
}
