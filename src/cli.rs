//! CLI definitions using clap derive API

use clap::Parser;
use clap::builder::{Styles, styling::AnsiColor};
use std::path::PathBuf;

/// flutterpatch - make a Flutter APK run on x86 and route through a proxy
#[derive(Parser, Debug)]
#[command(
    name = "flutterpatch",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Patch a Flutter APK for x86 and traffic inspection, then re-sign it",
    long_about = "Decompiles the APK with apktool, copies the armeabi-v7a libflutter.so \
                  into lib/x86, rebuilds, instruments the result with reflutter and signs \
                  it with uber-apk-signer. Missing jars are downloaded into the working \
                  directory.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  flutterpatch /home/user/myapp.apk\n    \
                  flutterpatch myapp.apk --workdir build --offline\n    \
                  flutterpatch myapp.apk --require-instrumenter"
)]
pub struct Cli {
    /// Path to the APK to patch
    pub apk: Option<PathBuf>,

    /// Directory holding tools and intermediate artifacts (defaults to current directory)
    #[arg(long, short = 'C', env = "FLUTTERPATCH_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, env = "FLUTTERPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Java launcher used for apktool and uber-apk-signer
    #[arg(long, env = "FLUTTERPATCH_JAVA")]
    pub java: Option<String>,

    /// Instrumentation command (defaults to reflutter)
    #[arg(long, env = "FLUTTERPATCH_INSTRUMENTER")]
    pub instrumenter: Option<String>,

    /// Fail instead of skipping when the instrumentation tool is not installed
    #[arg(long)]
    pub require_instrumenter: bool,

    /// Never download missing tools
    #[arg(long)]
    pub offline: bool,

    /// Enable verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
