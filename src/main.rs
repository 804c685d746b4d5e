//! flutterpatch - Flutter APK patcher
//!
//! Decompiles an APK, duplicates its ARM Flutter engine under the x86 ABI,
//! rebuilds it, instruments it for traffic interception and re-signs it so it
//! installs on x86 emulators behind an intercepting proxy.

use clap::Parser;
use miette::Diagnostic;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;
mod config;
mod error;
mod logging;
mod naming;
mod pipeline;
mod process;
mod tools;
mod ui;

use cli::Cli;
use config::PatchConfig;
use error::{PatchError, Result, io_error};
use pipeline::{Pipeline, Toolchain};
use process::SystemRunner;
use tools::ToolResolver;
use tools::fetch::HttpFetcher;

/// Check that the APK argument was given and names an existing file
fn validate_input(apk: Option<&Path>) -> Result<PathBuf> {
    let apk = apk.ok_or(PatchError::MissingInput)?;
    if !apk.is_file() {
        return Err(PatchError::InputNotFound {
            path: apk.display().to_string(),
        });
    }
    dunce::canonicalize(apk).map_err(|e| io_error(apk, &e))
}

fn run(cli: &Cli) -> Result<()> {
    let input = validate_input(cli.apk.as_deref())?;

    let cwd = std::env::current_dir()?;
    let config = PatchConfig::from_cli(cli, &cwd)?;
    fs::create_dir_all(&config.working_dir).map_err(|e| io_error(&config.working_dir, &e))?;
    tracing::debug!(?config, "starting run");

    let mut resolver = ToolResolver::new(&config.working_dir, HttpFetcher).offline(config.offline);
    let tools = Toolchain::resolve(&mut resolver, &config)?;

    let report = Pipeline::new(&config, &SystemRunner, tools, &input)?.run()?;
    tracing::info!(
        instrumented = report.instrumented,
        stages = report.stages.len(),
        "wrote {}",
        report.signed_package.display()
    );

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        if e.is_usage() {
            println!("[ERROR] {e}");
            if let Some(help) = e.help() {
                println!("{help}");
            }
        } else {
            eprintln!("Error: {e}");
            if let Some(help) = e.help() {
                eprintln!("  help: {help}");
            }
        }
        std::process::exit(1);
    }
}
