//! Operator-facing output
//!
//! Stage banners, command echo, warnings and the final success line.
//! Diagnostics that only matter when debugging go through `tracing` instead.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Announce a stage
pub fn stage(message: &str) {
    println!("{} {message}", Style::new().bold().cyan().apply_to("[+]"));
}

/// Echo a command line before it runs
pub fn command(command_line: &str) {
    println!("{} {command_line}", Style::new().dim().apply_to("[CMD]"));
}

/// Print a non-fatal warning
pub fn warning(message: &str) {
    eprintln!(
        "{} {message}",
        Style::new().bold().yellow().apply_to("Warning:")
    );
}

/// Print the final artifact name
pub fn success(artifact: &str) {
    println!();
    println!(
        "{} Final signed APK: {}",
        Style::new().bold().green().apply_to("[SUCCESS]"),
        Style::new().bold().apply_to(artifact)
    );
    println!("{}", "=".repeat(70));
}

/// Spinner shown while a captured tool runs
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .map(|s| s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Byte progress bar for downloads; falls back to a spinner when the size is unknown
pub fn download_bar(name: &str, total: Option<u64>) -> ProgressBar {
    let Some(total) = total else {
        return spinner(&format!("Downloading {name}"));
    };

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .map(|s| s.progress_chars("#>-"))
    {
        pb.set_style(style);
    }
    pb.set_message(name.to_string());
    pb
}
