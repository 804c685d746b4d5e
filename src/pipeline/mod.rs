//! The patch pipeline
//!
//! A run is a fixed sequence of stages:
//!
//! ```text
//! Start -> Decompiled -> LibDuplicated -> Rebuilt -> Instrumented -> Cleaned -> Signed -> Success
//! ```
//!
//! Each [`Pipeline::step`] performs exactly one stage and returns the next
//! state, or the error that ends the run. No stage is retried and no stage
//! runs twice. The decompiled tree is held by a [`DecompiledTree`] guard for
//! the whole run, so it is removed on failure as well as on success.

mod library;
mod tree;


use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{MissingToolPolicy, PatchConfig};
use crate::error::{PatchError, Result, io_error};
use crate::naming::{ArtifactNames, ArtifactPaths};
use crate::process::{ProcessRunner, ToolCommand};
use crate::tools::fetch::Fetcher;
use crate::tools::{ToolHandle, ToolResolver};
use crate::ui;

pub use library::duplicate_arm_library;
pub use tree::DecompiledTree;

/// One unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decompile,
    DuplicateLibrary,
    Rebuild,
    Instrument,
    Cleanup,
    Sign,
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Decompiled,
    LibDuplicated,
    Rebuilt,
    Instrumented,
    Cleaned,
    Signed,
    Success,
}

impl PipelineState {
    /// The stage that leaves this state, `None` once the run has succeeded
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            Self::Start => Some(Stage::Decompile),
            Self::Decompiled => Some(Stage::DuplicateLibrary),
            Self::LibDuplicated => Some(Stage::Rebuild),
            Self::Rebuilt => Some(Stage::Instrument),
            Self::Instrumented => Some(Stage::Cleanup),
            Self::Cleaned => Some(Stage::Sign),
            Self::Signed | Self::Success => None,
        }
    }
}

/// The jar tools a run needs, resolved up front
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub apktool: ToolHandle,
    pub signer: ToolHandle,
}

impl Toolchain {
    pub fn resolve<F: Fetcher>(
        resolver: &mut ToolResolver<F>,
        config: &PatchConfig,
    ) -> Result<Self> {
        Ok(Self {
            apktool: resolver.resolve(&config.apktool)?,
            signer: resolver.resolve(&config.signer)?,
        })
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Stages in the order they ran
    pub stages: Vec<Stage>,
    /// Whether the instrumenter patched the package
    pub instrumented: bool,
    pub signed_package: PathBuf,
}

/// A single run over one input package
pub struct Pipeline<'a, R: ProcessRunner> {
    config: &'a PatchConfig,
    runner: &'a R,
    tools: Toolchain,
    input: PathBuf,
    names: ArtifactNames,
    paths: ArtifactPaths,
    tree: DecompiledTree,
    instrumented: bool,
    executed: Vec<Stage>,
}

impl<'a, R: ProcessRunner> Pipeline<'a, R> {
    /// Prepare a run for `input`
    pub fn new(
        config: &'a PatchConfig,
        runner: &'a R,
        tools: Toolchain,
        input: &Path,
    ) -> Result<Self> {
        let names =
            ArtifactNames::from_package(input).ok_or_else(|| PatchError::InputNotFound {
                path: input.display().to_string(),
            })?;
        let paths = names.in_dir(&config.working_dir);

        let produced = config.working_dir.join(&config.instrumented_output);
        if same_file(&produced, input) {
            return Err(PatchError::InputWouldBeOverwritten {
                path: input.display().to_string(),
            });
        }

        tracing::debug!(base = names.base(), "artifacts go to {}", config.working_dir.display());
        let tree = DecompiledTree::new(paths.decompiled_tree.clone());

        Ok(Self {
            config,
            runner,
            tools,
            input: input.to_path_buf(),
            names,
            paths,
            tree,
            instrumented: false,
            executed: Vec::new(),
        })
    }

    /// Drive every stage to completion
    pub fn run(mut self) -> Result<PipelineReport> {
        let mut state = PipelineState::Start;
        while state != PipelineState::Success {
            state = self.step(state)?;
        }

        Ok(PipelineReport {
            stages: std::mem::take(&mut self.executed),
            instrumented: self.instrumented,
            signed_package: self.paths.signed_package.clone(),
        })
    }

    /// Perform the stage leaving `state` and return the state it leads to
    pub fn step(&mut self, state: PipelineState) -> Result<PipelineState> {
        let Some(stage) = state.next_stage() else {
            if state == PipelineState::Signed {
                ui::success(&self.names.signed_package());
            }
            return Ok(PipelineState::Success);
        };

        tracing::debug!(?stage, "entering stage");
        self.executed.push(stage);

        match stage {
            Stage::Decompile => self.decompile().map(|()| PipelineState::Decompiled),
            Stage::DuplicateLibrary => self.duplicate().map(|()| PipelineState::LibDuplicated),
            Stage::Rebuild => self.rebuild().map(|()| PipelineState::Rebuilt),
            Stage::Instrument => self.instrument().map(|()| PipelineState::Instrumented),
            Stage::Cleanup => {
                ui::stage("Cleaning up decompile folder...");
                self.tree.release();
                Ok(PipelineState::Cleaned)
            }
            Stage::Sign => self.sign().map(|()| PipelineState::Signed),
        }
    }

    fn jar(&self, tool: &ToolHandle) -> ToolCommand {
        ToolCommand::new(&self.config.java, &self.config.working_dir)
            .arg("-jar")
            .arg(tool.path.display().to_string())
    }

    fn decompile(&mut self) -> Result<()> {
        ui::stage(&format!("Decompiling APK: {}", self.input.display()));
        let cmd = self.jar(&self.tools.apktool).args([
            "d".to_string(),
            "-f".to_string(),
            self.input.display().to_string(),
            "-o".to_string(),
            self.tree.path().display().to_string(),
        ]);
        self.runner
            .run(&cmd, "Decompiling APK")
            .map(drop)
            .map_err(|e| retag(e, |reason| PatchError::DecompileFailed { reason }))
    }

    fn duplicate(&mut self) -> Result<()> {
        ui::stage("Duplicating libflutter.so for x86...");
        duplicate_arm_library(self.tree.path())?;
        ui::stage("Copied libflutter.so to x86 folder");
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        ui::stage("Rebuilding APK...");
        let rebuilt = &self.paths.rebuilt_package;
        let cmd = self.jar(&self.tools.apktool).args([
            "b".to_string(),
            self.tree.path().display().to_string(),
            "-o".to_string(),
            rebuilt.display().to_string(),
        ]);
        self.runner
            .run(&cmd, "Rebuilding APK")
            .map_err(|e| retag(e, |reason| PatchError::RebuildFailed { reason }))?;

        if !rebuilt.is_file() {
            return Err(PatchError::RebuildOutputMissing {
                path: rebuilt.display().to_string(),
            });
        }
        Ok(())
    }

    fn instrument(&mut self) -> Result<()> {
        ui::stage("Refluttering APK...");
        let rebuilt = &self.paths.rebuilt_package;
        let produced = self.config.working_dir.join(&self.config.instrumented_output);

        // A leftover from an earlier run must not stand in for this run's output
        if produced.exists() {
            tracing::debug!("removing stale {}", produced.display());
            fs::remove_file(&produced).map_err(|e| io_error(&produced, &e))?;
        }

        let cmd = ToolCommand::new(&self.config.instrumenter, &self.config.working_dir)
            .arg(rebuilt.display().to_string())
            .interactive(true);

        match self.runner.run(&cmd, "Refluttering APK") {
            Ok(_) => {}
            Err(PatchError::ToolMissing { program })
                if self.config.missing_instrumenter == MissingToolPolicy::Skip =>
            {
                tracing::debug!("instrumenter '{program}' not installed, skipping");
                ui::warning(&format!(
                    "'{program}' is not installed; signing {} without instrumentation",
                    self.names.rebuilt_package()
                ));
                return Ok(());
            }
            Err(e) => {
                return Err(retag(e, |reason| PatchError::InstrumentationFailed {
                    reason,
                }));
            }
        }

        if rebuilt.exists() {
            fs::remove_file(rebuilt).map_err(|e| io_error(rebuilt, &e))?;
        }
        if !produced.is_file() {
            return Err(PatchError::InstrumentationOutputMissing {
                artifact: self.config.instrumented_output.clone(),
            });
        }
        fs::rename(&produced, rebuilt).map_err(|e| io_error(&produced, &e))?;

        self.instrumented = true;
        Ok(())
    }

    fn sign(&mut self) -> Result<()> {
        ui::stage("Signing APK with uber-apk-signer...");
        let cmd = self.jar(&self.tools.signer).args([
            "-a".to_string(),
            self.paths.rebuilt_package.display().to_string(),
            "--overwrite".to_string(),
        ]);
        self.runner
            .run(&cmd, "Signing APK")
            .map_err(|e| retag(e, |reason| PatchError::SignFailed { reason }))?;

        if !self.paths.signed_package.is_file() {
            ui::warning(&format!(
                "Signer finished but {} was not found",
                self.names.signed_package()
            ));
        }
        Ok(())
    }
}

/// Whether both paths exist and name the same file
fn same_file(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Turn a runner failure into the stage's own error; other errors pass through
fn retag(err: PatchError, stage_error: impl FnOnce(String) -> PatchError) -> PatchError {
    match err {
        PatchError::ToolExecutionFailed { .. } => stage_error(err.reason()),
        other => other,
    }
}
