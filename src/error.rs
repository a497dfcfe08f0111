// src/error.rs

//! Error types for credential package generation
//!
//! Every failure in the pipeline is fatal. Library functions return
//! [`Error`]; the orchestrator wraps it in [`PipelineError`] together with
//! the [`Stage`] that failed.

use crate::process::ExitOutcome;
use std::fmt;
use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Precondition,
    ExternalTool,
    Io,
}

/// Errors raised while generating credentials and packages
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input (empty comment, short passphrase, unsafe user name)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A required external tool or the generator script was not found
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Destination already exists or a required source is missing
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// An external tool could not be launched or did not exit cleanly
    #[error(transparent)]
    ExternalTool(#[from] ToolFailure),

    /// Read, write, copy, move or remove failure with context
    #[error("I/O error: {0}")]
    Io(String),

    /// Bare I/O error
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::ExternalTool(_) => ErrorKind::ExternalTool,
            Self::Io(_) | Self::IoError(_) => ErrorKind::Io,
        }
    }
}

/// Diagnostics for a failed external tool invocation
///
/// The captured output is kept for logging only. It is deliberately left out
/// of the `Display` text so it never reaches the end caller.
#[derive(Debug, Error)]
#[error("{tool} failed: {outcome}")]
pub struct ToolFailure {
    tool: String,
    outcome: ExitOutcome,
    stdout: String,
    stderr: String,
}

impl ToolFailure {
    pub fn new(
        tool: impl Into<String>,
        outcome: ExitOutcome,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            tool: tool.into(),
            outcome,
            stdout,
            stderr,
        }
    }

    /// Failure to spawn the tool at all
    pub fn launch(tool: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(tool, ExitOutcome::LaunchFailed(reason.to_string()), String::new(), String::new())
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn outcome(&self) -> &ExitOutcome {
        &self.outcome
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

/// Pipeline stage, used to identify where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Probe,
    KeyWorkspace,
    KeyGeneration,
    PackageWorkspace,
    NativeBuild,
    Conversion,
    ArtifactLoad,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Probe => "probe",
            Self::KeyWorkspace => "key-workspace",
            Self::KeyGeneration => "key-generation",
            Self::PackageWorkspace => "package-workspace",
            Self::NativeBuild => "native-build",
            Self::Conversion => "conversion",
            Self::ArtifactLoad => "artifact-load",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single failure signal returned by the pipeline
#[derive(Debug, Error)]
#[error("credential generation failed at {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl PipelineError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
