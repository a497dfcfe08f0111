// src/lib.rs

//! lscgen: local security check credential provisioning
//!
//! Creates an RSA keypair for a scan user and packages the public key into
//! installer packages for target hosts (an RPM from the generator script and
//! a DEB converted from it with alien).
//!
//! # Architecture
//!
//! - Every external program runs through a [`process::ProcessRunner`]
//! - Every scratch directory is a [`workspace::Workspace`] removed on drop
//! - Tool discovery is memoized in [`probe::Capabilities`]
//! - [`pipeline::CredentialPipeline`] sequences the stages and returns an
//!   in-memory [`artifacts::ArtifactBundle`]

pub mod artifacts;
pub mod config;
mod error;
pub mod filesystem;
pub mod keys;
pub mod login;
pub mod naming;
pub mod packages;
pub mod pipeline;
pub mod probe;
pub mod process;
pub mod workspace;

pub use artifacts::ArtifactBundle;
pub use config::Config;
pub use error::{Error, ErrorKind, PipelineError, Result, Stage, ToolFailure};
pub use login::CredentialRequest;
pub use pipeline::CredentialPipeline;
