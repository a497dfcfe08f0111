// src/pipeline.rs

//! Credential package pipeline
//!
//! Sequences key generation, the RPM build, the DEB conversion and the final
//! artifact load:
//!
//! ```text
//! Idle -> KeyDirAllocated -> KeysGenerated -> PackageDirAllocated
//!      -> NativeBuilt -> Converted -> ArtifactsLoaded -> Done
//! ```
//!
//! Any stage may fail, which ends the run with a [`PipelineError`] naming the
//! stage. Workspaces are RAII handles, so every workspace that was allocated
//! is removed exactly once on whichever path the run takes. On success they
//! are closed explicitly and teardown failures are reported as warnings on
//! the bundle instead of failing the run.

use crate::artifacts::{ArtifactBundle, ArtifactPaths, load_artifacts};
use crate::config::Config;
use crate::error::{Error, PipelineError, Stage};
use crate::keys::KeyGenerator;
use crate::login::{CredentialRequest, LoginDescriptor};
use crate::naming::PackageNaming;
use crate::packages::{DebConverter, RpmBuilder};
use crate::probe::Capabilities;
use crate::process::{ProcessRunner, SystemRunner};
use crate::workspace::{Workspace, WorkspaceRoot};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of the key material workspace
pub const KEY_WORKSPACE_PREFIX: &str = "key_";
/// Prefix of the workspace receiving the RPM and DEB
pub const PACKAGE_WORKSPACE_PREFIX: &str = "rpm_";
/// Prefix of the generator script's scratch workspace
pub const STAGING_WORKSPACE_PREFIX: &str = "lsc_user_rpm_create_";

/// File name the RPM is moved to inside the package workspace
const NATIVE_PACKAGE_FILE: &str = "p.rpm";

/// Progress of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    KeyDirAllocated,
    KeysGenerated,
    PackageDirAllocated,
    NativeBuilt,
    Converted,
    ArtifactsLoaded,
    Done,
}

/// Produces keys and installer packages for scan users
pub struct CredentialPipeline {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
    capabilities: Arc<Capabilities>,
    workspaces: WorkspaceRoot,
    naming: PackageNaming,
}

impl CredentialPipeline {
    /// Create a pipeline with an explicit runner and capability cache
    pub fn new(
        config: Config,
        runner: Arc<dyn ProcessRunner>,
        capabilities: Arc<Capabilities>,
    ) -> Self {
        let workspaces = WorkspaceRoot::new(config.workspace.root());
        let naming = PackageNaming::new(&config.package);
        Self {
            config,
            runner,
            capabilities,
            workspaces,
            naming,
        }
    }

    /// Create a pipeline that runs the real tools on this host
    pub fn from_config(config: Config) -> Self {
        let runner = SystemRunner::new().with_timeout(config.tools.timeout());
        let capabilities = Capabilities::new(&config.tools);
        Self::new(config, Arc::new(runner), Arc::new(capabilities))
    }

    /// Allocate workspaces under a different root
    pub fn with_workspace_root(mut self, root: WorkspaceRoot) -> Self {
        self.workspaces = root;
        self
    }

    pub fn workspaces(&self) -> &WorkspaceRoot {
        &self.workspaces
    }

    pub fn naming(&self) -> &PackageNaming {
        &self.naming
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Create the keypair and both installer packages for `name`
    ///
    /// `password` is the user's login password and also the key passphrase.
    pub fn create_credential_packages(
        &self,
        name: &str,
        password: &str,
    ) -> Result<ArtifactBundle, PipelineError> {
        let request = CredentialRequest::new(name, password);
        self.run(&request)
    }

    /// Run the pipeline for a request
    pub fn run(&self, request: &CredentialRequest) -> Result<ArtifactBundle, PipelineError> {
        let mut state = PipelineState::Idle;

        request
            .validate(self.config.key.min_passphrase_len)
            .map_err(failed(Stage::Validate))?;

        if !self.capabilities.converter_available() {
            return Err(failed(Stage::Probe)(Error::Configuration(format!(
                "{} not found in path, cannot create DEB packages",
                self.config.tools.converter
            ))));
        }

        let key_dir = self
            .workspaces
            .allocate(KEY_WORKSPACE_PREFIX)
            .map_err(failed(Stage::KeyWorkspace))?;
        advance(&mut state, PipelineState::KeyDirAllocated);

        let login = LoginDescriptor::new(key_dir.path(), request, &self.config.key);

        KeyGenerator::new(self.runner.as_ref(), &self.config.tools, &self.config.key)
            .generate(&login)
            .map_err(failed(Stage::KeyGeneration))?;
        advance(&mut state, PipelineState::KeysGenerated);

        if self.capabilities.generator_dir().is_none() {
            return Err(failed(Stage::NativeBuild)(Error::Configuration(format!(
                "RPM generator script {} not found in {}",
                self.config.tools.generator_script,
                self.config.tools.data_dir.display()
            ))));
        }

        let package_dir = self
            .workspaces
            .allocate(PACKAGE_WORKSPACE_PREFIX)
            .map_err(failed(Stage::PackageWorkspace))?;
        advance(&mut state, PipelineState::PackageDirAllocated);

        let mut warnings = Vec::new();
        let rpm_path = package_dir.join(NATIVE_PACKAGE_FILE);
        {
            let staging = self
                .workspaces
                .allocate(STAGING_WORKSPACE_PREFIX)
                .map_err(failed(Stage::NativeBuild))?;

            RpmBuilder::new(
                self.runner.as_ref(),
                &self.capabilities,
                &self.naming,
                &self.config.tools.generator_script,
            )
            .build(&login, &staging, &rpm_path)
            .map_err(failed(Stage::NativeBuild))?;

            close_workspace(staging, &mut warnings);
        }
        debug!("rpm_path: {}", rpm_path.display());
        advance(&mut state, PipelineState::NativeBuilt);

        let deb_path = DebConverter::new(
            self.runner.as_ref(),
            &self.capabilities,
            &self.naming,
            &self.config.tools,
        )
        .convert(&rpm_path, &login.username)
        .map_err(failed(Stage::Conversion))?;
        debug!("deb_path: {}", deb_path.display());
        advance(&mut state, PipelineState::Converted);

        let mut bundle = load_artifacts(ArtifactPaths {
            public_key: &login.public_key_path,
            private_key: &login.private_key_path,
            native_package: &rpm_path,
            converted_package: &deb_path,
        })
        .map_err(failed(Stage::ArtifactLoad))?;
        advance(&mut state, PipelineState::ArtifactsLoaded);

        drop(login);
        close_workspace(package_dir, &mut warnings);
        close_workspace(key_dir, &mut warnings);
        bundle.teardown_warnings = warnings;
        advance(&mut state, PipelineState::Done);

        info!(
            "Created credential packages for {} (rpm {} bytes, deb {} bytes)",
            request.name(),
            bundle.native_package_size(),
            bundle.converted_package_size()
        );
        Ok(bundle)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!("pipeline: {:?} -> {:?}", state, next);
    *state = next;
}

/// Wrap an error with the stage it happened in and log the failure
fn failed(stage: Stage) -> impl FnOnce(Error) -> PipelineError {
    move |error| {
        warn!("Credential generation failed at {}: {}", stage, error);
        PipelineError::new(stage, error)
    }
}

/// Tear down a workspace on the success path, keeping failures as warnings
fn close_workspace(workspace: Workspace, warnings: &mut Vec<String>) {
    let path = workspace.path().display().to_string();
    if let Err(e) = workspace.close() {
        warn!("Failed to remove workspace {}: {}", path, e);
        warnings.push(format!("failed to remove workspace {}: {}", path, e));
    }
}
