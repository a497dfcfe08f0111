// src/packages/rpm.rs

//! RPM installer package build
//!
//! The RPM is produced by the external generator script shipped in the data
//! directory. The script is pointed at a staging workspace holding a copy of
//! the user's public key and leaves the RPM there; we then move it to the
//! caller's destination.

use crate::error::{Error, Result};
use crate::filesystem::{copy_file, move_file};
use crate::login::LoginDescriptor;
use crate::naming::PackageNaming;
use crate::probe::Capabilities;
use crate::process::{ProcessRequest, ProcessRunner};
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builds the key installer RPM with the generator script
pub struct RpmBuilder<'a> {
    runner: &'a dyn ProcessRunner,
    capabilities: &'a Capabilities,
    naming: &'a PackageNaming,
    script: String,
}

impl<'a> RpmBuilder<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        capabilities: &'a Capabilities,
        naming: &'a PackageNaming,
        script: &str,
    ) -> Self {
        Self {
            runner,
            capabilities,
            naming,
            script: script.to_string(),
        }
    }

    /// Build the RPM for `login` in `staging` and move it to `destination`
    ///
    /// `staging` is not removed here; its owner tears it down.
    pub fn build(
        &self,
        login: &LoginDescriptor,
        staging: &Workspace,
        destination: &Path,
    ) -> Result<PathBuf> {
        let generator_dir = self.capabilities.generator_dir().ok_or_else(|| {
            Error::Configuration(format!("RPM generator script {} not found", self.script))
        })?;

        debug!("Copying public key to {}", staging.path().display());
        let staged_key = staging.join(PackageNaming::staged_public_key(&login.username));
        copy_file(&login.public_key_path, &staged_key)?;

        info!("Building RPM for {}", login.username);
        let request = ProcessRequest::new(generator_dir.join(&self.script))
            .arg("--target")
            .arg(staging.path())
            .arg(&staged_key)
            .current_dir(staging.path());
        debug!("command: {}", request.display_command());
        self.runner.execute(&request)?.into_result(&self.script)?;

        let built = staging.join(self.naming.native_package(&login.username));
        debug!("Expecting RPM at {}", built.display());
        if !built.is_file() {
            return Err(Error::Io(format!(
                "{} did not produce {}",
                self.script,
                built.display()
            )));
        }

        move_file(&built, destination)?;
        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySection;
    use crate::login::CredentialRequest;
    use crate::process::{FnRunner, exited};
    use crate::workspace::WorkspaceRoot;
    use std::fs;
    use tempfile::TempDir;

    const SCRIPT: &str = "openvas-lsc-rpm-creator.sh";

    fn login_with_key(dir: &Path) -> LoginDescriptor {
        let request = CredentialRequest::new("alice", "s3cretpw");
        let login = LoginDescriptor::new(dir, &request, &KeySection::default());
        fs::write(&login.public_key_path, "ssh-rsa AAAA alice").unwrap();
        login
    }

    #[test]
    fn test_build_moves_rpm_to_destination() {
        let temp = TempDir::new().unwrap();
        let root = WorkspaceRoot::new(temp.path());
        let keys = root.allocate("key_").unwrap();
        let staging = root.allocate("lsc_user_rpm_create_").unwrap();
        let login = login_with_key(keys.path());
        let caps = Capabilities::preset(true, Some(PathBuf::from("/opt/lsc")));
        let naming = PackageNaming::default();

        let runner = FnRunner::new(|request| {
            assert_eq!(request.program(), Path::new("/opt/lsc/openvas-lsc-rpm-creator.sh"));
            let args = request.get_args();
            assert_eq!(args[0], "--target");
            let target = PathBuf::from(&args[1]);
            assert_eq!(request.working_dir(), Some(target.as_path()));
            assert_eq!(fs::read_to_string(&args[2]).unwrap(), "ssh-rsa AAAA alice");
            fs::write(target.join("openvas-lsc-target-alice-0.5-1.noarch.rpm"), b"rpm").unwrap();
            Ok(exited(0))
        });

        let destination = temp.path().join("p.rpm");
        let builder = RpmBuilder::new(&runner, &caps, &naming, SCRIPT);
        let built = builder.build(&login, &staging, &destination).unwrap();

        assert_eq!(built, destination);
        assert_eq!(fs::read(&destination).unwrap(), b"rpm");
        assert!(!staging.join("openvas-lsc-target-alice-0.5-1.noarch.rpm").exists());
        assert!(staging.join("alice.pub").exists());
    }

    #[test]
    fn test_missing_generator_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let root = WorkspaceRoot::new(temp.path());
        let keys = root.allocate("key_").unwrap();
        let staging = root.allocate("rpm_").unwrap();
        let login = login_with_key(keys.path());
        let caps = Capabilities::preset(true, None);
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| panic!("must not run"));

        let result = RpmBuilder::new(&runner, &caps, &naming, SCRIPT).build(
            &login,
            &staging,
            &temp.path().join("p.rpm"),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_script_failure() {
        let temp = TempDir::new().unwrap();
        let root = WorkspaceRoot::new(temp.path());
        let keys = root.allocate("key_").unwrap();
        let staging = root.allocate("rpm_").unwrap();
        let login = login_with_key(keys.path());
        let caps = Capabilities::preset(true, Some(PathBuf::from("/opt/lsc")));
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| Ok(exited(2)));

        let result = RpmBuilder::new(&runner, &caps, &naming, SCRIPT).build(
            &login,
            &staging,
            &temp.path().join("p.rpm"),
        );
        assert!(matches!(result, Err(Error::ExternalTool(_))));
        assert!(!temp.path().join("p.rpm").exists());
    }

    #[test]
    fn test_missing_output_is_io_error() {
        let temp = TempDir::new().unwrap();
        let root = WorkspaceRoot::new(temp.path());
        let keys = root.allocate("key_").unwrap();
        let staging = root.allocate("rpm_").unwrap();
        let login = login_with_key(keys.path());
        let caps = Capabilities::preset(true, Some(PathBuf::from("/opt/lsc")));
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| Ok(exited(0)));

        let result = RpmBuilder::new(&runner, &caps, &naming, SCRIPT).build(
            &login,
            &staging,
            &temp.path().join("p.rpm"),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_missing_public_key_is_io_error() {
        let temp = TempDir::new().unwrap();
        let root = WorkspaceRoot::new(temp.path());
        let keys = root.allocate("key_").unwrap();
        let staging = root.allocate("rpm_").unwrap();
        let request = CredentialRequest::new("alice", "s3cretpw");
        let login = LoginDescriptor::new(keys.path(), &request, &KeySection::default());
        let caps = Capabilities::preset(true, Some(PathBuf::from("/opt/lsc")));
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| panic!("must not run"));

        let result = RpmBuilder::new(&runner, &caps, &naming, SCRIPT).build(
            &login,
            &staging,
            &temp.path().join("p.rpm"),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
