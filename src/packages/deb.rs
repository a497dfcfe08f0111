// src/packages/deb.rs

//! DEB installer package conversion
//!
//! The DEB is derived from the RPM with `alien`, which has to run under
//! `fakeroot` so the generated archive carries root ownership without real
//! privileges. alien writes its output next to the input, named after the
//! lower-cased package name.

use crate::config::ToolsSection;
use crate::error::{Error, Result};
use crate::naming::PackageNaming;
use crate::probe::Capabilities;
use crate::process::{ProcessRequest, ProcessRunner};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Converts the RPM into a DEB with fakeroot + alien
pub struct DebConverter<'a> {
    runner: &'a dyn ProcessRunner,
    capabilities: &'a Capabilities,
    naming: &'a PackageNaming,
    fakeroot: String,
    converter: String,
}

impl<'a> DebConverter<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        capabilities: &'a Capabilities,
        naming: &'a PackageNaming,
        tools: &ToolsSection,
    ) -> Self {
        Self {
            runner,
            capabilities,
            naming,
            fakeroot: tools.fakeroot.clone(),
            converter: tools.converter.clone(),
        }
    }

    /// Convert `rpm_path` and return the path of the resulting DEB
    pub fn convert(&self, rpm_path: &Path, username: &str) -> Result<PathBuf> {
        if !self.capabilities.converter_available() {
            return Err(Error::Configuration(format!(
                "{} not found in path",
                self.converter
            )));
        }

        let (dir, file) = match (rpm_path.parent(), rpm_path.file_name()) {
            (Some(dir), Some(file)) => (dir, file),
            _ => {
                return Err(Error::Precondition(format!(
                    "not a package file path: {}",
                    rpm_path.display()
                )));
            }
        };

        info!("Converting {} with {}", rpm_path.display(), self.converter);
        let request = ProcessRequest::new(&self.fakeroot)
            .arg("--")
            .arg(&self.converter)
            .args(["--scripts", "--keep-version"])
            .arg(file)
            .current_dir(dir);
        debug!("command: {}", request.display_command());
        self.runner.execute(&request)?.into_result(&self.converter)?;

        let deb_path = dir.join(self.naming.converted_package(username));
        debug!("DEB path: {}", deb_path.display());
        Ok(deb_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ExitOutcome, FnRunner, ProcessOutput, exited};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_convert_command_and_name() {
        let temp = TempDir::new().unwrap();
        let rpm = temp.path().join("p.rpm");
        fs::write(&rpm, b"rpm").unwrap();
        let caps = Capabilities::preset(true, None);
        let naming = PackageNaming::default();

        let expected_dir = temp.path().to_path_buf();
        let runner = FnRunner::new(move |request| {
            assert_eq!(request.program_name(), "fakeroot");
            let args: Vec<_> = request
                .get_args()
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            assert_eq!(args, ["--", "alien", "--scripts", "--keep-version", "p.rpm"]);
            assert_eq!(request.working_dir(), Some(expected_dir.as_path()));
            Ok(exited(0))
        });

        let converter = DebConverter::new(&runner, &caps, &naming, &ToolsSection::default());
        let deb = converter.convert(&rpm, "Alice").unwrap();
        assert_eq!(deb, temp.path().join("openvas-lsc-target-alice_0.5-1_all.deb"));
    }

    #[test]
    fn test_unavailable_converter() {
        let caps = Capabilities::preset(false, None);
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| panic!("must not run"));

        let converter = DebConverter::new(&runner, &caps, &naming, &ToolsSection::default());
        let result = converter.convert(Path::new("/tmp/p.rpm"), "alice");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_abnormal_termination() {
        let caps = Capabilities::preset(true, None);
        let naming = PackageNaming::default();
        let runner = FnRunner::new(|_| {
            Ok(ProcessOutput {
                outcome: ExitOutcome::Signaled(9),
                stdout: String::new(),
                stderr: String::new(),
            })
        });

        let converter = DebConverter::new(&runner, &caps, &naming, &ToolsSection::default());
        match converter.convert(Path::new("/tmp/p.rpm"), "alice") {
            Err(Error::ExternalTool(failure)) => {
                assert_eq!(failure.tool(), "alien");
                assert_eq!(failure.outcome(), &ExitOutcome::Signaled(9));
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
    }
}
