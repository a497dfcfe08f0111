// src/artifacts.rs

//! Final artifacts returned to the caller
//!
//! Everything is read fully into memory before the workspaces go away. A
//! bundle only exists after a complete run; a read failure aborts the load.

use crate::error::{Error, Result};
use crate::naming::PackageNaming;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use zeroize::Zeroizing;

/// Public key file name used by [`ArtifactBundle::write_to`]
pub const PUBLIC_KEY_OUTPUT: &str = "key.pub";
/// Private key file name used by [`ArtifactBundle::write_to`]
pub const PRIVATE_KEY_OUTPUT: &str = "key.p8";

/// Keys and installer packages for one user
pub struct ArtifactBundle {
    /// OpenSSH public key line
    pub public_key: String,
    /// PKCS#8 encrypted private key (PEM)
    pub private_key: Zeroizing<String>,
    /// RPM installer
    pub native_package: Vec<u8>,
    /// DEB installer
    pub converted_package: Vec<u8>,
    /// Windows installer; not produced yet, always empty
    pub installer: Vec<u8>,
    /// Workspace teardown failures that happened after the bundle was built
    pub teardown_warnings: Vec<String>,
}

impl ArtifactBundle {
    pub fn native_package_size(&self) -> usize {
        self.native_package.len()
    }

    pub fn converted_package_size(&self) -> usize {
        self.converted_package.len()
    }

    pub fn installer_size(&self) -> usize {
        self.installer.len()
    }

    /// Write keys and packages into `dir` under their canonical names
    ///
    /// The private key is written with mode 0600.
    pub fn write_to(&self, dir: &Path, username: &str, naming: &PackageNaming) -> Result<()> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        fs::create_dir_all(dir)
            .map_err(|e| Error::Io(format!("Failed to create {}: {}", dir.display(), e)))?;

        let write = |name: &str, content: &[u8]| -> Result<()> {
            let path = dir.join(name);
            fs::write(&path, content)
                .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))
        };

        write(PUBLIC_KEY_OUTPUT, self.public_key.as_bytes())?;
        write(&naming.native_package(username), &self.native_package)?;
        write(&naming.converted_package(username), &self.converted_package)?;

        let private_path = dir.join(PRIVATE_KEY_OUTPUT);
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&private_path)
            .and_then(|mut file| file.write_all(self.private_key.as_bytes()))
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", private_path.display(), e)))?;

        Ok(())
    }
}

impl fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("native_package_size", &self.native_package_size())
            .field("converted_package_size", &self.converted_package_size())
            .field("installer_size", &self.installer_size())
            .field("teardown_warnings", &self.teardown_warnings)
            .finish()
    }
}

/// Paths of the four files that make up a bundle
#[derive(Debug, Clone, Copy)]
pub struct ArtifactPaths<'a> {
    pub public_key: &'a Path,
    pub private_key: &'a Path,
    pub native_package: &'a Path,
    pub converted_package: &'a Path,
}

/// Read all artifacts into memory, stopping at the first failure
pub fn load_artifacts(paths: ArtifactPaths<'_>) -> Result<ArtifactBundle> {
    let public_key = read_text(paths.public_key)?;
    let private_key = Zeroizing::new(read_text(paths.private_key)?);
    let native_package = read_bytes(paths.native_package)?;
    let converted_package = read_bytes(paths.converted_package)?;

    debug!(
        "Loaded artifacts: rpm {} bytes, deb {} bytes",
        native_package.len(),
        converted_package.len()
    );

    Ok(ArtifactBundle {
        public_key,
        private_key,
        native_package,
        converted_package,
        installer: Vec::new(),
        teardown_warnings: Vec::new(),
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))
}
