// src/naming.rs

//! Output file naming conventions of the external tools
//!
//! The generator script and alien name their output after the user and the
//! package version. The pipeline never asks the tools what they produced; it
//! computes the expected name and looks for that file.

use crate::config::PackageSection;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Extension ssh-keygen gives the public half of a key
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

/// Naming policy for the native (RPM) and converted (DEB) packages
#[derive(Debug, Clone)]
pub struct PackageNaming {
    prefix: String,
    version: String,
    release: String,
    native_arch: String,
    converted_arch: String,
}

impl PackageNaming {
    pub fn new(section: &PackageSection) -> Self {
        Self {
            prefix: section.prefix.clone(),
            version: section.version.clone(),
            release: section.release.clone(),
            native_arch: section.native_arch.clone(),
            converted_arch: section.converted_arch.clone(),
        }
    }

    /// RPM built by the generator script,
    /// e.g. `openvas-lsc-target-alice-0.5-1.noarch.rpm`
    pub fn native_package(&self, username: &str) -> String {
        format!(
            "{}-{}-{}-{}.{}.rpm",
            self.prefix, username, self.version, self.release, self.native_arch
        )
    }

    /// DEB produced by alien, which lower-cases the package name,
    /// e.g. `openvas-lsc-target-alice_0.5-1_all.deb`
    pub fn converted_package(&self, username: &str) -> String {
        format!(
            "{}-{}_{}-{}_{}.deb",
            self.prefix,
            username.to_lowercase(),
            self.version,
            self.release,
            self.converted_arch
        )
    }

    /// Public key file name the generator script expects
    pub fn staged_public_key(username: &str) -> String {
        format!("{}.{}", username, PUBLIC_KEY_EXTENSION)
    }
}

impl Default for PackageNaming {
    fn default() -> Self {
        Self::new(&PackageSection::default())
    }
}

/// Strip a trailing `.pub` from a key path, if present
///
/// Works on the raw path so non UTF-8 directories survive unchanged.
pub fn strip_public_suffix(path: &Path) -> PathBuf {
    if path.extension() == Some(OsStr::new(PUBLIC_KEY_EXTENSION)) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}
