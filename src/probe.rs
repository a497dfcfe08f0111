// src/probe.rs

//! Discovery of optional external tools
//!
//! Two facts are needed before a run: whether the RPM to DEB converter is
//! installed, and which directory holds the RPM generator script. Both are
//! probed at most once per [`Capabilities`] instance and cached, including
//! negative answers. Share one instance per process (e.g. in an `Arc`).

use crate::config::ToolsSection;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Memoized tool discovery results
#[derive(Debug)]
pub struct Capabilities {
    tools: ToolsSection,
    converter: OnceLock<bool>,
    generator_dir: OnceLock<Option<PathBuf>>,
}

impl Capabilities {
    /// Probe lazily according to the tool configuration
    pub fn new(tools: &ToolsSection) -> Self {
        Self {
            tools: tools.clone(),
            converter: OnceLock::new(),
            generator_dir: OnceLock::new(),
        }
    }

    /// Use precomputed answers instead of probing
    pub fn preset(converter_available: bool, generator_dir: Option<PathBuf>) -> Self {
        let converter = OnceLock::new();
        let _ = converter.set(converter_available);
        let dir = OnceLock::new();
        let _ = dir.set(generator_dir);
        Self {
            tools: ToolsSection::default(),
            converter,
            generator_dir: dir,
        }
    }

    /// Whether the converter (alien) can be found
    pub fn converter_available(&self) -> bool {
        *self.converter.get_or_init(|| {
            let found = find_program(&self.tools.converter, &self.tools.search_path);
            match &found {
                Some(path) => info!("Found {} at {}", self.tools.converter, path.display()),
                None => info!("{} not found in path", self.tools.converter),
            }
            found.is_some()
        })
    }

    /// Directory containing the RPM generator script, if installed
    pub fn generator_dir(&self) -> Option<&Path> {
        self.generator_dir
            .get_or_init(|| {
                let script = self.tools.data_dir.join(&self.tools.generator_script);
                if script.is_file() {
                    debug!("Found RPM generator at {}", script.display());
                    Some(self.tools.data_dir.clone())
                } else {
                    info!("RPM generator not found at {}", script.display());
                    None
                }
            })
            .as_deref()
    }

    /// Resolve any configured tool in the search path, without caching
    pub fn locate(&self, program: &str) -> Option<PathBuf> {
        find_program(program, &self.tools.search_path)
    }
}

/// Look up an executable in `search_path`, or in `$PATH` when empty
fn find_program(name: &str, search_path: &str) -> Option<PathBuf> {
    if search_path.is_empty() {
        which::which(name).ok()
    } else {
        let cwd = std::env::current_dir().ok()?;
        which::which_in(name, Some(search_path), cwd).ok()
    }
}
