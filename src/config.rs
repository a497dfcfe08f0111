// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [tools] - External tool names, generator script location, timeout
//! - [package] - Package name prefix, version, release, architectures
//! - [key] - Key name, key comment, passphrase policy
//! - [workspace] - Where temporary workspaces are created
//!
//! Every field has a default, so an empty file (or no file) is valid.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LSCGEN_CONFIG";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// External tool settings
    #[serde(default)]
    pub tools: ToolsSection,

    /// Package naming settings
    #[serde(default)]
    pub package: PackageSection,

    /// Key generation settings
    #[serde(default)]
    pub key: KeySection,

    /// Workspace settings
    #[serde(default)]
    pub workspace: WorkspaceSection,
}

/// External tool configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// Directory containing the RPM generator script
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name of the RPM generator script inside `data_dir`
    #[serde(default = "default_generator_script")]
    pub generator_script: String,

    #[serde(default = "default_keygen")]
    pub keygen: String,

    #[serde(default = "default_openssl")]
    pub openssl: String,

    /// RPM to DEB conversion tool
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Root emulation wrapper the converter runs under
    #[serde(default = "default_fakeroot")]
    pub fakeroot: String,

    /// Colon separated PATH used for tool discovery (empty = $PATH)
    #[serde(default)]
    pub search_path: String,

    /// Per-invocation timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            generator_script: default_generator_script(),
            keygen: default_keygen(),
            openssl: default_openssl(),
            converter: default_converter(),
            fakeroot: default_fakeroot(),
            search_path: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolsSection {
    /// Timeout for a single tool invocation, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/usr/share/openvas")
}

fn default_generator_script() -> String {
    "openvas-lsc-rpm-creator.sh".to_string()
}

fn default_keygen() -> String {
    "ssh-keygen".to_string()
}

fn default_openssl() -> String {
    "openssl".to_string()
}

fn default_converter() -> String {
    "alien".to_string()
}

fn default_fakeroot() -> String {
    "fakeroot".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// Package naming section
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_release")]
    pub release: String,

    #[serde(default = "default_native_arch")]
    pub native_arch: String,

    #[serde(default = "default_converted_arch")]
    pub converted_arch: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            version: default_version(),
            release: default_release(),
            native_arch: default_native_arch(),
            converted_arch: default_converted_arch(),
        }
    }
}

fn default_prefix() -> String {
    "openvas-lsc-target".to_string()
}

fn default_version() -> String {
    "0.5".to_string()
}

fn default_release() -> String {
    "1".to_string()
}

fn default_native_arch() -> String {
    "noarch".to_string()
}

fn default_converted_arch() -> String {
    "all".to_string()
}

/// Key generation section
#[derive(Debug, Clone, Deserialize)]
pub struct KeySection {
    /// Identifier recorded in the login descriptor
    #[serde(default = "default_key_name")]
    pub name: String,

    /// Comment embedded in the public key
    #[serde(default = "default_comment")]
    pub comment: String,

    /// Minimum passphrase length in characters
    #[serde(default = "default_min_passphrase_len")]
    pub min_passphrase_len: usize,
}

impl Default for KeySection {
    fn default() -> Self {
        Self {
            name: default_key_name(),
            comment: default_comment(),
            min_passphrase_len: default_min_passphrase_len(),
        }
    }
}

fn default_key_name() -> String {
    "key_name".to_string()
}

fn default_comment() -> String {
    "Key generated by OpenVAS Manager".to_string()
}

fn default_min_passphrase_len() -> usize {
    5
}

/// Workspace section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceSection {
    /// Parent directory for temporary workspaces (unset = system temp dir)
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl WorkspaceSection {
    pub fn root(&self) -> PathBuf {
        match &self.root {
            Some(root) if !root.as_os_str().is_empty() => root.clone(),
            _ => std::env::temp_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            Error::Configuration(msg) => {
                Error::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Locate and load the configuration
    ///
    /// Uses `$LSCGEN_CONFIG` if set, else `<config dir>/lscgen/config.toml`
    /// if it exists, else defaults. Environment overrides are applied last.
    pub fn discover() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_ENV) {
            Self::load(Path::new(&path))?
        } else {
            match dirs::config_dir().map(|d| d.join("lscgen/config.toml")) {
                Some(path) if path.is_file() => Self::load(&path)?,
                _ => Self::default(),
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `LSCGEN_DATA_DIR`, `LSCGEN_WORKSPACE_ROOT` and
    /// `LSCGEN_TOOL_TIMEOUT` from the given lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LSCGEN_DATA_DIR") {
            self.tools.data_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("LSCGEN_WORKSPACE_ROOT") {
            self.workspace.root = Some(PathBuf::from(root));
        }
        if let Some(timeout) = lookup("LSCGEN_TOOL_TIMEOUT") {
            self.tools.timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::Configuration(format!("LSCGEN_TOOL_TIMEOUT is not a number: {}", timeout))
            })?;
        }
        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let tools = [
            ("tools.generator_script", &self.tools.generator_script),
            ("tools.keygen", &self.tools.keygen),
            ("tools.openssl", &self.tools.openssl),
            ("tools.converter", &self.tools.converter),
            ("tools.fakeroot", &self.tools.fakeroot),
        ];
        for (field, value) in tools {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{} must not be empty", field)));
            }
        }

        let naming = [
            ("package.prefix", &self.package.prefix),
            ("package.version", &self.package.version),
            ("package.release", &self.package.release),
            ("package.native_arch", &self.package.native_arch),
            ("package.converted_arch", &self.package.converted_arch),
        ];
        for (field, value) in naming {
            if value.is_empty() || value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(Error::Configuration(format!(
                    "{} must be a non-empty token without '/' or whitespace, got {:?}",
                    field, value
                )));
            }
        }

        if self.key.comment.is_empty() {
            return Err(Error::Configuration("key.comment must not be empty".to_string()));
        }
        if self.key.min_passphrase_len == 0 {
            return Err(Error::Configuration(
                "key.min_passphrase_len must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.tools.converter, "alien");
        assert_eq!(config.tools.data_dir, PathBuf::from("/usr/share/openvas"));
        assert_eq!(config.package.prefix, "openvas-lsc-target");
        assert_eq!(config.package.version, "0.5");
        assert_eq!(config.key.min_passphrase_len, 5);
        assert_eq!(config.tools.timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[tools]
data_dir = "/opt/lsc"
converter = "alien"
timeout_secs = 0

[package]
prefix = "acme-lsc"
version = "1.2"

[key]
comment = "Scanner key"

[workspace]
root = "/var/tmp"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.tools.data_dir, PathBuf::from("/opt/lsc"));
        assert_eq!(config.tools.timeout(), None);
        assert_eq!(config.package.prefix, "acme-lsc");
        assert_eq!(config.package.release, "1");
        assert_eq!(config.key.comment, "Scanner key");
        assert_eq!(config.workspace.root(), PathBuf::from("/var/tmp"));
    }

    #[test]
    fn test_invalid_naming_token() {
        let toml_str = r#"
[package]
version = "0.5 beta"
"#;
        assert!(matches!(Config::parse(toml_str), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_passphrase_policy() {
        let toml_str = r#"
[key]
min_passphrase_len = 0
"#;
        assert!(Config::parse(toml_str).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LSCGEN_DATA_DIR", "/srv/lsc"),
            ("LSCGEN_WORKSPACE_ROOT", "/scratch"),
            ("LSCGEN_TOOL_TIMEOUT", "30"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.tools.data_dir, PathBuf::from("/srv/lsc"));
        assert_eq!(config.workspace.root(), PathBuf::from("/scratch"));
        assert_eq!(config.tools.timeout_secs, 30);
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "LSCGEN_TOOL_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/lscgen.toml"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
