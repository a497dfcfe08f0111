// src/keys/mod.rs

//! RSA keypair generation for local security checks
//!
//! Generation is split in two external steps:
//!
//! 1. `ssh-keygen` synthesizes the raw keypair (`key` + `key.pub`)
//! 2. `openssl pkcs8` re-encrypts the raw private key into an encrypted
//!    PKCS#8 file
//!
//! Either tool can be swapped through the configuration without touching the
//! rest of the pipeline.

use crate::config::{KeySection, ToolsSection};
use crate::error::{Error, Result};
use crate::login::LoginDescriptor;
use crate::naming::strip_public_suffix;
use crate::process::{ProcessRequest, ProcessRunner};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable carrying the input passphrase to openssl
const PASSIN_ENV: &str = "LSCGEN_PASSIN";
/// Environment variable carrying the output passphrase to openssl
const PASSOUT_ENV: &str = "LSCGEN_PASSOUT";

/// Runs the key generation and private key transform tools
pub struct KeyGenerator<'a> {
    runner: &'a dyn ProcessRunner,
    keygen: String,
    openssl: String,
    min_passphrase_len: usize,
}

impl<'a> KeyGenerator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, tools: &ToolsSection, key: &KeySection) -> Self {
        Self {
            runner,
            keygen: tools.keygen.clone(),
            openssl: tools.openssl.clone(),
            min_passphrase_len: key.min_passphrase_len,
        }
    }

    /// Generate the public key and the encrypted private key for a login
    pub fn generate(&self, login: &LoginDescriptor) -> Result<()> {
        self.create_public_key(&login.comment, login.key_passphrase(), &login.public_key_path)?;
        self.create_private_key(
            &login.public_key_path,
            &login.private_key_path,
            login.key_passphrase(),
            login.key_passphrase(),
        )?;
        info!("Generated keypair for {}", login.username);
        Ok(())
    }

    /// Create an RSA keypair whose public half lands at `path`
    ///
    /// A trailing `.pub` is stripped to get the raw private key path that
    /// ssh-keygen writes alongside. Missing parent directories are created.
    pub fn create_public_key(&self, comment: &str, passphrase: &str, path: &Path) -> Result<()> {
        if comment.is_empty() {
            return Err(Error::Validation("key comment must be set".to_string()));
        }
        if passphrase.chars().count() < self.min_passphrase_len {
            return Err(Error::Validation(format!(
                "passphrase must be at least {} characters",
                self.min_passphrase_len
            )));
        }

        ensure_parent_dir(path)?;
        let stripped = strip_public_suffix(path);

        // -m PEM keeps the raw private key in a form openssl pkcs8 reads
        let request = ProcessRequest::new(&self.keygen)
            .args(["-q", "-t", "rsa", "-m", "PEM", "-f"])
            .arg(&stripped)
            .arg("-C")
            .arg(comment)
            .arg("-N")
            .secret_arg(passphrase);
        debug!("command: {}", request.display_command());

        self.runner
            .execute(&request)?
            .into_result(&self.keygen)?;
        Ok(())
    }

    /// Re-encrypt the raw private key next to `pubkey_path` as PKCS#8
    ///
    /// Refuses to run if the public key is missing or `privkey_path` already
    /// exists.
    pub fn create_private_key(
        &self,
        pubkey_path: &Path,
        privkey_path: &Path,
        passphrase_pub: &str,
        passphrase_priv: &str,
    ) -> Result<()> {
        if passphrase_pub.is_empty() || passphrase_priv.is_empty() {
            return Err(Error::Validation("passphrases must be set".to_string()));
        }

        if !pubkey_path.exists() {
            return Err(Error::Precondition(format!(
                "public key {} not found",
                pubkey_path.display()
            )));
        }
        if privkey_path.exists() {
            return Err(Error::Precondition(format!(
                "{} already exists",
                privkey_path.display()
            )));
        }
        ensure_parent_dir(privkey_path)?;

        let stripped = strip_public_suffix(pubkey_path);
        let request = ProcessRequest::new(&self.openssl)
            .args(["pkcs8", "-topk8", "-v2", "des3", "-in"])
            .arg(&stripped)
            .arg("-passin")
            .arg(format!("env:{}", PASSIN_ENV))
            .arg("-out")
            .arg(privkey_path)
            .arg("-passout")
            .arg(format!("env:{}", PASSOUT_ENV))
            .secret_env(PASSIN_ENV, passphrase_pub)
            .secret_env(PASSOUT_ENV, passphrase_priv);
        debug!("command: {}", request.display_command());

        self.runner
            .execute(&request)?
            .into_result(&self.openssl)?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|e| {
            Error::Io(format!("Failed to access directory {}: {}", dir.display(), e))
        }),
        _ => Ok(()),
    }
}
