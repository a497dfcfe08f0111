// src/login.rs

//! Credential request and login descriptor
//!
//! Secrets are held in [`Zeroizing`] buffers so they are wiped when the
//! request or descriptor is dropped, whichever way the pipeline exits.

use crate::config::KeySection;
use crate::error::{Error, Result};
use crate::filesystem::validate_file_component;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// File name of the public key inside the key workspace
pub const PUBLIC_KEY_FILE: &str = "key.pub";

/// File name of the encrypted private key inside the key workspace
pub const PRIVATE_KEY_FILE: &str = "key.priv";

/// A "create credential" request: user name and password
pub struct CredentialRequest {
    name: String,
    password: Zeroizing<String>,
}

impl CredentialRequest {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check the request before anything touches the disk
    ///
    /// The name must be usable as a file name and the password, which doubles
    /// as the key passphrase, must be at least `min_passphrase_len` chars.
    pub fn validate(&self, min_passphrase_len: usize) -> Result<()> {
        validate_file_component(&self.name)
            .map_err(|e| Error::Validation(format!("user name: {}", e)))?;

        if self.password.chars().count() < min_passphrase_len {
            return Err(Error::Validation(format!(
                "password must be at least {} characters",
                min_passphrase_len
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to generate a key and package it for one user
pub struct LoginDescriptor {
    pub key_name: String,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    key_passphrase: Zeroizing<String>,
    pub comment: String,
    pub username: String,
    user_password: Zeroizing<String>,
}

impl LoginDescriptor {
    /// Build the descriptor for a key workspace
    ///
    /// The request password is used as key passphrase and as user password.
    pub fn new(key_dir: &Path, request: &CredentialRequest, key: &KeySection) -> Self {
        Self {
            key_name: key.name.clone(),
            public_key_path: key_dir.join(PUBLIC_KEY_FILE),
            private_key_path: key_dir.join(PRIVATE_KEY_FILE),
            key_passphrase: Zeroizing::new(request.password().to_string()),
            comment: key.comment.clone(),
            username: request.name().to_string(),
            user_password: Zeroizing::new(request.password().to_string()),
        }
    }

    pub fn key_passphrase(&self) -> &str {
        &self.key_passphrase
    }

    pub fn user_password(&self) -> &str {
        &self.user_password
    }
}

impl fmt::Debug for LoginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginDescriptor")
            .field("key_name", &self.key_name)
            .field("public_key_path", &self.public_key_path)
            .field("private_key_path", &self.private_key_path)
            .field("key_passphrase", &"<redacted>")
            .field("comment", &self.comment)
            .field("username", &self.username)
            .field("user_password", &"<redacted>")
            .finish()
    }
}
