// src/filesystem/path.rs

//! File name validation for names derived from request input
//!
//! The user name ends up as a file name inside a workspace (`<user>.pub`)
//! and inside package file names, so it must be a single, plain path
//! component.

use crate::error::{Error, Result};

/// Check that `name` is usable as a single file name component
///
/// Rejects empty names, `.` and `..`, path separators, NUL bytes and
/// control characters.
///
/// # Examples
///
/// ```
/// use lscgen::filesystem::validate_file_component;
///
/// assert!(validate_file_component("alice").is_ok());
/// assert!(validate_file_component("../alice").is_err());
/// assert!(validate_file_component("a/b").is_err());
/// ```
pub fn validate_file_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }

    if name == "." || name == ".." {
        return Err(Error::Validation(format!("invalid name: {}", name)));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::Validation(format!(
            "name contains path separator: {}",
            name
        )));
    }

    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(Error::Validation(
            "name contains control characters".to_string(),
        ));
    }

    Ok(())
}
