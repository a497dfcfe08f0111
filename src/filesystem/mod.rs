// src/filesystem/mod.rs

//! Filesystem helpers used to shuttle artifacts between workspaces
//!
//! This module provides:
//! - Recursive removal of a workspace directory
//! - Whole-file copy and copy-then-delete move
//! - Validation of file names derived from request input

mod ops;
mod path;

pub use ops::{copy_file, move_file, remove_recursive};
pub use path::validate_file_component;
