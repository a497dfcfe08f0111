// src/packages/mod.rs

//! Installer package production
//!
//! The RPM is built first by the generator script; the DEB is converted from
//! it. Both install the user's public key on the target host.

pub mod deb;
pub mod rpm;

pub use deb::DebConverter;
pub use rpm::RpmBuilder;
