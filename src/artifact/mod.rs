//! Uberjar inputs and output.
//!
//! - [`compiled`] - AOT compile output loaded from the classes directory
//! - [`dependency`] - dependency jars, read and indexed per coordinate
//! - [`manifest`] - synthesized `META-INF/MANIFEST.MF`
//! - [`assemble`] - deterministic, atomic archive writer

pub mod assemble;
pub mod compiled;
pub mod dependency;
pub mod manifest;
