//! Provides input/output functionality for text-based trajectory formats.
//!
//! This module contains the line-oriented file abstraction shared by every
//! grammar ([`file::TextFile`] and [`file::TextWriter`], both with transparent
//! gzip support), the [`traits::FrameFormat`] interface each grammar
//! implements, format selection through [`format::FormatKind`], and one
//! module per supported grammar.

pub mod bgf;
pub mod cssr;
pub mod error;
pub mod fields;
pub mod file;
pub mod format;
pub mod gro;
pub mod lammps;
pub mod mol2;
pub mod pdb;
pub mod sdf;
pub mod traits;
