//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::engine`] handles and the
//! [`crate::core`] formats together into complete procedures.
//!
//! - **Conversion** ([`convert`]) - Copies a range of steps from one file into another,
//!   in any pair of supported formats, with progress reporting.
//! - **Inspection** ([`inspect`]) - Indexes a file and summarizes every step
//!   (atoms, bonds, residues, cell).

pub mod convert;
pub mod inspect;
