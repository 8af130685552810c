//! # Core Module
//!
//! The stateless building blocks of moltraj: the frame containers, the text
//! grammars that read and write them, and the topology reconstruction run on
//! parsed frames.
//!
//! ## Architecture
//!
//! - **Containers** ([`models`]) - Atoms, residues, topology, unit cell and frames
//! - **File I/O** ([`io`]) - Line-oriented files with gzip support and one module per grammar
//! - **Topology reconstruction** ([`topology`]) - Residue bond templates, canonical type ids,
//!   molecule grouping and sequence-aware backbone bonds
//! - **Diagnostics** ([`diagnostics`]) - The replaceable sink for non-fatal conditions
//! - **Utilities** ([`utils`]) - Element symbols and masses
//!
//! Nothing in this module keeps state between calls: the byte offset index and
//! the open handles live in [`crate::engine`].

pub mod diagnostics;
pub mod io;
pub mod models;
pub mod topology;
pub mod utils;
