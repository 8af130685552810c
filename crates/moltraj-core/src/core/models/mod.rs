//! # Core Models Module
//!
//! Container types shared by every file format: atoms, residues, the bond
//! topology, the unit cell and the frame that ties them together.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom name, type label, mass, charge and properties
//! - [`residue`] - Named groups of atoms with an optional sequence number
//! - [`topology`] - Bonds, residues and the derived angles, dihedrals and impropers
//! - [`cell`] - Unit cell matrix with length/angle conversions
//! - [`frame`] - One trajectory step: topology, positions, velocities and cell
//! - [`property`] - Typed values attached to atoms, residues and frames

pub mod atom;
pub mod cell;
pub mod frame;
pub mod property;
pub mod residue;
pub mod topology;
