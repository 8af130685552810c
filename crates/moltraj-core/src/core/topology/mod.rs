//! # Topology Module
//!
//! Reconstruction of the connectivity information that text formats only
//! encode partially.
//!
//! ## Key Components
//!
//! - [`registry`] - Residue bond templates, built in or loaded from TOML files
//! - [`types`] - Canonical, order-independent type ids for atoms and bonded interactions
//! - [`molecules`] - Connected-component (molecule) ids from a bond list
//! - [`connectivity`] - Template and backbone bonds, serial number remapping and
//!   residue range labels
//!
//! ## Usage
//!
//! Readers run a [`connectivity::ConnectivityResolver`] on the frames they
//! parse; writers that need numeric types (LAMMPS Data) build
//! [`types::TopologyTypes`] and [`molecules::assign_molecule_ids`] from the
//! frame they are given.
//!
//! ```ignore
//! use moltraj::core::topology::registry::ResidueTemplates;
//!
//! let mut templates = ResidueTemplates::standard().clone();
//! templates.extend(ResidueTemplates::load("ligands.toml".as_ref())?);
//! ```

pub mod connectivity;
pub mod molecules;
pub mod registry;
pub mod types;
