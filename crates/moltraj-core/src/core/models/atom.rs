use super::property::{Property, PropertyMap};
use crate::core::utils::elements;

/// An atom as stored in a [`Frame`](super::frame::Frame).
///
/// The `kind` is the chemical type label (usually an element symbol, but
/// formats such as LAMMPS Data use numeric type names). Together with the
/// `mass` it defines the atom type used when canonicalizing topologies.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OW", "C12").
    pub name: String,
    /// The chemical type label (e.g., "C", "Zn", "3").
    pub kind: String,
    /// The mass in atomic mass units.
    pub mass: f64,
    /// The charge in elementary charge units.
    pub charge: f64,
    /// Format-specific extra data (altloc, SYBYL type, force-field type, ...).
    pub properties: PropertyMap,
}

impl Atom {
    /// Creates an atom whose type is the same as its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = name.clone();
        Self::with_kind(name, kind)
    }

    /// Creates an atom with an explicit type. The mass is taken from the
    /// element table when the type is an element symbol, and 0 otherwise.
    pub fn with_kind(name: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            name: name.into(),
            mass: elements::atomic_mass(&kind).unwrap_or(0.0),
            kind,
            charge: 0.0,
            properties: PropertyMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.properties.insert(key.into(), value.into());
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self::new("")
    }
}
