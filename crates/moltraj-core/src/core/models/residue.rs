use super::property::{Property, PropertyMap};

/// A named group of atoms, with an optional sequence number.
///
/// Atom indices are kept sorted and unique. Chain identifiers, insertion
/// codes and secondary structure labels are stored as properties
/// (`chainid`, `insertion_code`, `secondary_structure`, `is_standard_pdb`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Residue {
    pub name: String,
    pub id: Option<i64>,
    atoms: Vec<usize>,
    pub properties: PropertyMap,
}

impl Residue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn add_atom(&mut self, atom: usize) {
        if let Err(position) = self.atoms.binary_search(&atom) {
            self.atoms.insert(position, atom);
        }
    }

    pub(crate) fn truncate_atoms(&mut self, size: usize) {
        let keep = self.atoms.partition_point(|&atom| atom < size);
        self.atoms.truncate(keep);
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atoms.binary_search(&atom).is_ok()
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.properties.insert(key.into(), value.into());
    }

    /// The chain identifier, when it was recorded as a string property.
    pub fn chain_id(&self) -> Option<&str> {
        self.get("chainid").and_then(Property::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_atom_keeps_indices_sorted_and_unique() {
        let mut residue = Residue::with_id("ALA", 4);
        residue.add_atom(7);
        residue.add_atom(2);
        residue.add_atom(7);
        residue.add_atom(5);
        assert_eq!(residue.atoms(), &[2, 5, 7]);
        assert!(residue.contains(5));
        assert!(!residue.contains(3));
        assert_eq!(residue.len(), 3);
    }

    #[test]
    fn chain_id_is_read_from_string_property() {
        let mut residue = Residue::new("HOH");
        assert_eq!(residue.chain_id(), None);
        residue.set("chainid", "B");
        assert_eq!(residue.chain_id(), Some("B"));
        assert_eq!(residue.id, None);
    }
}
