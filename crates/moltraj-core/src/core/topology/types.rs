//! Order-independent identities for atoms and bonded interactions.
//!
//! Interactions are canonicalized so that a bond, angle, dihedral or improper
//! gets the same tuple whichever way round its atoms were listed. The same
//! functions work on atom indices and on atom type ids.

use crate::core::models::atom::Atom;
use crate::core::models::topology::Topology;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

pub fn canonical_bond([i, j]: [usize; 2]) -> [usize; 2] {
    [i.min(j), i.max(j)]
}

/// `j` is the vertex of the angle and keeps its slot.
pub fn canonical_angle([i, j, k]: [usize; 3]) -> [usize; 3] {
    [i.min(k), j, i.max(k)]
}

/// Orients the chain so that the end pair with the smaller maximum (then the
/// smaller minimum) comes first. Symmetric end pairs fall back to the
/// lexicographically smaller orientation.
pub fn canonical_dihedral([i, j, k, m]: [usize; 4]) -> [usize; 4] {
    let (forward, backward) = ([i, j, k, m], [m, k, j, i]);
    let keep = match (i.max(j).cmp(&k.max(m)), i.min(j).cmp(&k.min(m))) {
        (Ordering::Equal, Ordering::Equal) => forward <= backward,
        (Ordering::Equal, by_min) => by_min == Ordering::Less,
        (by_max, _) => by_max == Ordering::Less,
    };
    if keep { forward } else { backward }
}

/// `j` is the central atom; the three others are sorted.
pub fn canonical_improper([i, j, k, m]: [usize; 4]) -> [usize; 4] {
    let mut others = [i, k, m];
    others.sort_unstable();
    [others[0], j, others[1], others[2]]
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no {interaction} type registered for {tuple}; this is a bug")]
pub struct TypeLookupError {
    pub interaction: &'static str,
    pub tuple: String,
}

/// Insertion-ordered set of keys, each identified by its insertion rank.
#[derive(Debug, Clone)]
pub struct TypeTable<K> {
    entries: Vec<K>,
    ids: HashMap<K, usize>,
}

impl<K> Default for TypeTable<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> TypeTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `key`, registering it first if needed.
    pub fn insert(&mut self, key: K) -> usize {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push(key.clone());
        self.ids.insert(key, id);
        id
    }

    pub fn get(&self, key: &K) -> Option<usize> {
        self.ids.get(key).copied()
    }

    pub fn entries(&self) -> &[K] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An atom type: the type label and the bit pattern of the mass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomKind {
    pub label: String,
    mass_bits: u64,
}

impl AtomKind {
    pub fn of(atom: &Atom) -> Self {
        // -0.0 and 0.0 are the same mass
        let mass = if atom.mass == 0.0 { 0.0 } else { atom.mass };
        Self {
            label: atom.kind.clone(),
            mass_bits: mass.to_bits(),
        }
    }

    pub fn mass(&self) -> f64 {
        f64::from_bits(self.mass_bits)
    }
}

/// Dense type ids for every atom and bonded interaction of a topology,
/// assigned in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TopologyTypes {
    atoms: TypeTable<AtomKind>,
    atom_types: Vec<usize>,
    bonds: TypeTable<[usize; 2]>,
    angles: TypeTable<[usize; 3]>,
    dihedrals: TypeTable<[usize; 4]>,
    impropers: TypeTable<[usize; 4]>,
}

fn lookup_error<T: Debug>(interaction: &'static str, tuple: T) -> TypeLookupError {
    TypeLookupError {
        interaction,
        tuple: format!("{tuple:?}"),
    }
}

impl TopologyTypes {
    pub fn new(topology: &Topology) -> Self {
        let mut types = Self::default();
        for atom in topology.atoms() {
            let id = types.atoms.insert(AtomKind::of(atom));
            types.atom_types.push(id);
        }
        let kind = |index: usize| types.atom_types[index];

        let mut bonds = TypeTable::new();
        for [i, j] in topology.bonds() {
            bonds.insert(canonical_bond([kind(i), kind(j)]));
        }
        let mut angles = TypeTable::new();
        for [i, j, k] in topology.angles() {
            angles.insert(canonical_angle([kind(i), kind(j), kind(k)]));
        }
        let mut dihedrals = TypeTable::new();
        for [i, j, k, m] in topology.dihedrals() {
            dihedrals.insert(canonical_dihedral([kind(i), kind(j), kind(k), kind(m)]));
        }
        let mut impropers = TypeTable::new();
        for [i, j, k, m] in topology.impropers() {
            impropers.insert(canonical_improper([kind(i), kind(j), kind(k), kind(m)]));
        }

        types.bonds = bonds;
        types.angles = angles;
        types.dihedrals = dihedrals;
        types.impropers = impropers;
        types
    }

    /// Type id of the atom at `index` in the topology these types were built from.
    pub fn atom_type(&self, index: usize) -> Result<usize, TypeLookupError> {
        self.atom_types
            .get(index)
            .copied()
            .ok_or_else(|| lookup_error("atom", index))
    }

    fn kinds<const N: usize>(
        &self,
        interaction: &'static str,
        atoms: [usize; N],
    ) -> Result<[usize; N], TypeLookupError> {
        let mut kinds = [0; N];
        for (kind, &atom) in kinds.iter_mut().zip(&atoms) {
            *kind = self
                .atom_types
                .get(atom)
                .copied()
                .ok_or_else(|| lookup_error(interaction, atoms))?;
        }
        Ok(kinds)
    }

    pub fn bond_type(&self, bond: [usize; 2]) -> Result<usize, TypeLookupError> {
        let kinds = canonical_bond(self.kinds("bond", bond)?);
        self.bonds.get(&kinds).ok_or_else(|| lookup_error("bond", kinds))
    }

    pub fn angle_type(&self, angle: [usize; 3]) -> Result<usize, TypeLookupError> {
        let kinds = canonical_angle(self.kinds("angle", angle)?);
        self.angles.get(&kinds).ok_or_else(|| lookup_error("angle", kinds))
    }

    pub fn dihedral_type(&self, dihedral: [usize; 4]) -> Result<usize, TypeLookupError> {
        let kinds = canonical_dihedral(self.kinds("dihedral", dihedral)?);
        self.dihedrals
            .get(&kinds)
            .ok_or_else(|| lookup_error("dihedral", kinds))
    }

    pub fn improper_type(&self, improper: [usize; 4]) -> Result<usize, TypeLookupError> {
        let kinds = canonical_improper(self.kinds("improper", improper)?);
        self.impropers
            .get(&kinds)
            .ok_or_else(|| lookup_error("improper", kinds))
    }

    pub fn atom_kinds(&self) -> &[AtomKind] {
        self.atoms.entries()
    }

    pub fn bond_types(&self) -> &[[usize; 2]] {
        self.bonds.entries()
    }

    pub fn angle_types(&self) -> &[[usize; 3]] {
        self.angles.entries()
    }

    pub fn dihedral_types(&self) -> &[[usize; 4]] {
        self.dihedrals.entries()
    }

    pub fn improper_types(&self) -> &[[usize; 4]] {
        self.impropers.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::BondOrder;

    fn ethane() -> Topology {
        let mut topology = Topology::new();
        topology.push(Atom::new("C"));
        topology.push(Atom::new("C"));
        for _ in 0..6 {
            topology.push(Atom::new("H"));
        }
        topology.add_bond(0, 1, BondOrder::Single).unwrap();
        for h in 2..5 {
            topology.add_bond(0, h, BondOrder::Single).unwrap();
        }
        for h in 5..8 {
            topology.add_bond(h, 1, BondOrder::Single).unwrap();
        }
        topology
    }

    #[test]
    fn canonical_forms_do_not_depend_on_listing_order() {
        assert_eq!(canonical_bond([3, 1]), canonical_bond([1, 3]));
        assert_eq!(canonical_angle([1, 2, 3]), canonical_angle([3, 2, 1]));
        assert_eq!(canonical_dihedral([1, 2, 3, 4]), canonical_dihedral([4, 3, 2, 1]));
        assert_eq!(canonical_dihedral([4, 3, 2, 1]), [1, 2, 3, 4]);
        assert_eq!(canonical_improper([1, 2, 3, 4]), canonical_improper([1, 2, 4, 3]));
        assert_eq!(canonical_improper([4, 2, 1, 3]), [1, 2, 3, 4]);
    }

    #[test]
    fn dihedral_ties_on_maximum_are_broken_by_minimum() {
        assert_eq!(canonical_dihedral([2, 5, 1, 5]), [5, 1, 5, 2]);
        assert_eq!(canonical_dihedral([5, 1, 5, 2]), [5, 1, 5, 2]);
        assert_eq!(canonical_dihedral([1, 2, 2, 1]), [1, 2, 2, 1]);
    }

    #[test]
    fn symmetric_dihedral_end_pairs_pick_one_orientation() {
        assert_eq!(canonical_dihedral([0, 1, 0, 1]), canonical_dihedral([1, 0, 1, 0]));
        assert_eq!(canonical_dihedral([1, 0, 1, 0]), [0, 1, 0, 1]);
        assert_eq!(canonical_dihedral([2, 1, 2, 1]), [1, 2, 1, 2]);
        assert_eq!(canonical_dihedral([3, 1, 3, 1]), canonical_dihedral([1, 3, 1, 3]));
    }

    #[test]
    fn type_table_assigns_ids_by_insertion_rank() {
        let mut table = TypeTable::new();
        assert_eq!(table.insert([2, 3]), 0);
        assert_eq!(table.insert([0, 1]), 1);
        assert_eq!(table.insert([2, 3]), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&[0, 1]), Some(1));
        assert_eq!(table.get(&[5, 5]), None);
    }

    #[test]
    fn ethane_types_are_deduplicated_in_first_seen_order() {
        let topology = ethane();
        let types = TopologyTypes::new(&topology);
        let labels: Vec<_> = types.atom_kinds().iter().map(|k| k.label.as_str()).collect();
        assert_eq!(labels, ["C", "H"]);
        assert_eq!(types.bond_types(), &[[0, 0], [0, 1]]);
        assert_eq!(types.angle_types().len(), 2);
        assert_eq!(types.dihedral_types(), &[[1, 0, 0, 1]]);
        assert!(types.improper_types().len() == 2);
    }

    #[test]
    fn lookups_are_symmetric_and_resolve_every_interaction() {
        let topology = ethane();
        let types = TopologyTypes::new(&topology);
        assert_eq!(types.bond_type([0, 2]).unwrap(), types.bond_type([2, 0]).unwrap());
        assert_eq!(types.angle_type([2, 0, 1]).unwrap(), types.angle_type([1, 0, 2]).unwrap());
        assert_eq!(
            types.dihedral_type([2, 0, 1, 5]).unwrap(),
            types.dihedral_type([5, 1, 0, 2]).unwrap()
        );
        assert_eq!(
            types.improper_type([1, 0, 2, 3]).unwrap(),
            types.improper_type([1, 0, 3, 2]).unwrap()
        );
        for angle in topology.angles() {
            types.angle_type(angle).unwrap();
        }
        for improper in topology.impropers() {
            types.improper_type(improper).unwrap();
        }
    }

    #[test]
    fn polyether_chain_has_a_single_dihedral_type() {
        let mut topology = Topology::new();
        for kind in ["C", "O", "C", "O", "C"] {
            topology.push(Atom::new(kind));
        }
        for i in 0..4 {
            topology.add_bond(i, i + 1, BondOrder::Single).unwrap();
        }
        let types = TopologyTypes::new(&topology);
        assert_eq!(types.dihedral_types(), [[0, 1, 0, 1]]);
        assert_eq!(types.dihedral_type([0, 1, 2, 3]), types.dihedral_type([1, 2, 3, 4]));
        assert_eq!(types.dihedral_type([4, 3, 2, 1]).unwrap(), 0);
    }

    #[test]
    fn unregistered_patterns_are_reported_as_bugs() {
        let types = TopologyTypes::new(&ethane());
        let error = types.bond_type([2, 3]).unwrap_err();
        assert_eq!(error.interaction, "bond");
        assert!(error.to_string().ends_with("this is a bug"));
        assert!(types.atom_type(42).is_err());
    }

    #[test]
    fn atom_kind_identity_includes_mass() {
        let light = Atom::new("H");
        let mut heavy = Atom::new("H");
        heavy.mass = 2.014;
        assert_ne!(AtomKind::of(&light), AtomKind::of(&heavy));

        let mut zero = Atom::with_kind("X", "X");
        zero.mass = -0.0;
        assert_eq!(AtomKind::of(&zero), AtomKind::of(&Atom::with_kind("X", "X")));
    }
}
