use super::atom::Atom;
use super::residue::Residue;
use crate::core::topology::types::{canonical_angle, canonical_dihedral, canonical_improper};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Unknown,
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    Amide,
}

#[derive(Debug, Error)]
#[error("invalid bond order string '{0}'")]
pub struct ParseBondOrderError(String);

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "q" | "quadruple" => Ok(Self::Quadruple),
            "ar" | "aromatic" => Ok(Self::Aromatic),
            "am" | "amide" => Ok(Self::Amide),
            "du" | "un" | "nc" | "unknown" => Ok(Self::Unknown),
            _ => Err(ParseBondOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Unknown => "unknown",
                Self::Single => "single",
                Self::Double => "double",
                Self::Triple => "triple",
                Self::Quadruple => "quadruple",
                Self::Aromatic => "aromatic",
                Self::Amide => "amide",
            }
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("can not add a bond between atom {0} and itself")]
    SelfBond(usize),
    #[error("atom index {index} is out of bounds for a topology with {size} atoms")]
    AtomOutOfRange { index: usize, size: usize },
    #[error("atom {atom} already belongs to residue '{residue}'")]
    AtomInTwoResidues { atom: usize, residue: String },
}

/// Atoms, bonds and residues of a frame.
///
/// Bonds are stored once, as `(min, max)` index pairs. Angles, dihedrals and
/// impropers are not stored: they are derived from the bond graph on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<Atom>,
    bonds: BTreeMap<[usize; 2], BondOrder>,
    residues: Vec<Residue>,
    residue_of_atom: HashMap<usize, usize>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Grows the topology with default atoms, or shrinks it and forgets every
    /// bond and residue membership of the removed atoms.
    pub fn resize(&mut self, size: usize) {
        if size >= self.atoms.len() {
            self.atoms.resize_with(size, Atom::default);
            return;
        }
        self.atoms.truncate(size);
        self.bonds.retain(|[_, j], _| *j < size);
        self.residue_of_atom.retain(|atom, _| *atom < size);
        for residue in &mut self.residues {
            residue.truncate_atoms(size);
        }
    }

    fn check_index(&self, index: usize) -> Result<(), TopologyError> {
        if index >= self.atoms.len() {
            return Err(TopologyError::AtomOutOfRange {
                index,
                size: self.atoms.len(),
            });
        }
        Ok(())
    }

    /// Adds a bond. Re-adding an existing bond only upgrades an unknown order.
    pub fn add_bond(&mut self, i: usize, j: usize, order: BondOrder) -> Result<(), TopologyError> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(TopologyError::SelfBond(i));
        }
        let entry = self.bonds.entry([i.min(j), i.max(j)]).or_insert(order);
        if *entry == BondOrder::Unknown {
            *entry = order;
        }
        Ok(())
    }

    pub fn remove_bond(&mut self, i: usize, j: usize) -> Option<BondOrder> {
        self.bonds.remove(&[i.min(j), i.max(j)])
    }

    pub fn bond_order(&self, i: usize, j: usize) -> Option<BondOrder> {
        self.bonds.get(&[i.min(j), i.max(j)]).copied()
    }

    /// Bonds as sorted `(min, max)` pairs.
    pub fn bonds(&self) -> impl Iterator<Item = [usize; 2]> + '_ {
        self.bonds.keys().copied()
    }

    pub fn bonds_with_orders(&self) -> impl Iterator<Item = ([usize; 2], BondOrder)> + '_ {
        self.bonds.iter().map(|(bond, order)| (*bond, *order))
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Bonded neighbours of every atom.
    pub fn neighbors(&self) -> Vec<BTreeSet<usize>> {
        let mut neighbors = vec![BTreeSet::new(); self.atoms.len()];
        for &[i, j] in self.bonds.keys() {
            neighbors[i].insert(j);
            neighbors[j].insert(i);
        }
        neighbors
    }

    /// Every bonded angle `(i, j, k)` with `j` at the vertex, in canonical order.
    pub fn angles(&self) -> Vec<[usize; 3]> {
        let neighbors = self.neighbors();
        let mut angles = BTreeSet::new();
        for &[i, j] in self.bonds.keys() {
            for &k in &neighbors[i] {
                if k != j {
                    angles.insert(canonical_angle([k, i, j]));
                }
            }
            for &k in &neighbors[j] {
                if k != i {
                    angles.insert(canonical_angle([i, j, k]));
                }
            }
        }
        angles.into_iter().collect()
    }

    /// Every proper dihedral `(i, j, k, m)` along bonded chains, in canonical order.
    pub fn dihedrals(&self) -> Vec<[usize; 4]> {
        let neighbors = self.neighbors();
        let mut dihedrals = BTreeSet::new();
        for [i, j, k] in self.angles() {
            for &m in &neighbors[i] {
                if m != j && m != k {
                    dihedrals.insert(canonical_dihedral([m, i, j, k]));
                }
            }
            for &m in &neighbors[k] {
                if m != i && m != j {
                    dihedrals.insert(canonical_dihedral([i, j, k, m]));
                }
            }
        }
        dihedrals.into_iter().collect()
    }

    /// Every improper `(i, j, k, m)` with `j` bonded to the three others.
    pub fn impropers(&self) -> Vec<[usize; 4]> {
        let mut impropers = BTreeSet::new();
        for (center, bonded) in self.neighbors().iter().enumerate() {
            let bonded: Vec<usize> = bonded.iter().copied().collect();
            for a in 0..bonded.len() {
                for b in (a + 1)..bonded.len() {
                    for c in (b + 1)..bonded.len() {
                        impropers.insert(canonical_improper([
                            bonded[a], center, bonded[b], bonded[c],
                        ]));
                    }
                }
            }
        }
        impropers.into_iter().collect()
    }

    /// Adds a residue. Every atom of the residue must exist and must not
    /// already belong to another residue.
    pub fn add_residue(&mut self, residue: Residue) -> Result<(), TopologyError> {
        for &atom in residue.atoms() {
            self.check_index(atom)?;
            if let Some(&existing) = self.residue_of_atom.get(&atom) {
                return Err(TopologyError::AtomInTwoResidues {
                    atom,
                    residue: self.residues[existing].name.clone(),
                });
            }
        }
        let index = self.residues.len();
        for &atom in residue.atoms() {
            self.residue_of_atom.insert(atom, index);
        }
        self.residues.push(residue);
        Ok(())
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residue_for_atom(&self, atom: usize) -> Option<&Residue> {
        self.residue_of_atom
            .get(&atom)
            .map(|&index| &self.residues[index])
    }
}
