use super::atom::Atom;
use super::cell::UnitCell;
use super::property::{Property, PropertyMap};
use super::residue::Residue;
use super::topology::{BondOrder, Topology, TopologyError};
use nalgebra::{Point3, Vector3};

/// One step of a trajectory: atoms with their positions (and optionally
/// velocities), the topology, the unit cell and free-form properties.
///
/// Positions and velocities always have one entry per atom of the topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    topology: Topology,
    positions: Vec<Point3<f64>>,
    velocities: Option<Vec<Vector3<f64>>>,
    pub cell: UnitCell,
    pub properties: PropertyMap,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn atoms(&self) -> &[Atom] {
        self.topology.atoms()
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        self.topology.atoms_mut()
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    pub fn velocities(&self) -> Option<&[Vector3<f64>]> {
        self.velocities.as_deref()
    }

    pub fn velocities_mut(&mut self) -> Option<&mut [Vector3<f64>]> {
        self.velocities.as_deref_mut()
    }

    /// Enables velocities, initialized to zero. Existing velocities are kept.
    pub fn add_velocities(&mut self) {
        if self.velocities.is_none() {
            self.velocities = Some(vec![Vector3::zeros(); self.size()]);
        }
    }

    pub fn add_atom(&mut self, atom: Atom, position: Point3<f64>) {
        self.topology.push(atom);
        self.positions.push(position);
        if let Some(velocities) = &mut self.velocities {
            velocities.push(Vector3::zeros());
        }
    }

    pub fn add_atom_with_velocity(&mut self, atom: Atom, position: Point3<f64>, velocity: Vector3<f64>) {
        self.add_velocities();
        self.topology.push(atom);
        self.positions.push(position);
        if let Some(velocities) = &mut self.velocities {
            velocities.push(velocity);
        }
    }

    /// Resizes the frame. New atoms are default atoms at the origin.
    pub fn resize(&mut self, size: usize) {
        self.topology.resize(size);
        self.positions.resize(size, Point3::origin());
        if let Some(velocities) = &mut self.velocities {
            velocities.resize(size, Vector3::zeros());
        }
    }

    pub fn add_bond(&mut self, i: usize, j: usize, order: BondOrder) -> Result<(), TopologyError> {
        self.topology.add_bond(i, j, order)
    }

    pub fn add_residue(&mut self, residue: Residue) -> Result<(), TopologyError> {
        self.topology.add_residue(residue)
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.properties.insert(key.into(), value.into());
    }

    /// The frame title, stored as the "name" property by most formats.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Property::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_atom_keeps_positions_and_velocities_in_step() {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"), Point3::new(0.0, 0.0, 0.0));
        assert!(frame.velocities().is_none());

        frame.add_atom_with_velocity(Atom::new("H"), Point3::new(1.0, 0.0, 0.0), Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(frame.size(), 2);
        assert_eq!(frame.atoms().len(), 2);
        let velocities = frame.velocities().unwrap();
        assert_eq!(velocities[0], Vector3::zeros());
        assert_eq!(velocities[1], Vector3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn resize_grows_and_shrinks_every_per_atom_array() {
        let mut frame = Frame::new();
        frame.resize(3);
        frame.add_velocities();
        frame.add_bond(0, 2, BondOrder::Single).unwrap();
        assert_eq!(frame.positions().len(), 3);

        frame.resize(2);
        assert_eq!(frame.size(), 2);
        assert_eq!(frame.velocities().unwrap().len(), 2);
        assert_eq!(frame.topology().bond_count(), 0);
    }

    #[test]
    fn name_reads_the_string_property() {
        let mut frame = Frame::new();
        assert_eq!(frame.name(), None);
        frame.set("name", "water box");
        assert_eq!(frame.name(), Some("water box"));
    }
}
