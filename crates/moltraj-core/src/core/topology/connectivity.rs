//! Connectivity that text formats leave implicit: template bonds inside
//! standard residues, backbone bonds between consecutive residues, explicit
//! bonds given by on-file atom serial numbers, and residue range labels.

use super::registry::ResidueTemplates;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::frame::Frame;
use crate::core::models::residue::Residue;
use crate::core::models::topology::{BondOrder, TopologyError};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Identifies a residue inside a chain; the ordering follows the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResidueKey {
    pub chain: char,
    pub id: i64,
    pub insertion_code: char,
}

impl ResidueKey {
    pub fn new(chain: char, id: i64, insertion_code: char) -> Self {
        Self {
            chain,
            id,
            insertion_code,
        }
    }
}

/// A label for every residue between two keys, both ends included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRange {
    pub start: ResidueKey,
    pub end: ResidueKey,
    pub label: String,
}

impl LabelRange {
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Sets `property` on every residue covered by a range. Ranges are applied in
/// the given order, so a later range overwrites an earlier overlapping one.
/// Inverted ranges are skipped; callers report them when they are recorded.
pub fn apply_label_ranges(
    residues: &mut BTreeMap<ResidueKey, Residue>,
    ranges: &[LabelRange],
    property: &str,
) {
    for range in ranges {
        if range.is_inverted() {
            continue;
        }
        for residue in residues.range_mut(range.start..=range.end).map(|(_, r)| r) {
            residue.set(property, range.label.as_str());
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    first_id: i64,
    first_index: usize,
}

/// Maps on-file atom serial numbers to atom indices.
///
/// The numbering is split into segments of consecutive serials. A serial that
/// does not follow the previous one (a restart after a chain terminator, or a
/// gap left by a `TER` record) starts a new segment.
#[derive(Debug, Clone, Default)]
pub struct AtomOffsetTable {
    segments: Vec<Segment>,
    count: usize,
    last_id: Option<i64>,
}

impl AtomOffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the serial of the next atom. An unreadable serial continues the
    /// current numbering.
    pub fn record_atom(&mut self, serial: Option<i64>) {
        let expected = self.last_id.map_or(1, |last| last + 1);
        let id = serial.unwrap_or(expected);
        if self.segments.is_empty() || id != expected {
            self.segments.push(Segment {
                first_id: id,
                first_index: self.count,
            });
        }
        self.last_id = Some(id);
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of places where the numbering restarts or jumps.
    pub fn restart_points(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    fn segment_len(&self, segment: usize) -> usize {
        let end = self
            .segments
            .get(segment + 1)
            .map_or(self.count, |next| next.first_index);
        end - self.segments[segment].first_index
    }

    fn candidates(&self, serial: i64) -> impl Iterator<Item = usize> + '_ {
        (0..self.segments.len()).rev().filter_map(move |segment| {
            let Segment {
                first_id,
                first_index,
            } = self.segments[segment];
            let offset = usize::try_from(serial.checked_sub(first_id)?).ok()?;
            (offset < self.segment_len(segment)).then_some(first_index + offset)
        })
    }

    /// Index of the atom with `serial`. When several segments contain the
    /// serial, the most recent one wins.
    pub fn resolve(&self, serial: i64) -> Option<usize> {
        self.candidates(serial).next()
    }

    pub fn is_ambiguous(&self, serial: i64) -> bool {
        self.candidates(serial).nth(1).is_some()
    }
}

// Missing template atoms with these names are routine (hydrogens, terminal
// oxygens, phosphate groups) and are not reported.
fn is_optional_atom(name: &str) -> bool {
    name.starts_with('H') || name.starts_with('P') || name.starts_with("OP") || name == "OXT"
}

#[derive(Debug, Clone, Copy)]
struct BackboneEnd {
    atom: usize,
    residue_id: i64,
}

/// Adds bonds that a file does not state explicitly.
pub struct ConnectivityResolver<'a> {
    templates: &'a ResidueTemplates,
    diagnostics: &'a DiagnosticSink,
    context: &'a str,
}

impl<'a> ConnectivityResolver<'a> {
    pub fn new(templates: &'a ResidueTemplates, diagnostics: &'a DiagnosticSink, context: &'a str) -> Self {
        Self {
            templates,
            diagnostics,
            context,
        }
    }

    /// Bonds the atoms of every residue with a template, and links consecutive
    /// residues through their peptide (C-N) or nucleic (O3'-P) backbone.
    ///
    /// Residues are visited in frame order. A backbone bond is only added when
    /// the residue id is exactly one more than the previous linkable residue.
    pub fn link_standard_residues(&self, frame: &mut Frame) -> Result<(), TopologyError> {
        let mut peptide: Option<BackboneEnd> = None;
        let mut nucleic: Option<BackboneEnd> = None;
        let mut bonds = Vec::new();

        for residue in frame.topology().residues() {
            let Some(template) = self.templates.get(&residue.name) else {
                continue;
            };
            let Some(residue_id) = residue.id else {
                self.diagnostics.warn(
                    self.context,
                    format!("residue '{}' has no id, skipping its bonds", residue.name),
                );
                continue;
            };

            let atoms: HashMap<&str, usize> = residue
                .atoms()
                .iter()
                .map(|&index| (frame.atoms()[index].name.as_str(), index))
                .collect();

            // a linked end is consumed; an end is kept until a newer one is seen
            if let (Some(previous), Some(&nitrogen)) = (peptide, atoms.get("N")) {
                if residue_id == previous.residue_id + 1 {
                    bonds.push([previous.atom, nitrogen]);
                    peptide = None;
                }
            }
            if let Some(&atom) = atoms.get("C") {
                peptide = Some(BackboneEnd { atom, residue_id });
            }

            if let (Some(previous), Some(&phosphorus)) = (nucleic, atoms.get("P")) {
                if residue_id == previous.residue_id + 1 {
                    bonds.push([previous.atom, phosphorus]);
                    nucleic = None;
                }
            }
            if let Some(&atom) = atoms.get("O3'") {
                nucleic = Some(BackboneEnd { atom, residue_id });
            }

            if let (Some(&hydrogen), Some(&oxygen)) = (atoms.get("HO5'"), atoms.get("O5'")) {
                bonds.push([hydrogen, oxygen]);
            }

            let mut missing = BTreeSet::new();
            for (first, second) in &template.bonds {
                match (atoms.get(first.as_str()), atoms.get(second.as_str())) {
                    (Some(&i), Some(&j)) => bonds.push([i, j]),
                    (None, _) => {
                        missing.insert(first.as_str());
                    }
                    (_, None) => {
                        missing.insert(second.as_str());
                    }
                }
            }
            for name in missing.into_iter().filter(|name| !is_optional_atom(name)) {
                self.diagnostics.warn(
                    self.context,
                    format!(
                        "missing atom '{name}' in standard residue '{}' (resid {residue_id})",
                        residue.name
                    ),
                );
            }
        }

        for [i, j] in bonds {
            frame.add_bond(i, j, BondOrder::Unknown)?;
        }
        Ok(())
    }

    /// Adds bonds given as pairs of on-file serial numbers. Serials that do not
    /// resolve to an atom of the frame are reported and the bond is dropped.
    pub fn add_explicit_bonds(
        &self,
        frame: &mut Frame,
        offsets: &AtomOffsetTable,
        pairs: &[(i64, i64)],
    ) -> Result<(), TopologyError> {
        for &(first, second) in pairs {
            let resolve = |serial: i64| {
                if offsets.is_ambiguous(serial) {
                    self.diagnostics.warn(
                        self.context,
                        format!("atom serial {serial} is used more than once, using its last occurrence"),
                    );
                }
                offsets.resolve(serial).filter(|&index| index < frame.size())
            };
            match (resolve(first), resolve(second)) {
                (Some(i), Some(j)) if i != j => frame.add_bond(i, j, BondOrder::Unknown)?,
                (Some(_), Some(_)) => {}
                _ => self.diagnostics.warn(
                    self.context,
                    format!(
                        "ignoring bond between atom serials {first} and {second}, outside of the {} atoms of the frame",
                        frame.size()
                    ),
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    fn add_residue(frame: &mut Frame, name: &str, id: i64, atoms: &[&str]) {
        let mut residue = Residue::with_id(name, id);
        for atom in atoms {
            residue.add_atom(frame.size());
            frame.add_atom(Atom::new(*atom), Point3::origin());
        }
        frame.add_residue(residue).unwrap();
    }

    fn backbone_bonds(frame: &Frame) -> Vec<[usize; 2]> {
        frame
            .topology()
            .bonds()
            .filter(|&[i, j]| frame.atoms()[i].name == "C" && frame.atoms()[j].name == "N")
            .collect()
    }

    #[test]
    fn consecutive_residues_get_peptide_bonds() {
        let mut frame = Frame::new();
        for id in [5, 6, 7] {
            add_residue(&mut frame, "GLY", id, &["N", "CA", "C", "O"]);
        }
        let (sink, messages) = DiagnosticSink::collecting();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();

        assert_eq!(backbone_bonds(&frame), vec![[2, 4], [6, 8]]);
        assert!(frame.topology().bond_order(0, 1).is_some());
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn numbering_gap_breaks_the_backbone() {
        let mut frame = Frame::new();
        for id in [5, 6, 9] {
            add_residue(&mut frame, "GLY", id, &["N", "CA", "C", "O"]);
        }
        let sink = DiagnosticSink::silent();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();
        assert_eq!(backbone_bonds(&frame), vec![[2, 4]]);
    }

    #[test]
    fn residues_without_a_carbon_keep_the_previous_one() {
        let mut frame = Frame::new();
        add_residue(&mut frame, "GLY", 5, &["N", "CA", "C", "O"]);
        add_residue(&mut frame, "GLY", 5, &["CA", "O"]);
        add_residue(&mut frame, "GLY", 6, &["N", "CA", "C", "O"]);
        let sink = DiagnosticSink::silent();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();
        assert_eq!(backbone_bonds(&frame), vec![[2, 6]]);
    }

    #[test]
    fn nucleic_backbone_links_o3_prime_to_phosphorus() {
        let mut frame = Frame::new();
        add_residue(&mut frame, "DA", 1, &["HO5'", "O5'", "C5'", "O3'"]);
        add_residue(&mut frame, "DC", 2, &["P", "O5'", "O3'"]);
        let sink = DiagnosticSink::silent();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();

        let topology = frame.topology();
        assert!(topology.bond_order(3, 4).is_some(), "O3'(1) - P(2)");
        assert!(topology.bond_order(0, 1).is_some(), "HO5' - O5'");
        assert!(topology.bond_order(4, 5).is_some(), "P - O5'");
        assert!(topology.bond_order(3, 6).is_none());
    }

    #[test]
    fn missing_heavy_atoms_are_reported_but_hydrogens_are_not() {
        let mut frame = Frame::new();
        add_residue(&mut frame, "SER", 1, &["N", "CA", "C", "O", "CB"]);
        let (sink, messages) = DiagnosticSink::collecting();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("'OG'"), "{}", messages[0]);
        assert!(frame.topology().bond_order(1, 4).is_some());
    }

    #[test]
    fn residues_without_template_are_left_alone() {
        let mut frame = Frame::new();
        add_residue(&mut frame, "LIG", 1, &["C", "N"]);
        add_residue(&mut frame, "LIG", 2, &["C", "N"]);
        let sink = DiagnosticSink::silent();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .link_standard_residues(&mut frame)
            .unwrap();
        assert_eq!(frame.topology().bond_count(), 0);
    }

    #[test]
    fn serials_after_a_restart_resolve_past_the_first_chain() {
        let mut table = AtomOffsetTable::new();
        for serial in 1..=50 {
            table.record_atom(Some(serial));
        }
        for serial in 1..=10 {
            table.record_atom(Some(serial));
        }
        assert_eq!(table.restart_points(), 1);
        assert_eq!(table.resolve(3), Some(52));
        assert!(table.is_ambiguous(3));
        assert_eq!(table.resolve(42), Some(41));
        assert!(!table.is_ambiguous(42));
        assert_eq!(table.resolve(51), None);
    }

    #[test]
    fn ter_gaps_and_offset_starts_are_compacted() {
        let mut table = AtomOffsetTable::new();
        for serial in [10, 11, 12, 14, 15] {
            table.record_atom(Some(serial));
        }
        table.record_atom(None);
        assert_eq!(table.resolve(10), Some(0));
        assert_eq!(table.resolve(14), Some(3));
        assert_eq!(table.resolve(16), Some(5));
        assert_eq!(table.resolve(13), None);
        assert_eq!(table.resolve(9), None);
    }

    #[test]
    fn explicit_bonds_drop_unresolved_serials_with_a_diagnostic() {
        let mut frame = Frame::new();
        let mut table = AtomOffsetTable::new();
        for serial in 1..=3 {
            frame.add_atom(Atom::new("C"), Point3::origin());
            table.record_atom(Some(serial));
        }
        let (sink, messages) = DiagnosticSink::collecting();
        ConnectivityResolver::new(ResidueTemplates::standard(), &sink, "test")
            .add_explicit_bonds(&mut frame, &table, &[(1, 2), (2, 3), (3, 7)])
            .unwrap();
        assert_eq!(frame.topology().bonds().collect::<Vec<_>>(), vec![[0, 1], [1, 2]]);
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn label_ranges_use_key_order_and_last_range_wins() {
        let mut residues = BTreeMap::new();
        for id in 1..=6 {
            residues.insert(ResidueKey::new('A', id, ' '), Residue::with_id("ALA", id));
        }
        residues.insert(ResidueKey::new('B', 1, ' '), Residue::with_id("ALA", 1));
        let ranges = [
            LabelRange {
                start: ResidueKey::new('A', 2, ' '),
                end: ResidueKey::new('A', 5, ' '),
                label: "alpha helix".into(),
            },
            LabelRange {
                start: ResidueKey::new('A', 4, ' '),
                end: ResidueKey::new('A', 6, ' '),
                label: "extended".into(),
            },
            LabelRange {
                start: ResidueKey::new('A', 6, ' '),
                end: ResidueKey::new('A', 1, ' '),
                label: "ignored".into(),
            },
        ];
        apply_label_ranges(&mut residues, &ranges, "secondary_structure");

        let label = |chain, id| {
            residues[&ResidueKey::new(chain, id, ' ')]
                .get("secondary_structure")
                .and_then(|p| p.as_str())
                .map(str::to_string)
        };
        assert_eq!(label('A', 1), None);
        assert_eq!(label('A', 3).as_deref(), Some("alpha helix"));
        assert_eq!(label('A', 4).as_deref(), Some("extended"));
        assert_eq!(label('A', 6).as_deref(), Some("extended"));
        assert_eq!(label('B', 1), None);
    }
}
