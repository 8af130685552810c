//! LAMMPS data files (`read_data` input). Files hold a single frame.
//!
//! The reader understands every atom style listed in [`style`]; the writer
//! always uses the `full` style and generates numeric atom, bond, angle,
//! dihedral and improper types from the topology.

pub mod style;

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::fields::{parse_float, parse_int};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::atom::Atom;
use crate::core::models::cell::{CellShape, UnitCell};
use crate::core::models::frame::Frame;
use crate::core::models::residue::Residue;
use crate::core::models::topology::BondOrder;
use crate::core::topology::molecules::assign_molecule_ids;
use crate::core::topology::types::TopologyTypes;
use nalgebra::{Matrix3, Point3, Vector3};
use std::collections::{BTreeMap, HashMap};
use style::AtomStyle;
use tracing::debug;

const READER: &str = "LAMMPS Data reader";

/// Header lines that are recognized but carry nothing the frame stores.
const UNUSED_HEADERS: &[&str] = &[
    "angles",
    "dihedrals",
    "impropers",
    "bond types",
    "angle types",
    "dihedral types",
    "improper types",
    "extra bond per atom",
    "extra angle per atom",
    "extra dihedral per atom",
    "extra improper per atom",
    "extra special per atom",
    "ellipsoids",
    "lines",
    "triangles",
    "bodies",
];

const SKIPPED_SECTIONS: &[&str] = &[
    "Ellipsoids",
    "Lines",
    "Triangles",
    "Bodies",
    "Pair Coeffs",
    "PairIJ Coeffs",
    "Bond Coeffs",
    "Angle Coeffs",
    "Dihedral Coeffs",
    "Improper Coeffs",
    "BondBond Coeffs",
    "BondAngle Coeffs",
    "MiddleBondTorsion Coeffs",
    "EndBondTorsion Coeffs",
    "AngleTorsion Coeffs",
    "AngleAngleTorsion Coeffs",
    "BondBond13 Coeffs",
    "AngleAngle Coeffs",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    Atoms(Option<String>),
    Masses,
    Bonds,
    Velocities,
    Skipped,
}

/// Splits `line` into its data and the text after `#`.
fn split_comment(line: &str) -> (&str, &str) {
    match line.split_once('#') {
        Some((data, comment)) => (data, comment),
        None => (line, ""),
    }
}

fn section_of(line: &str, diagnostics: &DiagnosticSink) -> Option<Section> {
    let (data, comment) = split_comment(line);
    let name = data.trim();
    let section = match name {
        "Atoms" => {
            let style = comment.split_whitespace().next().map(str::to_string);
            Section::Atoms(style)
        }
        "Masses" => Section::Masses,
        "Bonds" => Section::Bonds,
        "Velocities" => Section::Velocities,
        // derived from the bonds
        "Angles" | "Dihedrals" | "Impropers" => Section::Skipped,
        _ if SKIPPED_SECTIONS.contains(&name) => {
            if !name.contains("Coeffs") {
                diagnostics.warn(READER, format!("ignoring section '{name}'"));
            }
            Section::Skipped
        }
        _ => return None,
    };
    Some(section)
}

/// Wraps a tilt factor into `[-length / 2, length / 2]`.
fn tilt_factor(factor: f64, length: f64) -> f64 {
    if length <= 0.0 || !factor.is_finite() {
        return factor;
    }
    let wrapped = factor - length * (factor / length).round();
    if wrapped.abs() < 1e-15 { 0.0 } else { wrapped }
}

#[derive(Debug, Default)]
pub struct LammpsDataFormat {
    written: bool,
}

struct DataReader<'a> {
    diagnostics: &'a DiagnosticSink,
    style_name: Option<String>,
    natoms: usize,
    nbonds: usize,
    ntypes: usize,
    masses: HashMap<String, f64>,
    names: Vec<Option<String>>,
    frame: Frame,
}

impl<'a> DataReader<'a> {
    fn new(diagnostics: &'a DiagnosticSink) -> Self {
        Self {
            diagnostics,
            style_name: None,
            natoms: 0,
            nbonds: 0,
            ntypes: 0,
            masses: HashMap::new(),
            names: Vec::new(),
            frame: Frame::new(),
        }
    }

    fn error(&self, file: &TextFile, message: impl Into<String>) -> FormatError {
        file.parse_error(FormatKind::LammpsData, ParseErrorKind::Invalid(message.into()))
    }

    fn header_count(&self, file: &TextFile, data: &str, name: &str) -> FormatResult<usize> {
        let value = data.split_whitespace().next().unwrap_or("");
        parse_int(value, name).map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))
    }

    fn header_length(&self, file: &TextFile, data: &str, name: &str) -> FormatResult<f64> {
        let values: Vec<&str> = data.split_whitespace().collect();
        if values.len() < 4 {
            return Err(self.error(file, format!("expected '<lo> <hi> {name}', got '{}'", data.trim())));
        }
        let low = parse_float(values[0], name).map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
        let high = parse_float(values[1], name).map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
        Ok(high - low)
    }

    /// Reads header lines and returns the first section, if any.
    fn header(&mut self, file: &mut TextFile) -> FormatResult<Option<Section>> {
        let mut matrix = Matrix3::zeros();
        let mut shape = CellShape::Orthorhombic;
        let mut section = None;

        while let Some(line) = file.try_read_line()? {
            let (data, _) = split_comment(&line);
            if data.trim().is_empty() || UNUSED_HEADERS.iter().any(|header| data.contains(header)) {
                continue;
            } else if data.contains("atoms") {
                self.natoms = self.header_count(file, data, "atom count")?;
            } else if data.contains("bonds") {
                self.nbonds = self.header_count(file, data, "bond count")?;
            } else if data.contains("atom types") {
                self.ntypes = self.header_count(file, data, "atom type count")?;
            } else if data.contains("xlo xhi") {
                matrix[(0, 0)] = self.header_length(file, data, "xlo xhi")?;
            } else if data.contains("ylo yhi") {
                matrix[(1, 1)] = self.header_length(file, data, "ylo yhi")?;
            } else if data.contains("zlo zhi") {
                matrix[(2, 2)] = self.header_length(file, data, "zlo zhi")?;
            } else if data.contains("xy xz yz") {
                let values: Vec<&str> = data.split_whitespace().collect();
                if values.len() != 6 {
                    return Err(self.error(file, format!("expected '<xy> <xz> <yz> xy xz yz', got '{}'", data.trim())));
                }
                for (slot, value) in [(0, 1), (0, 2), (1, 2)].into_iter().zip(&values) {
                    matrix[slot] =
                        parse_float(value, "tilt factor").map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
                }
                // zero tilts still declare a triclinic box
                shape = CellShape::Triclinic;
            } else {
                match section_of(&line, self.diagnostics) {
                    Some(found) => section = Some(found),
                    None => return Err(self.error(file, format!("expected a section name, got '{}'", line.trim()))),
                }
                break;
            }
        }

        if matrix != Matrix3::zeros() {
            self.frame.cell = UnitCell::from_matrix(matrix).with_shape(shape);
        }
        Ok(section)
    }

    /// Reads up to the next section header, failing on anything else.
    fn next_section(&mut self, file: &mut TextFile) -> FormatResult<Option<Section>> {
        while let Some(line) = file.try_read_line()? {
            if line.trim().is_empty() {
                continue;
            }
            return match section_of(&line, self.diagnostics) {
                Some(section) => Ok(Some(section)),
                None => Err(self.error(file, format!("expected a section name, got '{}'", line.trim()))),
            };
        }
        Ok(None)
    }

    fn skip_section(&mut self, file: &mut TextFile) -> FormatResult<Option<Section>> {
        while let Some(line) = file.try_read_line()? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(section) = section_of(&line, self.diagnostics) {
                return Ok(Some(section));
            }
        }
        Ok(None)
    }

    /// The next `count` non-blank lines, split into data and comment.
    fn section_lines(&self, file: &mut TextFile, count: usize, section: &str) -> FormatResult<Vec<(String, String)>> {
        let mut lines = Vec::new();
        while lines.len() < count {
            let line = file.read_line(&format!("{count} lines in the {section} section"))?;
            let (data, comment) = split_comment(&line);
            if !data.trim().is_empty() {
                lines.push((data.to_string(), comment.trim().to_string()));
            }
        }
        Ok(lines)
    }

    fn atoms(&mut self, file: &mut TextFile) -> FormatResult<()> {
        if self.natoms == 0 {
            return Err(self.error(file, "missing atoms count in header"));
        }
        let name = match self.style_name.clone() {
            Some(name) => name,
            None => {
                self.diagnostics.warn(READER, "unknown atom style, defaulting to 'full'");
                "full".to_string()
            }
        };
        let style = AtomStyle::named(&name).ok_or_else(|| self.error(file, format!("unknown atom style '{name}'")))?;
        if style.is_hybrid() {
            self.diagnostics.warn(READER, "only reading the first style for atom_style hybrid");
        }
        debug!(style = style.name, atoms = self.natoms, "Reading LAMMPS atoms section");

        // the header count is only trusted once that many lines were read
        let lines = self.section_lines(file, self.natoms, "Atoms")?;
        self.frame.resize(self.natoms);
        let mut residues: BTreeMap<i64, Residue> = BTreeMap::new();
        for (n, (data, comment)) in lines.into_iter().enumerate() {
            let fields: Vec<&str> = data.split_whitespace().collect();
            if fields.len() < style.columns {
                return Err(self.error(file, format!("invalid line for atom style {}: '{}'", style.name, data.trim())));
            }
            let int = |column: usize, name: &str| -> FormatResult<i64> {
                parse_int(fields[column], name).map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))
            };
            let float = |column: usize, name: &str| -> FormatResult<f64> {
                parse_float(fields[column], name).map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))
            };

            // id 0 means the ids are not meaningful
            let index = match int(0, "atom id")? {
                0 => n,
                id if id > 0 => (id - 1) as usize,
                id => return Err(self.error(file, format!("invalid atom id {id}"))),
            };
            if index >= self.natoms {
                return Err(self.error(
                    file,
                    format!("expected {} atoms, got atom with index {index}", self.natoms),
                ));
            }

            let mut atom = Atom::new(int(style.kind, "atom type")?.to_string());
            if let Some(column) = style.charge {
                atom.charge = float(column, "charge")?;
            }
            if let Some(column) = style.mass {
                atom.mass = float(column, "mass")?;
            }
            let p = style.position;
            let position = Point3::new(float(p, "x coordinate")?, float(p + 1, "y coordinate")?, float(p + 2, "z coordinate")?);

            if let Some(column) = style.molecule {
                let molecule = int(column, "molecule id")?;
                if molecule != 0 {
                    residues
                        .entry(molecule)
                        .or_insert_with(|| Residue::with_id("", molecule))
                        .add_atom(index);
                }
            }
            if let Some(name) = comment.split_whitespace().next() {
                if self.names.is_empty() {
                    self.names.resize(self.natoms, None);
                }
                self.names[index] = Some(name.to_string());
            }

            self.frame.atoms_mut()[index] = atom;
            self.frame.positions_mut()[index] = position;
        }

        for residue in residues.into_values() {
            self.frame.add_residue(residue)?;
        }
        Ok(())
    }

    fn masses(&mut self, file: &mut TextFile) -> FormatResult<()> {
        if self.ntypes == 0 {
            return Err(self.error(file, "missing atom types count in header"));
        }
        for (data, _) in self.section_lines(file, self.ntypes, "Masses")? {
            let fields: Vec<&str> = data.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(self.error(file, format!("bad mass specification '{}'", data.trim())));
            }
            let mass = parse_float(fields[1], "mass").map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
            self.masses.insert(fields[0].to_string(), mass);
        }
        Ok(())
    }

    fn bonds(&mut self, file: &mut TextFile) -> FormatResult<()> {
        if self.nbonds == 0 {
            return Err(self.error(file, "missing bonds count in header"));
        }
        for (data, _) in self.section_lines(file, self.nbonds, "Bonds")? {
            let fields: Vec<&str> = data.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(self.error(file, format!("bad bond specification '{}'", data.trim())));
            }
            let atom = |column: usize| -> FormatResult<usize> {
                let id: usize = parse_int(fields[column], "bonded atom id")
                    .map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
                id.checked_sub(1)
                    .ok_or_else(|| self.error(file, "bonded atom ids start at 1"))
            };
            let (i, j) = (atom(2)?, atom(3)?);
            self.frame.add_bond(i, j, BondOrder::Unknown)?;
        }
        Ok(())
    }

    fn velocities(&mut self, file: &mut TextFile) -> FormatResult<()> {
        if self.natoms == 0 {
            return Err(self.error(file, "missing atoms count in header"));
        }
        let lines = self.section_lines(file, self.natoms, "Velocities")?;
        if self.frame.size() < self.natoms {
            self.frame.resize(self.natoms);
        }
        self.frame.add_velocities();
        for (data, _) in lines {
            let fields: Vec<&str> = data.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(self.error(file, format!("bad velocity specification '{}'", data.trim())));
            }
            let id: usize = parse_int(fields[0], "atom id").map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
            if id == 0 || id > self.natoms {
                return Err(self.error(file, format!("velocity for unknown atom {id}")));
            }
            let mut velocity = Vector3::zeros();
            for axis in 0..3 {
                velocity[axis] = parse_float(fields[axis + 1], "velocity")
                    .map_err(|kind| file.parse_error(FormatKind::LammpsData, kind))?;
            }
            if let Some(velocities) = self.frame.velocities_mut() {
                velocities[id - 1] = velocity;
            }
        }
        Ok(())
    }

    /// Applies masses by type, then names from the atom comments.
    fn finish(mut self) -> Frame {
        for atom in self.frame.atoms_mut() {
            if let Some(&mass) = self.masses.get(&atom.kind) {
                atom.mass = mass;
            }
        }
        for (atom, name) in self.frame.atoms_mut().iter_mut().zip(self.names) {
            if let Some(name) = name {
                atom.kind = name.clone();
                atom.name = name;
            }
        }
        self.frame
    }
}

impl FrameFormat for LammpsDataFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::LammpsData
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        if file.tell() != 0 {
            return Ok(None);
        }
        Ok(file.try_read_line()?.map(|_| 0))
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        if file.tell() != 0 {
            return Err(FormatError::Unsupported {
                format: FormatKind::LammpsData,
                operation: "reading more than one frame",
            });
        }

        let mut reader = DataReader::new(context.diagnostics);
        let title = file.read_line("the LAMMPS data title")?;
        // VMD topotools writes the atom style in the title
        if let Some((_, rest)) = title.split_once("atom_style") {
            reader.style_name = rest.split_whitespace().next().map(str::to_string);
        }

        let mut section = reader.header(file)?;
        while let Some(current) = section {
            section = match current {
                Section::Atoms(style) => {
                    if style.is_some() {
                        reader.style_name = style;
                    }
                    reader.atoms(file)?;
                    reader.next_section(file)?
                }
                Section::Masses => {
                    reader.masses(file)?;
                    reader.next_section(file)?
                }
                Section::Bonds => {
                    reader.bonds(file)?;
                    reader.next_section(file)?
                }
                Section::Velocities => {
                    reader.velocities(file)?;
                    reader.next_section(file)?
                }
                Section::Skipped => reader.skip_section(file)?,
            };
        }
        Ok(reader.finish())
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        _context: &FormatContext,
    ) -> FormatResult<()> {
        if self.written {
            return Err(FormatError::Unsupported {
                format: FormatKind::LammpsData,
                operation: "writing more than one frame",
            });
        }
        self.written = true;

        let topology = frame.topology();
        let types = TopologyTypes::new(topology);
        let bonds: Vec<[usize; 2]> = topology.bonds().collect();
        let angles = topology.angles();
        let dihedrals = topology.dihedrals();
        let impropers = topology.impropers();
        debug!(
            atoms = frame.size(),
            atom_types = types.atom_kinds().len(),
            bond_types = types.bond_types().len(),
            "Writing LAMMPS data file"
        );

        out.line("LAMMPS data file -- atom_style full -- generated by moltraj")?;
        out.line(format_args!("{} atoms", frame.size()))?;
        out.line(format_args!("{} bonds", bonds.len()))?;
        out.line(format_args!("{} angles", angles.len()))?;
        out.line(format_args!("{} dihedrals", dihedrals.len()))?;
        out.line(format_args!("{} impropers", impropers.len()))?;
        out.line(format_args!("{} atom types", types.atom_kinds().len()))?;
        out.line(format_args!("{} bond types", types.bond_types().len()))?;
        out.line(format_args!("{} angle types", types.angle_types().len()))?;
        out.line(format_args!("{} dihedral types", types.dihedral_types().len()))?;
        out.line(format_args!("{} improper types", types.improper_types().len()))?;

        let matrix = frame.cell.matrix();
        out.line(format_args!("0 {} xlo xhi", matrix[(0, 0)]))?;
        out.line(format_args!("0 {} ylo yhi", matrix[(1, 1)]))?;
        out.line(format_args!("0 {} zlo zhi", matrix[(2, 2)]))?;
        if frame.cell.shape() == CellShape::Triclinic {
            out.line(format_args!(
                "{} {} {} xy xz yz",
                tilt_factor(matrix[(0, 1)], matrix[(0, 0)]),
                tilt_factor(matrix[(0, 2)], matrix[(0, 0)]),
                tilt_factor(matrix[(1, 2)], matrix[(1, 1)])
            ))?;
        }
        out.line("")?;

        let kinds = types.atom_kinds();
        if !kinds.is_empty() {
            out.line("# Pair Coeffs")?;
            for (id, kind) in kinds.iter().enumerate() {
                out.line(format_args!("# {} {}", id + 1, kind.label))?;
            }
        }
        if !types.bond_types().is_empty() {
            out.line("\n# Bond Coeffs")?;
            for (id, [i, j]) in types.bond_types().iter().enumerate() {
                out.line(format_args!("# {} {}-{}", id + 1, kinds[*i].label, kinds[*j].label))?;
            }
        }
        if !types.angle_types().is_empty() {
            out.line("\n# Angle Coeffs")?;
            for (id, [i, j, k]) in types.angle_types().iter().enumerate() {
                out.line(format_args!("# {} {}-{}-{}", id + 1, kinds[*i].label, kinds[*j].label, kinds[*k].label))?;
            }
        }
        for (title, table) in [("Dihedrals", types.dihedral_types()), ("Impropers", types.improper_types())] {
            if table.is_empty() {
                continue;
            }
            out.line(format_args!("\n# {title} Coeffs"))?;
            for (id, [i, j, k, m]) in table.iter().enumerate() {
                out.line(format_args!("# {} {}-{}-{}-{}", id + 1, kinds[*i].label, kinds[*j].label, kinds[*k].label, kinds[*m].label))?;
            }
        }

        out.line("\nMasses\n")?;
        for (id, kind) in kinds.iter().enumerate() {
            out.line(format_args!("{} {} # {}", id + 1, kind.mass(), kind.label))?;
        }

        out.line("\nAtoms # full\n")?;
        let molecules = assign_molecule_ids(frame.size(), bonds.iter().copied());
        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            out.line(format_args!(
                "{} {} {} {} {} {} {} # {}",
                index + 1,
                molecules[index] + 1,
                types.atom_type(index)? + 1,
                atom.charge,
                position.x,
                position.y,
                position.z,
                atom.kind
            ))?;
        }

        if let Some(velocities) = frame.velocities() {
            out.line("\nVelocities\n")?;
            for (index, velocity) in velocities.iter().enumerate() {
                out.line(format_args!("{} {} {} {}", index + 1, velocity.x, velocity.y, velocity.z))?;
            }
        }

        if !bonds.is_empty() {
            out.line("\nBonds\n")?;
            for (id, &[i, j]) in bonds.iter().enumerate() {
                out.line(format_args!("{} {} {} {}", id + 1, types.bond_type([i, j])? + 1, i + 1, j + 1))?;
            }
        }
        if !angles.is_empty() {
            out.line("\nAngles\n")?;
            for (id, &[i, j, k]) in angles.iter().enumerate() {
                out.line(format_args!(
                    "{} {} {} {} {}",
                    id + 1,
                    types.angle_type([i, j, k])? + 1,
                    i + 1,
                    j + 1,
                    k + 1
                ))?;
            }
        }
        if !dihedrals.is_empty() {
            out.line("\nDihedrals\n")?;
            for (id, &[i, j, k, m]) in dihedrals.iter().enumerate() {
                out.line(format_args!(
                    "{} {} {} {} {} {}",
                    id + 1,
                    types.dihedral_type([i, j, k, m])? + 1,
                    i + 1,
                    j + 1,
                    k + 1,
                    m + 1
                ))?;
            }
        }
        if !impropers.is_empty() {
            out.line("\nImpropers\n")?;
            for (id, &[i, j, k, m]) in impropers.iter().enumerate() {
                out.line(format_args!(
                    "{} {} {} {} {} {}",
                    id + 1,
                    types.improper_type([i, j, k, m])? + 1,
                    i + 1,
                    j + 1,
                    k + 1,
                    m + 1
                ))?;
            }
        }
        Ok(())
    }
}
