//! Tripos MOL2 format.
//!
//! A frame starts at a `@<TRIPOS>MOLECULE` record and runs until the next
//! one. The `ATOM`, `BOND` and `CRYSIN` sections are read, other sections
//! are skipped.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::fields::{parse_float, parse_int};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::atom::Atom;
use crate::core::models::cell::{CellShape, UnitCell};
use crate::core::models::frame::Frame;
use crate::core::models::property::Property;
use crate::core::models::residue::Residue;
use crate::core::models::topology::BondOrder;
use crate::core::utils::elements;
use nalgebra::Point3;
use std::collections::BTreeMap;

const MOLECULE: &str = "@<TRIPOS>MOLECULE";
const ATOM: &str = "@<TRIPOS>ATOM";
const BOND: &str = "@<TRIPOS>BOND";
const CRYSIN: &str = "@<TRIPOS>CRYSIN";
const READER: &str = "MOL2 reader";
const WRITER: &str = "MOL2 writer";

#[derive(Debug, Default)]
pub struct Mol2Format;

fn mol2_error(file: &TextFile, kind: ParseErrorKind) -> FormatError {
    file.parse_error(FormatKind::Mol2, kind)
}

fn parse_counts(file: &TextFile, line: &str) -> FormatResult<(usize, usize)> {
    let mut values = line.split_whitespace();
    let natoms = parse_int(values.next().unwrap_or(""), "atom count").map_err(|kind| mol2_error(file, kind))?;
    let nbonds = match values.next() {
        Some(value) => parse_int(value, "bond count").map_err(|kind| mol2_error(file, kind))?,
        None => 0,
    };
    Ok((natoms, nbonds))
}

/// Reads lines until one starting with `tag`, failing at end of file.
fn find_tag(file: &mut TextFile, tag: &str) -> FormatResult<()> {
    loop {
        match file.try_read_line()? {
            Some(line) if line.trim().starts_with(tag) => return Ok(()),
            Some(_) => {}
            None => return Err(file.eof_error(format!("a {tag} section"))),
        }
    }
}

/// The element of an atom, from its SYBYL type when it has one
/// (`C.ar` -> `C`) and from its name otherwise.
fn element_of(name: &str, sybyl: &str, diagnostics: &DiagnosticSink) -> (String, bool) {
    if sybyl.contains('.') || elements::is_element(sybyl) {
        let element = sybyl.split('.').next().unwrap_or(sybyl);
        return (element.to_string(), true);
    }
    let guess = elements::guess_element(name);
    diagnostics.warn(
        READER,
        format!("invalid sybyl type: '{sybyl}'; guessing '{guess}' from '{name}'"),
    );
    (guess, false)
}

fn bond_label(order: BondOrder) -> &'static str {
    match order {
        BondOrder::Single => "1",
        BondOrder::Double => "2",
        BondOrder::Triple => "3",
        BondOrder::Aromatic => "ar",
        BondOrder::Amide => "am",
        _ => "du",
    }
}

struct FrameReader<'a> {
    frame: Frame,
    residues: BTreeMap<i64, Residue>,
    diagnostics: &'a DiagnosticSink,
}

impl FrameReader<'_> {
    fn atoms(&mut self, file: &mut TextFile, natoms: usize, charges: bool) -> FormatResult<()> {
        for _ in 0..natoms {
            let line = file.read_line("a MOL2 atom line")?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return Err(mol2_error(
                    file,
                    ParseErrorKind::Unexpected {
                        expected: "at least 6 fields in a MOL2 atom line".into(),
                        found: line.trim().to_string(),
                    },
                ));
            }
            let coordinate = |index: usize, name: &str| {
                parse_float(fields[index], name).map_err(|kind| mol2_error(file, kind))
            };
            let position = Point3::new(coordinate(2, "x coordinate")?, coordinate(3, "y coordinate")?, coordinate(4, "z coordinate")?);

            let (name, sybyl) = (fields[1], fields[5]);
            let (element, is_sybyl) = element_of(name, sybyl, self.diagnostics);
            let mut atom = Atom::with_kind(name, element);
            if is_sybyl {
                atom.set("sybyl", sybyl);
            }
            if charges {
                if let Some(charge) = fields.get(8) {
                    atom.charge = parse_float(charge, "charge").map_err(|kind| mol2_error(file, kind))?;
                }
            }
            self.frame.add_atom(atom, position);

            if let Some(resid) = fields.get(6).and_then(|value| value.parse::<i64>().ok()) {
                let resname = fields.get(7).copied().unwrap_or("");
                self.residues
                    .entry(resid)
                    .or_insert_with(|| Residue::with_id(resname, resid))
                    .add_atom(self.frame.size() - 1);
            }
        }
        Ok(())
    }

    fn bonds(&mut self, file: &mut TextFile, nbonds: usize) -> FormatResult<()> {
        for _ in 0..nbonds {
            let line = file.read_line("a MOL2 bond line")?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(mol2_error(
                    file,
                    ParseErrorKind::Unexpected {
                        expected: "at least 3 fields in a MOL2 bond line".into(),
                        found: line.trim().to_string(),
                    },
                ));
            }
            let serial = |index: usize, name: &str| -> FormatResult<usize> {
                let value: usize = parse_int(fields[index], name).map_err(|kind| mol2_error(file, kind))?;
                value.checked_sub(1).ok_or_else(|| {
                    mol2_error(file, ParseErrorKind::Invalid(format!("{name} must start at 1")))
                })
            };
            let (i, j) = (serial(1, "first bond atom")?, serial(2, "second bond atom")?);
            let order = fields
                .get(3)
                .and_then(|order| order.parse::<BondOrder>().ok())
                .unwrap_or_default();
            self.frame.add_bond(i, j, order)?;
        }
        Ok(())
    }

    fn cell(&mut self, file: &mut TextFile) -> FormatResult<()> {
        let line = file.read_line("a MOL2 CRYSIN line")?;
        let values = line
            .split_whitespace()
            .take(6)
            .map(|value| parse_float(value, "cell parameter"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|kind| mol2_error(file, kind))?;
        match values.as_slice() {
            &[a, b, c, alpha, beta, gamma] => {
                self.frame.cell = UnitCell::from_lengths_angles([a, b, c], [alpha, beta, gamma]);
                Ok(())
            }
            _ => Err(mol2_error(
                file,
                ParseErrorKind::Unexpected {
                    expected: "six cell parameters".into(),
                    found: line.trim().to_string(),
                },
            )),
        }
    }
}

impl FrameFormat for Mol2Format {
    fn kind(&self) -> FormatKind {
        FormatKind::Mol2
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        let position = loop {
            let start = file.tell();
            match file.try_read_line()? {
                Some(line) if line.trim().starts_with(MOLECULE) => break start,
                Some(_) => {}
                None => return Ok(None),
            }
        };

        file.read_line("a MOL2 molecule name")?;
        let counts = file.read_line("a MOL2 counts line")?;
        let (natoms, nbonds) = parse_counts(file, &counts)?;

        find_tag(file, ATOM)?;
        file.skip_lines(natoms, "MOL2 atom lines")?;
        if nbonds != 0 {
            find_tag(file, BOND)?;
            file.skip_lines(nbonds, "MOL2 bond lines")?;
        }
        Ok(Some(position))
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        let header = loop {
            let line = file.read_line("a MOL2 molecule record")?;
            if !line.trim().is_empty() {
                break line;
            }
        };
        if header.trim() != MOLECULE {
            return Err(mol2_error(
                file,
                ParseErrorKind::Unexpected {
                    expected: MOLECULE.into(),
                    found: header.trim().to_string(),
                },
            ));
        }

        let mut reader = FrameReader {
            frame: Frame::new(),
            residues: BTreeMap::new(),
            diagnostics: context.diagnostics,
        };
        reader.frame.set("name", file.read_line("a MOL2 molecule name")?.trim());
        let counts = file.read_line("a MOL2 counts line")?;
        let (natoms, nbonds) = parse_counts(file, &counts)?;
        file.skip_lines(1, "a MOL2 molecule type")?;
        let charges = file.read_line("a MOL2 charge type")?.trim() != "NO_CHARGES";

        loop {
            let start = file.tell();
            let Some(line) = file.try_read_line()? else {
                break;
            };
            match line.trim() {
                ATOM => reader.atoms(file, natoms, charges)?,
                BOND => reader.bonds(file, nbonds)?,
                CRYSIN => reader.cell(file)?,
                MOLECULE => {
                    file.seek(start)?;
                    break;
                }
                _ => {}
            }
        }

        let FrameReader {
            mut frame, residues, ..
        } = reader;
        for residue in residues.into_values() {
            frame.add_residue(residue)?;
        }
        Ok(frame)
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()> {
        let topology = frame.topology();
        let bonds: Vec<_> = topology.bonds_with_orders().collect();

        out.line(MOLECULE)?;
        out.line(frame.name().unwrap_or(""))?;
        out.line(format_args!("{:4}  {:4}    1    0    0", frame.size(), bonds.len()))?;
        out.line("SMALL")?;
        out.line("USER_CHARGES")?;
        out.line("")?;
        out.line(ATOM)?;

        let mut max_resid = topology
            .residues()
            .iter()
            .filter_map(|residue| residue.id)
            .max()
            .unwrap_or(0);
        let mut missing_sybyl = 0;
        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            let residue = topology.residue_for_atom(index);
            let resname = residue.map_or("XXX", |residue| residue.name.as_str());
            let resid = match residue.and_then(|residue| residue.id) {
                Some(id) => id,
                None => {
                    max_resid += 1;
                    max_resid
                }
            };
            let sybyl = match atom.get("sybyl").and_then(Property::as_str) {
                Some(sybyl) => sybyl,
                None => {
                    missing_sybyl += 1;
                    atom.kind.as_str()
                }
            };
            out.line(format_args!(
                "{:4} {:<4}  {:.6} {:.6} {:.6} {} {} {} {:.6}",
                index + 1,
                atom.name,
                position.x,
                position.y,
                position.z,
                sybyl,
                resid,
                resname,
                atom.charge
            ))?;
        }
        if missing_sybyl > 0 {
            context.diagnostics.warn(
                WRITER,
                format!("sybyl type is not set for {missing_sybyl} atoms, using their element instead"),
            );
        }

        out.line(BOND)?;
        for (index, ([i, j], order)) in bonds.into_iter().enumerate() {
            out.line(format_args!("{:4}  {:4}  {:4}    {}", index + 1, i + 1, j + 1, bond_label(order)))?;
        }

        if frame.cell.shape() != CellShape::Infinite {
            let [a, b, c] = frame.cell.lengths();
            let [alpha, beta, gamma] = frame.cell.angles();
            out.line(CRYSIN)?;
            out.line(format_args!(
                "   {a:.4}   {b:.4}   {c:.4}   {alpha:.4}   {beta:.4}   {gamma:.4} 1 1"
            ))?;
        }

        out.line("@<TRIPOS>SUBSTRUCTURE")?;
        out.line("   1 ****        1 TEMP                        0 ****  **** 0 ROOT")?;
        out.line("")
    }
}
