//! GROMACS GRO format. Lengths are stored in nanometers on disk and converted
//! to Ångström in memory.

use super::error::{FormatResult, ParseErrorKind};
use super::fields::{check_float_width, parse_float, parse_int, slice_and_trim, truncate};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::models::atom::Atom;
use crate::core::models::cell::{CellShape, UnitCell};
use crate::core::models::frame::Frame;
use crate::core::models::residue::Residue;
use nalgebra::{Matrix3, Point3, Vector3};
use std::collections::BTreeMap;

const WRITER: &str = "GRO writer";
const NM_TO_ANGSTROM: f64 = 10.0;
const MAX_ID: i64 = 99999;

#[derive(Debug, Default)]
pub struct GroFormat;

fn gro_error(file: &TextFile, kind: ParseErrorKind) -> super::error::FormatError {
    file.parse_error(FormatKind::Gro, kind)
}

fn parse_atom_count(file: &TextFile, line: &str) -> FormatResult<usize> {
    parse_int(line, "atom count").map_err(|kind| gro_error(file, kind))
}

fn read_cell(file: &TextFile, line: &str) -> FormatResult<Option<UnitCell>> {
    let values = line
        .split_whitespace()
        .map(|value| parse_float(value, "box vector").map(|v| v * NM_TO_ANGSTROM))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|kind| gro_error(file, kind))?;
    match values.as_slice() {
        &[a, b, c] => Ok(Some(UnitCell::from_lengths_angles([a, b, c], [90.0, 90.0, 90.0]))),
        &[v1x, v2y, v3z, _v1y, _v1z, v2x, _v2z, v3x, v3y] => {
            let matrix = Matrix3::new(
                v1x, v2x, v3x, //
                0.0, v2y, v3y, //
                0.0, 0.0, v3z,
            );
            Ok(Some(UnitCell::from_matrix(matrix)))
        }
        _ => Ok(None),
    }
}

impl FrameFormat for GroFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Gro
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        let position = file.tell();
        let Some(title) = file.try_read_line()? else {
            return Ok(None);
        };
        let count = match file.try_read_line()? {
            Some(count) if !(title.trim().is_empty() && count.trim().is_empty()) => count,
            None if title.trim().is_empty() => return Ok(None),
            Some(_) => return Ok(None),
            None => return Err(file.eof_error("the GRO atom count")),
        };
        let natoms = parse_atom_count(file, &count)?;
        file.skip_lines(natoms + 1, "GRO atom or box lines")?;
        Ok(Some(position))
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        let mut frame = Frame::new();
        frame.set("name", file.read_line("the GRO title line")?.trim());
        let count = file.read_line("the GRO atom count")?;
        let natoms = parse_atom_count(file, &count)?;

        let mut residues: BTreeMap<i64, Residue> = BTreeMap::new();
        for _ in 0..natoms {
            let line = file.read_line("a GRO atom line")?;
            if line.len() < 44 {
                return Err(gro_error(
                    file,
                    ParseErrorKind::LineTooShort {
                        record: "GRO atom".into(),
                        expected: 44,
                        found: line.len(),
                    },
                ));
            }
            let value = |start: usize, name: &str| {
                parse_float(slice_and_trim(&line, start, start + 8), name)
                    .map(|v| v * NM_TO_ANGSTROM)
                    .map_err(|kind| gro_error(file, kind))
            };
            let position = Point3::new(value(20, "x coordinate")?, value(28, "y coordinate")?, value(36, "z coordinate")?);
            let atom = Atom::new(slice_and_trim(&line, 10, 15));
            if line.len() >= 68 {
                let velocity = Vector3::new(value(44, "x velocity")?, value(52, "y velocity")?, value(60, "z velocity")?);
                frame.add_atom_with_velocity(atom, position, velocity);
            } else {
                frame.add_atom(atom, position);
            }

            // atoms with an unreadable residue number belong to no residue
            if let Ok(resid) = slice_and_trim(&line, 0, 5).parse::<i64>() {
                residues
                    .entry(resid)
                    .or_insert_with(|| Residue::with_id(slice_and_trim(&line, 5, 10), resid))
                    .add_atom(frame.size() - 1);
            }
        }

        let box_line = file.read_line("the GRO box line")?;
        match read_cell(file, &box_line)? {
            Some(cell) => frame.cell = cell,
            None => context.diagnostics.warn(
                "GRO reader",
                format!("expected 3 or 9 values in the box line, got '{}'", box_line.trim()),
            ),
        }

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
        let diagnostics = context.diagnostics;
        out.line(frame.name().unwrap_or("GRO file produced by moltraj"))?;
        out.line(format_args!("{:>5}", frame.size()))?;

        let topology = frame.topology();
        let mut next_free_resid = topology
            .residues()
            .iter()
            .filter_map(|residue| residue.id)
            .max()
            .unwrap_or(0)
            + 1;

        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            let residue = topology.residue_for_atom(index);
            let resname = match residue {
                Some(residue) => {
                    let (name, cut) = truncate(&residue.name, 5);
                    if cut {
                        diagnostics.warn(
                            WRITER,
                            format!("residue '{}' name is too long, it will be truncated", residue.name),
                        );
                    }
                    name
                }
                None => "XXXXX",
            };
            let resid = match residue.and_then(|residue| residue.id) {
                Some(id) if (0..=MAX_ID).contains(&id) => id.to_string(),
                Some(id) => {
                    diagnostics.warn(WRITER, format!("too many residues, removing residue id {id}"));
                    "-1".to_string()
                }
                None => {
                    let id = next_free_resid;
                    next_free_resid += 1;
                    if id <= MAX_ID { id.to_string() } else { "-1".to_string() }
                }
            };
            let (name, cut) = truncate(&atom.name, 5);
            if cut {
                diagnostics.warn(WRITER, format!("atom name '{}' is too long, it will be truncated", atom.name));
            }
            let serial = if index as i64 >= MAX_ID {
                if index as i64 == MAX_ID {
                    diagnostics.warn(WRITER, "too many atoms, removing atomic id bigger than 99999");
                }
                "*****".to_string()
            } else {
                (index + 1).to_string()
            };

            let position = position.coords / NM_TO_ANGSTROM;
            for (value, axis) in [(position.x, "x"), (position.y, "y"), (position.z, "z")] {
                check_float_width(FormatKind::Gro, value, 8, 3, &format!("{axis} coordinate of atom {index}"))?;
            }
            let mut line = format!(
                "{resid:>5}{resname:<5}{name:>5}{serial:>5}{:8.3}{:8.3}{:8.3}",
                position.x, position.y, position.z
            );
            if let Some(velocities) = frame.velocities() {
                let velocity = velocities[index] / NM_TO_ANGSTROM;
                for (value, axis) in [(velocity.x, "x"), (velocity.y, "y"), (velocity.z, "z")] {
                    check_float_width(FormatKind::Gro, value, 8, 4, &format!("{axis} velocity of atom {index}"))?;
                }
                line.push_str(&format!("{:8.4}{:8.4}{:8.4}", velocity.x, velocity.y, velocity.z));
            }
            out.line(line)?;
        }

        let cell = &frame.cell;
        if cell.shape() == CellShape::Triclinic {
            let m = cell.matrix() / NM_TO_ANGSTROM;
            out.line(format_args!(
                "  {:8.5}  {:8.5}  {:8.5} 0.0 0.0  {:8.5} 0.0  {:8.5}  {:8.5}",
                m[(0, 0)],
                m[(1, 1)],
                m[(2, 2)],
                m[(0, 1)],
                m[(0, 2)],
                m[(1, 2)]
            ))?;
        } else {
            let [a, b, c] = cell.lengths().map(|length| length / NM_TO_ANGSTROM);
            out.line(format_args!("  {a:8.5}  {b:8.5}  {c:8.5}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::DiagnosticSink;
    use crate::core::topology::registry::ResidueTemplates;

    const WATER: &str = "\
Two waters t= 0.0
    6
    1SOL     OW    1   0.126   1.624   1.679  0.1227 -0.0580  0.0434
    1SOL    HW1    2   0.190   1.661   1.747  0.8085  0.3191 -0.7791
    1SOL    HW2    3   0.177   1.568   1.613 -0.9045 -2.6469  1.3180
    2SOL     OW    4   1.275   0.053   0.622  0.2519  0.3140 -0.1734
    2SOL    HW1    5   1.337   0.002   0.680 -1.0641 -1.1349  0.0257
    2SOL    HW2    6   1.326   0.120   0.568  1.9427 -0.8216 -0.0244
   1.86206   1.86206   1.86206
";

    fn context(sink: &DiagnosticSink) -> FormatContext<'_> {
        FormatContext {
            diagnostics: sink,
            templates: ResidueTemplates::standard(),
        }
    }

    #[test]
    fn reads_positions_velocities_residues_and_box() {
        let sink = DiagnosticSink::silent();
        let mut file = TextFile::from_string("water.gro", WATER);
        let frame = GroFormat.read_next(&mut file, &context(&sink)).unwrap();

        assert_eq!(frame.name(), Some("Two waters t= 0.0"));
        assert_eq!(frame.size(), 6);
        assert!((frame.positions()[0].x - 1.26).abs() < 1e-9);
        assert!((frame.velocities().unwrap()[0].x - 1.227).abs() < 1e-9);
        assert_eq!(frame.topology().residues().len(), 2);
        assert_eq!(frame.topology().residues()[1].atoms(), &[3, 4, 5]);
        assert!((frame.cell.lengths()[0] - 18.6206).abs() < 1e-9);
    }

    #[test]
    fn forward_skips_frames_and_detects_the_end() {
        let content = format!("{WATER}{WATER}\n");
        let mut file = TextFile::from_string("water.gro", content);
        assert_eq!(GroFormat.forward(&mut file).unwrap(), Some(0));
        let second = GroFormat.forward(&mut file).unwrap().unwrap();
        assert_eq!(second as usize, WATER.len());
        assert_eq!(GroFormat.forward(&mut file).unwrap(), None);
    }

    #[test]
    fn forward_fails_on_truncated_frames_and_bad_counts() {
        let truncated: String = WATER.lines().take(4).map(|l| format!("{l}\n")).collect();
        let mut file = TextFile::from_string("water.gro", truncated);
        assert!(GroFormat.forward(&mut file).is_err());

        let mut file = TextFile::from_string("bad.gro", "title\nnot a number\n");
        assert!(GroFormat.forward(&mut file).is_err());
    }

    #[test]
    fn write_then_read_keeps_triclinic_box_and_velocities() {
        let sink = DiagnosticSink::silent();
        let mut file = TextFile::from_string("water.gro", WATER);
        let mut frame = GroFormat.read_next(&mut file, &context(&sink)).unwrap();
        frame.cell = UnitCell::from_lengths_angles([20.0, 22.0, 25.0], [90.0, 90.0, 60.0]);

        let mut out = TextWriter::in_memory("out.gro");
        GroFormat.write_next(&mut out, &frame, &context(&sink)).unwrap();
        let mut file = TextFile::from_string("out.gro", out.contents());
        let back = GroFormat.read_next(&mut file, &context(&sink)).unwrap();

        assert_eq!(back.size(), 6);
        assert_eq!(back.cell.shape(), CellShape::Triclinic);
        let lengths = back.cell.lengths();
        assert!((lengths[2] - 25.0).abs() < 1e-3);
        assert!((back.cell.angles()[2] - 60.0).abs() < 1e-3);
        let velocity = back.velocities().unwrap()[5];
        assert!((velocity.x - 19.427).abs() < 1e-3);
        assert_eq!(back.topology().residues()[0].name, "SOL");
    }
}
