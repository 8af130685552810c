//! CSSR (Cambridge Structure Search and Retrieval) format. Files hold a
//! single frame.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::fields::{check_float_width, parse_float, parse_int};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::models::atom::Atom;
use crate::core::models::cell::{CellShape, UnitCell};
use crate::core::models::frame::Frame;
use crate::core::models::topology::BondOrder;
use nalgebra::{Point3, Vector3};

const READER: &str = "CSSR reader";
const WRITER: &str = "CSSR writer";
const MAX_BONDS: usize = 8;
const MAX_SERIAL: usize = 9999;

#[derive(Debug, Default)]
pub struct CssrFormat {
    written: bool,
}

fn cssr_error(file: &TextFile, kind: ParseErrorKind) -> FormatError {
    file.parse_error(FormatKind::Cssr, kind)
}

/// Three numbers following column `start` of a header line.
fn header_triplet(file: &TextFile, line: &str, start: usize, field: &str) -> FormatResult<[f64; 3]> {
    let values = line
        .get(start..)
        .unwrap_or("")
        .split_whitespace()
        .take(3)
        .map(|value| parse_float(value, field))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|kind| cssr_error(file, kind))?;
    match values.as_slice() {
        &[a, b, c] => Ok([a, b, c]),
        _ => Err(cssr_error(
            file,
            ParseErrorKind::Unexpected {
                expected: format!("three values for {field}"),
                found: line.trim().to_string(),
            },
        )),
    }
}

/// Atom names look like `<type><id>` (`O121`, `H22`).
fn type_from_name(name: &str) -> &str {
    let end = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
    &name[..end]
}

impl FrameFormat for CssrFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Cssr
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
                format: FormatKind::Cssr,
                operation: "reading more than one frame",
            });
        }

        let mut frame = Frame::new();
        let line = file.read_line("the CSSR cell lengths")?;
        let lengths = header_triplet(file, &line, 38, "cell lengths")?;
        let line = file.read_line("the CSSR cell angles")?;
        let angles = header_triplet(file, &line, 21, "cell angles")?;
        frame.cell = UnitCell::from_lengths_angles(lengths, angles);

        let line = file.read_line("the CSSR atom count")?;
        let mut counts = line.split_whitespace();
        let natoms: usize =
            parse_int(counts.next().unwrap_or(""), "atom count").map_err(|kind| cssr_error(file, kind))?;
        let fractional = counts.next().and_then(|style| style.parse::<i64>().ok()) == Some(0);

        let title = file.read_line("the CSSR title")?;
        if !title.trim().is_empty() {
            frame.set("name", title.trim());
        }

        let mut connectivity = Vec::new();
        for _ in 0..natoms {
            let line = file.read_line("a CSSR atom line")?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return Err(cssr_error(
                    file,
                    ParseErrorKind::Unexpected {
                        expected: "at least 5 fields in a CSSR atom line".into(),
                        found: line.trim().to_string(),
                    },
                ));
            }
            let value = |index: usize, name: &str| {
                parse_float(fields[index], name).map_err(|kind| cssr_error(file, kind))
            };
            let coordinates = Vector3::new(value(2, "x coordinate")?, value(3, "y coordinate")?, value(4, "z coordinate")?);
            let position = if fractional {
                frame.cell.cartesian(&coordinates)
            } else {
                Point3::from(coordinates)
            };

            let name = fields[1];
            let mut atom = Atom::with_kind(name, type_from_name(name));
            if fields.len() > 5 + MAX_BONDS {
                atom.charge = value(5 + MAX_BONDS, "charge")?;
            }
            frame.add_atom(atom, position);

            let partners = fields
                .iter()
                .skip(5)
                .take(MAX_BONDS)
                .map(|partner| parse_int::<usize>(partner, "bonded atom"))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|kind| cssr_error(file, kind))?;
            connectivity.push(partners);
        }

        for (i, partners) in connectivity.into_iter().enumerate() {
            for partner in partners.into_iter().filter(|&partner| partner != 0) {
                if partner > natoms {
                    context
                        .diagnostics
                        .warn(READER, format!("atom {} is bonded to unknown atom {partner}", i + 1));
                    continue;
                }
                frame.add_bond(i, partner - 1, BondOrder::Unknown)?;
            }
        }
        Ok(frame)
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()> {
        if self.written {
            return Err(FormatError::Unsupported {
                format: FormatKind::Cssr,
                operation: "writing more than one frame",
            });
        }
        self.written = true;
        let diagnostics = context.diagnostics;

        let cell = &frame.cell;
        let lengths = cell.lengths();
        let angles = cell.angles();
        for (value, name) in lengths.iter().chain(&angles).zip(["a", "b", "c", "alpha", "beta", "gamma"]) {
            check_float_width(FormatKind::Cssr, *value, 8, 3, &format!("cell parameter {name}"))?;
        }
        out.line(format_args!(
            " REFERENCE STRUCTURE = 00000   A,B,C ={:8.3}{:8.3}{:8.3}",
            lengths[0], lengths[1], lengths[2]
        ))?;
        out.line(format_args!(
            "   ALPHA,BETA,GAMMA ={:8.3}{:8.3}{:8.3}    SPGR =  1 P1",
            angles[0], angles[1], angles[2]
        ))?;

        let style = if cell.shape() == CellShape::Infinite { 1 } else { 0 };
        if frame.size() > MAX_SERIAL {
            diagnostics.warn(WRITER, "too many atoms, the file might not open with other programs");
            out.line(format_args!("{} {style}", frame.size()))?;
        } else {
            out.line(format_args!("{:4}   {style}", frame.size()))?;
        }
        out.line(format_args!(" {}", frame.name().unwrap_or("file created with moltraj")))?;

        let mut connectivity = vec![Vec::new(); frame.size()];
        for [i, j] in frame.topology().bonds() {
            if i >= MAX_SERIAL || j >= MAX_SERIAL {
                diagnostics.warn(WRITER, "atomic index is too big for connectivity record, removing the bond");
                continue;
            }
            connectivity[i].push(j);
            connectivity[j].push(i);
        }

        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            let serial = if index < MAX_SERIAL { (index + 1).to_string() } else { "****".to_string() };
            let coordinates = if style == 0 {
                cell.fractional(position).unwrap_or(position.coords)
            } else {
                position.coords
            };
            let mut line = format!(
                "{serial:>4} {:<4}  {:9.5} {:9.5} {:9.5}",
                atom.name, coordinates.x, coordinates.y, coordinates.z
            );

            let partners = &connectivity[index];
            if partners.len() > MAX_BONDS {
                diagnostics.warn(
                    WRITER,
                    format!("too many bonds with atom {index}, only {MAX_BONDS} are supported"),
                );
            }
            for slot in 0..MAX_BONDS {
                let partner = partners.get(slot).map_or(0, |partner| partner + 1);
                line.push_str(&format!("{partner:>4}"));
            }
            line.push_str(&format!(" {:7.3}", atom.charge));
            out.line(line)?;
        }
        Ok(())
    }
}
