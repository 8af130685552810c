//! MDL SDF (V2000 connection table) format.
//!
//! Each record is a molfile followed by optional `> <name>` data items and
//! ends with a `$$$$` line.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::fields::{check_float_width, parse_float, parse_int, slice_and_trim};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;

const READER: &str = "SDF reader";
const WRITER: &str = "SDF writer";
const END_OF_RECORD: &str = "$$$$";
const MAX_COUNT: usize = 999;

#[derive(Debug, Default)]
pub struct SdfFormat;

fn sdf_error(file: &TextFile, kind: ParseErrorKind) -> FormatError {
    file.parse_error(FormatKind::Sdf, kind)
}

fn parse_counts(file: &TextFile, line: &str) -> FormatResult<(usize, usize)> {
    if line.len() < 10 {
        return Err(sdf_error(
            file,
            ParseErrorKind::LineTooShort {
                record: "SDF counts".into(),
                expected: 10,
                found: line.len(),
            },
        ));
    }
    let natoms = parse_int(slice_and_trim(line, 0, 3), "atom count").map_err(|kind| sdf_error(file, kind))?;
    let nbonds = parse_int(slice_and_trim(line, 3, 6), "bond count").map_err(|kind| sdf_error(file, kind))?;
    Ok((natoms, nbonds))
}

fn charge_from_code(code: i64) -> Option<f64> {
    match code {
        0 => Some(0.0),
        1 => Some(3.0),
        2 => Some(2.0),
        3 => Some(1.0),
        5 => Some(-1.0),
        6 => Some(-2.0),
        7 => Some(-3.0),
        _ => None,
    }
}

fn code_from_charge(charge: f64, diagnostics: &DiagnosticSink) -> u8 {
    if charge.fract() != 0.0 {
        diagnostics.warn(WRITER, format!("charge not an integer: '{charge}'"));
        return 0;
    }
    match charge as i64 {
        0 => 0,
        1 => 3,
        2 => 2,
        3 => 1,
        -1 => 5,
        -2 => 6,
        -3 => 7,
        other => {
            diagnostics.warn(WRITER, format!("no charge code for '{other}'"));
            0
        }
    }
}

fn bond_order_of(code: i64) -> BondOrder {
    match code {
        1 => BondOrder::Single,
        2 => BondOrder::Double,
        3 => BondOrder::Triple,
        4 => BondOrder::Aromatic,
        _ => BondOrder::Unknown,
    }
}

fn bond_code(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
        _ => 8,
    }
}

fn read_atom(file: &TextFile, line: &str, diagnostics: &DiagnosticSink) -> FormatResult<(Atom, Point3<f64>)> {
    if line.len() < 34 {
        return Err(sdf_error(
            file,
            ParseErrorKind::LineTooShort {
                record: "SDF atom".into(),
                expected: 34,
                found: line.len(),
            },
        ));
    }
    let coordinate = |start: usize, name: &str| {
        parse_float(slice_and_trim(line, start, start + 10), name).map_err(|kind| sdf_error(file, kind))
    };
    let position = Point3::new(coordinate(0, "x coordinate")?, coordinate(10, "y coordinate")?, coordinate(20, "z coordinate")?);
    let mut atom = Atom::new(slice_and_trim(line, 31, 34));

    if line.len() >= 40 {
        let field = slice_and_trim(line, 36, 39);
        match field.parse::<i64>() {
            Ok(code) => match charge_from_code(code) {
                Some(charge) => atom.charge = charge,
                None => diagnostics.warn(READER, format!("unknown charge code: '{code}'")),
            },
            Err(_) => diagnostics.warn(READER, format!("charge code not numeric: '{field}'")),
        }
    }
    Ok((atom, position))
}

/// Applies `M  CHG` entries, which take precedence over the atom block codes.
fn read_charge_entries(frame: &mut Frame, line: &str, diagnostics: &DiagnosticSink) {
    let values: Vec<&str> = line.get(6..).unwrap_or("").split_whitespace().collect();
    let Some((_, pairs)) = values.split_first() else {
        return;
    };
    for pair in pairs.chunks(2) {
        let parsed = match pair {
            [atom, charge] => atom.parse::<usize>().ok().zip(charge.parse::<f64>().ok()),
            _ => None,
        };
        match parsed {
            Some((atom, charge)) if (1..=frame.size()).contains(&atom) => {
                frame.atoms_mut()[atom - 1].charge = charge;
            }
            _ => diagnostics.warn(READER, format!("invalid charge entry in '{}'", line.trim())),
        }
    }
}

impl FrameFormat for SdfFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Sdf
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        let position = file.tell();
        let mut header = Vec::with_capacity(4);
        while header.len() < 4 {
            match file.try_read_line()? {
                Some(line) => header.push(line),
                None if header.iter().all(|line| line.trim().is_empty()) => return Ok(None),
                None => return Err(file.eof_error("an SDF header and counts line")),
            }
        }
        if header.iter().all(|line| line.trim().is_empty()) && file.at_blank_tail()? {
            return Ok(None);
        }

        let (natoms, nbonds) = parse_counts(file, &header[3])?;
        file.skip_lines(natoms + nbonds, "SDF atom and bond lines")?;

        while let Some(line) = file.try_read_line()? {
            if line.starts_with(END_OF_RECORD) {
                break;
            }
        }
        Ok(Some(position))
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        let diagnostics = context.diagnostics;
        let mut frame = Frame::new();
        frame.set("name", file.read_line("an SDF molecule name")?.trim());
        file.skip_lines(2, "the SDF program and comment lines")?;
        let counts = file.read_line("an SDF counts line")?;
        let (natoms, nbonds) = parse_counts(file, &counts)?;

        for _ in 0..natoms {
            let line = file.read_line("an SDF atom line")?;
            let (atom, position) = read_atom(file, &line, diagnostics)?;
            frame.add_atom(atom, position);
        }

        for _ in 0..nbonds {
            let line = file.read_line("an SDF bond line")?;
            let serial = |start: usize, name: &str| -> FormatResult<usize> {
                let value: usize = parse_int(slice_and_trim(&line, start, start + 3), name)
                    .map_err(|kind| sdf_error(file, kind))?;
                value.checked_sub(1).ok_or_else(|| {
                    sdf_error(file, ParseErrorKind::Invalid(format!("{name} must start at 1")))
                })
            };
            let (i, j) = (serial(0, "first bond atom")?, serial(3, "second bond atom")?);
            let order = slice_and_trim(&line, 6, 9).parse().map_or(BondOrder::Unknown, bond_order_of);
            frame.add_bond(i, j, order)?;
        }

        loop {
            let Some(line) = file.try_read_line()? else {
                diagnostics.warn(READER, "premature end of file while reading atom properties");
                return Ok(frame);
            };
            if line.starts_with(END_OF_RECORD) {
                return Ok(frame);
            } else if line.starts_with("M  END") {
                break;
            } else if line.starts_with("M  CHG") {
                read_charge_entries(&mut frame, &line, diagnostics);
            }
        }

        let mut name = String::new();
        let mut value = String::new();
        loop {
            let Some(line) = file.try_read_line()? else {
                diagnostics.warn(READER, "premature end of file while reading data items");
                return Ok(frame);
            };
            if line.is_empty() {
                if name.is_empty() {
                    diagnostics.warn(READER, "data item without a name");
                    continue;
                }
                frame.set(name.clone(), value.clone());
            } else if line.starts_with(END_OF_RECORD) {
                return Ok(frame);
            } else if let Some(header) = line.strip_prefix("> <") {
                name = header.rsplit_once('>').map_or(header, |(name, _)| name).to_string();
                value = file.read_line("an SDF data item value")?;
            } else {
                value.push('\n');
                value.push_str(&line);
            }
        }
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()> {
        let topology = frame.topology();
        let bonds: Vec<_> = topology.bonds_with_orders().collect();
        if frame.size() > MAX_COUNT || bonds.len() > MAX_COUNT {
            return Err(FormatError::ValueTooWide {
                format: FormatKind::Sdf,
                context: format!("{} atoms and {} bonds do not fit in a V2000 counts line", frame.size(), bonds.len()),
            });
        }

        out.line(frame.name().unwrap_or("NONAME"))?;
        out.line(" moltraj")?;
        out.line("")?;
        out.line(format_args!(
            "{:>3}{:>3}  0     0  0  0  0  0  0999 V2000",
            frame.size(),
            bonds.len()
        ))?;

        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            let kind = if atom.kind.is_empty() || atom.kind.len() > 3 { "Xxx" } else { atom.kind.as_str() };
            for (value, axis) in [(position.x, "x"), (position.y, "y"), (position.z, "z")] {
                check_float_width(FormatKind::Sdf, value, 10, 4, &format!("{axis} coordinate of atom {index}"))?;
            }
            let code = code_from_charge(atom.charge, context.diagnostics);
            out.line(format_args!(
                "{:>10.4}{:>10.4}{:>10.4} {:3} 0{:3}  0  0  0  0  0  0  0  0  0  0",
                position.x, position.y, position.z, kind, code
            ))?;
        }

        for ([i, j], order) in bonds {
            out.line(format_args!("{:>3}{:>3}{:>3}  0  0  0  0", i + 1, j + 1, bond_code(order)))?;
        }
        out.line("M  END")?;

        for (key, value) in frame.properties.iter().filter(|(key, _)| key.as_str() != "name") {
            out.line(format_args!("> <{key}>"))?;
            out.line(value)?;
            out.line("")?;
        }
        out.line(END_OF_RECORD)
    }
}
