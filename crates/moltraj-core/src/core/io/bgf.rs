//! Biograf (BGF) format, as written by DREIDING-based tools.
//!
//! Atoms use the fixed `FORMAT ATOM (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)`
//! layout. Connectivity comes from `CONECT` records listing an atom and all
//! of its neighbours, with bond orders in `ORDER` records aligned on the
//! same neighbours. Frames end at a line starting with `END`.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::fields::{check_float_width, column_char, fits_int, parse_float, parse_int, slice_and_trim, truncate};
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
use std::collections::HashMap;

const READER: &str = "BGF reader";
const WRITER: &str = "BGF writer";
const FORCE_FIELD_TYPE: &str = "force_field_type";
const ATOM_FORMAT: &str = "FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)";
const CONECT_FORMAT: &str = "FORMAT CONECT (a6,12i6)";
const PER_LINE: usize = 12;
const MAX_SERIAL: i64 = 99999;

#[derive(Debug, Default)]
pub struct BgfFormat;

fn bgf_error(file: &TextFile, kind: ParseErrorKind) -> FormatError {
    file.parse_error(FormatKind::Bgf, kind)
}

/// Element of an atom from its force-field type (`C_3` -> `C`, `Zn` -> `Zn`),
/// falling back to the atom name.
fn element_of(force_field_type: &str, name: &str) -> String {
    let prefix = force_field_type.split('_').next().unwrap_or("");
    if elements::is_element(prefix) {
        elements::normalize_symbol(prefix)
    } else {
        elements::guess_element(name)
    }
}

fn order_label(order: BondOrder) -> &'static str {
    match order {
        BondOrder::Single => "1",
        BondOrder::Double => "2",
        BondOrder::Triple => "3",
        BondOrder::Quadruple => "4",
        BondOrder::Aromatic => "ar",
        BondOrder::Amide => "am",
        BondOrder::Unknown => "0",
    }
}

#[derive(Default)]
struct FrameReader {
    frame: Frame,
    serials: HashMap<i64, usize>,
    residues: Vec<Residue>,
    residue_index: HashMap<(char, i64), usize>,
    neighbours: Vec<(i64, Vec<i64>)>,
    orders: HashMap<i64, Vec<String>>,
}

impl FrameReader {
    fn atom(&mut self, file: &TextFile, line: &str, hetero: bool) -> FormatResult<()> {
        if line.len() < 60 {
            return Err(bgf_error(
                file,
                ParseErrorKind::LineTooShort {
                    record: "BGF atom".into(),
                    expected: 60,
                    found: line.len(),
                },
            ));
        }
        let serial: i64 = parse_int(slice_and_trim(line, 7, 12), "atom serial").map_err(|kind| bgf_error(file, kind))?;
        let coordinate = |start: usize, name: &str| {
            parse_float(slice_and_trim(line, start, start + 10), name).map_err(|kind| bgf_error(file, kind))
        };
        let position = Point3::new(coordinate(30, "x coordinate")?, coordinate(40, "y coordinate")?, coordinate(50, "z coordinate")?);

        let name = slice_and_trim(line, 13, 18);
        let force_field_type = slice_and_trim(line, 61, 66);
        let mut atom = Atom::with_kind(name, element_of(force_field_type, name));
        if !force_field_type.is_empty() {
            atom.set(FORCE_FIELD_TYPE, force_field_type);
        }
        let charge = slice_and_trim(line, 72, 80);
        if !charge.is_empty() {
            atom.charge = parse_float(charge, "charge").map_err(|kind| bgf_error(file, kind))?;
        }
        self.frame.add_atom(atom, position);
        let index = self.frame.size() - 1;
        self.serials.insert(serial, index);

        let chain = column_char(line, 23);
        let resid = slice_and_trim(line, 25, 30).parse::<i64>().unwrap_or(0);
        let slot = *self.residue_index.entry((chain, resid)).or_insert_with(|| {
            let mut residue = Residue::with_id(slice_and_trim(line, 19, 22), resid);
            residue.set("chainid", chain.to_string());
            residue.set("is_standard_pdb", !hetero);
            self.residues.push(residue);
            self.residues.len() - 1
        });
        self.residues[slot].add_atom(index);
        Ok(())
    }

    fn conect(&mut self, file: &TextFile, line: &str) -> FormatResult<()> {
        let values = line
            .split_whitespace()
            .skip(1)
            .map(|value| parse_int::<i64>(value, "CONECT serial"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|kind| bgf_error(file, kind))?;
        if let Some((&atom, partners)) = values.split_first() {
            match self.neighbours.iter_mut().find(|(serial, _)| *serial == atom) {
                Some((_, existing)) => existing.extend_from_slice(partners),
                None => self.neighbours.push((atom, partners.to_vec())),
            }
        }
        Ok(())
    }

    fn order(&mut self, file: &TextFile, line: &str) -> FormatResult<()> {
        let mut values = line.split_whitespace().skip(1);
        let Some(atom) = values.next() else {
            return Ok(());
        };
        let atom: i64 = parse_int(atom, "ORDER serial").map_err(|kind| bgf_error(file, kind))?;
        self.orders
            .entry(atom)
            .or_default()
            .extend(values.map(str::to_string));
        Ok(())
    }

    fn crystx(&mut self, file: &TextFile, line: &str) -> FormatResult<()> {
        let values = line
            .split_whitespace()
            .skip(1)
            .take(6)
            .map(|value| parse_float(value, "cell parameter"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|kind| bgf_error(file, kind))?;
        match values.as_slice() {
            &[a, b, c, alpha, beta, gamma] => {
                self.frame.cell = UnitCell::from_lengths_angles([a, b, c], [alpha, beta, gamma]);
                Ok(())
            }
            _ => Err(bgf_error(
                file,
                ParseErrorKind::Unexpected {
                    expected: "six cell parameters".into(),
                    found: line.trim().to_string(),
                },
            )),
        }
    }

    fn finish(mut self, diagnostics: &DiagnosticSink) -> FormatResult<Frame> {
        for residue in self.residues {
            self.frame.add_residue(residue)?;
        }
        for (atom, partners) in &self.neighbours {
            let orders = self.orders.get(atom);
            for (slot, partner) in partners.iter().enumerate() {
                let (Some(&i), Some(&j)) = (self.serials.get(atom), self.serials.get(partner)) else {
                    diagnostics.warn(
                        READER,
                        format!("bond between unknown atoms {atom} and {partner}, removing it"),
                    );
                    continue;
                };
                // bonds without an ORDER record are single bonds
                let order = match orders.and_then(|orders| orders.get(slot)) {
                    Some(label) => label.parse().unwrap_or_default(),
                    None => BondOrder::Single,
                };
                if i != j && self.frame.topology().bond_order(i, j).is_none() {
                    self.frame.add_bond(i, j, order)?;
                }
            }
        }
        Ok(self.frame)
    }
}

impl FrameFormat for BgfFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Bgf
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        let position = file.tell();
        let mut content = false;
        while let Some(line) = file.try_read_line()? {
            if line.starts_with("END") {
                return Ok(Some(position));
            }
            content |= !line.trim().is_empty();
        }
        match (content, position) {
            (false, _) => Ok(None),
            (true, 0) => Ok(Some(0)),
            (true, _) => Err(file.eof_error("an END record")),
        }
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        let mut reader = FrameReader::default();
        while let Some(line) = file.try_read_line()? {
            let record = line.split_whitespace().next().unwrap_or("");
            match record {
                "ATOM" => reader.atom(file, &line, false)?,
                "HETATM" => reader.atom(file, &line, true)?,
                "CONECT" => reader.conect(file, &line)?,
                "ORDER" => reader.order(file, &line)?,
                "CRYSTX" => reader.crystx(file, &line)?,
                "DESCRP" => {
                    let description = line.get(6..).unwrap_or("").trim();
                    reader.frame.set("name", description);
                }
                _ if line.starts_with("END") => break,
                _ => {}
            }
        }
        reader.finish(context.diagnostics)
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()> {
        let diagnostics = context.diagnostics;
        if !fits_int(frame.size() as i64, 5) {
            return Err(FormatError::ValueTooWide {
                format: FormatKind::Bgf,
                context: format!("{} atoms do not fit in the 5 columns of a BGF serial", frame.size()),
            });
        }

        out.line("BIOGRF 200")?;
        out.line(format_args!("DESCRP {}", frame.name().unwrap_or("moltraj")))?;
        out.line("REMARK generated by moltraj")?;
        if frame.cell.shape() != CellShape::Infinite {
            let [a, b, c] = frame.cell.lengths();
            let [alpha, beta, gamma] = frame.cell.angles();
            out.line(format_args!(
                "CRYSTX {a:11.5}{b:11.5}{c:11.5}{alpha:11.5}{beta:11.5}{gamma:11.5}"
            ))?;
        }
        out.line(ATOM_FORMAT)?;

        let topology = frame.topology();
        let neighbours = topology.neighbors();
        let mut next_resid = topology
            .residues()
            .iter()
            .filter_map(|residue| residue.id)
            .max()
            .unwrap_or(0)
            + 1;

        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            let residue = topology.residue_for_atom(index);
            let standard = residue
                .and_then(|residue| residue.get("is_standard_pdb"))
                .and_then(Property::as_bool)
                .unwrap_or(false);
            let record = if standard { "ATOM" } else { "HETATM" };

            let (name, cut) = truncate(&atom.name, 5);
            if cut {
                diagnostics.warn(WRITER, format!("atom name '{}' is too long, it will be truncated", atom.name));
            }
            let resname = truncate(residue.map_or("RES", |residue| residue.name.as_str()), 3).0;
            let chain = residue
                .and_then(|residue| residue.chain_id())
                .and_then(|chain| chain.chars().next())
                .unwrap_or(' ');
            let resid = match residue.and_then(|residue| residue.id) {
                Some(id) if (-9999..=MAX_SERIAL).contains(&id) => id,
                Some(id) => {
                    diagnostics.warn(WRITER, format!("residue id {id} is too big, using 0 instead"));
                    0
                }
                None => {
                    let id = next_resid;
                    next_resid += 1;
                    id.min(MAX_SERIAL)
                }
            };

            for (value, axis) in [(position.x, "x"), (position.y, "y"), (position.z, "z")] {
                check_float_width(FormatKind::Bgf, value, 10, 5, &format!("{axis} coordinate of atom {index}"))?;
            }
            check_float_width(FormatKind::Bgf, atom.charge, 8, 5, &format!("charge of atom {index}"))?;
            let force_field_type = atom
                .get(FORCE_FIELD_TYPE)
                .and_then(Property::as_str)
                .unwrap_or(atom.kind.as_str());

            out.line(format_args!(
                "{:<6} {:>5} {:<5} {:>3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<5}{:>3}{:>2} {:>8.5}",
                record,
                index + 1,
                name,
                resname,
                chain,
                resid,
                position.x,
                position.y,
                position.z,
                truncate(force_field_type, 5).0,
                neighbours[index].len(),
                0,
                atom.charge
            ))?;
        }

        out.line(CONECT_FORMAT)?;
        for (index, partners) in neighbours.iter().enumerate() {
            if partners.is_empty() {
                continue;
            }
            let partners: Vec<usize> = partners.iter().copied().collect();
            for chunk in partners.chunks(PER_LINE) {
                let serials: String = chunk.iter().map(|partner| format!("{:>6}", partner + 1)).collect();
                out.line(format_args!("CONECT{:>6}{serials}", index + 1))?;
            }
            let orders: Vec<BondOrder> = partners
                .iter()
                .filter_map(|&partner| topology.bond_order(index, partner))
                .collect();
            if orders.iter().any(|&order| order != BondOrder::Single) {
                for chunk in orders.chunks(PER_LINE) {
                    let labels: String = chunk.iter().map(|&order| format!("{:>6}", order_label(order))).collect();
                    out.line(format_args!("ORDER {:>6}{labels}", index + 1))?;
                }
            }
        }
        out.line("END")
    }
}
