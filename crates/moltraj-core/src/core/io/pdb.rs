//! PDB (Protein Data Bank) text format.
//!
//! Frames end at an `END` or `ENDMDL` record. Bonds come from `CONECT`
//! records and from the standard residue templates; secondary structure from
//! `HELIX`, `SHEET` and `TURN` records is stored as a residue property.

use super::error::{FormatResult, ParseErrorKind};
use super::fields::{check_float_width, column_char, fits_int, parse_float, parse_int, slice_and_trim, truncate};
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use super::traits::{FormatContext, FrameFormat};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::atom::Atom;
use crate::core::models::cell::UnitCell;
use crate::core::models::frame::Frame;
use crate::core::models::property::Property;
use crate::core::models::residue::Residue;
use crate::core::topology::connectivity::{
    AtomOffsetTable, ConnectivityResolver, LabelRange, ResidueKey, apply_label_ranges,
};
use nalgebra::Point3;
use std::collections::BTreeMap;

const READER: &str = "PDB reader";
const WRITER: &str = "PDB writer";
const SECONDARY_STRUCTURE: &str = "secondary_structure";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Header,
    Title,
    Cryst1,
    Atom,
    Hetatm,
    Conect,
    Model,
    Endmdl,
    Ter,
    End,
    Helix,
    Sheet,
    Turn,
    Ignored,
    Unknown,
}

fn record_of(line: &str) -> Record {
    let head: String = line.chars().take(6).collect();
    let record = format!("{head:<6}");
    match record.as_str() {
        "ENDMDL" => Record::Endmdl,
        _ if record.starts_with("END") => Record::End,
        "CRYST1" => Record::Cryst1,
        "ATOM  " => Record::Atom,
        "HETATM" => Record::Hetatm,
        "CONECT" => Record::Conect,
        _ if record.starts_with("MODEL") => Record::Model,
        _ if record.starts_with("TER") => Record::Ter,
        "HELIX " => Record::Helix,
        "SHEET " => Record::Sheet,
        "TURN  " => Record::Turn,
        "HEADER" => Record::Header,
        "TITLE " => Record::Title,
        "REMARK" | "MASTER" | "AUTHOR" | "CAVEAT" | "COMPND" | "EXPDTA" | "KEYWDS" | "OBSLTE"
        | "SOURCE" | "SPLIT " | "SPRSDE" | "JRNL  " | "SEQRES" | "HET   " | "REVDAT" | "SCALE1"
        | "SCALE2" | "SCALE3" | "ORIGX1" | "ORIGX2" | "ORIGX3" | "ANISOU" | "SITE  " | "FORMUL"
        | "DBREF " | "HETNAM" | "HETSYN" | "SSBOND" | "LINK  " | "SEQADV" | "MODRES" | "CISPEP" => {
            Record::Ignored
        }
        _ if line.trim().is_empty() => Record::Ignored,
        _ => Record::Unknown,
    }
}

fn helix_class(class: i64) -> Option<&'static str> {
    match class {
        1 | 6 => Some("alpha helix"),
        2 | 7 => Some("omega helix"),
        3 => Some("pi helix"),
        4 | 8 => Some("gamma helix"),
        5 => Some("3-10 helix"),
        _ => None,
    }
}

/// Reads the line after the current one without consuming it.
fn peek_line(file: &mut TextFile) -> FormatResult<Option<String>> {
    let position = file.tell();
    let next = file.try_read_line()?;
    file.seek(position)?;
    Ok(next)
}

/// Whether an `ENDMDL` record ends the frame, or a following `END` does.
fn endmdl_ends_frame(file: &mut TextFile) -> FormatResult<bool> {
    Ok(!peek_line(file)?.is_some_and(|next| next.starts_with("END")))
}

/// State of one frame while its records are read.
struct FrameReader<'a> {
    diagnostics: &'a DiagnosticSink,
    frame: Frame,
    residues: BTreeMap<ResidueKey, Residue>,
    ranges: Vec<LabelRange>,
    offsets: AtomOffsetTable,
    conect: Vec<(i64, i64)>,
}

impl<'a> FrameReader<'a> {
    fn new(diagnostics: &'a DiagnosticSink) -> Self {
        Self {
            diagnostics,
            frame: Frame::new(),
            residues: BTreeMap::new(),
            ranges: Vec::new(),
            offsets: AtomOffsetTable::new(),
            conect: Vec::new(),
        }
    }

    fn warn(&self, message: String) {
        self.diagnostics.warn(READER, message);
    }

    fn header(&mut self, line: &str) {
        if line.len() < 66 {
            return;
        }
        self.frame.set("classification", slice_and_trim(line, 10, 50));
        self.frame.set("deposition_date", slice_and_trim(line, 50, 59));
        self.frame.set("pdb_idcode", slice_and_trim(line, 62, 66));
    }

    fn title(&mut self, line: &str) {
        if line.len() < 11 {
            return;
        }
        let previous = self.frame.name().unwrap_or("").to_string();
        let title = format!("{previous}{}", line.get(10..line.len().min(80)).unwrap_or(""));
        self.frame.set("name", title.trim());
    }

    fn cryst1(&mut self, file: &TextFile, line: &str) -> FormatResult<()> {
        if line.len() < 54 {
            return Err(file.parse_error(
                FormatKind::Pdb,
                ParseErrorKind::LineTooShort {
                    record: "CRYST1".into(),
                    expected: 54,
                    found: line.len(),
                },
            ));
        }
        let field = |start, end, name| {
            parse_float(slice_and_trim(line, start, end), name)
                .map_err(|kind| file.parse_error(FormatKind::Pdb, kind))
        };
        let lengths = [
            field(6, 15, "cell length a")?,
            field(15, 24, "cell length b")?,
            field(24, 33, "cell length c")?,
        ];
        let angles = [
            field(33, 40, "cell angle alpha")?,
            field(40, 47, "cell angle beta")?,
            field(47, 54, "cell angle gamma")?,
        ];
        self.frame.cell = UnitCell::from_lengths_angles(lengths, angles);

        if line.len() >= 55 {
            let space_group = slice_and_trim(line, 55, 65);
            if space_group != "P 1" && space_group != "P1" {
                self.warn(format!(
                    "ignoring custom space group ({space_group}), using P1 instead"
                ));
            }
        }
        Ok(())
    }

    fn atom(&mut self, file: &TextFile, line: &str, hetatm: bool) -> FormatResult<()> {
        if line.len() < 54 {
            return Err(file.parse_error(
                FormatKind::Pdb,
                ParseErrorKind::LineTooShort {
                    record: if hetatm { "HETATM" } else { "ATOM" }.into(),
                    expected: 54,
                    found: line.len(),
                },
            ));
        }
        self.offsets.record_atom(slice_and_trim(line, 6, 11).parse().ok());

        let name = slice_and_trim(line, 12, 16);
        let element = slice_and_trim(line, 76, 78);
        let mut atom = if element.is_empty() {
            Atom::new(name)
        } else {
            Atom::with_kind(name, element)
        };
        let altloc = column_char(line, 16);
        if altloc != ' ' {
            atom.set("altloc", altloc.to_string());
        }

        let coordinate = |start, name| {
            parse_float(slice_and_trim(line, start, start + 8), name)
                .map_err(|kind| file.parse_error(FormatKind::Pdb, kind))
        };
        let position = Point3::new(
            coordinate(30, "x coordinate")?,
            coordinate(38, "y coordinate")?,
            coordinate(46, "z coordinate")?,
        );
        let index = self.frame.size();
        self.frame.add_atom(atom, position);

        // atoms without a readable residue number belong to no residue
        let Ok(resid) = slice_and_trim(line, 22, 26).parse::<i64>() else {
            return Ok(());
        };
        let chain = column_char(line, 21);
        let insertion_code = column_char(line, 26);
        self.residues
            .entry(ResidueKey::new(chain, resid, insertion_code))
            .or_insert_with(|| {
                let mut residue = Residue::with_id(slice_and_trim(line, 17, 20), resid);
                if insertion_code != ' ' {
                    residue.set("insertion_code", insertion_code.to_string());
                }
                residue.set("is_standard_pdb", !hetatm);
                residue.set("chainid", chain.to_string());
                residue.set("chainname", chain.to_string());
                residue
            })
            .add_atom(index);
        Ok(())
    }

    fn conect(&mut self, file: &TextFile, line: &str) -> FormatResult<()> {
        let length = line.trim_end().len();
        let serial = |start: usize| {
            parse_int::<i64>(slice_and_trim(line, start, start + 5), "CONECT atom serial")
                .map_err(|kind| file.parse_error(FormatKind::Pdb, kind))
        };
        let atom = serial(6)?;
        for start in [11, 16, 21, 26] {
            if length <= start {
                break;
            }
            self.conect.push((atom, serial(start)?));
        }
        Ok(())
    }

    fn record_range(&mut self, start: ResidueKey, end: ResidueKey, label: &str, record: &str) {
        let range = LabelRange {
            start,
            end,
            label: label.to_string(),
        };
        if range.is_inverted() {
            self.warn(format!(
                "{record} range ends before it starts ({}{} to {}{}), ignoring it",
                start.chain, start.id, end.chain, end.id
            ));
            return;
        }
        self.ranges.push(range);
    }

    fn helix(&mut self, line: &str) {
        if line.len() < 38 {
            self.warn(format!("HELIX record too short: '{line}'"));
            return;
        }
        let (chain1, chain2) = (column_char(line, 19), column_char(line, 31));
        let (Ok(start), Ok(end)) = (
            slice_and_trim(line, 21, 25).parse::<i64>(),
            slice_and_trim(line, 33, 37).parse::<i64>(),
        ) else {
            self.warn(format!("HELIX record contains invalid numbers: '{line}'"));
            return;
        };
        if chain1 != chain2 {
            self.warn(format!("HELIX chain {chain1} and {chain2} are not the same"));
            return;
        }
        let Ok(class) = slice_and_trim(line, 38, 40).parse::<i64>() else {
            self.warn(format!("could not parse helix class in '{line}'"));
            return;
        };
        if let Some(label) = helix_class(class) {
            self.record_range(
                ResidueKey::new(chain1, start, column_char(line, 25)),
                ResidueKey::new(chain2, end, column_char(line, 37)),
                label,
                "HELIX",
            );
        }
    }

    fn secondary(&mut self, line: &str, first: usize, second: usize, record: &str) {
        if line.len() < second + 6 {
            self.warn(format!("secondary structure record too short: '{line}'"));
            return;
        }
        let (chain1, chain2) = (column_char(line, first), column_char(line, second));
        if chain1 != chain2 {
            self.warn(format!("{record} chain {chain1} and {chain2} are not the same"));
            return;
        }
        let (Ok(start), Ok(end)) = (
            slice_and_trim(line, first + 1, first + 5).parse::<i64>(),
            slice_and_trim(line, second + 1, second + 5).parse::<i64>(),
        ) else {
            self.warn(format!("{record} record contains invalid numbers: '{line}'"));
            return;
        };
        self.record_range(
            ResidueKey::new(chain1, start, column_char(line, first + 5)),
            ResidueKey::new(chain2, end, column_char(line, second + 5)),
            "extended",
            record,
        );
    }

    /// Labels and adds the residues of the chain that just ended.
    fn chain_ended(&mut self) -> FormatResult<()> {
        apply_label_ranges(&mut self.residues, &self.ranges, SECONDARY_STRUCTURE);
        for (_, residue) in std::mem::take(&mut self.residues) {
            self.frame.add_residue(residue)?;
        }
        Ok(())
    }

    fn finish(mut self, context: &FormatContext) -> FormatResult<Frame> {
        self.chain_ended()?;
        let resolver = ConnectivityResolver::new(context.templates, context.diagnostics, READER);
        resolver.add_explicit_bonds(&mut self.frame, &self.offsets, &self.conect)?;
        resolver.link_standard_residues(&mut self.frame)?;
        Ok(self.frame)
    }
}

/// PDB reader and writer. The writer numbers models and writes the final
/// `END` record when it is finished.
#[derive(Debug, Default)]
pub struct PdbFormat {
    models: usize,
    written: bool,
}

impl FrameFormat for PdbFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Pdb
    }

    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>> {
        let start = file.tell();
        let mut content = false;
        loop {
            let Some(line) = file.try_read_line()? else {
                return if !content {
                    Ok(None)
                } else if start == 0 {
                    Ok(Some(0))
                } else {
                    Err(file.eof_error("an END or ENDMDL record"))
                };
            };
            if line.starts_with("ENDMDL") && !endmdl_ends_frame(file)? {
                continue;
            }
            if line.starts_with("END") {
                return Ok(Some(start));
            }
            content |= !line.trim().is_empty();
        }
    }

    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame> {
        let mut reader = FrameReader::new(context.diagnostics);
        let mut got_end = false;
        while let Some(line) = file.try_read_line()? {
            match record_of(&line) {
                Record::Header => reader.header(&line),
                Record::Title => reader.title(&line),
                Record::Cryst1 => reader.cryst1(file, &line)?,
                Record::Atom => reader.atom(file, &line, false)?,
                Record::Hetatm => reader.atom(file, &line, true)?,
                Record::Conect => reader.conect(file, &line)?,
                Record::Helix => reader.helix(&line),
                Record::Sheet => reader.secondary(&line, 21, 32, "SHEET"),
                Record::Turn => reader.secondary(&line, 19, 30, "TURN"),
                Record::Ter => reader.chain_ended()?,
                Record::Model | Record::Ignored => {}
                Record::Endmdl => {
                    if endmdl_ends_frame(file)? {
                        got_end = true;
                        break;
                    }
                }
                Record::End => {
                    got_end = true;
                    break;
                }
                Record::Unknown => reader.warn(format!("ignoring unknown record: {line}")),
            }
        }
        if !got_end {
            reader.warn("missing END record in file".to_string());
        }
        reader.finish(context)
    }

    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()> {
        let diagnostics = context.diagnostics;
        self.written = true;
        out.line(format_args!("MODEL {:>4}", self.models + 1))?;

        let cell = &frame.cell;
        let [a, b, c] = cell.lengths();
        for (length, name) in [(a, "cell length a"), (b, "cell length b"), (c, "cell length c")] {
            check_float_width(FormatKind::Pdb, length, 9, 3, name)?;
        }
        let [alpha, beta, gamma] = cell.angles();
        out.line(format_args!(
            "CRYST1{a:9.3}{b:9.3}{c:9.3}{alpha:7.2}{beta:7.2}{gamma:7.2} P 1           1"
        ))?;

        // atoms without residue get residue numbers after the largest one
        let mut next_free_resid = frame
            .topology()
            .residues()
            .iter()
            .filter_map(|residue| residue.id)
            .max()
            .unwrap_or(0)
            + 1;

        let topology = frame.topology();
        for (index, (atom, position)) in frame.atoms().iter().zip(frame.positions()).enumerate() {
            for (value, axis) in [(position.x, "x"), (position.y, "y"), (position.z, "z")] {
                check_float_width(FormatKind::Pdb, value, 8, 3, &format!("{axis} coordinate of atom {index}"))?;
            }

            let altloc = single_char(atom.get("altloc"), " ", "altloc", diagnostics);
            let (name, cut) = truncate(&atom.name, 4);
            if cut {
                diagnostics.warn(WRITER, format!("atom name '{}' is too long, it will be truncated", atom.name));
            }

            let (record, resname, chain, resid, insertion) = match topology.residue_for_atom(index) {
                Some(residue) => {
                    let standard = residue
                        .get("is_standard_pdb")
                        .and_then(Property::as_bool)
                        .unwrap_or(false);
                    let (resname, cut) = truncate(&residue.name, 3);
                    if cut {
                        diagnostics.warn(
                            WRITER,
                            format!("residue '{}' name is too long, it will be truncated", residue.name),
                        );
                    }
                    let resid = match residue.id {
                        Some(id) if fits_int(id, 4) => id.to_string(),
                        Some(id) => {
                            diagnostics.warn(WRITER, format!("too many residues, removing residue id {id}"));
                            "-1".to_string()
                        }
                        None => "-1".to_string(),
                    };
                    (
                        if standard { "ATOM" } else { "HETATM" },
                        resname.to_string(),
                        single_char(residue.get("chainid"), "X", "chain id", diagnostics),
                        resid,
                        single_char(residue.get("insertion_code"), " ", "insertion code", diagnostics),
                    )
                }
                None => {
                    let resid = if next_free_resid <= 9999 {
                        next_free_resid.to_string()
                    } else {
                        "-1".to_string()
                    };
                    next_free_resid += 1;
                    ("HETATM", "XXX".to_string(), "X".to_string(), resid, " ".to_string())
                }
            };

            out.line(format_args!(
                "{:<6}{:>5} {:<4}{:1}{:<3} {:1}{:>4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}",
                record,
                pdb_serial(index, diagnostics),
                name,
                altloc,
                resname,
                chain,
                resid,
                insertion,
                position.x,
                position.y,
                position.z,
                1.0,
                0.0,
                atom.kind,
            ))?;
        }

        let mut partners = vec![Vec::new(); frame.size()];
        for [i, j] in topology.bonds() {
            if i >= MAX_SERIAL || j >= MAX_SERIAL {
                diagnostics.warn(
                    WRITER,
                    format!("atomic index is too big for CONECT, removing the bond between {i} and {j}"),
                );
                continue;
            }
            partners[i].push(j);
            partners[j].push(i);
        }
        for (index, bonded) in partners.iter().enumerate() {
            for chunk in bonded.chunks(4) {
                let mut line = format!("CONECT{:>5}", index + 1);
                for partner in chunk {
                    line.push_str(&format!("{:>5}", partner + 1));
                }
                out.line(line)?;
            }
        }

        out.line("ENDMDL")?;
        self.models += 1;
        Ok(())
    }

    fn finish(&mut self, out: &mut TextWriter) -> FormatResult<()> {
        if self.written {
            out.line("END")?;
            self.written = false;
        }
        Ok(())
    }
}

const MAX_SERIAL: usize = 99999;

fn pdb_serial(index: usize, diagnostics: &DiagnosticSink) -> String {
    let serial = index + 1;
    if serial > MAX_SERIAL {
        if serial == MAX_SERIAL + 1 {
            diagnostics.warn(WRITER, "too many atoms, removing atomic id bigger than 99999");
        }
        "*****".to_string()
    } else {
        serial.to_string()
    }
}

/// A one-character string property, truncated with a diagnostic when longer.
fn single_char(property: Option<&Property>, default: &str, what: &str, diagnostics: &DiagnosticSink) -> String {
    let Some(value) = property.and_then(Property::as_str) else {
        return default.to_string();
    };
    let (kept, cut) = truncate(value, 1);
    if cut {
        diagnostics.warn(WRITER, format!("{what} '{value}' is too long, it will be truncated"));
    }
    if kept.is_empty() { default.to_string() } else { kept.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::error::FormatError;
    use crate::core::models::topology::BondOrder;
    use crate::core::topology::registry::ResidueTemplates;

    fn read_all(content: &str) -> (Vec<Frame>, Vec<String>) {
        let (sink, messages) = DiagnosticSink::collecting();
        let context = FormatContext {
            diagnostics: &sink,
            templates: ResidueTemplates::standard(),
        };
        let mut format = PdbFormat::default();
        let mut file = TextFile::from_string("test.pdb", content);
        let mut frames = Vec::new();
        while !file.at_blank_tail().unwrap() {
            frames.push(format.read_next(&mut file, &context).unwrap());
        }
        let messages = messages.lock().unwrap().clone();
        (frames, messages)
    }

    const DIPEPTIDE: &str = "\
HEADER    PEPTIDE                                 01-JAN-00   1ABC
TITLE     TWO GLYCINES
CRYST1   10.000   20.000   30.000  90.00  90.00  90.00 P 1           1
HELIX    1   1 GLY A    1  GLY A    2  1                                   2
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00           C
ATOM      3  C   GLY A   1       2.000   1.400   0.000  1.00  0.00           C
ATOM      4  O   GLY A   1       1.300   2.400   0.000  1.00  0.00           O
ATOM      5  N   GLY A   2       3.300   1.500   0.000  1.00  0.00           N
ATOM      6  CA  GLY A   2       4.000   2.800   0.000  1.00  0.00           C
ATOM      7  C   GLY A   2       5.500   2.600   0.000  1.00  0.00           C
ATOM      8  O   GLY A   2       6.000   1.500   0.000  1.00  0.00           O
TER       9      GLY A   2
HETATM   10  O   HOH B   1      10.000  10.000  10.000  1.00  0.00           O
CONECT   10    8
END
";

    #[test]
    fn reads_atoms_residues_cell_and_metadata() {
        let (frames, messages) = read_all(DIPEPTIDE);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.size(), 9);
        assert_eq!(frame.name(), Some("TWO GLYCINES"));
        assert_eq!(frame.get("pdb_idcode").and_then(Property::as_str), Some("1ABC"));
        assert_eq!(frame.cell.lengths(), [10.0, 20.0, 30.0]);
        assert_eq!(frame.atoms()[1].kind, "C");
        assert_eq!(frame.positions()[1], Point3::new(1.45, 0.0, 0.0));

        let residues = frame.topology().residues();
        assert_eq!(residues.len(), 3);
        assert_eq!(residues[0].get(SECONDARY_STRUCTURE).and_then(Property::as_str), Some("alpha helix"));
        assert_eq!(residues[2].name, "HOH");
        assert_eq!(residues[2].get("is_standard_pdb").and_then(Property::as_bool), Some(false));
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn bonds_come_from_templates_backbone_and_conect() {
        let (frames, _) = read_all(DIPEPTIDE);
        let topology = frames[0].topology();
        assert!(topology.bond_order(0, 1).is_some(), "N-CA");
        assert!(topology.bond_order(2, 4).is_some(), "peptide C-N");
        // serial 10 follows the TER gap and is atom index 8
        assert!(topology.bond_order(7, 8).is_some(), "CONECT 10 8");
        assert_eq!(topology.bond_count(), 3 + 3 + 1 + 1);
    }

    #[test]
    fn forward_handles_models_and_missing_end() {
        let content = "MODEL 1\nATOM\nENDMDL\nEND\nMODEL 2\nATOM\nENDMDL\n\n";
        let mut format = PdbFormat::default();
        let mut file = TextFile::from_string("test.pdb", content);
        assert_eq!(format.forward(&mut file).unwrap(), Some(0));
        assert_eq!(format.forward(&mut file).unwrap(), Some(24));
        assert_eq!(format.forward(&mut file).unwrap(), None);

        let mut single = TextFile::from_string("test.pdb", "ATOM\nATOM\n");
        assert_eq!(format.forward(&mut single).unwrap(), Some(0));
    }

    #[test]
    fn forward_reports_truncated_frames() {
        let mut format = PdbFormat::default();
        let mut file = TextFile::from_string("test.pdb", "ATOM\nEND\nATOM\n");
        assert_eq!(format.forward(&mut file).unwrap(), Some(0));
        assert!(format.forward(&mut file).is_err());
    }

    #[test]
    fn write_then_read_preserves_atoms_bonds_and_cell() {
        let mut frame = Frame::new();
        frame.cell = UnitCell::from_lengths_angles([15.0, 16.0, 17.0], [80.0, 90.0, 120.0]);
        for (i, name) in ["C", "O", "N"].iter().enumerate() {
            frame.add_atom(Atom::new(*name), Point3::new(i as f64, -1.5 * i as f64, 2.25));
        }
        let mut residue = Residue::with_id("LIG", 7);
        residue.add_atom(0);
        residue.add_atom(1);
        residue.set("chainid", "AB");
        frame.add_residue(residue).unwrap();
        frame.add_bond(0, 1, BondOrder::Double).unwrap();
        frame.add_bond(1, 2, BondOrder::Single).unwrap();

        let (sink, messages) = DiagnosticSink::collecting();
        let context = FormatContext {
            diagnostics: &sink,
            templates: ResidueTemplates::standard(),
        };
        let mut format = PdbFormat::default();
        let mut out = TextWriter::in_memory("out.pdb");
        format.write_next(&mut out, &frame, &context).unwrap();
        format.write_next(&mut out, &frame, &context).unwrap();
        format.finish(&mut out).unwrap();
        let text = out.contents();
        assert!(text.ends_with("ENDMDL\nEND\n"));
        assert_eq!(messages.lock().unwrap().len(), 4, "chain id truncated for two atoms in two frames");

        let (frames, _) = read_all(&text);
        assert_eq!(frames.len(), 2);
        let back = &frames[1];
        assert_eq!(back.size(), 3);
        assert_eq!(back.topology().bonds().collect::<Vec<_>>(), vec![[0, 1], [1, 2]]);
        let lengths = back.cell.lengths();
        let angles = back.cell.angles();
        for (value, expected) in lengths.iter().zip([15.0, 16.0, 17.0]) {
            assert!((value - expected).abs() < 1e-3);
        }
        for (value, expected) in angles.iter().zip([80.0, 90.0, 120.0]) {
            assert!((value - expected).abs() < 1e-2);
        }
        assert_eq!(back.topology().residues()[0].chain_id(), Some("A"));
        assert_eq!(back.topology().residues()[0].id, Some(7));
    }

    #[test]
    fn coordinates_too_wide_are_an_error() {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("C"), Point3::new(123456.0, 0.0, 0.0));
        let sink = DiagnosticSink::silent();
        let context = FormatContext {
            diagnostics: &sink,
            templates: ResidueTemplates::standard(),
        };
        let mut out = TextWriter::in_memory("out.pdb");
        let error = PdbFormat::default().write_next(&mut out, &frame, &context).unwrap_err();
        assert!(matches!(error, FormatError::ValueTooWide { .. }));
    }

    #[test]
    fn inverted_and_mismatched_ranges_are_reported() {
        let content = "\
SHEET    1   A 2 ALA A  10  ALA A   5  0
TURN     1 T1  ALA A   1  ALA B   3  TURN
ATOM      1  CA  ALA A   5       0.000   0.000   0.000  1.00  0.00           C
END
";
        let (frames, messages) = read_all(content);
        assert!(frames[0].topology().residues()[0].get(SECONDARY_STRUCTURE).is_none());
        assert!(messages.iter().any(|m| m.contains("ends before it starts")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("TURN chain A and B")), "{messages:?}");
    }
}
