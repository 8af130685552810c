use super::config::OpenOptions;
use super::error::EngineError;
use super::step_reader::StepReader;
use super::writer::FrameWriter;
use crate::core::io::file::{TextFile, TextWriter};
use crate::core::io::format::FormatKind;
use crate::core::models::frame::Frame;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown open mode '{0}', expected 'r', 'w' or 'a'")]
pub struct ParseOpenModeError(String);

impl FromStr for OpenMode {
    type Err = ParseOpenModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "a" => Ok(Self::Append),
            _ => Err(ParseOpenModeError(s.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
        })
    }
}

#[derive(Debug)]
enum Handle {
    Reader(StepReader),
    Writer(FrameWriter),
}

/// One open trajectory file, for reading or for writing.
#[derive(Debug)]
pub struct Trajectory {
    path: PathBuf,
    mode: OpenMode,
    format: FormatKind,
    handle: Handle,
}

impl Trajectory {
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, EngineError> {
        Self::open_with(path, mode, OpenOptions::default())
    }

    /// Opens `path`, using the format hint of `options` or the file extension.
    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, options: OpenOptions) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let format = match options.format {
            Some(format) => format,
            None => FormatKind::from_path(&path).ok_or_else(|| EngineError::UnknownFormat { path: path.clone() })?,
        };
        if mode == OpenMode::Append && !format.supports_append() {
            return Err(EngineError::AppendUnsupported { format });
        }

        let handle = match mode {
            OpenMode::Read => Handle::Reader(StepReader::new(
                TextFile::open(&path)?,
                format.create(),
                options.diagnostics,
                options.templates,
            )),
            OpenMode::Write | OpenMode::Append => Handle::Writer(FrameWriter::new(
                TextWriter::create(&path, mode == OpenMode::Append)?,
                format.create(),
                options.diagnostics,
                options.templates,
            )),
        };
        debug!(path = %path.display(), %format, %mode, "Opened trajectory.");
        Ok(Self {
            path,
            mode,
            format,
            handle,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn format(&self) -> FormatKind {
        self.format
    }

    pub fn read(&mut self) -> Result<Frame, EngineError> {
        self.reader("read")?.read()
    }

    pub fn read_step(&mut self, step: usize) -> Result<Frame, EngineError> {
        self.reader("read")?.read_step(step)
    }

    pub fn step_count(&mut self) -> Result<usize, EngineError> {
        self.reader("count the steps of")?.step_count()
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), EngineError> {
        match &mut self.handle {
            Handle::Writer(writer) => writer.write(frame),
            Handle::Reader(_) => Err(EngineError::InvalidMode {
                operation: "write to",
                mode: self.mode,
            }),
        }
    }

    /// Closes the file, writing the format trailer when it was opened for writing.
    pub fn close(self) -> Result<(), EngineError> {
        match self.handle {
            Handle::Writer(writer) => writer.finish(),
            Handle::Reader(_) => Ok(()),
        }
    }

    fn reader(&mut self, operation: &'static str) -> Result<&mut StepReader, EngineError> {
        match &mut self.handle {
            Handle::Reader(reader) => Ok(reader),
            Handle::Writer(_) => Err(EngineError::InvalidMode {
                operation,
                mode: self.mode,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::DiagnosticSink;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::UnitCell;
    use crate::core::models::residue::Residue;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;
    use std::collections::BTreeSet;

    fn methanol(cell: UnitCell) -> Frame {
        let mut frame = Frame::new();
        frame.cell = cell;
        frame.set("name", "methanol");
        let atoms = [
            ("C1", "C", [1.000, 1.100, 1.200]),
            ("O1", "O", [2.400, 1.100, 1.200]),
            ("H1", "H", [0.640, 2.100, 1.200]),
            ("H2", "H", [2.720, 2.000, 1.200]),
        ];
        let mut residue = Residue::with_id("MOH", 1);
        residue.set("chainid", "A");
        for (index, (name, kind, [x, y, z])) in atoms.into_iter().enumerate() {
            frame.add_atom(Atom::with_kind(name, kind), Point3::new(x, y, z));
            residue.add_atom(index);
        }
        frame.add_residue(residue).unwrap();
        frame.add_bond(0, 1, BondOrder::Single).unwrap();
        frame.add_bond(0, 2, BondOrder::Single).unwrap();
        frame.add_bond(1, 3, BondOrder::Single).unwrap();
        frame
    }

    fn bond_set(frame: &Frame) -> BTreeSet<[usize; 2]> {
        frame.topology().bonds().collect()
    }

    fn options(format: Option<FormatKind>) -> OpenOptions {
        OpenOptions::builder().diagnostics(DiagnosticSink::silent()).build().with_format(format)
    }

    fn round_trip(file_name: &str, format: Option<FormatKind>, frame: &Frame) -> Frame {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        let mut output = Trajectory::open_with(&path, OpenMode::Write, options(format)).unwrap();
        output.write(frame).unwrap();
        output.close().unwrap();

        let mut input = Trajectory::open_with(&path, OpenMode::Read, options(format)).unwrap();
        assert_eq!(input.step_count().unwrap(), 1, "{file_name}");
        input.read_step(0).unwrap()
    }

    #[test]
    fn every_format_round_trips_atoms_bonds_and_cell() {
        let cell = UnitCell::from_lengths_angles([10.0, 12.0, 14.0], [90.0, 90.0, 90.0]);
        let frame = methanol(cell);
        let cases = [
            ("out.pdb", None, true, true),
            ("out.gro", None, false, true),
            ("out.sdf", None, true, false),
            ("out.mol2", None, true, true),
            ("out.bgf", None, true, true),
            ("out.cssr", None, true, true),
            ("out.data", Some(FormatKind::LammpsData), true, true),
        ];
        for (file_name, format, has_bonds, has_cell) in cases {
            let back = round_trip(file_name, format, &frame);
            assert_eq!(back.size(), frame.size(), "{file_name}");
            if has_bonds {
                assert_eq!(bond_set(&back), bond_set(&frame), "{file_name}");
            }
            if has_cell {
                for (expected, found) in frame.cell.lengths().iter().zip(back.cell.lengths()) {
                    assert!((expected - found).abs() < 1e-3, "{file_name}: {expected} != {found}");
                }
                for (expected, found) in frame.cell.angles().iter().zip(back.cell.angles()) {
                    assert!((expected - found).abs() < 1e-2, "{file_name}: {expected} != {found}");
                }
            }
            for (expected, found) in frame.positions().iter().zip(back.positions()) {
                assert!((expected - found).norm() < 2e-2, "{file_name}");
            }
        }
    }

    #[test]
    fn gzip_files_round_trip() {
        let cell = UnitCell::from_lengths_angles([20.0, 20.0, 20.0], [90.0, 90.0, 90.0]);
        let frame = methanol(cell);
        let back = round_trip("methanol.pdb.gz", None, &frame);
        assert_eq!(back.size(), 4);
        assert_eq!(bond_set(&back), bond_set(&frame));
        assert_eq!(back.cell.lengths(), [20.0, 20.0, 20.0]);
    }

    #[test]
    fn append_adds_steps_to_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.gro");
        let frame = methanol(UnitCell::orthorhombic(10.0, 10.0, 10.0));
        for mode in [OpenMode::Write, OpenMode::Append] {
            let mut output = Trajectory::open_with(&path, mode, options(None)).unwrap();
            output.write(&frame).unwrap();
            output.write(&frame).unwrap();
            output.close().unwrap();
        }
        let mut input = Trajectory::open_with(&path, OpenMode::Read, options(None)).unwrap();
        assert_eq!(input.step_count().unwrap(), 4);
        assert!(matches!(
            input.read_step(4),
            Err(EngineError::StepOutOfRange { step: 4, last: 3, .. })
        ));
    }

    #[test]
    fn single_frame_formats_can_not_be_appended_to() {
        let dir = tempfile::tempdir().unwrap();
        let cssr = Trajectory::open_with(dir.path().join("a.cssr"), OpenMode::Append, options(None));
        assert!(matches!(cssr, Err(EngineError::AppendUnsupported { format: FormatKind::Cssr })));
        let lammps = Trajectory::open_with(
            dir.path().join("a.data"),
            OpenMode::Append,
            options(Some(FormatKind::LammpsData)),
        );
        assert!(matches!(lammps, Err(EngineError::AppendUnsupported { .. })));
    }

    #[test]
    fn operations_must_match_the_open_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modes.pdb");
        let mut output = Trajectory::open_with(&path, OpenMode::Write, options(None)).unwrap();
        assert!(matches!(output.read(), Err(EngineError::InvalidMode { mode: OpenMode::Write, .. })));
        assert!(matches!(output.step_count(), Err(EngineError::InvalidMode { .. })));
        output.write(&methanol(UnitCell::infinite())).unwrap();
        output.close().unwrap();

        let mut input = Trajectory::open_with(&path, OpenMode::Read, options(None)).unwrap();
        let frame = input.read().unwrap();
        assert!(matches!(input.write(&frame), Err(EngineError::InvalidMode { mode: OpenMode::Read, .. })));
        assert!(matches!(input.read(), Err(EngineError::EndOfTrajectory { .. })));
    }

    #[test]
    fn unknown_extensions_need_a_format_hint() {
        let dir = tempfile::tempdir().unwrap();
        let result = Trajectory::open_with(dir.path().join("file.xyz"), OpenMode::Write, options(None));
        assert!(matches!(result, Err(EngineError::UnknownFormat { .. })));
    }

    #[test]
    fn open_modes_parse_from_single_letters() {
        assert_eq!("r".parse::<OpenMode>(), Ok(OpenMode::Read));
        assert_eq!("w".parse::<OpenMode>(), Ok(OpenMode::Write));
        assert_eq!("a".parse::<OpenMode>(), Ok(OpenMode::Append));
        assert!("rw".parse::<OpenMode>().is_err());
    }
}
