use super::bgf::BgfFormat;
use super::cssr::CssrFormat;
use super::file::is_gzip;
use super::gro::GroFormat;
use super::lammps::LammpsDataFormat;
use super::mol2::Mol2Format;
use super::pdb::PdbFormat;
use super::sdf::SdfFormat;
use super::traits::FrameFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Pdb,
    Gro,
    Sdf,
    Mol2,
    Bgf,
    Cssr,
    LammpsData,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown format '{0}'")]
pub struct UnknownFormatError(pub String);

impl FormatKind {
    pub const ALL: [FormatKind; 7] = [
        Self::Pdb,
        Self::Gro,
        Self::Sdf,
        Self::Mol2,
        Self::Bgf,
        Self::Cssr,
        Self::LammpsData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pdb => "PDB",
            Self::Gro => "GRO",
            Self::Sdf => "SDF",
            Self::Mol2 => "MOL2",
            Self::Bgf => "BGF",
            Self::Cssr => "CSSR",
            Self::LammpsData => "LAMMPS Data",
        }
    }

    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Pdb => Some("pdb"),
            Self::Gro => Some("gro"),
            Self::Sdf => Some("sdf"),
            Self::Mol2 => Some("mol2"),
            Self::Bgf => Some("bgf"),
            Self::Cssr => Some("cssr"),
            Self::LammpsData => None,
        }
    }

    /// Guesses the format from the file extension, looking through `.gz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = if is_gzip(path) {
            Path::new(path.file_stem()?)
        } else {
            path
        };
        let extension = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|kind| {
            kind.extension()
                .is_some_and(|known| known.eq_ignore_ascii_case(extension))
        })
    }

    /// Single-frame formats hold exactly one frame and can not be appended to.
    pub fn is_single_frame(self) -> bool {
        matches!(self, Self::Cssr | Self::LammpsData)
    }

    pub fn supports_append(self) -> bool {
        !self.is_single_frame()
    }

    pub fn create(self) -> Box<dyn FrameFormat> {
        match self {
            Self::Pdb => Box::new(PdbFormat::default()),
            Self::Gro => Box::new(GroFormat),
            Self::Sdf => Box::new(SdfFormat),
            Self::Mol2 => Box::new(Mol2Format),
            Self::Bgf => Box::new(BgfFormat),
            Self::Cssr => Box::new(CssrFormat::default()),
            Self::LammpsData => Box::new(LammpsDataFormat::default()),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatKind {
    type Err = UnknownFormatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(wanted)
                    || kind
                        .extension()
                        .is_some_and(|extension| extension.eq_ignore_ascii_case(wanted))
            })
            .or_else(|| {
                matches!(wanted.to_lowercase().as_str(), "lammps" | "lammps-data" | "lammps_data")
                    .then_some(Self::LammpsData)
            })
            .ok_or_else(|| UnknownFormatError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_uses_the_extension_and_looks_through_gzip() {
        assert_eq!(FormatKind::from_path(Path::new("a/b.pdb")), Some(FormatKind::Pdb));
        assert_eq!(FormatKind::from_path(Path::new("x.MOL2")), Some(FormatKind::Mol2));
        assert_eq!(FormatKind::from_path(Path::new("x.gro.gz")), Some(FormatKind::Gro));
        assert_eq!(FormatKind::from_path(Path::new("data.lmp")), None);
        assert_eq!(FormatKind::from_path(Path::new("noextension")), None);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("lammps data".parse::<FormatKind>(), Ok(FormatKind::LammpsData));
        assert_eq!("LAMMPS".parse::<FormatKind>(), Ok(FormatKind::LammpsData));
        assert_eq!("Pdb".parse::<FormatKind>(), Ok(FormatKind::Pdb));
        assert_eq!("sdf".parse::<FormatKind>(), Ok(FormatKind::Sdf));
        assert!("XYZ".parse::<FormatKind>().is_err());
    }

    #[test]
    fn single_frame_formats_reject_append() {
        assert!(!FormatKind::Cssr.supports_append());
        assert!(!FormatKind::LammpsData.supports_append());
        assert!(FormatKind::Pdb.supports_append());
        assert_eq!(FormatKind::LammpsData.to_string(), "LAMMPS Data");
    }
}
