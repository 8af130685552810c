use thiserror::Error;

use super::config::ConfigError;
use super::trajectory::OpenMode;
use crate::core::io::error::FormatError;
use crate::core::io::format::{FormatKind, UnknownFormatError};
use crate::core::topology::registry::TemplateLoadError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("could not guess the format of '{path}' from its extension, please give a format name", path = path.display())]
    UnknownFormat { path: PathBuf },

    #[error(transparent)]
    UnknownFormatName(#[from] UnknownFormatError),

    #[error("the {format} format does not support append mode")]
    AppendUnsupported { format: FormatKind },

    #[error("can not {operation} a trajectory opened in {mode} mode")]
    InvalidMode {
        operation: &'static str,
        mode: OpenMode,
    },

    #[error("can not read step {step} from '{path}': the file contains no steps", path = path.display())]
    NoSteps { path: PathBuf, step: usize },

    #[error("step {step} is out of bounds for '{path}': the last step is {last}", path = path.display())]
    StepOutOfRange {
        path: PathBuf,
        step: usize,
        last: usize,
    },

    #[error("no more steps to read in '{path}'", path = path.display())]
    EndOfTrajectory { path: PathBuf },

    #[error("inconsistent frame index for '{path}': offset {offset} found after offset {previous}", path = path.display())]
    CorruptIndex {
        path: PathBuf,
        offset: u64,
        previous: u64,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Templates(#[from] TemplateLoadError),
}
