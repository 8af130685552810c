use super::error::FormatResult;
use super::file::{TextFile, TextWriter};
use super::format::FormatKind;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::models::frame::Frame;
use crate::core::topology::registry::ResidueTemplates;

/// Collaborators shared by every read and write of one open file.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub diagnostics: &'a DiagnosticSink,
    pub templates: &'a ResidueTemplates,
}

/// Defines the interface for one text grammar of trajectory frames.
///
/// A format object lives as long as the open file, so writers can keep state
/// between frames (model numbers, whether a trailer is due).
pub trait FrameFormat: Send {
    fn kind(&self) -> FormatKind;

    /// Skips exactly one frame from the current position.
    ///
    /// # Return
    ///
    /// The byte offset where the skipped frame starts, or `None` at a clean
    /// end of file.
    ///
    /// # Errors
    ///
    /// Fails when the file ends in the middle of a frame or a count field
    /// needed to find the end of the frame is malformed.
    fn forward(&mut self, file: &mut TextFile) -> FormatResult<Option<u64>>;

    /// Parses one frame starting at the current position.
    fn read_next(&mut self, file: &mut TextFile, context: &FormatContext) -> FormatResult<Frame>;

    /// Writes one frame at the end of the output.
    fn write_next(
        &mut self,
        out: &mut TextWriter,
        frame: &Frame,
        context: &FormatContext,
    ) -> FormatResult<()>;

    /// Writes whatever trailer the grammar needs once all frames are written.
    fn finish(&mut self, _out: &mut TextWriter) -> FormatResult<()> {
        Ok(())
    }
}
