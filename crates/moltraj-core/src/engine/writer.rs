use super::error::EngineError;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::io::file::TextWriter;
use crate::core::io::format::FormatKind;
use crate::core::io::traits::{FormatContext, FrameFormat};
use crate::core::models::frame::Frame;
use crate::core::topology::registry::ResidueTemplates;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Sequential writer of frames to one file.
///
/// [`finish`](Self::finish) writes the format trailer and flushes the file.
/// A writer dropped without being finished does it on a best-effort basis and
/// reports failures through the diagnostic sink.
pub struct FrameWriter {
    out: TextWriter,
    format: Box<dyn FrameFormat>,
    diagnostics: DiagnosticSink,
    templates: Arc<ResidueTemplates>,
    steps: usize,
    finished: bool,
}

impl FrameWriter {
    pub fn new(
        out: TextWriter,
        format: Box<dyn FrameFormat>,
        diagnostics: DiagnosticSink,
        templates: Arc<ResidueTemplates>,
    ) -> Self {
        Self {
            out,
            format,
            diagnostics,
            templates,
            steps: 0,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.out.path()
    }

    pub fn format(&self) -> FormatKind {
        self.format.kind()
    }

    /// Number of frames written through this writer.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), EngineError> {
        let context = FormatContext {
            diagnostics: &self.diagnostics,
            templates: self.templates.as_ref(),
        };
        self.format.write_next(&mut self.out, frame, &context)?;
        self.steps += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), EngineError> {
        self.complete()
    }

    fn complete(&mut self) -> Result<(), EngineError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.format.finish(&mut self.out)?;
        self.out.finish()?;
        debug!(
            path = %self.out.path().display(),
            steps = self.steps,
            bytes = self.out.written(),
            "Finished writing trajectory."
        );
        Ok(())
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            self.diagnostics
                .warn(self.out.path().display(), format!("failed to finish the file: {e}"));
        }
    }
}

impl std::fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("out", &self.out)
            .field("format", &self.format.kind())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
