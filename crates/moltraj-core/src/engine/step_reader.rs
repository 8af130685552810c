use super::error::EngineError;
use super::index::{FrameIndex, NonMonotonicOffset};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::io::file::TextFile;
use crate::core::io::format::FormatKind;
use crate::core::io::traits::{FormatContext, FrameFormat};
use crate::core::models::frame::Frame;
use crate::core::topology::registry::ResidueTemplates;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Indexed and sequential access to the frames of one file.
///
/// The frame index is built lazily: sequential reads record the offset of
/// every frame they parse, and a full forward scan only happens when a step
/// past the discovered range is requested or the step count is needed.
pub struct StepReader {
    file: TextFile,
    format: Box<dyn FrameFormat>,
    index: FrameIndex,
    diagnostics: DiagnosticSink,
    templates: Arc<ResidueTemplates>,
    scans: usize,
}

impl StepReader {
    pub fn new(
        file: TextFile,
        format: Box<dyn FrameFormat>,
        diagnostics: DiagnosticSink,
        templates: Arc<ResidueTemplates>,
    ) -> Self {
        Self {
            file,
            format,
            index: FrameIndex::new(),
            diagnostics,
            templates,
            scans: 0,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn format(&self) -> FormatKind {
        self.format.kind()
    }

    pub fn index(&self) -> &FrameIndex {
        &self.index
    }

    /// Number of full forward scans performed so far (at most one).
    pub fn scans(&self) -> usize {
        self.scans
    }

    /// Total number of steps in the file, scanning it to the end if needed.
    pub fn step_count(&mut self) -> Result<usize, EngineError> {
        self.scan()?;
        Ok(self.index.len())
    }

    /// Reads the step at `step`, seeking directly to it when its offset is known.
    pub fn read_step(&mut self, step: usize) -> Result<Frame, EngineError> {
        if step >= self.index.len() {
            self.scan()?;
        }
        let Some(offset) = self.index.get(step) else {
            let path = self.path().to_path_buf();
            return Err(match self.index.len() {
                0 => EngineError::NoSteps { path, step },
                count => EngineError::StepOutOfRange {
                    path,
                    step,
                    last: count - 1,
                },
            });
        };
        self.file.seek(offset)?;
        self.parse()
    }

    /// Reads the step starting at the current position.
    pub fn read(&mut self) -> Result<Frame, EngineError> {
        if self.file.at_blank_tail()? {
            return Err(EngineError::EndOfTrajectory {
                path: self.path().to_path_buf(),
            });
        }
        let offset = self.file.tell();
        let frame = self.parse()?;
        self.record(offset)?;
        Ok(frame)
    }

    /// Scans forward from the last known frame to the end of the file. The
    /// position used by [`read`](Self::read) is restored afterwards.
    pub fn scan(&mut self) -> Result<(), EngineError> {
        if self.index.is_complete() {
            return Ok(());
        }
        let resume = self.file.tell();
        let result = self.scan_from_last();
        self.file.seek(resume)?;
        result?;

        self.index.mark_complete();
        self.scans += 1;
        debug!(
            path = %self.path().display(),
            steps = self.index.len(),
            "Frame index complete."
        );
        Ok(())
    }

    fn scan_from_last(&mut self) -> Result<(), EngineError> {
        match self.index.last() {
            Some(last) => {
                self.file.seek(last)?;
                self.format.forward(&mut self.file)?;
            }
            None => self.file.seek(0)?,
        }
        while let Some(offset) = self.format.forward(&mut self.file)? {
            self.record(offset)?;
        }
        Ok(())
    }

    fn record(&mut self, offset: u64) -> Result<(), EngineError> {
        self.index
            .record(offset)
            .map(|_| ())
            .map_err(|NonMonotonicOffset { offset, previous }| EngineError::CorruptIndex {
                path: self.file.path().to_path_buf(),
                offset,
                previous,
            })
    }

    fn parse(&mut self) -> Result<Frame, EngineError> {
        let context = FormatContext {
            diagnostics: &self.diagnostics,
            templates: self.templates.as_ref(),
        };
        Ok(self.format.read_next(&mut self.file, &context)?)
    }
}

impl std::fmt::Debug for StepReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepReader")
            .field("file", &self.file)
            .field("format", &self.format.kind())
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::error::FormatError;

    fn gro(steps: usize) -> String {
        (0..steps)
            .map(|step| {
                format!(
                    "step {step}\n    2\n    1SOL     OW    1{:8.3}   1.624   1.679\n    1SOL    HW1    2   0.190   1.661   1.747\n   1.86206   1.86206   1.86206\n",
                    0.1 * step as f64
                )
            })
            .collect()
    }

    fn reader(content: impl Into<String>) -> StepReader {
        StepReader::new(
            TextFile::from_string("test.gro", content),
            FormatKind::Gro.create(),
            DiagnosticSink::silent(),
            Arc::new(ResidueTemplates::standard().clone()),
        )
    }

    #[test]
    fn indexed_reads_match_sequential_reads_after_one_scan() {
        let mut sequential = reader(gro(4));
        let frames: Vec<Frame> = (0..4).map(|_| sequential.read().unwrap()).collect();
        assert_eq!(sequential.scans(), 0);

        let mut indexed = reader(gro(4));
        assert_eq!(indexed.step_count().unwrap(), 4);
        for step in [3, 0, 2, 1] {
            assert_eq!(indexed.read_step(step).unwrap(), frames[step]);
        }
        assert_eq!(indexed.scans(), 1);
        assert_eq!(frames[2].name(), Some("step 2"));
    }

    #[test]
    fn out_of_range_steps_report_the_last_valid_step() {
        let mut three = reader(gro(3));
        match three.read_step(3) {
            Err(EngineError::StepOutOfRange { step: 3, last: 2, .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(three.read_step(10), Err(EngineError::StepOutOfRange { last: 2, .. })));
        assert_eq!(three.scans(), 1);

        let mut empty = reader("\n\n");
        assert!(matches!(empty.read_step(0), Err(EngineError::NoSteps { step: 0, .. })));
        assert_eq!(empty.step_count().unwrap(), 0);
    }

    #[test]
    fn sequential_reads_grow_the_index_without_scanning() {
        let mut steps = reader(gro(3));
        steps.read().unwrap();
        steps.read().unwrap();
        assert_eq!(steps.index().len(), 2);
        assert!(!steps.index().is_complete());

        assert_eq!(steps.step_count().unwrap(), 3);
        assert_eq!(steps.read().unwrap().name(), Some("step 2"));
        assert!(matches!(steps.read(), Err(EngineError::EndOfTrajectory { .. })));
    }

    #[test]
    fn reading_a_known_step_then_continuing_sequentially() {
        let mut steps = reader(gro(3));
        steps.read().unwrap();
        steps.read().unwrap();
        assert_eq!(steps.read_step(0).unwrap().name(), Some("step 0"));
        assert_eq!(steps.read().unwrap().name(), Some("step 1"));
        assert_eq!(steps.read().unwrap().name(), Some("step 2"));
        assert_eq!(steps.scans(), 0);
    }

    #[test]
    fn truncated_last_frame_fails_the_scan_but_keeps_the_reader_usable() {
        let mut content = gro(2);
        content.push_str("step 2\n    2\n    1SOL     OW    1   0.126   1.624   1.679\n");
        let mut steps = reader(content);
        assert!(matches!(
            steps.step_count(),
            Err(EngineError::Format(FormatError::UnexpectedEof { .. }))
        ));
        assert!(!steps.index().is_complete());
        assert_eq!(steps.read().unwrap().name(), Some("step 0"));
    }
}
