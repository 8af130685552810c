use crate::core::diagnostics::DiagnosticSink;
use crate::core::io::format::FormatKind;
use crate::core::topology::registry::ResidueTemplates;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid step range: first step {first} is after last step {last}")]
    InvalidStepRange { first: usize, last: usize },
}

/// Collaborators shared by the files opened with these options.
///
/// Every handle opened with the same options (or clones of them) shares the
/// same diagnostic sink, so replacing its callback affects all of them.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub format: Option<FormatKind>,
    pub diagnostics: DiagnosticSink,
    pub templates: Arc<ResidueTemplates>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            format: None,
            diagnostics: DiagnosticSink::default(),
            templates: Arc::new(ResidueTemplates::standard().clone()),
        }
    }
}

impl OpenOptions {
    pub fn builder() -> OpenOptionsBuilder {
        OpenOptionsBuilder::new()
    }

    /// The same collaborators with a different format hint.
    pub fn with_format(&self, format: Option<FormatKind>) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}

#[derive(Default)]
pub struct OpenOptionsBuilder {
    format: Option<FormatKind>,
    diagnostics: Option<DiagnosticSink>,
    templates: Option<Arc<ResidueTemplates>>,
}

impl OpenOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }
    pub fn diagnostics(mut self, diagnostics: DiagnosticSink) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
    pub fn templates(mut self, templates: ResidueTemplates) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }

    pub fn build(self) -> OpenOptions {
        let defaults = OpenOptions::default();
        OpenOptions {
            format: self.format,
            diagnostics: self.diagnostics.unwrap_or(defaults.diagnostics),
            templates: self.templates.unwrap_or(defaults.templates),
        }
    }
}

/// Inclusive range of steps; `last: None` runs to the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepRange {
    pub first: usize,
    pub last: Option<usize>,
}

impl StepRange {
    /// The steps of this range that exist in a file with `count` steps.
    pub fn clamp(&self, count: usize) -> std::ops::Range<usize> {
        let end = self.last.map_or(count, |last| count.min(last + 1));
        self.first.min(end)..end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_format: Option<FormatKind>,
    pub output_format: Option<FormatKind>,
    pub steps: StepRange,
    pub templates_path: Option<PathBuf>,
}

#[derive(Default)]
pub struct ConvertConfigBuilder {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    input_format: Option<FormatKind>,
    output_format: Option<FormatKind>,
    first_step: Option<usize>,
    last_step: Option<usize>,
    templates_path: Option<PathBuf>,
}

impl ConvertConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, path: PathBuf) -> Self {
        self.input = Some(path);
        self
    }
    pub fn output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }
    pub fn input_format(mut self, format: FormatKind) -> Self {
        self.input_format = Some(format);
        self
    }
    pub fn output_format(mut self, format: FormatKind) -> Self {
        self.output_format = Some(format);
        self
    }
    pub fn first_step(mut self, step: usize) -> Self {
        self.first_step = Some(step);
        self
    }
    pub fn last_step(mut self, step: usize) -> Self {
        self.last_step = Some(step);
        self
    }
    pub fn templates_path(mut self, path: PathBuf) -> Self {
        self.templates_path = Some(path);
        self
    }

    pub fn build(self) -> Result<ConvertConfig, ConfigError> {
        let steps = StepRange {
            first: self.first_step.unwrap_or(0),
            last: self.last_step,
        };
        if let Some(last) = steps.last {
            if steps.first > last {
                return Err(ConfigError::InvalidStepRange {
                    first: steps.first,
                    last,
                });
            }
        }
        Ok(ConvertConfig {
            input: self.input.ok_or(ConfigError::MissingParameter("input"))?,
            output: self.output.ok_or(ConfigError::MissingParameter("output"))?,
            input_format: self.input_format,
            output_format: self.output_format,
            steps,
            templates_path: self.templates_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_builder_requires_both_paths() {
        let missing_output = ConvertConfigBuilder::new().input("in.pdb".into()).build();
        assert_eq!(missing_output, Err(ConfigError::MissingParameter("output")));

        let missing_input = ConvertConfigBuilder::new().output("out.gro".into()).build();
        assert_eq!(missing_input, Err(ConfigError::MissingParameter("input")));
    }

    #[test]
    fn convert_builder_keeps_every_setting() {
        let config = ConvertConfigBuilder::new()
            .input("in.data".into())
            .output("out.pdb.gz".into())
            .input_format(FormatKind::LammpsData)
            .first_step(2)
            .last_step(5)
            .templates_path("ligands.toml".into())
            .build()
            .unwrap();
        assert_eq!(config.input_format, Some(FormatKind::LammpsData));
        assert_eq!(config.output_format, None);
        assert_eq!(config.steps, StepRange { first: 2, last: Some(5) });
        assert_eq!(config.templates_path, Some(PathBuf::from("ligands.toml")));
    }

    #[test]
    fn inverted_step_ranges_are_rejected() {
        let result = ConvertConfigBuilder::new()
            .input("a.pdb".into())
            .output("b.pdb".into())
            .first_step(4)
            .last_step(1)
            .build();
        assert_eq!(result, Err(ConfigError::InvalidStepRange { first: 4, last: 1 }));
    }

    #[test]
    fn step_ranges_are_clamped_to_the_file() {
        assert_eq!(StepRange::default().clamp(3), 0..3);
        assert_eq!(StepRange { first: 1, last: Some(1) }.clamp(3), 1..2);
        assert_eq!(StepRange { first: 1, last: Some(10) }.clamp(3), 1..3);
        assert_eq!(StepRange { first: 5, last: None }.clamp(3), 3..3);
    }

    #[test]
    fn open_options_builder_overrides_defaults() {
        let options = OpenOptions::builder()
            .format(FormatKind::Gro)
            .templates(ResidueTemplates::new())
            .build();
        assert_eq!(options.format, Some(FormatKind::Gro));
        assert!(options.templates.is_empty());
        assert!(!OpenOptions::default().templates.is_empty());
        assert_eq!(options.with_format(None).format, None);
    }
}
