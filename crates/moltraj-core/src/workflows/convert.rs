use crate::core::io::format::FormatKind;
use crate::core::topology::registry::ResidueTemplates;
use crate::engine::config::{ConvertConfig, OpenOptions};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::trajectory::{OpenMode, Trajectory};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub input_format: FormatKind,
    pub output_format: FormatKind,
    pub steps_in_input: usize,
    pub steps_written: usize,
}

/// Loads the templates used to rebuild bonds: the built-in table, with the
/// user table from `config.templates_path` layered on top.
pub fn load_templates(config: &ConvertConfig) -> Result<ResidueTemplates, EngineError> {
    let mut templates = ResidueTemplates::standard().clone();
    if let Some(path) = &config.templates_path {
        let user = ResidueTemplates::load(path)?;
        info!(path = %path.display(), residues = user.len(), "Loaded user residue templates.");
        templates.extend(user);
    }
    Ok(templates)
}

/// Copies the selected steps of `config.input` into `config.output`.
#[instrument(skip_all, name = "convert_workflow", fields(input = %config.input.display(), output = %config.output.display()))]
pub fn run(
    config: &ConvertConfig,
    options: &OpenOptions,
    reporter: &ProgressReporter,
) -> Result<ConvertSummary, EngineError> {
    let options = OpenOptions {
        templates: Arc::new(load_templates(config)?),
        ..options.clone()
    };

    let mut input = Trajectory::open_with(&config.input, OpenMode::Read, options.with_format(config.input_format))?;
    reporter.report(Progress::ScanStart {
        path: config.input.clone(),
    });
    let steps_in_input = input.step_count()?;
    reporter.report(Progress::ScanFinish { steps: steps_in_input });
    info!(steps = steps_in_input, format = %input.format(), "Indexed input trajectory.");

    let range = config.steps.clamp(steps_in_input);
    if range.is_empty() {
        // reports the missing step with the usual out-of-range error
        input.read_step(config.steps.first)?;
    }

    let mut output = Trajectory::open_with(&config.output, OpenMode::Write, options.with_format(config.output_format))?;
    reporter.report(Progress::TaskStart {
        total_steps: range.len() as u64,
    });
    for step in range.clone() {
        let frame = input.read_step(step)?;
        output.write(&frame)?;
        debug!(step, atoms = frame.size(), "Converted step.");
        reporter.report(Progress::TaskIncrement {
            step,
            atoms: frame.size(),
        });
    }
    let summary = ConvertSummary {
        input_format: input.format(),
        output_format: output.format(),
        steps_in_input,
        steps_written: range.len(),
    };
    output.close()?;
    reporter.report(Progress::TaskFinish);

    info!(
        steps = summary.steps_written,
        from = %summary.input_format,
        to = %summary.output_format,
        "Conversion finished."
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::DiagnosticSink;
    use crate::engine::config::ConvertConfigBuilder;
    use std::path::Path;
    use std::sync::Mutex;

    const TWO_WATERS: &str = "\
water 0
    3
    1SOL     OW    1   0.126   1.624   1.679
    1SOL    HW1    2   0.190   1.661   1.747
    1SOL    HW2    3   0.177   1.568   1.613
   1.86206   1.86206   1.86206
water 1
    3
    1SOL     OW    1   0.130   1.624   1.679
    1SOL    HW1    2   0.194   1.661   1.747
    1SOL    HW2    3   0.181   1.568   1.613
   1.86206   1.86206   1.86206
water 2
    3
    1SOL     OW    1   0.134   1.624   1.679
    1SOL    HW1    2   0.198   1.661   1.747
    1SOL    HW2    3   0.185   1.568   1.613
   1.86206   1.86206   1.86206
";

    fn options() -> OpenOptions {
        OpenOptions::builder().diagnostics(DiagnosticSink::silent()).build()
    }

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("water.gro");
        std::fs::write(&path, TWO_WATERS).unwrap();
        path
    }

    #[test]
    fn converts_the_selected_steps_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConvertConfigBuilder::new()
            .input(write_input(dir.path()))
            .output(dir.path().join("water.pdb"))
            .first_step(1)
            .build()
            .unwrap();

        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TaskIncrement { step, .. } = event {
                events.lock().unwrap().push(step);
            }
        }));
        let summary = run(&config, &options(), &reporter).unwrap();
        drop(reporter);

        assert_eq!(summary.steps_in_input, 3);
        assert_eq!(summary.steps_written, 2);
        assert_eq!(summary.output_format, FormatKind::Pdb);
        assert_eq!(events.into_inner().unwrap(), vec![1, 2]);

        let mut output = Trajectory::open_with(&config.output, OpenMode::Read, options()).unwrap();
        assert_eq!(output.step_count().unwrap(), 2);
        let first = output.read_step(0).unwrap();
        assert!((first.positions()[0].x - 1.30).abs() < 1e-6);
    }

    #[test]
    fn a_first_step_past_the_end_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConvertConfigBuilder::new()
            .input(write_input(dir.path()))
            .output(dir.path().join("water.sdf"))
            .first_step(7)
            .build()
            .unwrap();
        let result = run(&config, &options(), &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::StepOutOfRange { step: 7, last: 2, .. })));
        assert!(!dir.path().join("water.sdf").exists());
    }

    #[test]
    fn user_templates_are_layered_on_the_built_in_ones() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("ligands.toml");
        std::fs::write(&templates, "[LIG]\nbonds = [[\"C1\", \"O1\"]]\n").unwrap();
        let config = ConvertConfigBuilder::new()
            .input(write_input(dir.path()))
            .output(dir.path().join("out.pdb"))
            .templates_path(templates)
            .build()
            .unwrap();
        let loaded = load_templates(&config).unwrap();
        assert!(loaded.contains("LIG"));
        assert!(loaded.contains("ALA"));
    }
}
