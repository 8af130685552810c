use crate::cli::ConvertArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::logging::diagnostic_sink;
use crate::utils::progress::CliProgressHandler;
use moltraj::engine::config::OpenOptions;
use moltraj::engine::progress::ProgressReporter;
use moltraj::workflows;
use tracing::info;

pub fn run(args: ConvertArgs) -> Result<()> {
    let config = PartialConfig::load(args.config.as_deref())?.merge_with_convert_args(&args)?;
    let options = OpenOptions::builder().diagnostics(diagnostic_sink()).build();

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the conversion workflow...");
    let summary = workflows::convert::run(&config, &options, &reporter)?;

    println!(
        "✓ Converted {} of {} step(s) from {} to {}: {}",
        summary.steps_written,
        summary.steps_in_input,
        summary.input_format,
        summary.output_format,
        config.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use moltraj::engine::error::EngineError;

    const ETHANE: &str = "\
ethane
 moltraj

  2  1  0     0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5400    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
M  END
$$$$
";

    fn args(dir: &std::path::Path, output: &str) -> ConvertArgs {
        let input = dir.join("ethane.sdf");
        std::fs::write(&input, ETHANE).unwrap();
        ConvertArgs {
            input,
            output: dir.join(output),
            input_format: None,
            output_format: None,
            first: None,
            last: None,
            templates: None,
            config: None,
        }
    }

    #[test]
    fn converts_a_file_into_another_format() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), "ethane.mol2");
        let output = args.output.clone();
        run(args).unwrap();

        let content = std::fs::read_to_string(output).unwrap();
        assert!(content.starts_with("@<TRIPOS>MOLECULE\nethane\n"));
        assert!(content.contains("@<TRIPOS>BOND"));
    }

    #[test]
    fn missing_input_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), "out.pdb");
        args.input = dir.path().join("missing.sdf");
        assert!(matches!(run(args), Err(CliError::Moltraj(EngineError::Format(_)))));
    }
}
