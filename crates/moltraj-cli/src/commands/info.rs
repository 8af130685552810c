use crate::cli::InfoArgs;
use crate::config::{InfoConfig, PartialConfig};
use crate::error::Result;
use crate::logging::diagnostic_sink;
use moltraj::core::topology::registry::ResidueTemplates;
use moltraj::engine::config::OpenOptions;
use moltraj::engine::error::EngineError;
use moltraj::workflows::inspect::{self, TrajectorySummary};
use std::fmt::Write;
use tracing::info;

pub fn run(args: InfoArgs) -> Result<()> {
    let config = PartialConfig::load(args.config.as_deref())?.merge_with_info_args(&args)?;
    let options = open_options(&config)?;

    info!("Inspecting {:?}", &config.input);
    let summary = inspect::run(&config.input, &options)?;
    print!("{}", render(&summary));
    Ok(())
}

fn open_options(config: &InfoConfig) -> Result<OpenOptions> {
    let mut templates = ResidueTemplates::standard().clone();
    if let Some(path) = &config.templates {
        templates.extend(ResidueTemplates::load(path).map_err(EngineError::from)?);
    }
    let mut builder = OpenOptions::builder().diagnostics(diagnostic_sink()).templates(templates);
    if let Some(format) = config.format {
        builder = builder.format(format);
    }
    Ok(builder.build())
}

fn render(summary: &TrajectorySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Format: {}", summary.format);
    let _ = writeln!(out, "Steps:  {}", summary.steps.len());
    if summary.steps.is_empty() {
        return out;
    }
    let _ = writeln!(
        out,
        "\n{:>6}  {:>8}  {:>8}  {:>8}  {:<30}  {}",
        "step", "atoms", "bonds", "residues", "cell (a, b, c)", "name"
    );
    for step in &summary.steps {
        let [a, b, c] = step.cell_lengths;
        let cell = format!("{a:.3}, {b:.3}, {c:.3} ({:?})", step.cell);
        let _ = writeln!(
            out,
            "{:>6}  {:>8}  {:>8}  {:>8}  {:<30}  {}",
            step.step,
            step.atoms,
            step.bonds,
            step.residues,
            cell,
            step.name.as_deref().unwrap_or("")
        );
    }
    out
}
