use clap::{Args, Parser, Subcommand};
use moltraj::core::io::format::FormatKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "moltraj CLI - Inspect and convert text-based molecular trajectory files (PDB, GRO, SDF, MOL2, BGF, CSSR, LAMMPS data).",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output, including file diagnostics
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the format, the number of steps and a summary of every step of a file.
    Info(InfoArgs),
    /// Convert a range of steps from one file into another, possibly in another format.
    Convert(ConvertArgs),
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to the trajectory file (e.g., water.gro, protein.pdb.gz).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Format of the input, when it can not be guessed from the extension
    /// (e.g., 'PDB', 'LAMMPS Data').
    #[arg(short, long, value_name = "NAME")]
    pub format: Option<FormatKind>,

    /// Additional residue bond templates in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub templates: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input trajectory file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Path for the output trajectory file. A `.gz` extension compresses it.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Override the input format guessed from the extension.
    #[arg(long, value_name = "NAME")]
    pub input_format: Option<FormatKind>,

    /// Override the output format guessed from the extension.
    #[arg(long, value_name = "NAME")]
    pub output_format: Option<FormatKind>,

    /// First step to convert (0-based).
    #[arg(long, value_name = "N")]
    pub first: Option<usize>,

    /// Last step to convert (inclusive). Defaults to the last step of the input.
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,

    /// Additional residue bond templates in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub templates: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_arguments_parse_format_names() {
        let cli = Cli::try_parse_from([
            "moltraj",
            "-vv",
            "convert",
            "in.data",
            "out.pdb",
            "--input-format",
            "LAMMPS Data",
            "--first",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Convert(args) = cli.command else {
            panic!("expected the convert command");
        };
        assert_eq!(args.input_format, Some(FormatKind::LammpsData));
        assert_eq!(args.output_format, None);
        assert_eq!(args.first, Some(2));
        assert_eq!(args.last, None);
    }

    #[test]
    fn unknown_format_names_are_rejected() {
        let result = Cli::try_parse_from(["moltraj", "info", "a.txt", "--format", "xyz"]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["moltraj", "-q", "-v", "info", "a.pdb"]);
        assert!(result.is_err());
    }
}
