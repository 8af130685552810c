use crate::cli::{ConvertArgs, InfoArgs};
use crate::error::{CliError, Result};
use moltraj::core::io::format::FormatKind;
use moltraj::engine::config::{ConvertConfig, ConvertConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialInputConfig {
    format: Option<String>,
    templates: Option<PathBuf>,
    first_step: Option<usize>,
    last_step: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOutputConfig {
    format: Option<String>,
}

/// Settings read from a configuration file. Every value can be overridden on
/// the command line.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(default)]
    input: PartialInputConfig,
    #[serde(default)]
    output: PartialOutputConfig,
}

/// Settings of the `info` command after merging the file and the arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoConfig {
    pub input: PathBuf,
    pub format: Option<FormatKind>,
    pub templates: Option<PathBuf>,
}

fn parse_format(name: Option<&str>, key: &str) -> Result<Option<FormatKind>> {
    name.map(|name| {
        name.parse::<FormatKind>()
            .map_err(|e| CliError::Config(format!("invalid value for '{key}': {e}")))
    })
    .transpose()
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file when a path is given, and returns empty settings otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_with_info_args(self, args: &InfoArgs) -> Result<InfoConfig> {
        Ok(InfoConfig {
            input: args.input.clone(),
            format: match args.format {
                Some(format) => Some(format),
                None => parse_format(self.input.format.as_deref(), "input.format")?,
            },
            templates: args.templates.clone().or(self.input.templates),
        })
    }

    pub fn merge_with_convert_args(self, args: &ConvertArgs) -> Result<ConvertConfig> {
        let mut builder = ConvertConfigBuilder::new()
            .input(args.input.clone())
            .output(args.output.clone());

        let input_format = match args.input_format {
            Some(format) => Some(format),
            None => parse_format(self.input.format.as_deref(), "input.format")?,
        };
        if let Some(format) = input_format {
            builder = builder.input_format(format);
        }
        let output_format = match args.output_format {
            Some(format) => Some(format),
            None => parse_format(self.output.format.as_deref(), "output.format")?,
        };
        if let Some(format) = output_format {
            builder = builder.output_format(format);
        }
        if let Some(first) = args.first.or(self.input.first_step) {
            builder = builder.first_step(first);
        }
        if let Some(last) = args.last.or(self.input.last_step) {
            builder = builder.last_step(last);
        }
        if let Some(templates) = args.templates.clone().or(self.input.templates) {
            builder = builder.templates_path(templates);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltraj::engine::config::StepRange;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn convert_args() -> ConvertArgs {
        ConvertArgs {
            input: "in.data".into(),
            output: "out.pdb".into(),
            input_format: None,
            output_format: None,
            first: None,
            last: Some(8),
            templates: None,
            config: None,
        }
    }

    #[test]
    fn file_values_fill_what_the_arguments_leave_out() {
        let file = config_file(
            r#"
[input]
format = "lammps data"
templates = "ligands.toml"
first-step = 2
last-step = 4

[output]
format = "bgf"
"#,
        );
        let config = PartialConfig::from_file(file.path())
            .unwrap()
            .merge_with_convert_args(&convert_args())
            .unwrap();
        assert_eq!(config.input_format, Some(FormatKind::LammpsData));
        assert_eq!(config.output_format, Some(FormatKind::Bgf));
        assert_eq!(config.steps, StepRange { first: 2, last: Some(8) });
        assert_eq!(config.templates_path, Some(PathBuf::from("ligands.toml")));
    }

    #[test]
    fn arguments_override_the_file() {
        let file = config_file("[input]\nformat = \"pdb\"\n");
        let mut args = convert_args();
        args.input_format = Some(FormatKind::Gro);
        let config = PartialConfig::from_file(file.path())
            .unwrap()
            .merge_with_convert_args(&args)
            .unwrap();
        assert_eq!(config.input_format, Some(FormatKind::Gro));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = config_file("[input]\nformats = \"pdb\"\n");
        let result = PartialConfig::from_file(file.path());
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn invalid_format_names_are_configuration_errors() {
        let file = config_file("[output]\nformat = \"xyz\"\n");
        let result = PartialConfig::from_file(file.path())
            .unwrap()
            .merge_with_convert_args(&convert_args());
        assert!(matches!(result, Err(CliError::Config(message)) if message.contains("output.format")));
    }

    #[test]
    fn inverted_step_ranges_are_configuration_errors() {
        let mut args = convert_args();
        args.first = Some(9);
        let result = PartialConfig::default().merge_with_convert_args(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn missing_files_report_their_path() {
        let result = PartialConfig::from_file(Path::new("/no/such/moltraj.toml"));
        assert!(matches!(result, Err(CliError::FileParsing { path, .. }) if path.ends_with("moltraj.toml")));
    }

    #[test]
    fn info_settings_merge_the_same_way() {
        let file = config_file("[input]\nformat = \"sdf\"\ntemplates = \"extra.toml\"\n");
        let args = InfoArgs {
            input: "mol.txt".into(),
            format: None,
            templates: None,
            config: None,
        };
        let config = PartialConfig::load(Some(file.path()))
            .unwrap()
            .merge_with_info_args(&args)
            .unwrap();
        assert_eq!(config.format, Some(FormatKind::Sdf));
        assert_eq!(config.templates, Some(PathBuf::from("extra.toml")));
    }
}
