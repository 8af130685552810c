use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const STANDARD_TEMPLATES: &str = include_str!("../../../data/residue-bonds.toml");

/// Atom-name pairs expected to be bonded inside a residue.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ResidueTemplate {
    pub bonds: Vec<(String, String)>,
}

/// Residue bond templates keyed by residue name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidueTemplates {
    templates: HashMap<String, ResidueTemplate>,
}

impl ResidueTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: standard amino acids, nucleotides and water.
    pub fn standard() -> &'static ResidueTemplates {
        static STANDARD: OnceLock<ResidueTemplates> = OnceLock::new();
        STANDARD.get_or_init(|| {
            Self::from_toml_str(STANDARD_TEMPLATES)
                .expect("built-in residue templates must be valid TOML")
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let templates: HashMap<String, ResidueTemplate> = toml::from_str(content)?;
        Ok(Self { templates })
    }

    pub fn load(path: &Path) -> Result<Self, TemplateLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| TemplateLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn get(&self, residue_name: &str) -> Option<&ResidueTemplate> {
        self.templates.get(residue_name)
    }

    pub fn contains(&self, residue_name: &str) -> bool {
        self.templates.contains_key(residue_name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Adds `other`'s templates, replacing those with the same residue name.
    pub fn extend(&mut self, other: ResidueTemplates) {
        self.templates.extend(other.templates);
    }
}

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn standard_templates_cover_amino_acids_nucleotides_and_water() {
        let standard = ResidueTemplates::standard();
        for name in ["ALA", "GLY", "TRP", "DA", "U", "HOH"] {
            assert!(standard.contains(name), "missing template for {name}");
        }
        let alanine = standard.get("ALA").unwrap();
        assert!(alanine.bonds.contains(&("N".to_string(), "CA".to_string())));
        assert!(alanine.bonds.contains(&("C".to_string(), "OXT".to_string())));
        assert!(standard.get("XYZ").is_none());
    }

    #[test]
    fn load_succeeds_for_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[LIG]\nbonds = [[\"C1\", \"O1\"], [\"C1\", \"C2\"]]").unwrap();
        let templates = ResidueTemplates::load(file.path()).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates.get("LIG").unwrap().bonds.len(), 2);
    }

    #[test]
    fn load_fails_on_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[LIG]\nbonds = []\nangles = []").unwrap();
        let result = ResidueTemplates::load(file.path());
        assert!(matches!(result, Err(TemplateLoadError::Toml { .. })));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let result = ResidueTemplates::load(Path::new("/no/such/templates.toml"));
        assert!(matches!(result, Err(TemplateLoadError::Io { .. })));
    }

    #[test]
    fn extend_overrides_templates_with_the_same_name() {
        let mut templates = ResidueTemplates::standard().clone();
        let custom = ResidueTemplates::from_toml_str("[HOH]\nbonds = [[\"O\", \"H1\"]]").unwrap();
        templates.extend(custom);
        assert_eq!(templates.get("HOH").unwrap().bonds.len(), 1);
        assert!(templates.contains("ALA"));
    }
}
