use crate::core::io::format::FormatKind;
use crate::core::models::cell::CellShape;
use crate::core::models::frame::Frame;
use crate::engine::config::OpenOptions;
use crate::engine::error::EngineError;
use crate::engine::trajectory::{OpenMode, Trajectory};
use std::path::Path;
use tracing::{info, instrument};

/// What one step of a trajectory contains.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    pub step: usize,
    pub name: Option<String>,
    pub atoms: usize,
    pub bonds: usize,
    pub residues: usize,
    pub cell: CellShape,
    pub cell_lengths: [f64; 3],
    pub has_velocities: bool,
}

impl StepSummary {
    fn of(step: usize, frame: &Frame) -> Self {
        Self {
            step,
            name: frame.name().map(str::to_string),
            atoms: frame.size(),
            bonds: frame.topology().bond_count(),
            residues: frame.topology().residues().len(),
            cell: frame.cell.shape(),
            cell_lengths: frame.cell.lengths(),
            has_velocities: frame.velocities().is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySummary {
    pub format: FormatKind,
    pub steps: Vec<StepSummary>,
}

#[instrument(skip_all, name = "inspect_workflow", fields(path = %path.display()))]
pub fn run(path: &Path, options: &OpenOptions) -> Result<TrajectorySummary, EngineError> {
    let mut trajectory = Trajectory::open_with(path, OpenMode::Read, options.clone())?;
    let count = trajectory.step_count()?;
    info!(steps = count, format = %trajectory.format(), "Indexed trajectory.");

    let steps = (0..count)
        .map(|step| trajectory.read_step(step).map(|frame| StepSummary::of(step, &frame)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TrajectorySummary {
        format: trajectory.format(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::DiagnosticSink;

    const FORMALDEHYDE: &str = "\
@<TRIPOS>MOLECULE
formaldehyde
 3 2 1 0 0
SMALL
NO_CHARGES

@<TRIPOS>ATOM
      1 C1          0.0000    0.0000    0.0000 C.2       1 FOR
      2 O1          1.2000    0.0000    0.0000 O.2       1 FOR
      3 H1         -0.5400    0.9300    0.0000 H         1 FOR
@<TRIPOS>BOND
     1     1     2    2
     2     1     3    1
";

    #[test]
    fn summarizes_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formaldehyde.mol2");
        std::fs::write(&path, format!("{FORMALDEHYDE}{FORMALDEHYDE}")).unwrap();

        let options = OpenOptions::builder().diagnostics(DiagnosticSink::silent()).build();
        let summary = run(&path, &options).unwrap();
        assert_eq!(summary.format, FormatKind::Mol2);
        assert_eq!(summary.steps.len(), 2);

        let second = &summary.steps[1];
        assert_eq!(second.step, 1);
        assert_eq!(second.name.as_deref(), Some("formaldehyde"));
        assert_eq!(second.atoms, 3);
        assert_eq!(second.bonds, 2);
        assert_eq!(second.residues, 1);
        assert_eq!(second.cell, CellShape::Infinite);
        assert!(!second.has_velocities);
    }

    #[test]
    fn missing_files_report_their_path() {
        let options = OpenOptions::builder().diagnostics(DiagnosticSink::silent()).build();
        let error = run(Path::new("/does/not/exist.pdb"), &options).unwrap_err();
        assert!(error.to_string().contains("/does/not/exist.pdb"));
    }
}
