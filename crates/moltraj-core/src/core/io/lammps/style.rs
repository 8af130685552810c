//! Column layouts of the `Atoms` section for every LAMMPS atom style.

use phf::{Map, phf_map};

/// Where the fields used by the reader live in one `Atoms` line, as indices
/// into its whitespace-separated columns. Column 0 is always the atom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomStyle {
    pub name: &'static str,
    /// Minimum number of columns of a valid line.
    pub columns: usize,
    pub kind: usize,
    /// Column of `x`; `y` and `z` follow.
    pub position: usize,
    pub molecule: Option<usize>,
    pub charge: Option<usize>,
    pub mass: Option<usize>,
}

const fn style(name: &'static str, columns: usize, kind: usize, position: usize) -> AtomStyle {
    AtomStyle {
        name,
        columns,
        kind,
        position,
        molecule: None,
        charge: None,
        mass: None,
    }
}

const fn with_molecule(mut style: AtomStyle, column: usize) -> AtomStyle {
    style.molecule = Some(column);
    style
}

const fn with_charge(mut style: AtomStyle, column: usize) -> AtomStyle {
    style.charge = Some(column);
    style
}

const fn with_mass(mut style: AtomStyle, column: usize) -> AtomStyle {
    style.mass = Some(column);
    style
}

static STYLES: Map<&'static str, AtomStyle> = phf_map! {
    // atom-ID molecule-ID atom-type x y z
    "angle" => with_molecule(style("angle", 6, 2, 3), 1),
    "bond" => with_molecule(style("bond", 6, 2, 3), 1),
    "molecular" => with_molecule(style("molecular", 6, 2, 3), 1),
    // atom-ID atom-type x y z
    "atomic" => style("atomic", 5, 1, 2),
    // atom-ID atom-type bodyflag mass x y z
    "body" => with_mass(style("body", 7, 1, 4), 3),
    // atom-ID atom-type q x y z [mux muy muz]
    "charge" => with_charge(style("charge", 6, 1, 3), 2),
    "dipole" => with_charge(style("dipole", 6, 1, 3), 2),
    // atom-ID atom-type theta x y z
    "dpd" => style("dpd", 6, 1, 3),
    // atom-ID atom-type q spin eradius x y z
    "electron" => with_charge(style("electron", 8, 1, 5), 2),
    // atom-ID atom-type ellipsoidflag density x y z
    "ellipsoid" => style("ellipsoid", 7, 1, 4),
    // atom-ID molecule-ID atom-type q x y z
    "full" => with_charge(with_molecule(style("full", 7, 2, 4), 1), 3),
    // atom-ID molecule-ID atom-type lineflag density x y z
    "line" => with_molecule(style("line", 8, 2, 5), 1),
    // atom-ID atom-type rho e cv x y z
    "meso" => style("meso", 8, 1, 5),
    // atom-ID atom-type volume density x y z
    "peri" => style("peri", 7, 1, 4),
    // atom-ID atom-type molecule volume mass kernel-radius contact-radius x y z
    "smd" => with_mass(with_molecule(style("smd", 10, 1, 7), 2), 4),
    // atom-ID atom-type diameter density x y z
    "sphere" => style("sphere", 7, 1, 4),
    // atom-ID molecule-ID template-index template-atom atom-type x y z
    "template" => with_molecule(style("template", 8, 4, 5), 1),
    // atom-ID molecule-ID atom-type triangleflag density x y z
    "tri" => with_molecule(style("tri", 8, 2, 5), 1),
    // atom-ID atom-type charge spin eradius etag cs_re cs_im x y z
    "wavepacket" => with_charge(style("wavepacket", 11, 1, 8), 2),
    // atom-ID atom-type x y z sub-style1 sub-style2 ...
    "hybrid" => style("hybrid", 5, 1, 2),
};

impl AtomStyle {
    pub fn named(name: &str) -> Option<&'static AtomStyle> {
        STYLES.get(name)
    }

    /// Hybrid styles are read through their first sub-style only.
    pub fn is_hybrid(&self) -> bool {
        self.name == "hybrid"
    }
}
