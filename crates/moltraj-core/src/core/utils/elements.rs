use phf::{Map, phf_map};

static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008, "D" => 2.014, "He" => 4.0026,
    "Li" => 6.94, "Be" => 9.0122, "B" => 10.81, "C" => 12.011, "N" => 14.007,
    "O" => 15.999, "F" => 18.998, "Ne" => 20.180,
    "Na" => 22.990, "Mg" => 24.305, "Al" => 26.982, "Si" => 28.085, "P" => 30.974,
    "S" => 32.06, "Cl" => 35.45, "Ar" => 39.948,
    "K" => 39.098, "Ca" => 40.078, "Sc" => 44.956, "Ti" => 47.867, "V" => 50.942,
    "Cr" => 51.996, "Mn" => 54.938, "Fe" => 55.845, "Co" => 58.933, "Ni" => 58.693,
    "Cu" => 63.546, "Zn" => 65.38, "Ga" => 69.723, "Ge" => 72.630, "As" => 74.922,
    "Se" => 78.971, "Br" => 79.904, "Kr" => 83.798,
    "Rb" => 85.468, "Sr" => 87.62, "Y" => 88.906, "Zr" => 91.224, "Nb" => 92.906,
    "Mo" => 95.95, "Tc" => 98.0, "Ru" => 101.07, "Rh" => 102.91, "Pd" => 106.42,
    "Ag" => 107.87, "Cd" => 112.41, "In" => 114.82, "Sn" => 118.71, "Sb" => 121.76,
    "Te" => 127.60, "I" => 126.90, "Xe" => 131.29,
    "Cs" => 132.91, "Ba" => 137.33, "La" => 138.91, "Ce" => 140.12, "Gd" => 157.25,
    "Hf" => 178.49, "Ta" => 180.95, "W" => 183.84, "Re" => 186.21, "Os" => 190.23,
    "Ir" => 192.22, "Pt" => 195.08, "Au" => 196.97, "Hg" => 200.59, "Tl" => 204.38,
    "Pb" => 207.2, "Bi" => 208.98, "U" => 238.03,
};

/// Normalizes the capitalization of an element symbol (`"CL"` -> `"Cl"`).
pub fn normalize_symbol(symbol: &str) -> String {
    let mut chars = symbol.trim().chars();
    match chars.next() {
        Some(first) => std::iter::once(first.to_ascii_uppercase())
            .chain(chars.map(|c| c.to_ascii_lowercase()))
            .collect(),
        None => String::new(),
    }
}

pub fn is_element(symbol: &str) -> bool {
    ATOMIC_MASSES.contains_key(symbol) || ATOMIC_MASSES.contains_key(normalize_symbol(symbol).as_str())
}

/// Standard atomic mass for an element symbol, if the symbol is known.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES
        .get(symbol)
        .or_else(|| ATOMIC_MASSES.get(normalize_symbol(symbol).as_str()))
        .copied()
}

/// Guesses an element from an atom name by taking the longest alphabetic
/// prefix that is still a known element (`"CA1"` -> `"Ca"`, `"N12"` -> `"N"`).
pub fn guess_element(name: &str) -> String {
    let mut guess = String::new();
    for c in name.trim().chars() {
        if !c.is_ascii_alphabetic() {
            break;
        }
        let candidate = format!("{guess}{c}");
        if !is_element(&candidate) {
            break;
        }
        guess = candidate;
    }
    if guess.is_empty() {
        guess
    } else {
        normalize_symbol(&guess)
    }
}
