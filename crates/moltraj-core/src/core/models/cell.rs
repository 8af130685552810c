use nalgebra::{Matrix3, Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellShape {
    /// No periodic boundaries.
    #[default]
    Infinite,
    /// All angles are 90 degrees.
    Orthorhombic,
    /// Arbitrary angles.
    Triclinic,
}

/// A unit cell, stored as the matrix whose columns are the three cell vectors.
///
/// The first vector lies along x and the second in the xy plane, which is
/// the convention shared by every text format handled here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    matrix: Matrix3<f64>,
    shape: CellShape,
}

impl Default for UnitCell {
    fn default() -> Self {
        Self::infinite()
    }
}

fn cos_degrees(angle: f64) -> f64 {
    if angle == 90.0 { 0.0 } else { angle.to_radians().cos() }
}

fn sin_degrees(angle: f64) -> f64 {
    if angle == 90.0 { 1.0 } else { angle.to_radians().sin() }
}

fn angle_between(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let norms = u.norm() * v.norm();
    if norms == 0.0 {
        return 90.0;
    }
    (u.dot(v) / norms).clamp(-1.0, 1.0).acos().to_degrees()
}

impl UnitCell {
    pub fn infinite() -> Self {
        Self {
            matrix: Matrix3::zeros(),
            shape: CellShape::Infinite,
        }
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::from_lengths_angles([a, b, c], [90.0, 90.0, 90.0])
    }

    /// Builds a cell from lengths (Å) and angles (degrees). All-zero lengths
    /// give an infinite cell and right angles an orthorhombic one.
    pub fn from_lengths_angles(lengths: [f64; 3], angles: [f64; 3]) -> Self {
        let [a, b, c] = lengths;
        let [alpha, beta, gamma] = angles;
        if a == 0.0 && b == 0.0 && c == 0.0 {
            return Self::infinite();
        }

        let (cos_alpha, cos_beta, cos_gamma) =
            (cos_degrees(alpha), cos_degrees(beta), cos_degrees(gamma));
        let sin_gamma = sin_degrees(gamma);

        let b_vector = Vector3::new(b * cos_gamma, b * sin_gamma, 0.0);
        let cx = cos_beta;
        let cy = (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let cz = (1.0 - cx * cx - cy * cy).max(0.0).sqrt();
        let c_vector = Vector3::new(c * cx, c * cy, c * cz);

        let shape = if alpha == 90.0 && beta == 90.0 && gamma == 90.0 {
            CellShape::Orthorhombic
        } else {
            CellShape::Triclinic
        };

        Self {
            matrix: Matrix3::from_columns(&[Vector3::new(a, 0.0, 0.0), b_vector, c_vector]),
            shape,
        }
    }

    /// Builds a cell from a matrix whose columns are the cell vectors.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        let mut cell = Self {
            matrix,
            shape: CellShape::Triclinic,
        };
        if matrix == Matrix3::zeros() {
            cell.shape = CellShape::Infinite;
        } else if cell.angles().iter().all(|angle| (angle - 90.0).abs() < 1e-6) {
            cell.shape = CellShape::Orthorhombic;
        }
        cell
    }

    /// Forces the shape, e.g. a LAMMPS box declared triclinic with zero tilts.
    pub fn with_shape(mut self, shape: CellShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn shape(&self) -> CellShape {
        self.shape
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn lengths(&self) -> [f64; 3] {
        [
            self.matrix.column(0).norm(),
            self.matrix.column(1).norm(),
            self.matrix.column(2).norm(),
        ]
    }

    /// Angles alpha (b, c), beta (a, c) and gamma (a, b) in degrees.
    pub fn angles(&self) -> [f64; 3] {
        if self.shape == CellShape::Infinite || self.shape == CellShape::Orthorhombic {
            return [90.0, 90.0, 90.0];
        }
        let a = self.matrix.column(0).into_owned();
        let b = self.matrix.column(1).into_owned();
        let c = self.matrix.column(2).into_owned();
        [angle_between(&b, &c), angle_between(&a, &c), angle_between(&a, &b)]
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Fractional coordinates of a Cartesian position, or `None` for a
    /// degenerate (e.g. infinite) cell.
    pub fn fractional(&self, position: &Point3<f64>) -> Option<Vector3<f64>> {
        self.matrix
            .try_inverse()
            .map(|inverse| inverse * position.coords)
    }

    pub fn cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * fractional)
    }
}
