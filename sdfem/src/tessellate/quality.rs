//! Element quality checks
//!
//! Linear tetrahedra are checked with the volume-length ratio
//!
//! ```text
//! rho = 480 V / ((|ab| + |cd|) (|ac| + |bd|) (|ad| + |bc|))
//! ```
//!
//! which is scale-invariant and goes to zero as the tetrahedron flattens.
//! The Jacobian of the linear shape functions is checked as well, so that an
//! element with the wrong node order is never handed to the solver.
use nalgebra::{Matrix3, Point3};

/// Elements with a volume-length ratio below this value are rejected
pub const MIN_VOLUME_RATIO: f64 = 1.0;

/// Rejected elements with a volume-length ratio below this value are flat
pub const COLLAPSED_RATIO: f64 = 1e-9;

/// Reason for rejecting an element
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Defect {
    /// Two corners coincide
    ZeroEdge,
    /// Volume-length ratio is below [`MIN_VOLUME_RATIO`]
    Sliver {
        /// Volume-length ratio of the element
        rho: f64,
    },
    /// Jacobian determinant is zero or negative
    Inverted {
        /// Determinant at the element centroid
        det: f64,
    },
}

impl Defect {
    /// Checks whether the rejected element had (numerically) no volume
    ///
    /// Collapsed pieces are expected wherever the surface passes through or
    /// near a grid sample; dropping them doesn't open a gap in the mesh.
    pub fn is_collapsed(&self) -> bool {
        match self {
            Defect::ZeroEdge => true,
            Defect::Sliver { rho } => !(*rho >= COLLAPSED_RATIO),
            Defect::Inverted { .. } => false,
        }
    }
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Defect::ZeroEdge => write!(f, "zero-length edge"),
            Defect::Sliver { rho } => write!(f, "sliver (rho = {rho:.3e})"),
            Defect::Inverted { det } => write!(f, "inverted (det = {det:.3e})"),
        }
    }
}

/// Computes the volume-length ratio of a tetrahedron
///
/// Returns `None` if any edge has zero length.
pub fn volume_ratio(t: &[Point3<f64>; 4]) -> Option<f64> {
    let [a, b, c, d] = t;
    let edge = |p: &Point3<f64>, q: &Point3<f64>| (q - p).norm();
    let lengths = [
        edge(a, b),
        edge(c, d),
        edge(a, c),
        edge(b, d),
        edge(a, d),
        edge(b, c),
    ];
    if lengths.contains(&0.0) {
        return None;
    }
    let v = volume(t).abs();
    let denom = (lengths[0] + lengths[1])
        * (lengths[2] + lengths[3])
        * (lengths[4] + lengths[5]);
    Some(480.0 * v / denom)
}

/// Signed volume of a tetrahedron
pub fn volume(t: &[Point3<f64>; 4]) -> f64 {
    jacobian(t) / 6.0
}

/// Determinant of the Jacobian of the linear shape functions
///
/// Linear shape functions have a constant Jacobian, so this is the value at
/// the centroid `(1/4, 1/4, 1/4)` as well as everywhere else.  It's positive
/// when `(b - a) · ((c - a) × (d - a)) > 0`.
pub fn jacobian(t: &[Point3<f64>; 4]) -> f64 {
    let [a, b, c, d] = t;
    Matrix3::from_columns(&[b - a, c - a, d - a]).determinant()
}

/// Checks a tetrahedron's corners, returning the first defect found
pub fn check(t: &[Point3<f64>; 4]) -> Option<Defect> {
    let Some(rho) = volume_ratio(t) else {
        return Some(Defect::ZeroEdge);
    };
    if rho.is_nan() || rho < MIN_VOLUME_RATIO {
        return Some(Defect::Sliver { rho });
    }
    let det = jacobian(t);
    if det.is_nan() || det <= 0.0 {
        return Some(Defect::Inverted { det });
    }
    None
}
