//! Implicit fields consumed by the mesher
//!
//! A field is a scalar function of position which is negative inside the
//! solid, positive outside, and zero on its boundary.  The mesher only ever
//! asks for point samples, so any shape library can be plugged in by
//! implementing [`Field`].
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Lower corner
    pub min: Point3<f64>,
    /// Upper corner
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Builds a new bounding box
    ///
    /// The corners are sorted per axis, so they may be given in any order.
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Returns the smallest box containing every point
    ///
    /// An empty input gives a box with `min = +inf` and `max = -inf`.
    pub fn around<'a, I: IntoIterator<Item = &'a Point3<f64>>>(
        points: I,
    ) -> Self {
        points.into_iter().fold(
            Self {
                min: Point3::from(Vector3::repeat(f64::INFINITY)),
                max: Point3::from(Vector3::repeat(f64::NEG_INFINITY)),
            },
            |b, p| Self {
                min: b.min.inf(p),
                max: b.max.sup(p),
            },
        )
    }

    /// Returns the size along each axis
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Returns the center of the box
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the largest size along any axis
    pub fn max_extent(&self) -> f64 {
        self.size().max()
    }

    /// Checks whether the box is empty (i.e. `min > max` on some axis)
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }
}

/// A scalar field describing a solid
///
/// Evaluation must be total and free of side effects, since samples are
/// taken from many threads at once and never retried.
pub trait Field: Sync {
    /// Evaluates the field at the given position
    fn evaluate(&self, p: Point3<f64>) -> f64;

    /// Returns a box which encloses the solid
    fn bounding_box(&self) -> BoundingBox;
}

impl<F: Field + ?Sized> Field for &F {
    fn evaluate(&self, p: Point3<f64>) -> f64 {
        (**self).evaluate(p)
    }
    fn bounding_box(&self) -> BoundingBox {
        (**self).bounding_box()
    }
}

impl<F: Field + ?Sized> Field for Box<F> {
    fn evaluate(&self, p: Point3<f64>) -> f64 {
        (**self).evaluate(p)
    }
    fn bounding_box(&self) -> BoundingBox {
        (**self).bounding_box()
    }
}
