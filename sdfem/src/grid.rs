//! Regular sampling grid
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Error, field::BoundingBox};

/// Index of a single grid cell
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub struct CellIndex {
    /// Cell position along the X axis
    pub x: usize,
    /// Cell position along the Y axis
    pub y: usize,
    /// Cell position along the Z axis (i.e. the layer)
    pub z: usize,
}

impl CellIndex {
    /// Builds a new cell index
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// Regular grid of cubic cells
///
/// `size` is the number of cells along each axis; there are `size + 1`
/// samples along each axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    /// Position of the lowest grid vertex
    pub origin: Point3<f64>,
    /// Cell size along each axis
    pub step: Vector3<f64>,
    /// Number of cells along each axis
    pub size: Vector3<usize>,
}

impl Grid {
    /// Builds a grid from raw parts
    pub fn new(
        origin: Point3<f64>,
        step: Vector3<f64>,
        size: Vector3<usize>,
    ) -> Self {
        Self { origin, step, size }
    }

    /// Builds a grid around the given bounding box
    ///
    /// The longest axis of the box is split into `resolution` steps, then
    /// every axis is padded to a whole number of steps plus one.  The padded
    /// grid is centered on the box, so there's a margin of half a cell (or
    /// more) of outside samples around the solid.
    pub fn from_bounds(
        bbox: &BoundingBox,
        resolution: usize,
    ) -> Result<Self, Error> {
        if resolution == 0 {
            return Err(Error::BadResolution);
        }
        let extent = bbox.max_extent();
        if !(extent.is_finite() && extent > 0.0) || bbox.is_empty() {
            return Err(Error::EmptyBounds);
        }
        let inc = extent / resolution as f64;
        let size = bbox.size().map(|s| (s / inc).ceil() as usize + 1);
        let padded = size.map(|n| n as f64) * inc;
        let origin = bbox.center() - padded / 2.0;
        Ok(Self {
            origin,
            step: Vector3::repeat(inc),
            size,
        })
    }

    /// Returns the position of the given grid vertex
    pub fn vertex(&self, x: usize, y: usize, z: usize) -> Point3<f64> {
        Point3::new(
            self.origin.x + x as f64 * self.step.x,
            self.origin.y + y as f64 * self.step.y,
            self.origin.z + z as f64 * self.step.z,
        )
    }

    /// Returns the 8 corner positions of a cell, in standard corner order
    pub fn cell_corners(&self, c: CellIndex) -> [Point3<f64>; 8] {
        crate::tessellate::CORNERS
            .map(|[dx, dy, dz]| self.vertex(c.x + dx, c.y + dy, c.z + dz))
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.size.x * self.size.y * self.size.z
    }

    /// Number of cells in a single Z layer
    pub fn layer_size(&self) -> usize {
        self.size.x * self.size.y
    }

    /// Checks whether the cell is within the grid
    pub fn contains(&self, c: CellIndex) -> bool {
        c.x < self.size.x && c.y < self.size.y && c.z < self.size.z
    }

    /// Converts a cell to its flat (z-major) index
    pub fn index(&self, c: CellIndex) -> usize {
        debug_assert!(self.contains(c));
        c.x + self.size.x * (c.y + self.size.y * c.z)
    }

    /// Converts a flat index back into a cell
    pub fn cell(&self, i: usize) -> CellIndex {
        CellIndex {
            x: i % self.size.x,
            y: (i / self.size.x) % self.size.y,
            z: i / self.layer_size(),
        }
    }

    /// Returns the cell containing the given point
    ///
    /// Points outside the grid are clamped to the nearest boundary cell on
    /// each axis independently.  An axis with no cells (only possible through
    /// [`Grid::new`]) always maps to 0.
    pub fn cell_of(&self, p: &Point3<f64>) -> CellIndex {
        let axis = |i: usize| {
            let v = ((p[i] - self.origin[i]) / self.step[i]).floor();
            // NaN and negative values both fail this comparison
            if v > 0.0 {
                (v as usize).min(self.size[i].saturating_sub(1))
            } else {
                0
            }
        };
        CellIndex {
            x: axis(0),
            y: axis(1),
            z: axis(2),
        }
    }

    /// Iterates over every cell in z-major order
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (0..self.cell_count()).map(|i| self.cell(i))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> BoundingBox {
        BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn padded_bounds() {
        let g = Grid::from_bounds(&unit_cube(), 4).unwrap();
        assert_eq!(g.size, Vector3::new(5, 5, 5));
        assert_relative_eq!(g.step, Vector3::repeat(0.25));
        assert_relative_eq!(g.origin, Point3::new(-0.125, -0.125, -0.125));
        assert_relative_eq!(g.vertex(5, 5, 5), Point3::new(1.125, 1.125, 1.125));
    }

    #[test]
    fn flat_axis() {
        let b = BoundingBox::new(Point3::origin(), Point3::new(2.0, 1.0, 0.0));
        let g = Grid::from_bounds(&b, 2).unwrap();
        assert_eq!(g.size, Vector3::new(3, 2, 1));
        assert_relative_eq!(g.origin.z, -0.5);
    }

    #[test]
    fn bad_bounds() {
        assert!(matches!(
            Grid::from_bounds(&unit_cube(), 0),
            Err(Error::BadResolution)
        ));
        let flat = BoundingBox::new(Point3::origin(), Point3::origin());
        assert!(matches!(
            Grid::from_bounds(&flat, 10),
            Err(Error::EmptyBounds)
        ));
    }

    #[test]
    fn index_round_trip() {
        let g = Grid::new(
            Point3::origin(),
            Vector3::repeat(1.0),
            Vector3::new(3, 4, 5),
        );
        for (i, c) in g.cells().enumerate() {
            assert_eq!(g.index(c), i);
        }
        assert_eq!(g.cell(3), CellIndex::new(0, 1, 0));
        assert_eq!(g.cell(12), CellIndex::new(0, 0, 1));
    }

    #[test]
    fn cell_of_clamps() {
        let g = Grid::new(
            Point3::origin(),
            Vector3::repeat(0.5),
            Vector3::new(4, 4, 4),
        );
        assert_eq!(g.cell_of(&Point3::new(0.6, 1.2, 0.0)), CellIndex::new(1, 2, 0));
        assert_eq!(
            g.cell_of(&Point3::new(-10.0, 10.0, 1.99)),
            CellIndex::new(0, 3, 3)
        );
        assert_eq!(
            g.cell_of(&Point3::new(f64::NAN, 2.0, 2.5)),
            CellIndex::new(0, 3, 3)
        );
    }

    #[test]
    fn cell_of_zero_size_axis() {
        let g = Grid::new(
            Point3::origin(),
            Vector3::repeat(1.0),
            Vector3::new(3, 0, 2),
        );
        assert_eq!(g.cell_count(), 0);
        assert_eq!(
            g.cell_of(&Point3::new(1.5, 4.0, 1.5)),
            CellIndex::new(1, 0, 1)
        );
    }

    #[test]
    fn corners() {
        let g = Grid::new(
            Point3::origin(),
            Vector3::repeat(1.0),
            Vector3::new(2, 2, 2),
        );
        let c = g.cell_corners(CellIndex::new(1, 0, 1));
        assert_eq!(c[0], Point3::new(1.0, 0.0, 1.0));
        assert_eq!(c[6], Point3::new(2.0, 1.0, 2.0));
        assert_eq!(c[3], Point3::new(1.0, 1.0, 1.0));
    }
}
