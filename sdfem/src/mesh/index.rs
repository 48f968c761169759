use nalgebra::Point3;
use std::collections::VecDeque;

use super::Element;
use crate::{
    field::BoundingBox,
    grid::{CellIndex, Grid},
};

/// Set of grid cells overlapping a point set's bounding box
#[derive(Clone, Debug)]
pub struct Region {
    /// Cells, in z-major order
    pub cells: Vec<CellIndex>,
    /// Lower corner of the points' bounding box
    pub min: Point3<f64>,
    /// Upper corner of the points' bounding box
    pub max: Point3<f64>,
}

/// Grid cells, each owning the elements generated from it
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    grid: Grid,
    cells: Vec<Vec<Element>>,
}

impl SpatialIndex {
    /// Builds an index with an empty element list for every cell
    pub fn new(grid: Grid) -> Self {
        let cells = vec![vec![]; grid.cell_count()];
        Self { grid, cells }
    }

    /// Returns the underlying grid
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Appends an element to the given cell's list
    ///
    /// # Panics
    /// If the cell is outside the grid
    pub fn push(&mut self, cell: CellIndex, e: Element) {
        assert!(self.grid.contains(cell), "cell {cell:?} is out of bounds");
        let i = self.grid.index(cell);
        self.cells[i].push(e);
    }

    /// Returns the elements generated from the given cell
    ///
    /// Cells outside the grid have no elements.
    pub fn cell(&self, c: CellIndex) -> &[Element] {
        if self.grid.contains(c) {
            &self.cells[self.grid.index(c)]
        } else {
            &[]
        }
    }

    /// Iterates over every cell and its elements, in z-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, &[Element])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, es)| (self.grid.cell(i), es.as_slice()))
    }

    /// Returns the total number of elements
    pub fn element_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Returns the number of elements in a single Z layer
    pub fn element_count_on_layer(&self, z: usize) -> usize {
        if z >= self.grid.size.z {
            return 0;
        }
        let n = self.grid.layer_size();
        self.cells[z * n..(z + 1) * n].iter().map(Vec::len).sum()
    }

    /// Finds every cell which overlaps the bounding box of `points`
    ///
    /// The box corners are clamped into the grid, so the result is never
    /// empty unless `points` is.
    pub fn voxels_intersecting(&self, points: &[Point3<f64>]) -> Region {
        let bbox = BoundingBox::around(points);
        let mut cells = vec![];
        if !points.is_empty() {
            let lo = self.grid.cell_of(&bbox.min);
            let hi = self.grid.cell_of(&bbox.max);
            for z in lo.z..=hi.z {
                for y in lo.y..=hi.y {
                    for x in lo.x..=hi.x {
                        cells.push(CellIndex::new(x, y, z));
                    }
                }
            }
        }
        Region {
            cells,
            min: bbox.min,
            max: bbox.max,
        }
    }

    /// Counts groups of face-connected, non-empty cells
    pub fn components(&self) -> usize {
        let mut seen = vec![false; self.cells.len()];
        let mut todo = VecDeque::new();
        let mut count = 0;
        for start in 0..self.cells.len() {
            if seen[start] || self.cells[start].is_empty() {
                continue;
            }
            count += 1;
            seen[start] = true;
            todo.push_back(start);
            while let Some(i) = todo.pop_front() {
                for n in self.neighbors(self.grid.cell(i)) {
                    let j = self.grid.index(n);
                    if !seen[j] && !self.cells[j].is_empty() {
                        seen[j] = true;
                        todo.push_back(j);
                    }
                }
            }
        }
        count
    }

    /// Returns the (up to 6) face neighbors of a cell
    fn neighbors(&self, c: CellIndex) -> impl Iterator<Item = CellIndex> {
        let size = self.grid.size;
        let steps = [
            (c.x > 0).then(|| CellIndex::new(c.x - 1, c.y, c.z)),
            (c.x + 1 < size.x).then(|| CellIndex::new(c.x + 1, c.y, c.z)),
            (c.y > 0).then(|| CellIndex::new(c.x, c.y - 1, c.z)),
            (c.y + 1 < size.y).then(|| CellIndex::new(c.x, c.y + 1, c.z)),
            (c.z > 0).then(|| CellIndex::new(c.x, c.y, c.z - 1)),
            (c.z + 1 < size.z).then(|| CellIndex::new(c.x, c.y, c.z + 1)),
        ];
        steps.into_iter().flatten()
    }
}
