use nalgebra::Point3;
use std::collections::{HashMap, hash_map::Entry};

/// Exact hash key for a point
///
/// Adding `0.0` turns `-0.0` into `0.0`, so the two zeros share a key.
fn key(p: &Point3<f64>) -> [u64; 3] {
    [p.x, p.y, p.z].map(|v| (v + 0.0).to_bits())
}

/// Deduplicating vertex store, used while a mesh is being built
///
/// Points are matched by their exact bit patterns; there is no tolerance.
/// This works because every shared point is computed the same way by each
/// cell that touches it.
#[derive(Default)]
pub struct VertexBuilder {
    points: Vec<Point3<f64>>,
    lookup: HashMap<[u64; 3], u32>,
}

impl VertexBuilder {
    /// Builds an empty vertex store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the given point, adding it if it's new
    pub fn add(&mut self, p: Point3<f64>) -> u32 {
        match self.lookup.entry(key(&p)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                debug_assert!(self.points.len() < u32::MAX as usize);
                let id = self.points.len() as u32;
                self.points.push(p);
                e.insert(id);
                id
            }
        }
    }

    /// Returns the id of the given point, if it has been added
    pub fn find(&self, p: &Point3<f64>) -> Option<u32> {
        self.lookup.get(&key(p)).copied()
    }

    /// Returns the position of the given point
    ///
    /// # Panics
    /// If the id is out of range
    pub fn get(&self, id: u32) -> Point3<f64> {
        self.points[id as usize]
    }

    /// Number of distinct points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops the lookup table, keeping the point array
    pub fn seal(self) -> VertexBuffer {
        VertexBuffer {
            points: self.points,
        }
    }
}

/// Read-only vertex array of a finished mesh
#[derive(Clone, Debug, Default)]
pub struct VertexBuffer {
    points: Vec<Point3<f64>>,
}

impl VertexBuffer {
    /// Returns the position of the given vertex
    ///
    /// # Panics
    /// If the id is out of range
    pub fn get(&self, id: u32) -> Point3<f64> {
        self.points[id as usize]
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks whether there are no vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns every vertex, indexed by id
    pub fn as_slice(&self) -> &[Point3<f64>] {
        &self.points
    }
}
