//! Plane-by-plane field sampling
//!
//! The grid is evaluated one Z plane at a time.  Only two planes are kept in
//! memory (the bottom and top faces of the current cell layer), so memory use
//! scales with the grid's cross-section rather than its volume.
use nalgebra::Point3;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{Error, field::Field, grid::Grid};

mod pool;
pub use pool::{BATCH_SIZE, EvalPool, QUEUE_DEPTH};

/// Where field evaluation runs while sampling a grid
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThreadCount {
    /// Sample planes in the thread that called [`Mesh::build`](crate::mesh::Mesh::build)
    One,

    /// Hand batches of sample points to this many pool workers
    ///
    /// `Many(1)` still runs a (single) worker next to the meshing thread, so
    /// sampling overlaps with tessellation of the previous layer.
    Many(std::num::NonZeroUsize),
}

/// A count of one maps to [`ThreadCount::One`]
impl From<std::num::NonZeroUsize> for ThreadCount {
    fn from(v: std::num::NonZeroUsize) -> Self {
        if v.get() == 1 {
            ThreadCount::One
        } else {
            ThreadCount::Many(v)
        }
    }
}

/// Printed as `-` for inline sampling, otherwise as the worker count
impl std::fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadCount::One => write!(f, "-"),
            ThreadCount::Many(n) => write!(f, "{n}"),
        }
    }
}

impl ThreadCount {
    /// Number of pool workers to spawn, or `None` for inline sampling
    pub fn get(&self) -> Option<usize> {
        match self {
            ThreadCount::One => None,
            ThreadCount::Many(v) => Some(v.get()),
        }
    }
}

/// One worker per available CPU
impl Default for ThreadCount {
    fn default() -> Self {
        std::thread::available_parallelism()
            .map(ThreadCount::from)
            .unwrap_or(ThreadCount::One)
    }
}

/// Shared flag which stops a mesh build between cell layers
///
/// Clones share the same flag, so one clone can be handed to the build while
/// another is kept by the caller (or a signal handler).
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Returns a token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that every build holding a clone of this token stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once any clone has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Field samples for the two Z planes bounding a layer of cells
pub struct PlaneCache {
    grid: Grid,
    /// Sample positions for the plane being evaluated
    points: Vec<Point3<f64>>,
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl PlaneCache {
    /// Allocates (empty) plane buffers for the given grid
    pub fn new(grid: &Grid) -> Self {
        let n = (grid.size.x + 1) * (grid.size.y + 1);
        Self {
            grid: grid.clone(),
            points: Vec::with_capacity(n),
            lo: vec![f64::NAN; n],
            hi: vec![f64::NAN; n],
        }
    }

    /// Shifts the planes down by one, then evaluates plane `z` into the top
    ///
    /// After `advance(pool, z)`, the cache holds planes `z - 1` and `z`.
    pub fn advance<F: Field + ?Sized>(
        &mut self,
        pool: &EvalPool<F>,
        z: usize,
    ) -> Result<(), Error> {
        std::mem::swap(&mut self.lo, &mut self.hi);
        self.points.clear();
        for y in 0..=self.grid.size.y {
            for x in 0..=self.grid.size.x {
                self.points.push(self.grid.vertex(x, y, z));
            }
        }
        pool.eval(&self.points, &mut self.hi)
    }

    /// Reads a sample from the lower (`upper = false`) or upper plane
    pub fn get(&self, x: usize, y: usize, upper: bool) -> f64 {
        let i = x + y * (self.grid.size.x + 1);
        if upper { self.hi[i] } else { self.lo[i] }
    }

    /// Returns the 8 corner samples of the cell at `(x, y)` in this layer
    pub fn cell_values(&self, x: usize, y: usize) -> [f64; 8] {
        crate::tessellate::CORNERS
            .map(|[dx, dy, dz]| self.get(x + dx, y + dy, dz == 1))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::BoundingBox;
    use nalgebra::Vector3;
    use std::num::NonZeroUsize;

    /// Field which returns `x + 10 y + 100 z`, to check sample placement
    struct Ramp;
    impl Field for Ramp {
        fn evaluate(&self, p: Point3<f64>) -> f64 {
            p.x + 10.0 * p.y + 100.0 * p.z
        }
        fn bounding_box(&self) -> BoundingBox {
            BoundingBox::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0))
        }
    }

    fn check_planes(threads: ThreadCount) {
        let grid = Grid::new(
            Point3::origin(),
            Vector3::repeat(1.0),
            Vector3::new(2, 3, 2),
        );
        std::thread::scope(|s| {
            let pool = EvalPool::new(s, &Ramp, threads);
            let mut planes = PlaneCache::new(&grid);
            planes.advance(&pool, 0).unwrap();
            planes.advance(&pool, 1).unwrap();
            assert_eq!(planes.get(2, 3, false), 32.0);
            assert_eq!(planes.get(1, 2, true), 121.0);

            let v = planes.cell_values(1, 1);
            assert_eq!(v, [11.0, 12.0, 22.0, 21.0, 111.0, 112.0, 122.0, 121.0]);

            planes.advance(&pool, 2).unwrap();
            assert_eq!(planes.get(0, 0, false), 100.0);
            assert_eq!(planes.get(0, 0, true), 200.0);
        });
    }

    #[test]
    fn planes_single_threaded() {
        check_planes(ThreadCount::One);
    }

    #[test]
    fn planes_multi_threaded() {
        check_planes(ThreadCount::Many(NonZeroUsize::new(4).unwrap()));
    }

    #[test]
    fn cancel_token() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn thread_count() {
        assert_eq!(ThreadCount::from(NonZeroUsize::new(1).unwrap()), ThreadCount::One);
        assert_eq!(ThreadCount::One.get(), None);
        assert_eq!(ThreadCount::One.to_string(), "-");
        let three = NonZeroUsize::new(3).unwrap();
        assert_eq!(ThreadCount::from(three).get(), Some(3));
        assert_eq!(ThreadCount::Many(NonZeroUsize::new(3).unwrap()).to_string(), "3");
    }
}
