//! Volumetric meshes of solid elements
//!
//! A [`Mesh`] is built from a [`Field`] by sampling it over a regular grid
//! (see [`crate::sample`]), then tessellating every cell (see
//! [`crate::tessellate`]).  Elements stay attached to the cell which
//! generated them, which makes spatial queries cheap: finding the node
//! nearest to a point only needs to look inside a single cell.
//!
//! ```
//! use nalgebra::Point3;
//! use sdfem::{
//!     field::{BoundingBox, Field},
//!     mesh::{Mesh, Settings},
//! };
//!
//! struct Ball;
//! impl Field for Ball {
//!     fn evaluate(&self, p: Point3<f64>) -> f64 {
//!         p.coords.norm() - 1.0
//!     }
//!     fn bounding_box(&self) -> BoundingBox {
//!         BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
//!     }
//! }
//!
//! let settings = Settings {
//!     resolution: 10,
//!     ..Default::default()
//! };
//! let mesh = Mesh::build(&Ball, &settings)?;
//! assert_eq!(mesh.count_components(), 1);
//! # Ok::<(), sdfem::Error>(())
//! ```
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

mod builder;
mod element;
mod index;
mod tie;
mod vertex;

pub use builder::MeshBuilder;
pub use element::{Element, ElementType, MAX_NODES};
pub use index::{Region, SpatialIndex};
pub use tie::{CORNER_WEIGHT, FaceTie, HEX20_FACES, MIDSIDE_WEIGHT};
pub use vertex::{VertexBuffer, VertexBuilder};

use crate::{
    Error,
    field::Field,
    grid::{CellIndex, Grid},
    sample::{CancelToken, EvalPool, PlaneCache, ThreadCount},
    tessellate::{CellOutput, ElementKind, Surface, Tessellator, quality::Defect},
};

/// Settings when building a mesh
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of cells along the longest axis of the field's bounding box
    pub resolution: usize,

    /// Element family to generate
    pub element: ElementKind,

    /// Handling of cells on the surface
    pub surface: Surface,

    /// Number of threads used to evaluate the field
    #[serde(skip)]
    pub threads: ThreadCount,

    /// Token to cancel meshing
    #[serde(skip)]
    pub cancel: CancelToken,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: 50,
            element: ElementKind::default(),
            surface: Surface::default(),
            threads: ThreadCount::default(),
            cancel: CancelToken::new(),
        }
    }
}

/// Element which was rejected while tessellating a cell
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Degenerate {
    /// Cell which produced the element
    pub cell: CellIndex,
    /// Type the element would have had
    pub kind: ElementType,
    /// Reason for rejection
    pub defect: Defect,
    /// Unsigned volume of the element's corner tetrahedron
    pub volume: f64,
}

/// Volumetric mesh, with elements indexed by grid cell
#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: VertexBuffer,
    index: SpatialIndex,
    degenerate: Vec<Degenerate>,
    ties: Vec<FaceTie>,
}

impl Mesh {
    /// Samples and tessellates a field
    ///
    /// The field is evaluated one Z plane at a time on a pool of scoped
    /// workers; everything else runs in the calling thread.  Cancellation is
    /// checked between planes.
    pub fn build<F: Field + ?Sized>(
        field: &F,
        settings: &Settings,
    ) -> Result<Self, Error> {
        let grid = Grid::from_bounds(&field.bounding_box(), settings.resolution)?;
        log::debug!(
            "meshing {}x{}x{} cells of size {} with {} thread(s)",
            grid.size.x,
            grid.size.y,
            grid.size.z,
            grid.step.x,
            settings.threads,
        );
        let tess = Tessellator::new(settings.element, settings.surface);
        let mut builder = MeshBuilder::new(grid.clone());

        std::thread::scope(|s| {
            let pool = EvalPool::new(s, field, settings.threads);
            let mut planes = PlaneCache::new(&grid);
            let mut out = CellOutput::default();
            planes.advance(&pool, 0)?;
            for z in 0..grid.size.z {
                if settings.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                planes.advance(&pool, z + 1)?;
                for y in 0..grid.size.y {
                    for x in 0..grid.size.x {
                        let cell = CellIndex::new(x, y, z);
                        tess.cell(
                            &grid.cell_corners(cell),
                            &planes.cell_values(x, y),
                            &mut out,
                        );
                        builder.ingest(cell, &mut out)?;
                    }
                }
            }
            Ok(())
        })?;

        let mesh = builder.finish();
        let (collapsed, solid): (Vec<&Degenerate>, Vec<&Degenerate>) = mesh
            .degenerate
            .iter()
            .partition(|d| d.defect.is_collapsed());
        if !collapsed.is_empty() {
            log::debug!("dropped {} collapsed element(s)", collapsed.len());
        }
        if !solid.is_empty() {
            log::warn!(
                "rejected {} degenerate element(s) with a total volume of {}",
                solid.len(),
                solid.iter().map(|d| d.volume).sum::<f64>(),
            );
            for d in &solid {
                log::debug!("  {} in cell {:?}: {}", d.kind, d.cell, d.defect);
            }
        }
        if !mesh.ties.is_empty() {
            log::debug!("tied {} node(s) to hexahedron faces", mesh.ties.len());
        }
        log::info!(
            "built mesh with {} vertices and {} elements",
            mesh.vertex_count(),
            mesh.element_count()
        );
        Ok(mesh)
    }

    /// Returns the sampling grid
    pub fn grid(&self) -> &Grid {
        self.index.grid()
    }

    /// Returns the vertex buffer
    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// Returns the position of a single vertex
    pub fn vertex(&self, id: u32) -> Point3<f64> {
        self.vertices.get(id)
    }

    /// Returns the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of cell layers along Z
    pub fn layer_count(&self) -> usize {
        self.grid().size.z
    }

    /// Returns the elements generated from a single cell
    pub fn cell(&self, c: CellIndex) -> &[Element] {
        self.index.cell(c)
    }

    /// Iterates over every element in z-major cell order
    ///
    /// Each item is `(ordinal, cell, element)`, where `ordinal` is the
    /// element's 0-based position in this iteration.
    pub fn elements(
        &self,
    ) -> impl Iterator<Item = (usize, CellIndex, &Element)> + '_ {
        self.index
            .iter()
            .flat_map(|(c, es)| es.iter().map(move |e| (c, e)))
            .enumerate()
            .map(|(i, (c, e))| (i, c, e))
    }

    /// Returns the total number of elements
    pub fn element_count(&self) -> usize {
        self.index.element_count()
    }

    /// Returns the number of elements generated from a single Z layer
    pub fn element_count_on_layer(&self, z: usize) -> usize {
        self.index.element_count_on_layer(z)
    }

    /// Returns the number of elements of the given type
    pub fn element_count_of(&self, kind: ElementType) -> usize {
        self.elements().filter(|(_, _, e)| e.kind() == kind).count()
    }

    /// Returns elements which were rejected during tessellation
    pub fn degenerate(&self) -> &[Degenerate] {
        &self.degenerate
    }

    /// Returns the total volume of rejected elements
    ///
    /// Collapsed pieces contribute (numerically) nothing, so this measures
    /// the gaps that the quality check has opened in the mesh.
    pub fn rejected_volume(&self) -> f64 {
        self.degenerate.iter().map(|d| d.volume).sum()
    }

    /// Returns nodes tied to the faces of quadratic hexahedra
    ///
    /// These appear where a C3D10 borders a C3D20R (see [`FaceTie`]).
    /// Linear hexahedra need no ties: a C3D8 face and the two C3D4 faces
    /// against it share all of their nodes, though the C3D8 face is bilinear
    /// and the tetrahedra split it into two flat triangles.
    pub fn ties(&self) -> &[FaceTie] {
        &self.ties
    }

    /// Finds the node nearest to `p`, searching the cell which contains it
    ///
    /// Points outside the grid are clamped into it.  The node is `None` if
    /// that cell has no elements.
    pub fn locate(&self, p: &Point3<f64>) -> (Option<u32>, CellIndex) {
        let cell = self.grid().cell_of(p);
        let node = self
            .cell(cell)
            .iter()
            .flat_map(|e| e.nodes().iter().copied())
            .map(|n| (n, (self.vertex(n) - p).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(n, _)| n);
        (node, cell)
    }

    /// Finds every cell overlapping the bounding box of `points`
    pub fn voxels_intersecting(&self, points: &[Point3<f64>]) -> Region {
        self.index.voxels_intersecting(points)
    }

    /// Counts groups of face-connected cells which hold elements
    pub fn count_components(&self) -> usize {
        self.index.components()
    }
}
