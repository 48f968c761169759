//! Per-cell tessellation into solid finite elements
//!
//! Each grid cell is split into the 6 Kuhn tetrahedra around its `0-6`
//! diagonal.  Tetrahedra which are fully inside the model are kept as-is;
//! those that straddle the surface are clipped against it (marching
//! tetrahedra), with the clipped prisms split back into tetrahedra.  All of
//! this is precomputed per sign pattern in [`tables`].
//!
//! Hexahedral element kinds use a single hexahedron for cells that are
//! entirely inside the model, falling back to clipped tetrahedra on the
//! boundary.
use arrayvec::ArrayVec;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::mesh::ElementType;

pub mod quality;
pub mod tables;

use quality::Defect;
use tables::{
    CELL_TO_EDGE_MASK, CELL_TO_TETS, CORNER_TO_LATTICE, LATTICE_SIZE,
    LATTICE_TO_CORNERS,
};

/// Cell corner offsets
///
/// Corners `0..4` go counter-clockwise around the bottom face (looking down
/// Z), and corners `4..8` lie directly above them.  This is also the corner
/// order of a C3D8 hexahedron.
pub const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Hexahedron edges, in C3D20 midside order
pub const HEX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Tetrahedron edges, in C3D10 midside order
pub const TET_EDGES: [(usize, usize); 6] =
    [(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];

/// Samples closer than this to the isovalue are treated as lying on it
pub const EPSILON: f64 = 1e-12;

/// Crossings closer than this fraction of an edge to either end move onto it
///
/// Without snapping, a crossing near a corner leaves a thin wedge between
/// the surface and the neighboring lattice points, and those wedges fail the
/// quality check.  At this fraction, clipped pieces are either well-shaped
/// or collapsed to zero volume.
pub const SNAP: f64 = 0.35;

/// Element family to generate
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Linear tetrahedra (C3D4)
    #[default]
    Tet4,
    /// Quadratic tetrahedra (C3D10)
    Tet10,
    /// Linear hexahedra (C3D8), with C3D4 on the boundary
    Hex8,
    /// Quadratic reduced-integration hexahedra (C3D20R), with C3D10 on the
    /// boundary
    Hex20R,
}

impl ElementKind {
    /// Returns the element type used for tetrahedra
    pub fn tet_type(self) -> ElementType {
        match self {
            ElementKind::Tet4 | ElementKind::Hex8 => ElementType::Tet4,
            ElementKind::Tet10 | ElementKind::Hex20R => ElementType::Tet10,
        }
    }

    /// Returns the element type used for fully-inside hexahedral cells
    ///
    /// This is `None` for tetrahedral kinds.
    pub fn hex_type(self) -> Option<ElementType> {
        match self {
            ElementKind::Tet4 | ElementKind::Tet10 => None,
            ElementKind::Hex8 => Some(ElementType::Hex8),
            ElementKind::Hex20R => Some(ElementType::Hex20R),
        }
    }
}

/// Handling of cells which cross the surface
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Clip boundary cells against the surface
    #[default]
    Clip,
    /// Keep fully-inside cells only, giving a stair-stepped boundary
    Voxel,
}

/// Finds the point where the field crosses `iso` along an edge
///
/// If both samples are within [`EPSILON`] of the isovalue, the midpoint is
/// returned; if only one is, its endpoint is returned.  Otherwise, crossings
/// within [`SNAP`] of an endpoint (as a fraction of the edge) return that
/// endpoint.
pub fn interpolate(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    v1: f64,
    v2: f64,
    iso: f64,
) -> Point3<f64> {
    let close1 = (iso - v1).abs() < EPSILON;
    let close2 = (iso - v2).abs() < EPSILON;
    if close1 && close2 {
        return nalgebra::center(p1, p2);
    }
    if close1 {
        return *p1;
    }
    if close2 {
        return *p2;
    }
    let t = (iso - v1) / (v2 - v1);
    if t < SNAP {
        *p1
    } else if t > 1.0 - SNAP {
        *p2
    } else {
        p1 + (p2 - p1) * t
    }
}

/// Builds an 8-bit mask of which corners are below the isovalue
pub fn sign_pattern(values: &[f64; 8], iso: f64) -> u8 {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < iso)
        .fold(0, |m, (i, _)| m | (1 << i))
}

/// Element produced by the tessellator, with its nodes as positions
#[derive(Clone, Debug)]
pub struct RawElement {
    /// Element type
    pub kind: ElementType,
    /// Node positions, in solver node order
    pub points: ArrayVec<Point3<f64>, 20>,
}

/// Candidate element which failed the quality check
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rejected {
    /// Type the element would have had
    pub kind: ElementType,
    /// Reason for rejection
    pub defect: Defect,
    /// Unsigned volume of the element's corner tetrahedron
    pub volume: f64,
}

/// Reusable output buffer for [`Tessellator::cell`]
#[derive(Default)]
pub struct CellOutput {
    /// Elements generated from the cell
    pub elements: Vec<RawElement>,
    /// Candidate elements rejected by the quality check
    pub defects: Vec<Rejected>,
}

impl CellOutput {
    /// Empties both buffers, keeping their allocations
    pub fn clear(&mut self) {
        self.elements.clear();
        self.defects.clear();
    }

    fn push_tet(&mut self, kind: ElementType, t: [Point3<f64>; 4]) {
        let mut points: ArrayVec<_, 20> = t.into_iter().collect();
        if kind == ElementType::Tet10 {
            points.extend(
                TET_EDGES.iter().map(|&(a, b)| nalgebra::center(&t[a], &t[b])),
            );
        }
        self.elements.push(RawElement { kind, points });
    }

    fn push_hex(&mut self, kind: ElementType, c: &[Point3<f64>; 8]) {
        let mut points: ArrayVec<_, 20> = c.iter().cloned().collect();
        if kind == ElementType::Hex20R {
            points.extend(
                HEX_EDGES.iter().map(|&(a, b)| nalgebra::center(&c[a], &c[b])),
            );
        }
        self.elements.push(RawElement { kind, points });
    }
}

/// Converts cells into elements
#[derive(Copy, Clone, Debug)]
pub struct Tessellator {
    kind: ElementKind,
    surface: Surface,
    iso: f64,
}

impl Tessellator {
    /// Builds a tessellator with an isovalue of 0
    pub fn new(kind: ElementKind, surface: Surface) -> Self {
        Self {
            kind,
            surface,
            iso: 0.0,
        }
    }

    /// Tessellates a single cell, appending to `out`
    ///
    /// `corners` and `values` are in [`CORNERS`] order.  Tetrahedra which
    /// fail [`quality::check`] are recorded in `out.defects` instead of
    /// `out.elements`.
    pub fn cell(
        &self,
        corners: &[Point3<f64>; 8],
        values: &[f64; 8],
        out: &mut CellOutput,
    ) {
        let mask = sign_pattern(values, self.iso);
        if mask == 0 {
            return;
        }
        if mask == 0xFF {
            if let Some(hex) = self.kind.hex_type() {
                out.push_hex(hex, corners);
                return;
            }
        } else if self.surface == Surface::Voxel {
            return;
        }

        let mut lattice = [Point3::origin(); LATTICE_SIZE];
        for (c, &l) in CORNER_TO_LATTICE.iter().enumerate() {
            lattice[l as usize] = corners[c];
        }
        let edges = CELL_TO_EDGE_MASK[mask as usize];
        for (l, pt) in lattice.iter_mut().enumerate() {
            if edges & (1 << l) != 0 {
                let (a, b) = LATTICE_TO_CORNERS[l];
                *pt = interpolate(
                    &corners[a],
                    &corners[b],
                    values[a],
                    values[b],
                    self.iso,
                );
            }
        }

        let kind = self.kind.tet_type();
        for tet in CELL_TO_TETS[mask as usize] {
            let t = tet.map(|l| lattice[l as usize]);
            match quality::check(&t) {
                Some(defect) => out.defects.push(Rejected {
                    kind,
                    defect,
                    volume: quality::volume(&t).abs(),
                }),
                None => out.push_tet(kind, t),
            }
        }
    }
}
