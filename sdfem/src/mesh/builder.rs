use arrayvec::ArrayVec;
use nalgebra::Point3;

use super::{
    Degenerate, Element, ElementType, FaceTie, HEX20_FACES, Mesh, SpatialIndex,
    VertexBuilder, element::MAX_NODES,
};
use crate::{
    Error,
    grid::{CellIndex, Grid},
    tessellate::{CellOutput, Rejected},
};

/// Container used during construction of a [`Mesh`]
pub struct MeshBuilder {
    vertices: VertexBuilder,
    index: SpatialIndex,
    degenerate: Vec<Degenerate>,
}

impl MeshBuilder {
    /// Builds an empty mesh over the given grid
    pub fn new(grid: Grid) -> Self {
        Self {
            vertices: VertexBuilder::new(),
            index: SpatialIndex::new(grid),
            degenerate: vec![],
        }
    }

    /// Looks up the given vertex, adding it if it hasn't been seen before
    pub fn add_vertex(&mut self, p: Point3<f64>) -> u32 {
        self.vertices.add(p)
    }

    /// Appends an element to the given cell
    ///
    /// Node ids must come from [`MeshBuilder::add_vertex`].
    pub fn add_element(
        &mut self,
        cell: CellIndex,
        kind: ElementType,
        nodes: &[u32],
    ) -> Result<(), Error> {
        debug_assert!(nodes.iter().all(|&n| (n as usize) < self.vertices.len()));
        let e = Element::new(kind, nodes)?;
        self.index.push(cell, e);
        Ok(())
    }

    /// Records an element which was rejected by the quality check
    pub fn add_degenerate(&mut self, d: Degenerate) {
        self.degenerate.push(d);
    }

    /// Moves a tessellated cell's output into the mesh, emptying `out`
    pub fn ingest(
        &mut self,
        cell: CellIndex,
        out: &mut CellOutput,
    ) -> Result<(), Error> {
        for e in out.elements.drain(..) {
            let ids: ArrayVec<u32, MAX_NODES> =
                e.points.iter().map(|p| self.vertices.add(*p)).collect();
            self.add_element(cell, e.kind, &ids)?;
        }
        for Rejected {
            kind,
            defect,
            volume,
        } in out.defects.drain(..)
        {
            self.add_degenerate(Degenerate {
                cell,
                kind,
                defect,
                volume,
            });
        }
        Ok(())
    }

    /// Finds nodes sitting at the center of a C3D20R face
    ///
    /// Both face diagonals are checked, since a neighboring C3D10 may split
    /// the face along either one.
    fn face_ties(&self) -> Vec<FaceTie> {
        let mut ties = vec![];
        for (cell, elements) in self.index.iter() {
            for e in elements.iter().filter(|e| e.kind() == ElementType::Hex20R)
            {
                let n = e.nodes();
                for face in &HEX20_FACES {
                    let corners = [0, 1, 2, 3].map(|i| n[face[i]]);
                    let p = corners.map(|c| self.vertices.get(c));
                    let node = [(0, 2), (1, 3)]
                        .into_iter()
                        .filter_map(|(a, b)| {
                            self.vertices.find(&nalgebra::center(&p[a], &p[b]))
                        })
                        .find(|id| !n.contains(id));
                    if let Some(node) = node {
                        ties.push(FaceTie {
                            node,
                            cell,
                            corners,
                            midsides: [4, 5, 6, 7].map(|i| n[face[i]]),
                        });
                    }
                }
            }
        }
        ties
    }

    /// Seals the vertex buffer and returns the finished mesh
    ///
    /// This is also where hanging nodes on quadratic hexahedron faces are
    /// found (see [`FaceTie`]).
    pub fn finish(self) -> Mesh {
        let ties = self.face_ties();
        Mesh {
            vertices: self.vertices.seal(),
            index: self.index,
            degenerate: self.degenerate,
            ties,
        }
    }
}
