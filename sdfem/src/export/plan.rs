use nalgebra::Vector3;
use std::{collections::BTreeSet, ops::Range};

use super::{Analysis, ExportSettings};
use crate::{
    Error,
    mesh::{ElementType, FaceTie, Mesh},
};

/// Everything the writer needs, checked before any file is created
pub(super) struct Plan {
    /// Exported Z layers
    pub layers: Range<usize>,
    /// Node ids referenced by exported elements, in ascending order
    pub nodes: Vec<u32>,
    /// Sorted node ids for each restraint
    pub node_sets: Vec<Vec<u32>>,
    /// Exported face ties, each with the degrees of freedom to tie
    pub ties: Vec<(FaceTie, Vec<u8>)>,
    /// Gravity magnitude and unit direction, if enabled
    pub gravity: Option<(f64, Vector3<f64>)>,
    /// Number of elements with an unknown type in the exported layers
    pub skipped_unknown: usize,
}

impl Plan {
    pub fn new(
        mesh: &Mesh,
        analysis: &Analysis,
        settings: &ExportSettings,
    ) -> Result<Self, Error> {
        let layer_count = mesh.layer_count();
        let layers = settings.layers.clone().unwrap_or(0..layer_count);
        if layers.start >= layers.end || layers.end > layer_count {
            return Err(Error::BadLayerRange {
                start: layers.start,
                end: layers.end,
                layers: layer_count,
            });
        }
        analysis.material.validate()?;
        let gravity = analysis.gravity.validate()?;

        let mut used = vec![false; mesh.vertex_count()];
        let mut skipped_unknown = 0;
        for (i, c, e) in mesh.elements() {
            if !layers.contains(&c.z) {
                continue;
            }
            if e.kind() == ElementType::Unknown {
                log::warn!("skipping element {i} in cell {c:?} (unknown type)");
                skipped_unknown += 1;
                continue;
            }
            for &n in e.nodes() {
                used[n as usize] = true;
            }
        }
        let nodes = used
            .iter()
            .enumerate()
            .filter(|(_, u)| **u)
            .map(|(i, _)| i as u32)
            .collect();

        let mut node_sets: Vec<Vec<u32>> = Vec::with_capacity(analysis.restraints.len());
        for (i, r) in analysis.restraints.iter().enumerate() {
            if !r.fixed.any() {
                return Err(Error::NoFixedDof(i));
            }
            let cells = r.cells().ok_or(Error::UnresolvedRestraint(i))?;
            let set: BTreeSet<u32> = cells
                .iter()
                .filter(|c| layers.contains(&c.z))
                .flat_map(|c| mesh.cell(*c))
                .filter(|e| e.kind() != ElementType::Unknown)
                .flat_map(|e| e.nodes().iter().copied())
                .collect();
            if set.is_empty() {
                return Err(Error::EmptyRestraint(i));
            }
            node_sets.push(set.into_iter().collect());
        }

        // A restrained degree of freedom can't also be a dependent one
        let mut ties = vec![];
        for t in mesh.ties() {
            if !layers.contains(&t.cell.z) || !used[t.node as usize] {
                continue;
            }
            let dofs: Vec<u8> = (1..=3)
                .filter(|d| {
                    !analysis.restraints.iter().zip(&node_sets).any(|(r, set)| {
                        set.binary_search(&t.node).is_ok()
                            && r.fixed.dofs().any(|f| f == *d)
                    })
                })
                .collect();
            if !dofs.is_empty() {
                ties.push((*t, dofs));
            }
        }

        for (i, l) in analysis.loads.iter().enumerate() {
            let t = l.target().ok_or(Error::UnresolvedLoad(i))?;
            if !used.get(t.node as usize).copied().unwrap_or(false) {
                return Err(Error::LoadOutsideLayers(i));
            }
        }

        Ok(Self {
            layers,
            nodes,
            node_sets,
            ties,
            gravity,
            skipped_unknown,
        })
    }
}
