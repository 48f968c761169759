//! Boundary conditions and loads
//!
//! Restraints and loads are given as positions in model space, then resolved
//! against a finished [`Mesh`]: restraints pick up the grid cells around
//! them, and loads snap to their nearest node.  Export requires every
//! restraint and load to be resolved.
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    export::{Gravity, Material},
    grid::CellIndex,
    mesh::Mesh,
};

/// Which translational degrees of freedom are fixed
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixed {
    /// Fix displacement along X
    #[serde(default)]
    pub x: bool,
    /// Fix displacement along Y
    #[serde(default)]
    pub y: bool,
    /// Fix displacement along Z
    #[serde(default)]
    pub z: bool,
}

impl Fixed {
    /// Every axis fixed
    pub const ALL: Fixed = Fixed {
        x: true,
        y: true,
        z: true,
    };

    /// Checks whether at least one axis is fixed
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }

    /// Returns the solver's degree-of-freedom numbers (1-3) for fixed axes
    pub fn dofs(&self) -> impl Iterator<Item = u8> {
        [self.x, self.y, self.z]
            .into_iter()
            .zip(1..)
            .filter_map(|(f, dof)| f.then_some(dof))
    }
}

/// Displacement restraint over one or more locations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Restraint {
    /// Restrained locations; more than one point spans a region
    pub locations: Vec<Point3<f64>>,
    /// Fixed degrees of freedom
    pub fixed: Fixed,
    /// Cells covered by the restraint, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cells: Option<Vec<CellIndex>>,
}

impl Restraint {
    /// Builds a restraint at a single point
    pub fn new(location: Point3<f64>, fixed: Fixed) -> Self {
        Self::region(vec![location], fixed)
    }

    /// Builds a restraint over the bounding box of a set of points
    pub fn region(locations: Vec<Point3<f64>>, fixed: Fixed) -> Self {
        Self {
            locations,
            fixed,
            cells: None,
        }
    }

    /// Supplies the restrained cells directly
    ///
    /// Pre-supplied cells are kept by [`Restraint::resolve`].
    pub fn with_cells(mut self, cells: Vec<CellIndex>) -> Self {
        self.cells = Some(cells);
        self
    }

    /// Returns the restrained cells, if resolved
    pub fn cells(&self) -> Option<&[CellIndex]> {
        self.cells.as_deref()
    }

    /// Checks whether cells are known
    pub fn is_resolved(&self) -> bool {
        self.cells.is_some()
    }

    /// Finds the cells covering this restraint's locations
    pub fn resolve(&mut self, mesh: &Mesh) {
        if self.cells.is_none() {
            let region = mesh.voxels_intersecting(&self.locations);
            self.cells = Some(region.cells);
        }
    }
}

/// Node and cell picked for a load
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LoadTarget {
    /// Node id (0-based)
    pub node: u32,
    /// Cell holding the node
    pub cell: CellIndex,
}

/// Concentrated force applied at the node nearest to a location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Requested location
    pub location: Point3<f64>,
    /// Force vector
    pub force: Vector3<f64>,
    #[serde(skip)]
    target: Option<LoadTarget>,
}

impl Load {
    /// Builds a new (unresolved) load
    pub fn new(location: Point3<f64>, force: Vector3<f64>) -> Self {
        Self {
            location,
            force,
            target: None,
        }
    }

    /// Returns the resolved target, if any
    pub fn target(&self) -> Option<LoadTarget> {
        self.target
    }

    /// Checks whether a target node is known
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    /// Picks the node nearest to the load's location
    ///
    /// Returns [`Error::LoadOutsideMesh`] if the location's cell holds no
    /// elements.
    pub fn resolve(&mut self, mesh: &Mesh) -> Result<(), Error> {
        let (node, cell) = mesh.locate(&self.location);
        let node = node.ok_or(Error::LoadOutsideMesh {
            location: self.location,
        })?;
        self.target = Some(LoadTarget { node, cell });
        Ok(())
    }
}

/// Everything needed to describe a static analysis besides the mesh
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    /// Material assigned to every element
    pub material: Material,
    /// Displacement restraints
    pub restraints: Vec<Restraint>,
    /// Concentrated loads
    pub loads: Vec<Load>,
    /// Body load from gravity
    pub gravity: Gravity,
}

impl Analysis {
    /// Resolves every restraint and load against the mesh
    pub fn resolve(&mut self, mesh: &Mesh) -> Result<(), Error> {
        for r in &mut self.restraints {
            r.resolve(mesh);
        }
        for l in &mut self.loads {
            l.resolve(mesh)?;
        }
        Ok(())
    }
}
