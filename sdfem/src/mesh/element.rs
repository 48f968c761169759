use arrayvec::ArrayVec;

use crate::Error;

/// Largest number of nodes in a single element
pub const MAX_NODES: usize = 20;

/// Solid element type, named after its CalculiX / ABAQUS keyword
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::EnumIter,
    strum::IntoStaticStr,
    strum::Display,
)]
pub enum ElementType {
    /// Linear tetrahedron
    #[strum(serialize = "C3D4")]
    Tet4,
    /// Quadratic tetrahedron
    #[strum(serialize = "C3D10")]
    Tet10,
    /// Linear hexahedron
    #[strum(serialize = "C3D8")]
    Hex8,
    /// Quadratic hexahedron with reduced integration
    #[strum(serialize = "C3D20R")]
    Hex20R,
    /// Anything else; skipped on export
    #[strum(serialize = "unknown")]
    Unknown,
}

impl ElementType {
    /// Every exportable type, in export order
    pub const SOLID: [ElementType; 4] = [
        ElementType::Tet4,
        ElementType::Tet10,
        ElementType::Hex8,
        ElementType::Hex20R,
    ];

    /// Returns the number of nodes, or `None` for [`ElementType::Unknown`]
    pub fn node_count(self) -> Option<usize> {
        match self {
            ElementType::Tet4 => Some(4),
            ElementType::Tet10 => Some(10),
            ElementType::Hex8 => Some(8),
            ElementType::Hex20R => Some(20),
            ElementType::Unknown => None,
        }
    }

    /// Returns the solver keyword, e.g. `C3D4`
    pub fn solver_name(self) -> &'static str {
        self.into()
    }

    /// Returns the name of the element set holding this type, e.g. `eC3D4`
    pub fn element_set(self) -> String {
        format!("e{self}")
    }

    /// Position within [`ElementType::SOLID`]
    pub fn solid_index(self) -> Option<usize> {
        Self::SOLID.iter().position(|t| *t == self)
    }
}

/// A single element: type tag plus node ids in solver order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    kind: ElementType,
    nodes: ArrayVec<u32, MAX_NODES>,
}

impl Element {
    /// Builds a new element, checking the node count for known types
    pub fn new(kind: ElementType, nodes: &[u32]) -> Result<Self, Error> {
        if let Some(expected) = kind.node_count() {
            if expected != nodes.len() {
                return Err(Error::NodeCountMismatch {
                    kind: kind.solver_name(),
                    expected,
                    actual: nodes.len(),
                });
            }
        }
        let nodes = ArrayVec::try_from(nodes)
            .map_err(|_| Error::TooManyNodes(nodes.len()))?;
        Ok(Self { kind, nodes })
    }

    /// Returns the element type
    pub fn kind(&self) -> ElementType {
        self.kind
    }

    /// Returns node ids, in solver order
    pub fn nodes(&self) -> &[u32] {
        &self.nodes
    }
}
