//! Module containing the universal error type
use nalgebra::Point3;
use thiserror::Error;

/// Universal error type for `sdfem`
#[derive(Error, Debug)]
pub enum Error {
    /// Export layer range is empty or extends past the mesh
    #[error("bad layer range {start}..{end} for a mesh with {layers} layers")]
    BadLayerRange {
        /// First exported layer
        start: usize,
        /// One past the last exported layer
        end: usize,
        /// Number of layers in the mesh
        layers: usize,
    },

    /// Restraint at the given index has no fixed degree of freedom
    #[error("restraint {0} does not fix any degree of freedom")]
    NoFixedDof(usize),

    /// Restraint at the given index does not touch any exported node
    #[error("restraint {0} does not touch any exported node")]
    EmptyRestraint(usize),

    /// Restraint at the given index was never resolved against the mesh
    #[error("restraint {0} has not been resolved against the mesh")]
    UnresolvedRestraint(usize),

    /// Load at the given index was never resolved against the mesh
    #[error("load {0} has not been resolved against the mesh")]
    UnresolvedLoad(usize),

    /// Load location falls in a cell without elements
    #[error("load at {location} is not near any element")]
    LoadOutsideMesh {
        /// Requested load location
        location: Point3<f64>,
    },

    /// Load at the given index targets a node outside the exported layers
    #[error("load {0} targets a node outside the exported layers")]
    LoadOutsideLayers(usize),

    /// Material constant is not a finite positive number
    #[error("material {property} must be finite and positive (got {value})")]
    InvalidMaterial {
        /// Name of the offending property
        property: &'static str,
        /// Value provided
        value: f64,
    },

    /// Gravity is enabled with a degenerate direction or a magnitude which is
    /// not finite and positive
    #[error("gravity needs a finite non-zero direction and a positive magnitude")]
    InvalidGravity,

    /// Grid resolution must be at least one cell
    #[error("resolution must be at least 1")]
    BadResolution,

    /// Field bounds are empty or not finite
    #[error("bounding box must have a finite non-zero extent")]
    EmptyBounds,

    /// Element of a known type was given the wrong number of nodes
    #[error("{kind} element needs {expected} nodes (got {actual})")]
    NodeCountMismatch {
        /// Solver name of the element type
        kind: &'static str,
        /// Number of nodes for that type
        expected: usize,
        /// Number of nodes provided
        actual: usize,
    },

    /// Element has more nodes than any supported type
    #[error("element has too many nodes ({0})")]
    TooManyNodes(usize),

    /// Evaluation workers exited before returning every batch
    #[error("evaluation workers disconnected")]
    PoolDisconnected,

    /// An evaluation worker panicked while evaluating the field
    #[error("evaluation worker panicked: {0}")]
    WorkerPanicked(String),

    /// The operation was cancelled
    #[error("cancelled")]
    Cancelled,

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
