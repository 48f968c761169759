use crate::grid::CellIndex;

/// Faces of a C3D20 element, as 4 corners (in cyclic order) then the 4
/// midsides between them
pub const HEX20_FACES: [[usize; 8]; 6] = [
    [0, 1, 2, 3, 8, 9, 10, 11],
    [4, 5, 6, 7, 12, 13, 14, 15],
    [0, 1, 5, 4, 8, 17, 12, 16],
    [1, 2, 6, 5, 9, 18, 13, 17],
    [2, 3, 7, 6, 10, 19, 14, 18],
    [3, 0, 4, 7, 11, 16, 15, 19],
];

/// Serendipity shape-function weight of a face corner at the face center
pub const CORNER_WEIGHT: f64 = -0.25;

/// Serendipity shape-function weight of a face midside at the face center
pub const MIDSIDE_WEIGHT: f64 = 0.5;

/// Node which sits at the center of a quadratic hexahedron's face
///
/// A C3D20R face has no center node, but a C3D10 on the far side of that
/// face puts the midside of its diagonal edge there.  Tying the node to the
/// hexahedron's face interpolation makes the two elements displace together.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaceTie {
    /// The hanging node
    pub node: u32,
    /// Cell holding the hexahedron
    pub cell: CellIndex,
    /// Corner nodes of the face
    pub corners: [u32; 4],
    /// Midside nodes of the face
    pub midsides: [u32; 4],
}

impl FaceTie {
    /// Returns `(node, coefficient)` terms of the homogeneous tie equation
    ///
    /// The hanging node comes first, with a coefficient of 1; the terms sum
    /// to zero when it follows the face's shape functions.
    pub fn terms(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        std::iter::once((self.node, 1.0))
            .chain(self.corners.iter().map(|&n| (n, -CORNER_WEIGHT)))
            .chain(self.midsides.iter().map(|&n| (n, -MIDSIDE_WEIGHT)))
    }
}
