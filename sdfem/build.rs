use std::io::Write;

// Same corner numbering as `sdfem::tessellate`, but available at build time.
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Kuhn decomposition of the cube into 6 tetrahedra around the 0-6 diagonal
///
/// Every face of the cube is split along the diagonal running from its
/// minimum corner to its maximum corner, so neighboring cells agree.
const KUHN: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 1, 5, 6],
    [0, 3, 2, 6],
    [0, 3, 7, 6],
    [0, 4, 5, 6],
    [0, 4, 7, 6],
];

/// Prism relabelings which move vertex `i` into slot 0
///
/// Prisms are numbered with `(0, 1, 2)` as one triangle, `(3, 4, 5)` as the
/// other, and lateral edges `0-3`, `1-4`, `2-5`.
const PRISM_ROTATIONS: [[usize; 6]; 6] = [
    [0, 1, 2, 3, 4, 5],
    [1, 2, 0, 4, 5, 3],
    [2, 0, 1, 5, 3, 4],
    [3, 5, 4, 0, 2, 1],
    [4, 3, 5, 1, 0, 2],
    [5, 4, 3, 2, 1, 0],
];

/// Packs a point of the 3x3x3 cell lattice into an index
///
/// Lattice coordinates are doubled cell coordinates, so corners sit at even
/// positions and edge midpoints at odd ones.  Comparing indices compares
/// positions in `(z, y, x)` order, which is the same in every cell.
fn lattice(p: [usize; 3]) -> u8 {
    (p[0] + 3 * p[1] + 9 * p[2]) as u8
}

fn coords(l: u8) -> [i64; 3] {
    let l = l as i64;
    [l % 3, (l / 3) % 3, l / 9]
}

fn corner(c: usize) -> u8 {
    lattice(CORNERS[c].map(|v| v * 2))
}

fn edge(a: usize, b: usize) -> u8 {
    let (pa, pb) = (CORNERS[a], CORNERS[b]);
    lattice([pa[0] + pb[0], pa[1] + pb[1], pa[2] + pb[2]])
}

/// Signed volume (times 6) of a tetrahedron on the lattice
fn volume(t: [u8; 4]) -> i64 {
    let [a, b, c, d] = t.map(coords);
    let sub = |p: [i64; 3], q: [i64; 3]| [p[0] - q[0], p[1] - q[1], p[2] - q[2]];
    let (ab, ac, ad) = (sub(b, a), sub(c, a), sub(d, a));
    let cross = [
        ac[1] * ad[2] - ac[2] * ad[1],
        ac[2] * ad[0] - ac[0] * ad[2],
        ac[0] * ad[1] - ac[1] * ad[0],
    ];
    ab[0] * cross[0] + ab[1] * cross[1] + ab[2] * cross[2]
}

/// Reorders a tetrahedron so that its Jacobian is positive
///
/// Crossing points are placed at edge midpoints here; the sign of the volume
/// doesn't change as they slide along their edges.
fn orient(mut t: [u8; 4]) -> [u8; 4] {
    let v = volume(t);
    assert!(v != 0, "flat tetrahedron {t:?} in table");
    if v < 0 {
        t.swap(1, 2);
    }
    t
}

/// Splits a prism into 3 tetrahedra
///
/// The split picks, on every quad face, the diagonal which touches the
/// smallest vertex of that face (Dompierre et al, 1999).  Since the vertex
/// order is global, both cells that share a face split it the same way.
fn split_prism(v: [u8; 6]) -> [[u8; 4]; 3] {
    let min = (0..6).min_by_key(|&i| v[i]).unwrap();
    let v = PRISM_ROTATIONS[min].map(|i| v[i]);
    if v[1].min(v[5]) < v[2].min(v[4]) {
        [
            [v[0], v[1], v[2], v[5]],
            [v[0], v[1], v[5], v[4]],
            [v[0], v[4], v[5], v[3]],
        ]
    } else {
        [
            [v[0], v[1], v[2], v[4]],
            [v[0], v[4], v[2], v[5]],
            [v[0], v[4], v[5], v[3]],
        ]
    }
}

/// Builds tables for volumetric marching tetrahedra
///
/// For each of the 256 corner sign patterns, we record which lattice edges
/// cross the surface and the list of (oriented) tetrahedra covering the
/// inside of the cell.
fn main() -> Result<(), std::io::Error> {
    println!("cargo:rerun-if-changed=build.rs");

    let mut edge_table = vec![];
    let mut tet_table = vec![];

    for i in 0..256usize {
        let inside = |c: usize| (i & (1 << c)) != 0;
        let mut mask = 0u32;
        let mut tets = vec![];
        let mut e = |a: usize, b: usize| {
            let l = edge(a, b);
            mask |= 1 << l;
            l
        };

        for kuhn in KUHN {
            let (ins, outs): (Vec<usize>, Vec<usize>) =
                kuhn.iter().partition(|&&c| inside(c));
            match ins.len() {
                0 => (),
                1 => {
                    let a = ins[0];
                    tets.push([
                        corner(a),
                        e(a, outs[0]),
                        e(a, outs[1]),
                        e(a, outs[2]),
                    ]);
                }
                2 => {
                    let (a, b) = (ins[0], ins[1]);
                    let (c, d) = (outs[0], outs[1]);
                    let prism = [
                        corner(a),
                        e(a, c),
                        e(a, d),
                        corner(b),
                        e(b, c),
                        e(b, d),
                    ];
                    tets.extend(split_prism(prism));
                }
                3 => {
                    let d = outs[0];
                    let prism = [
                        corner(ins[0]),
                        corner(ins[1]),
                        corner(ins[2]),
                        e(ins[0], d),
                        e(ins[1], d),
                        e(ins[2], d),
                    ];
                    tets.extend(split_prism(prism));
                }
                4 => tets.push(kuhn.map(corner)),
                _ => unreachable!(),
            }
        }
        edge_table.push(mask);
        tet_table.push(tets.into_iter().map(orient).collect::<Vec<_>>());
    }

    let out_dir = std::env::var_os("OUT_DIR").unwrap();
    let dest_path = std::path::Path::new(&out_dir).join("fe_tables.rs");
    let mut file =
        std::fs::File::create(dest_path).expect("could not make output file");

    writeln!(
        &mut file,
        "
/// Lattice position of each cube corner
pub const CORNER_TO_LATTICE: [u8; 8] = {:?};",
        (0..8).map(corner).collect::<Vec<_>>()
    )?;

    writeln!(
        &mut file,
        "
/// Endpoints of the lattice edge through each lattice point
///
/// Entries are `(lo, hi)` cube corners, with `lo` before `hi` in lattice
/// order; corner points map to themselves.
pub const LATTICE_TO_CORNERS: [(usize, usize); 27] = ["
    )?;
    for l in 0..27u8 {
        let c = coords(l);
        let lo = c.map(|v| if v == 1 { 0 } else { v as usize });
        let hi = c.map(|v| if v == 1 { 2 } else { v as usize });
        let find = |p: [usize; 3]| {
            CORNERS.iter().position(|q| q.map(|v| v * 2) == p).unwrap()
        };
        writeln!(&mut file, "    ({}, {}),", find(lo), find(hi))?;
    }
    writeln!(&mut file, "];")?;

    writeln!(
        &mut file,
        "
/// Lookup table of lattice edges that cross the surface
///
/// Given a cell sign pattern `i`, bit `l` is set if the lattice point `l`
/// lies on a Kuhn edge with one corner inside and one outside the model.
pub const CELL_TO_EDGE_MASK: [u32; 256] = ["
    )?;
    for m in edge_table {
        writeln!(&mut file, "    {m:#09x},")?;
    }
    writeln!(&mut file, "];")?;

    writeln!(
        &mut file,
        "
/// Lookup table of tetrahedra covering the inside of a cell
///
/// Given a cell sign pattern `i`, returns a list of tetrahedra as lattice
/// points, each ordered to have a positive Jacobian.
pub const CELL_TO_TETS: [&[[u8; 4]]; 256] = ["
    )?;
    for tets in tet_table {
        write!(&mut file, "    &[")?;
        for t in tets {
            write!(&mut file, "{t:?}, ")?;
        }
        writeln!(&mut file, "],")?;
    }
    writeln!(&mut file, "];")?;

    Ok(())
}
