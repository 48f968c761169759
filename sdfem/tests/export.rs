use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use nalgebra::{Point3, Vector3};
use sdfem::{
    Error,
    boundary::{Analysis, Fixed, Load, Restraint},
    export::{ExportSettings, Gravity, write_inp},
    field::{BoundingBox, Field},
    grid::{CellIndex, Grid},
    mesh::{ElementType, Mesh, MeshBuilder, Settings},
    sample::ThreadCount,
    tessellate::{CORNERS, ElementKind, HEX_EDGES, Surface, TET_EDGES},
};

/// Box of size 4 x 2 x 2, sitting on the XY plane
struct Block;

impl Field for Block {
    fn evaluate(&self, p: Point3<f64>) -> f64 {
        let q = (p.coords - Vector3::new(0.0, 0.0, 1.0)).abs()
            - Vector3::new(2.0, 1.0, 1.0);
        q.max()
    }
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(Point3::new(-2.0, -1.0, 0.0), Point3::new(2.0, 1.0, 2.0))
    }
}

fn block(element: ElementKind) -> Mesh {
    let settings = Settings {
        resolution: 8,
        element,
        surface: Surface::Clip,
        threads: ThreadCount::Many(NonZeroUsize::new(2).unwrap()),
        ..Default::default()
    };
    Mesh::build(&Block, &settings).unwrap()
}

/// Clamped at `x = -2`, pushed down at `x = 2`, with gravity
fn cantilever(mesh: &Mesh) -> Analysis {
    let mut a = Analysis {
        restraints: vec![Restraint::region(
            vec![Point3::new(-2.0, -1.0, 0.0), Point3::new(-1.9, 1.0, 2.0)],
            Fixed::ALL,
        )],
        loads: vec![Load::new(
            Point3::new(2.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -10.0),
        )],
        gravity: Gravity {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    };
    a.resolve(mesh).unwrap();
    a
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    s.into()
}

fn read(path: &Path, suffix: &str) -> String {
    std::fs::read_to_string(suffixed(path, suffix)).unwrap()
}

/// Parses data lines following a keyword line, joining wrapped records
fn records(text: &str) -> Vec<Vec<String>> {
    let mut out = vec![];
    let mut current = String::new();
    for line in text.lines().skip(1) {
        current.push_str(line);
        if !line.ends_with(',') {
            out.push(current.split(',').map(str::to_owned).collect());
            current.clear();
        }
    }
    out
}

#[test]
fn test_round_trip() {
    let mesh = block(ElementKind::Tet10);
    let analysis = cantilever(&mesh);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("block.inp");
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();

    // Nodes are written once each, in ascending order, as f32
    let nodes: BTreeMap<u32, [f32; 3]> = records(&read(&path, ".nodes"))
        .into_iter()
        .map(|r| {
            let id: u32 = r[0].parse().unwrap();
            let p = [1, 2, 3].map(|i| r[i].parse::<f32>().unwrap());
            (id, p)
        })
        .collect();
    assert_eq!(nodes.len(), report.nodes);
    assert_eq!(nodes.len(), mesh.vertex_count());
    for (&id, p) in &nodes {
        let v = mesh.vertex(id - 1);
        assert_eq!(*p, [v.x as f32, v.y as f32, v.z as f32]);
    }

    // Elements match the mesh, with 1-based ids
    let expected: Vec<Vec<usize>> = mesh
        .elements()
        .filter(|(_, _, e)| e.kind() == ElementType::Tet10)
        .map(|(i, _, e)| {
            std::iter::once(i + 1)
                .chain(e.nodes().iter().map(|&n| n as usize + 1))
                .collect()
        })
        .collect();
    let text = read(&path, ".elements_C3D10");
    assert!(text.starts_with("*ELEMENT,TYPE=C3D10,ELSET=eC3D10\n"));
    let actual: Vec<Vec<usize>> = records(&text)
        .into_iter()
        .map(|r| r.iter().map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(actual, expected);
    assert_eq!(report.elements_of(ElementType::Tet10), expected.len());
    assert_eq!(report.element_total(), mesh.element_count());

    // Other element files exist, but are empty
    assert_eq!(read(&path, ".elements_C3D4"), "*ELEMENT,TYPE=C3D4,ELSET=eC3D4\n");
    assert_eq!(report.files.len(), 9);
}

#[test]
fn test_master_file() {
    let mesh = block(ElementKind::Hex8);
    let analysis = cantilever(&mesh);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("block.inp");
    write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();

    let master = std::fs::read_to_string(&path).unwrap();
    assert!(master.starts_with("**\n** Structure: finite elements of a 3D model."));
    let include = |s: &str| format!("*INCLUDE,INPUT={}", suffixed(&path, s).display());
    let keys = [
        "*HEADING".to_owned(),
        include(".nodes"),
        include(".elements_C3D4"),
        include(".elements_C3D10"),
        include(".elements_C3D8"),
        include(".elements_C3D20R"),
        include(".boundary"),
        "*MATERIAL,NAME=steel".to_owned(),
        "*ELASTIC,TYPE=ISO\n2.100000e5,3.000000e-1,0".to_owned(),
        "*DENSITY\n7.850000e-9".to_owned(),
        "*SOLID SECTION,MATERIAL=steel,ELSET=eC3D20R".to_owned(),
        "*STEP\n*STATIC".to_owned(),
        include(".load"),
        include(".gravity"),
        "*EL FILE\nS\n*NODE FILE\nU\n*END STEP".to_owned(),
    ];
    let mut pos = 0;
    for k in &keys {
        let i = master[pos..]
            .find(k.as_str())
            .unwrap_or_else(|| panic!("missing {k:?} after offset {pos}"));
        pos += i + k.len();
    }

    let load = read(&path, ".load");
    let lines: Vec<_> = load.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "*CLOAD");
    let node = analysis.loads[0].target().unwrap().node + 1;
    assert_eq!(lines[1], format!("{node},1,0.0"));
    assert_eq!(lines[3], format!("{node},3,-10.0"));

    let gravity = read(&path, ".gravity");
    assert!(gravity.starts_with("*DLOAD\neC3D4,GRAV,9810.0,0.0,0.0,-1.0\n"));
    assert_eq!(gravity.lines().count(), 5);

    let boundary = read(&path, ".boundary");
    assert!(boundary.starts_with("*NSET,NSET=restraint1\n"));
    assert!(boundary.ends_with("*BOUNDARY\nrestraint1,1\nrestraint1,2\nrestraint1,3\n"));
}

#[test]
fn test_optional_files() {
    let mesh = block(ElementKind::Tet4);
    let mut analysis = cantilever(&mesh);
    analysis.loads.clear();
    analysis.gravity.enabled = false;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("block.inp");
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();
    assert!(!suffixed(&path, ".load").exists());
    assert!(!suffixed(&path, ".gravity").exists());
    assert_eq!(report.files.len(), 7);

    let master = std::fs::read_to_string(&path).unwrap();
    assert!(!master.contains(".load"));
    assert!(master.contains("*STATIC\n*EL FILE\n"));
}

#[test]
fn test_layer_ranges() {
    let mesh = block(ElementKind::Tet4);
    let analysis = cantilever(&mesh);
    let n = mesh.layer_count();

    let dir = tempfile::tempdir().unwrap();
    let all = dir.path().join("all.inp");
    let full = dir.path().join("full.inp");
    write_inp(&all, &mesh, &analysis, &ExportSettings::default()).unwrap();
    let settings = ExportSettings { layers: Some(0..n) };
    write_inp(&full, &mesh, &analysis, &settings).unwrap();
    for s in [".nodes", ".elements_C3D4", ".boundary", ".load", ".gravity"] {
        assert_eq!(read(&all, s), read(&full, s), "mismatch in {s}");
    }

    // Partial range
    let part = dir.path().join("part.inp");
    let settings = ExportSettings { layers: Some(0..2) };
    let report = write_inp(&part, &mesh, &analysis, &settings);
    // The load sits on the top face, which isn't exported
    assert!(matches!(report, Err(Error::LoadOutsideLayers(0))));

    let mut fixed_only = analysis.clone();
    fixed_only.loads.clear();
    let report = write_inp(&part, &mesh, &fixed_only, &settings).unwrap();
    let expected: usize = (0..2).map(|z| mesh.element_count_on_layer(z)).sum();
    assert_eq!(report.elements_of(ElementType::Tet4), expected);
    assert!(report.nodes < mesh.vertex_count());

    // Empty and out-of-bounds ranges
    for layers in [0..0, 3..2, 0..n + 1] {
        let bad = dir.path().join("bad.inp");
        let settings = ExportSettings {
            layers: Some(layers),
        };
        assert!(matches!(
            write_inp(&bad, &mesh, &analysis, &settings),
            Err(Error::BadLayerRange { .. })
        ));
        assert!(!bad.exists());
    }
}

#[test]
fn test_config_errors() {
    let mesh = block(ElementKind::Tet4);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.inp");
    let settings = ExportSettings::default();

    let mut a = cantilever(&mesh);
    a.restraints.push(
        Restraint::new(Point3::origin(), Fixed::default())
            .with_cells(vec![CellIndex::new(0, 0, 0)]),
    );
    assert!(matches!(
        write_inp(&path, &mesh, &a, &settings),
        Err(Error::NoFixedDof(1))
    ));
    assert!(!suffixed(&path, ".boundary").exists());
    assert!(!path.exists());

    let mut a = cantilever(&mesh);
    a.restraints
        .push(Restraint::new(Point3::origin(), Fixed::ALL));
    assert!(matches!(
        write_inp(&path, &mesh, &a, &settings),
        Err(Error::UnresolvedRestraint(1))
    ));

    let mut a = cantilever(&mesh);
    a.loads.push(Load::new(Point3::origin(), Vector3::x()));
    assert!(matches!(
        write_inp(&path, &mesh, &a, &settings),
        Err(Error::UnresolvedLoad(1))
    ));

    // Restrained cells are all outside the exported layers
    let mut a = cantilever(&mesh);
    a.restraints.push(
        Restraint::new(Point3::origin(), Fixed::ALL)
            .with_cells(vec![CellIndex::new(4, 2, 4)]),
    );
    let lower = ExportSettings { layers: Some(0..2) };
    assert!(matches!(
        write_inp(&path, &mesh, &a, &lower),
        Err(Error::EmptyRestraint(1))
    ));

    let mut a = cantilever(&mesh);
    a.material.youngs_modulus = 0.0;
    assert!(matches!(
        write_inp(&path, &mesh, &a, &settings),
        Err(Error::InvalidMaterial { .. })
    ));
    assert!(!path.exists());
}

/// Single-cell mesh with a C3D10 and a C3D8 sharing one node (17 nodes)
fn mixed_mesh() -> Mesh {
    let grid = Grid::new(
        Point3::origin(),
        Vector3::repeat(1.0),
        Vector3::new(1, 1, 1),
    );
    let mut b = MeshBuilder::new(grid);
    let ids: Vec<u32> = (0..25)
        .map(|i| b.add_vertex(Point3::new(i as f64, 0.0, 0.0)))
        .collect();
    let cell = CellIndex::new(0, 0, 0);
    b.add_element(cell, ElementType::Tet10, &ids[0..10]).unwrap();
    b.add_element(cell, ElementType::Hex8, &ids[9..17]).unwrap();
    b.add_element(cell, ElementType::Unknown, &ids[17..20]).unwrap();
    b.finish()
}

#[test]
fn test_wrapped_records() {
    let mesh = mixed_mesh();
    let mut analysis = Analysis {
        restraints: vec![Restraint::new(Point3::origin(), Fixed::ALL)],
        ..Default::default()
    };
    analysis.resolve(&mesh).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.inp");
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();
    assert_eq!(report.skipped_unknown, 1);
    assert_eq!(report.nodes, 17);
    assert_eq!(report.element_total(), 2);

    let boundary = read(&path, ".boundary");
    let lines: Vec<_> = boundary.lines().collect();
    assert_eq!(lines[0], "*NSET,NSET=restraint1");
    assert_eq!(lines[1], "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,");
    assert_eq!(lines[2], "17");
    assert_eq!(lines[3], "*BOUNDARY");

    // 11 entries (element id and 10 nodes) fit on one line
    let tets = read(&path, ".elements_C3D10");
    assert_eq!(tets.lines().nth(1), Some("1,1,2,3,4,5,6,7,8,9,10"));
    let hexes = read(&path, ".elements_C3D8");
    assert_eq!(hexes.lines().nth(1), Some("2,10,11,12,13,14,15,16,17"));

    // Nodes of the unknown element are never written
    let nodes = read(&path, ".nodes");
    assert_eq!(nodes.lines().count(), 18);
    assert!(nodes.ends_with("17,16.0,0.0,0.0\n"));
}

#[test]
fn test_wrapped_hex20() {
    let grid = Grid::new(
        Point3::origin(),
        Vector3::repeat(1.0),
        Vector3::new(1, 1, 1),
    );
    let mut b = MeshBuilder::new(grid);
    let ids: Vec<u32> = (0..20)
        .map(|i| b.add_vertex(Point3::new(0.0, i as f64, 0.0)))
        .collect();
    b.add_element(CellIndex::new(0, 0, 0), ElementType::Hex20R, &ids)
        .unwrap();
    let mesh = b.finish();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hex.inp");
    write_inp(&path, &mesh, &Analysis::default(), &ExportSettings::default())
        .unwrap();
    let text = read(&path, ".elements_C3D20R");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "1,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,");
    assert_eq!(lines[2], "16,17,18,19,20");
}

/// C3D20R hexahedron in cell `(0, 0, 0)` with a C3D10 against its `x = 1`
/// face, whose `(1, 0, 0)-(1, 1, 1)` edge puts a node at the face center
fn hex_and_tet() -> Mesh {
    let grid = Grid::new(
        Point3::origin(),
        Vector3::repeat(1.0),
        Vector3::new(2, 1, 1),
    );
    let mut b = MeshBuilder::new(grid);
    let c = CORNERS.map(|[x, y, z]| Point3::new(x as f64, y as f64, z as f64));
    let hex: Vec<u32> = c
        .iter()
        .copied()
        .chain(HEX_EDGES.iter().map(|&(i, j)| nalgebra::center(&c[i], &c[j])))
        .map(|p| b.add_vertex(p))
        .collect();
    b.add_element(CellIndex::new(0, 0, 0), ElementType::Hex20R, &hex)
        .unwrap();

    let t = [c[1], c[6], c[2], Point3::new(2.0, 0.0, 0.0)];
    let tet: Vec<u32> = t
        .iter()
        .copied()
        .chain(TET_EDGES.iter().map(|&(i, j)| nalgebra::center(&t[i], &t[j])))
        .map(|p| b.add_vertex(p))
        .collect();
    b.add_element(CellIndex::new(1, 0, 0), ElementType::Tet10, &tet)
        .unwrap();
    b.finish()
}

#[test]
fn test_face_equations() {
    let mesh = hex_and_tet();
    assert_eq!(mesh.vertex_count(), 25);
    assert_eq!(mesh.ties().len(), 1);
    let tie = mesh.ties()[0];
    assert_eq!(tie.node, 21);
    assert_eq!(tie.corners, [1, 2, 6, 5]);
    assert_eq!(tie.midsides, [9, 18, 13, 17]);

    let analysis = Analysis {
        restraints: vec![
            Restraint::new(Point3::origin(), Fixed::ALL)
                .with_cells(vec![CellIndex::new(0, 0, 0)]),
        ],
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tied.inp");
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();
    assert_eq!(report.equations, 3);
    assert!(report.files.contains(&suffixed(&path, ".equations")));

    let text = read(&path, ".equations");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 3 * 4);
    assert_eq!(lines[0], "*EQUATION");
    assert_eq!(lines[1], "9");
    assert_eq!(lines[2], "22,1,1.0,2,1,0.25,3,1,0.25,7,1,0.25");
    assert_eq!(lines[3], "6,1,0.25,10,1,-0.5,19,1,-0.5,14,1,-0.5");
    assert_eq!(lines[4], "18,1,-0.5");
    assert_eq!(lines[6], "22,2,1.0,2,2,0.25,3,2,0.25,7,2,0.25");

    // Equations come after the restraints that they don't overlap
    let master = std::fs::read_to_string(&path).unwrap();
    let eq = master.find(".equations").unwrap();
    assert!(master.find(".boundary").unwrap() < eq);
    assert!(eq < master.find("*MATERIAL").unwrap());
}

#[test]
fn test_restrained_ties() {
    let mesh = hex_and_tet();
    let analysis = Analysis {
        restraints: vec![
            Restraint::new(Point3::new(2.0, 0.0, 0.0), Fixed {
                x: true,
                ..Default::default()
            })
            .with_cells(vec![CellIndex::new(1, 0, 0)]),
        ],
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tied.inp");
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();
    assert_eq!(report.equations, 2);
    let text = read(&path, ".equations");
    assert!(!text.contains("22,1,1.0"));
    assert!(text.contains("22,2,1.0"));
    assert!(text.contains("22,3,1.0"));

    // Fixing every axis of the hanging node leaves nothing to tie
    let analysis = Analysis {
        restraints: vec![
            Restraint::new(Point3::new(2.0, 0.0, 0.0), Fixed::ALL)
                .with_cells(vec![CellIndex::new(1, 0, 0)]),
        ],
        ..Default::default()
    };
    let report =
        write_inp(&path, &mesh, &analysis, &ExportSettings::default()).unwrap();
    assert_eq!(report.equations, 0);
    let master = std::fs::read_to_string(&path).unwrap();
    assert!(!master.contains(".equations"));
}
