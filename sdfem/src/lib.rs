//! `sdfem` builds volumetric finite-element meshes from implicit surfaces, and
//! writes them out as CalculiX / ABAQUS input decks.
//!
//! An **implicit surface** is a function `f(x, y, z)` which is negative inside
//! the shape, positive outside, and zero on its boundary.  Anything which can
//! be evaluated at a point can be meshed, by implementing the
//! [`Field`](crate::field::Field) trait.
//!
//! # Meshing
//! [`Mesh::build`](crate::mesh::Mesh::build) samples the field over a regular
//! grid, one Z plane at a time, then converts each grid cell into solid
//! elements.  Cells entirely inside the shape become 6 tetrahedra (or a single
//! hexahedron); cells on the surface are clipped against it.  Neighboring
//! cells always share their nodes.  Where a quadratic tetrahedron puts a
//! node at the center of a quadratic hexahedron's face, that node is tied to
//! the face (see [`FaceTie`](crate::mesh::FaceTie)) and exported as an
//! `*EQUATION`.
//!
//! Four element families are supported, matching the solver's keywords:
//! `C3D4`, `C3D10`, `C3D8` and `C3D20R` (see
//! [`ElementKind`](crate::tessellate::ElementKind)).  Candidate elements that
//! would be too flat to simulate are rejected and listed in
//! [`Mesh::degenerate`](crate::mesh::Mesh::degenerate).
//!
//! # Boundary conditions
//! Restraints and loads are given as positions, then resolved against the
//! finished mesh (see [`boundary`]).  A restraint covers every element node in
//! the grid cells around it; a load lands on its nearest node.
//!
//! # Export
//! [`export::write_inp`] writes the mesh, material, boundary conditions and
//! loads as a static analysis, split over a master file and several included
//! files.
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use sdfem::{
//!     boundary::{Analysis, Fixed, Load, Restraint},
//!     export::{ExportSettings, write_inp},
//!     field::{BoundingBox, Field},
//!     mesh::{Mesh, Settings},
//! };
//!
//! /// A 10 x 2 x 2 beam
//! struct Beam;
//! impl Field for Beam {
//!     fn evaluate(&self, p: Point3<f64>) -> f64 {
//!         let q = p.coords.abs() - Vector3::new(5.0, 1.0, 1.0);
//!         q.max()
//!     }
//!     fn bounding_box(&self) -> BoundingBox {
//!         BoundingBox::new(Point3::new(-5.0, -1.0, -1.0), Point3::new(5.0, 1.0, 1.0))
//!     }
//! }
//!
//! let settings = Settings {
//!     resolution: 20,
//!     ..Default::default()
//! };
//! let mesh = Mesh::build(&Beam, &settings)?;
//!
//! let mut analysis = Analysis::default();
//! analysis.restraints.push(Restraint::region(
//!     vec![Point3::new(-5.0, -1.0, -1.0), Point3::new(-4.5, 1.0, 1.0)],
//!     Fixed::ALL,
//! ));
//! analysis.loads.push(Load::new(
//!     Point3::new(5.0, 0.0, 1.0),
//!     Vector3::new(0.0, 0.0, -100.0),
//! ));
//! analysis.resolve(&mesh)?;
//!
//! let dir = std::env::temp_dir().join("sdfem-doc");
//! std::fs::create_dir_all(&dir)?;
//! let report =
//!     write_inp(dir.join("beam.inp"), &mesh, &analysis, &ExportSettings::default())?;
//! assert_eq!(report.element_total(), mesh.element_count());
//! # Ok::<(), sdfem::Error>(())
//! ```
#![warn(missing_docs)]

pub mod boundary;
pub mod export;
pub mod field;
pub mod grid;
pub mod mesh;
pub mod sample;
pub mod tessellate;

mod error;
pub use error::Error;
