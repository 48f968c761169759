//! Tessellation tables, generated by `build.rs`
include!(concat!(env!("OUT_DIR"), "/fe_tables.rs"));

/// Number of points in the 3x3x3 cell lattice
pub const LATTICE_SIZE: usize = 27;

// Edge masks are packed into a `u32`, one bit per lattice point
static_assertions::const_assert!(LATTICE_SIZE <= u32::BITS as usize);
