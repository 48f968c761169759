use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::Error;

/// Linear-elastic isotropic material
///
/// Constants are in mm-N-s units (so density is in t/mm³ and stiffness in
/// MPa).  The defaults describe structural steel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Name used for the material and section keywords
    pub name: String,
    /// Mass density
    pub density: f64,
    /// Young's modulus
    pub youngs_modulus: f64,
    /// Poisson's ratio
    pub poisson_ratio: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "steel".to_owned(),
            density: 7.85e-9,
            youngs_modulus: 210_000.0,
            poisson_ratio: 0.3,
        }
    }
}

impl Material {
    /// Checks that every constant is finite and positive
    pub fn validate(&self) -> Result<(), Error> {
        for (property, value) in [
            ("density", self.density),
            ("Young's modulus", self.youngs_modulus),
            ("Poisson's ratio", self.poisson_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidMaterial { property, value });
            }
        }
        Ok(())
    }
}

/// Gravity body load
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gravity {
    /// Direction of the acceleration (normalized on export)
    pub direction: Vector3<f64>,
    /// Magnitude of the acceleration
    pub magnitude: f64,
    /// Whether to write the gravity load
    pub enabled: bool,
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            direction: -Vector3::z(),
            magnitude: 9810.0,
            enabled: false,
        }
    }
}

impl Gravity {
    /// Returns the magnitude and unit direction, or `None` if disabled
    pub fn validate(&self) -> Result<Option<(f64, Vector3<f64>)>, Error> {
        if !self.enabled {
            return Ok(None);
        }
        let dir = self
            .direction
            .try_normalize(f64::EPSILON)
            .filter(|d| d.iter().all(|v| v.is_finite()))
            .ok_or(Error::InvalidGravity)?;
        if !(self.magnitude.is_finite() && self.magnitude > 0.0) {
            return Err(Error::InvalidGravity);
        }
        Ok(Some((self.magnitude, dir)))
    }
}

/// Settings for writing an analysis deck
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Cell layers to export (`start <= z < end`), or `None` for all
    pub layers: Option<Range<usize>>,
}
