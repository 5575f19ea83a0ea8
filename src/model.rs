//! Read-only domain model input
//!
//! The engineering description of one spudcan penetration analysis. The
//! pipeline consumes this structure as-is; producing and persisting it is
//! the host application's business.

use serde::Deserialize;

/// One spudcan penetration analysis project
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    /// Title written into the engine project
    pub title: String,
    pub spudcan: Spudcan,
    pub materials: Vec<Material>,
    /// Top-down soil layering
    pub layers: Vec<Layer>,
    pub loading: Loading,
    pub control: AnalysisControl,
    /// Water depth above mudline, metres
    #[serde(default)]
    pub water_depth: f64,
}

/// Conical spudcan footing geometry
#[derive(Debug, Clone, Deserialize)]
pub struct Spudcan {
    /// Largest diameter, metres
    pub diameter: f64,
    /// Cone half-angle from the horizontal, degrees; strictly between 0 and 90
    pub cone_angle: f64,
}

/// One soil material set
#[derive(Debug, Clone, Deserialize)]
pub struct Material {
    /// Identifying name, referenced by layers
    pub name: String,
    /// Saturated unit weight, kN/m3
    pub unit_weight: f64,
    /// Undrained shear strength or cohesion, kPa
    pub cohesion: f64,
    /// Friction angle, degrees
    #[serde(default)]
    pub friction_angle: f64,
    /// Stiffness modulus, kPa
    pub stiffness: f64,
}

/// One stratigraphic layer, top-down
#[derive(Debug, Clone, Deserialize)]
pub struct Layer {
    /// Name of the material set this layer uses
    pub material: String,
    /// Layer thickness, metres
    pub thickness: f64,
}

/// Loading applied to the spudcan
#[derive(Debug, Clone, Deserialize)]
pub struct Loading {
    /// Vertical preload, kN
    pub vertical_preload: f64,
}

/// Analysis control parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisControl {
    /// Penetration at which the analysis stops, metres
    pub target_penetration: f64,
    /// Maximum number of calculation steps
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Tolerated equilibrium error
    #[serde(default = "default_tolerated_error")]
    pub tolerated_error: f64,
}

fn default_max_steps() -> u32 {
    250
}

fn default_tolerated_error() -> f64 {
    0.01
}
