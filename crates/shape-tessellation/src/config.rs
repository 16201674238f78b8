use geom_kernel::BoundingBox;
use serde::{Deserialize, Serialize};

/// Meshing tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    /// Upper bound on the chordal deviation, in model units.
    pub linear_deflection: f64,
    /// Angular deflection in radians, scaled by the shape's size.
    pub angular_deflection: f64,
    /// Deflection for free-standing wires.
    pub tangential_deflection: f64,
    /// Floor for the chordal tolerance.
    pub min_tolerance: f64,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            linear_deflection: 0.1,
            angular_deflection: 0.5,
            tangential_deflection: 0.05,
            min_tolerance: 1e-4,
        }
    }
}

impl TessellationConfig {
    /// Preview quality.
    pub fn coarse() -> Self {
        Self {
            linear_deflection: 0.5,
            angular_deflection: 1.0,
            tangential_deflection: 0.25,
            ..Self::default()
        }
    }

    pub fn fine() -> Self {
        Self {
            linear_deflection: 0.01,
            angular_deflection: 0.1,
            tangential_deflection: 0.005,
            ..Self::default()
        }
    }

    /// Applies per-request overrides; the angle arrives in degrees.
    pub fn with_overrides(mut self, linear: Option<f64>, angular_deg: Option<f64>) -> Self {
        if let Some(l) = linear.filter(|l| l.is_finite() && *l > 0.0) {
            self.linear_deflection = l;
        }
        if let Some(a) = angular_deg.filter(|a| a.is_finite() && *a > 0.0) {
            self.angular_deflection = a.to_radians();
        }
        self
    }

    /// min(linear, R·(1 − cos(angular / 2))) with R half the bounding-box
    /// diagonal, never below `min_tolerance`.
    pub fn chordal_tolerance(&self, bounds: Option<&BoundingBox>) -> f64 {
        let mut tol = self.linear_deflection;
        if let Some(bb) = bounds {
            let radius = bb.diagonal() / 2.0;
            let angular = radius * (1.0 - (self.angular_deflection / 2.0).cos());
            if angular > 0.0 {
                tol = tol.min(angular);
            }
        }
        tol.max(self.min_tolerance)
    }
}
