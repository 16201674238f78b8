use serde::{Deserialize, Serialize};

/// Mass properties of a built shape, assuming unit density.
///
/// The inertia matrix is taken about the center of mass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MassProps {
    pub mass: f64,
    pub center_of_mass: [f64; 3],
    pub inertia_matrix: [[f64; 3]; 3],
}

impl MassProps {
    /// Shapes without a closed volume (wires, open shells) carry zero mass.
    pub fn is_massless(&self) -> bool {
        self.mass.abs() < f64::EPSILON
    }
}
