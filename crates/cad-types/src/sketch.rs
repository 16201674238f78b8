use serde::{Deserialize, Serialize};

/// A 2D entity on the sketch plane (local XY, normal +Z).
///
/// Angles are in degrees, measured counter-clockwise from +X.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SketchGeometry {
    Circle {
        center: [f64; 2],
        radius: f64,
    },
    LineSegment {
        start: [f64; 2],
        end: [f64; 2],
    },
    ArcOfCircle {
        center: [f64; 2],
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

impl SketchGeometry {
    /// Start, midpoint and end of an arc, lifted onto the z = 0 plane.
    pub fn arc_points(&self) -> Option<[[f64; 3]; 3]> {
        let SketchGeometry::ArcOfCircle {
            center,
            radius,
            start_angle,
            end_angle,
        } = self
        else {
            return None;
        };
        let mut sweep = end_angle - start_angle;
        if sweep <= 0.0 {
            sweep += 360.0;
        }
        let at = |deg: f64| {
            let (s, c) = deg.to_radians().sin_cos();
            [center[0] + radius * c, center[1] + radius * s, 0.0]
        };
        Some([
            at(*start_angle),
            at(start_angle + sweep / 2.0),
            at(start_angle + sweep),
        ])
    }
}

/// Lifts a sketch-plane point to 3D.
pub fn lift(p: [f64; 2]) -> [f64; 3] {
    [p[0], p[1], 0.0]
}
