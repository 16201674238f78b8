//! Primitive solids. Angles arrive in degrees and leave in radians.

use cad_types::{BoxParams, ConeParams, CylinderParams, SphereParams, TorusParams};
use geom_kernel::{KernelBundle, ShapeHandle};
use tracing::debug;

use super::absent_on_failure;

fn positive(values: &[(&str, f64)]) -> bool {
    match values.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
        Some(&(field, value)) => {
            debug!(field, value, "degenerate dimension");
            false
        }
        None => true,
    }
}

pub fn make_box(kernel: &mut dyn KernelBundle, p: &BoxParams) -> Option<ShapeHandle> {
    if !positive(&[("Length", p.length), ("Width", p.width), ("Height", p.height)]) {
        return None;
    }
    absent_on_failure("box", kernel.make_box(p.length, p.width, p.height))
}

pub fn make_cylinder(kernel: &mut dyn KernelBundle, p: &CylinderParams) -> Option<ShapeHandle> {
    if !positive(&[("Radius", p.radius), ("Height", p.height), ("Angle", p.angle)]) {
        return None;
    }
    absent_on_failure(
        "cylinder",
        kernel.make_cylinder(p.radius, p.height, p.angle.to_radians()),
    )
}

pub fn make_cone(kernel: &mut dyn KernelBundle, p: &ConeParams) -> Option<ShapeHandle> {
    if !positive(&[("Height", p.height), ("Angle", p.angle)]) {
        return None;
    }
    if p.radius1 < 0.0 || p.radius2 < 0.0 || p.radius1 + p.radius2 <= 0.0 {
        debug!(radius1 = p.radius1, radius2 = p.radius2, "degenerate cone radii");
        return None;
    }
    absent_on_failure(
        "cone",
        kernel.make_cone(p.radius1, p.radius2, p.height, p.angle.to_radians()),
    )
}

pub fn make_sphere(kernel: &mut dyn KernelBundle, p: &SphereParams) -> Option<ShapeHandle> {
    if !positive(&[("Radius", p.radius), ("Angle3", p.angle3)]) {
        return None;
    }
    let lat_min = p.angle1.max(-90.0);
    let lat_max = p.angle2.min(90.0);
    if lat_max <= lat_min {
        debug!(lat_min, lat_max, "empty latitude band");
        return None;
    }
    absent_on_failure(
        "sphere",
        kernel.make_sphere(
            p.radius,
            lat_min.to_radians(),
            lat_max.to_radians(),
            p.angle3.to_radians(),
        ),
    )
}

pub fn make_torus(kernel: &mut dyn KernelBundle, p: &TorusParams) -> Option<ShapeHandle> {
    if !positive(&[("Radius1", p.radius1), ("Radius2", p.radius2), ("Angle3", p.angle3)]) {
        return None;
    }
    if p.angle2 <= p.angle1 {
        debug!(angle1 = p.angle1, angle2 = p.angle2, "empty torus section");
        return None;
    }
    absent_on_failure(
        "torus",
        kernel.make_torus(
            p.radius1,
            p.radius2,
            p.angle1.to_radians(),
            p.angle2.to_radians(),
            p.angle3.to_radians(),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom_kernel::{KernelIntrospect, MockKernel};

    #[test]
    fn defaults_build() {
        let mut k = MockKernel::new();
        assert!(make_box(&mut k, &BoxParams::default()).is_some());
        assert!(make_cylinder(&mut k, &CylinderParams::default()).is_some());
        assert!(make_cone(&mut k, &ConeParams::default()).is_some());
        assert!(make_sphere(&mut k, &SphereParams::default()).is_some());
        assert!(make_torus(&mut k, &TorusParams::default()).is_some());
    }

    #[test]
    fn non_positive_dimensions_are_absent_without_kernel_calls() {
        let mut k = MockKernel::new();
        let flat = BoxParams {
            height: 0.0,
            ..BoxParams::default()
        };
        assert!(make_box(&mut k, &flat).is_none());
        let negative = CylinderParams {
            radius: -1.0,
            ..CylinderParams::default()
        };
        assert!(make_cylinder(&mut k, &negative).is_none());
        assert_eq!(k.operation_count(), 0);
        assert_eq!(k.live_shapes(), 0);
    }

    #[test]
    fn kernel_rejection_is_absence() {
        let mut k = MockKernel::new();
        // Tube wider than the main radius self-intersects.
        let fat = TorusParams {
            radius1: 1.0,
            radius2: 2.0,
            ..TorusParams::default()
        };
        assert!(make_torus(&mut k, &fat).is_none());
    }
}
