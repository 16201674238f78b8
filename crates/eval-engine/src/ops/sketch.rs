use cad_types::{lift, SketchGeometry, SketchParams};
use geom_kernel::{KernelBundle, ShapeHandle};
use tracing::{debug, warn};

use super::absent_on_failure;

const SKETCH_NORMAL: [f64; 3] = [0.0, 0.0, 1.0];

/// Builds every entity as a kernel edge on the sketch plane and groups
/// them into one compound. Entities the kernel rejects are skipped.
pub fn build(kernel: &mut dyn KernelBundle, params: &SketchParams) -> Option<ShapeHandle> {
    let mut edges = Vec::with_capacity(params.geometry.len());
    for (i, entity) in params.geometry.iter().enumerate() {
        let edge = match entity {
            SketchGeometry::Circle { center, radius } => {
                kernel.make_circle(lift(*center), SKETCH_NORMAL, *radius)
            }
            SketchGeometry::LineSegment { start, end } => {
                kernel.make_line(lift(*start), lift(*end))
            }
            SketchGeometry::ArcOfCircle { .. } => match entity.arc_points() {
                Some([start, transit, end]) => kernel.make_arc(start, transit, end),
                None => continue,
            },
        };
        match edge {
            Ok(h) => edges.push(h),
            Err(e) => warn!(entity = i, error = %e, "sketch entity skipped"),
        }
    }
    if edges.is_empty() {
        debug!("sketch has no buildable entities");
        return None;
    }
    let compound = kernel.make_compound(&edges);
    for e in &edges {
        kernel.release(e);
    }
    absent_on_failure("sketch", compound)
}
