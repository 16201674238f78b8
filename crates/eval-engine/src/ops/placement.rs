use cad_types::Placement;
use geom_kernel::{KernelBundle, ShapeHandle};

use super::absent_on_failure;

/// Rotates `shape` about its axis through the origin, then translates it.
/// Intermediate shapes are released; the input is released once replaced.
pub fn apply(
    kernel: &mut dyn KernelBundle,
    shape: ShapeHandle,
    placement: Option<&Placement>,
) -> Option<ShapeHandle> {
    let Some(placement) = placement else {
        return Some(shape);
    };
    let mut current = shape;
    if let Some((axis, angle)) = placement.rotation() {
        let rotated = kernel.rotate(&current, axis, angle);
        kernel.release(&current);
        current = absent_on_failure("rotate", rotated)?;
    }
    if placement.position != [0.0; 3] {
        let moved = kernel.translate(&current, placement.position);
        kernel.release(&current);
        current = absent_on_failure("translate", moved)?;
    }
    Some(current)
}
