//! One builder per object kind.
//!
//! Builders return `None` when the object cannot be built; kernel errors
//! are logged here and never reach the caller.

pub mod boolean;
pub mod extrude;
pub mod import;
pub mod placement;
pub mod primitive;
pub mod sketch;

use geom_kernel::{KernelError, ShapeHandle};
use tracing::warn;

/// Turns a kernel failure into absence.
pub(crate) fn absent_on_failure(
    operation: &str,
    result: Result<ShapeHandle, KernelError>,
) -> Option<ShapeHandle> {
    match result {
        Ok(h) => Some(h),
        Err(e) => {
            warn!(operation, error = %e, "kernel operation failed");
            None
        }
    }
}
