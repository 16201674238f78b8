use cad_types::ExtrusionParams;
use geom_kernel::{KernelBundle, ShapeHandle};
use tracing::debug;

use super::absent_on_failure;
use crate::factory::ShapeFactory;
use crate::types::EvalError;

/// Sweeps a copy of the base object along `Dir`, spanning `LengthRev`
/// behind the base and `LengthFwd` ahead of it.
pub fn extrude(
    factory: &mut ShapeFactory<'_>,
    params: &ExtrusionParams,
) -> Result<Option<ShapeHandle>, EvalError> {
    let Some(base_name) = &params.base else {
        debug!("extrusion without base");
        return Ok(None);
    };
    let norm = params.dir.iter().map(|c| c * c).sum::<f64>().sqrt();
    let total = params.length_fwd + params.length_rev;
    if !(norm.is_finite() && norm > 1e-12) || !(total.is_finite() && total > 0.0) {
        debug!(dir = ?params.dir, total, "degenerate extrusion");
        return Ok(None);
    }
    let Some(base) = factory.resolve_name(base_name)? else {
        return Ok(None);
    };
    let unit = params.dir.map(|c| c / norm);
    Ok(sweep_copy(
        factory.kernel(),
        base.handle,
        unit,
        params.length_rev,
        total,
        params.solid,
    ))
}

fn sweep_copy(
    kernel: &mut dyn KernelBundle,
    base: ShapeHandle,
    unit: [f64; 3],
    length_rev: f64,
    total: f64,
    solid: bool,
) -> Option<ShapeHandle> {
    let mut profile = absent_on_failure("copy", kernel.copy_shape(&base))?;
    if length_rev != 0.0 {
        let moved = kernel.translate(&profile, unit.map(|c| -c * length_rev));
        kernel.release(&profile);
        profile = absent_on_failure("translate", moved)?;
    }
    if solid && !kernel.as_introspect().has_faces(&profile) {
        let face = kernel.make_face(&profile);
        kernel.release(&profile);
        profile = absent_on_failure("face", face)?;
    }
    let prism = kernel.sweep(&profile, unit.map(|c| c * total));
    kernel.release(&profile);
    absent_on_failure("sweep", prism)
}
