use cad_types::RawBrepParams;
use geom_kernel::{KernelBundle, KernelError, ShapeHandle};
use tracing::debug;
use uuid::Uuid;

use crate::types::EvalError;

/// Writes the embedded payload to a fresh scratch entry and imports it.
///
/// Unlike other builders a failure here is an error: the payload came
/// from the document and cannot be repaired by retrying.
pub fn import(
    kernel: &mut dyn KernelBundle,
    object: &str,
    params: &RawBrepParams,
) -> Result<ShapeHandle, EvalError> {
    let fail = |source| EvalError::Import {
        object: object.to_string(),
        source,
    };
    if params.shape.is_empty() {
        return Err(fail(KernelError::ImportFailed {
            reason: "empty payload".to_string(),
        }));
    }
    let scratch = format!("raw-{}.brep", Uuid::new_v4());
    debug!(object, %scratch, bytes = params.shape.as_bytes().len(), "importing raw B-rep");
    kernel.write_scratch(&scratch, params.shape.as_bytes());
    kernel.import_brep(&scratch).map_err(fail)
}
