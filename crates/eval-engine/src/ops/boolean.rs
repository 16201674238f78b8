//! Cut, MultiFuse and MultiCommon.
//!
//! Operands come from the cache and are never released here. Operands are
//! reported as hidden only once the boolean has produced a shape.

use cad_types::CutParams;
use geom_kernel::ShapeHandle;
use tracing::debug;

use super::absent_on_failure;
use crate::factory::ShapeFactory;
use crate::types::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Fuse,
    Common,
}

pub fn cut(
    factory: &mut ShapeFactory<'_>,
    params: &CutParams,
) -> Result<Option<ShapeHandle>, EvalError> {
    let (Some(base_name), Some(tool_name)) = (&params.base, &params.tool) else {
        debug!("cut without base or tool");
        return Ok(None);
    };
    let Some(base) = factory.resolve_name(base_name)? else {
        return Ok(None);
    };
    let Some(tool) = factory.resolve_name(tool_name)? else {
        return Ok(None);
    };
    let result = factory
        .kernel()
        .boolean_subtract(&base.handle, &tool.handle);
    let shape = absent_on_failure("cut", result);
    if shape.is_some() {
        factory.hide(base_name);
        factory.hide(tool_name);
    }
    Ok(shape)
}

/// Left fold over `names` in order. One operand yields a copy of it; none
/// yields absence.
pub fn fold(
    factory: &mut ShapeFactory<'_>,
    kind: BooleanKind,
    names: &[String],
) -> Result<Option<ShapeHandle>, EvalError> {
    let mut operands = Vec::with_capacity(names.len());
    for name in names {
        match factory.resolve_name(name)? {
            Some(entry) => operands.push(entry.handle),
            None => {
                debug!(operand = %name, "operand absent");
                return Ok(None);
            }
        }
    }
    let Some((first, rest)) = operands.split_first() else {
        debug!("boolean without operands");
        return Ok(None);
    };

    let kernel = factory.kernel();
    let shape = if rest.is_empty() {
        absent_on_failure("copy", kernel.copy_shape(first))
    } else {
        let mut acc = *first;
        let mut owned = false;
        for next in rest {
            let result = match kind {
                BooleanKind::Fuse => kernel.boolean_union(&acc, next),
                BooleanKind::Common => kernel.boolean_intersect(&acc, next),
            };
            if owned {
                kernel.release(&acc);
            }
            match absent_on_failure(kind.label(), result) {
                Some(h) => {
                    acc = h;
                    owned = true;
                }
                None => return Ok(None),
            }
        }
        Some(acc)
    };

    if shape.is_some() {
        for name in names {
            factory.hide(name);
        }
    }
    Ok(shape)
}

impl BooleanKind {
    fn label(self) -> &'static str {
        match self {
            BooleanKind::Fuse => "fuse",
            BooleanKind::Common => "common",
        }
    }
}

#[cfg(test)]
mod tests {
    use cad_types::{BoxParams, MultiShapeParams, ObjectKind, ObjectSpec, Placement};
    use geom_kernel::{KernelIntrospect, MockKernel};

    use crate::cache::ShapeCache;
    use crate::factory::ShapeFactory;
    use crate::index::ObjectIndex;

    fn unit_box(name: &str, x: f64) -> ObjectSpec {
        ObjectSpec::new(
            name,
            ObjectKind::Box(BoxParams {
                length: 1.0,
                width: 1.0,
                height: 1.0,
            }),
        )
        .with_placement(Placement::translation([x, 0.0, 0.0]))
    }

    fn fuse(name: &str, shapes: &[&str]) -> ObjectSpec {
        ObjectSpec::new(
            name,
            ObjectKind::MultiFuse(MultiShapeParams {
                shapes: shapes.iter().map(|s| s.to_string()).collect(),
            }),
        )
    }

    #[test]
    fn fold_releases_intermediate_results() {
        let objects = vec![
            unit_box("A", 0.0),
            unit_box("B", 2.0),
            unit_box("C", 4.0),
            fuse("F", &["A", "B", "C"]),
        ];
        let index = ObjectIndex::build(&objects);
        let mut kernel = MockKernel::new();
        let mut cache = ShapeCache::new();
        let entry = ShapeFactory::new(&mut kernel, &mut cache, &index)
            .resolve(&objects[3])
            .unwrap()
            .unwrap();
        // Three operands plus the final fuse.
        assert_eq!(kernel.live_shapes(), 4);
        assert_eq!(kernel.face_count(&entry.handle), 18);
        approx::assert_relative_eq!(entry.metadata.mass, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_fuse_is_absent() {
        let objects = vec![fuse("F", &[])];
        let index = ObjectIndex::build(&objects);
        let mut kernel = MockKernel::new();
        let mut cache = ShapeCache::new();
        let mut factory = ShapeFactory::new(&mut kernel, &mut cache, &index);
        assert!(factory.resolve(&objects[0]).unwrap().is_none());
    }

    #[test]
    fn failed_boolean_leaves_operands_visible() {
        let objects = vec![unit_box("A", 0.0), unit_box("B", 0.5), fuse("F", &["A", "B"])];
        let index = ObjectIndex::build(&objects);
        let mut kernel = MockKernel::with_failing_booleans();
        let mut cache = ShapeCache::new();
        let mut factory = ShapeFactory::new(&mut kernel, &mut cache, &index);
        assert!(factory.resolve(&objects[2]).unwrap().is_none());
        assert!(factory.hidden().is_empty());
        drop(factory);
        // Operands were cached, the failed fuse was not.
        assert_eq!(cache.len(), 2);
    }
}
