use std::collections::BTreeSet;

use cad_types::ObjectSpec;
use geom_kernel::KernelBundle;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::cache::{CacheEntry, ShapeCache};
use crate::factory::ShapeFactory;
use crate::index::ObjectIndex;
use crate::types::EvalError;

/// What a malformed raw B-rep payload does to the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFailurePolicy {
    /// The whole pass fails and nothing is displayed.
    #[default]
    AbortBatch,
    /// The offending object is skipped; the rest of the pass continues.
    SkipObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedShape {
    pub name: String,
    pub entry: CacheEntry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    /// Displayable shapes in document order.
    pub shapes: Vec<EvaluatedShape>,
    /// Objects consumed by booleans.
    pub hidden: BTreeSet<String>,
    /// Visible objects that produced no shape.
    pub skipped: Vec<String>,
}

/// One evaluation pass over a snapshot of the object list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    pub import_failure: ImportFailurePolicy,
}

impl Evaluator {
    pub fn new(import_failure: ImportFailurePolicy) -> Self {
        Self { import_failure }
    }

    /// Builds every visible object, then drops the ones a boolean consumed.
    #[instrument(skip_all, fields(objects = objects.len()))]
    pub fn run(
        &self,
        kernel: &mut dyn KernelBundle,
        cache: &mut ShapeCache,
        objects: &[ObjectSpec],
    ) -> Result<EvaluationOutcome, EvalError> {
        let index = ObjectIndex::build(objects);
        let mut factory = ShapeFactory::new(kernel, cache, &index);
        let mut outcome = EvaluationOutcome::default();

        for spec in index.iter().filter(|s| s.visible) {
            match factory.resolve(spec) {
                Ok(Some(entry)) => outcome.shapes.push(EvaluatedShape {
                    name: spec.name.clone(),
                    entry,
                }),
                Ok(None) => outcome.skipped.push(spec.name.clone()),
                Err(e @ EvalError::Import { .. })
                    if self.import_failure == ImportFailurePolicy::SkipObject =>
                {
                    warn!(name = %spec.name, error = %e, "import failed, skipping object");
                    outcome.skipped.push(spec.name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        outcome.hidden = factory.into_hidden();
        outcome
            .shapes
            .retain(|s| !outcome.hidden.contains(&s.name));
        info!(
            shapes = outcome.shapes.len(),
            hidden = outcome.hidden.len(),
            skipped = outcome.skipped.len(),
            "evaluation pass complete"
        );
        Ok(outcome)
    }
}
