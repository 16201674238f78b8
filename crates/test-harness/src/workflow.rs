//! DocumentBuilder: fluent API for scripting documents in tests.
//!
//! Wraps `worker_bridge::dispatch()` so tests go through the real request
//! path. Objects are addressed by name, as in the document itself.

use std::collections::{BTreeMap, BTreeSet};

use cad_types::{ObjectKind, ObjectSpec, Placement, SketchGeometry};
use eval_engine::{CacheStats, Evaluator, ShapeCache};
use geom_kernel::{KernelBundle, MockKernel, ShapeHandle, TruckKernel};
use worker_bridge::{
    dispatch, DisplayEntry, DocumentContent, LoadFilePayload, LoadOptions, WorkerConfig,
    WorkerReply, WorkerRequest, WorkerState,
};

use crate::helpers::*;
use crate::oracle::{self, OracleVerdict};

/// The DISPLAY_SHAPE content of one LOAD_FILE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub shapes: BTreeMap<String, DisplayEntry>,
    pub hidden: BTreeSet<String>,
}

impl Evaluation {
    pub fn shape(&self, name: &str) -> Result<&DisplayEntry, HarnessError> {
        self.shapes.get(name).ok_or_else(|| HarnessError::NotDisplayed {
            name: name.to_string(),
        })
    }

    pub fn is_displayed(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.shapes.keys().map(String::as_str).collect()
    }
}

/// A fluent builder for scripting and evaluating documents in tests.
///
/// Holds a worker state and a kernel, like the worker thread does, and
/// keeps the object list in document order.
pub struct DocumentBuilder {
    pub state: WorkerState,
    kernel: Box<dyn KernelBundle>,
    objects: Vec<ObjectSpec>,
    options: LoadOptions,
    next_id: u64,
    last: Option<Evaluation>,
}

impl DocumentBuilder {
    /// Builder on MockKernel (deterministic, fast).
    pub fn mock() -> Self {
        Self::with_kernel(Box::new(MockKernel::new()), WorkerConfig::default())
    }

    /// Builder on TruckKernel (real geometry).
    pub fn truck() -> Self {
        Self::with_kernel(Box::new(TruckKernel::new()), WorkerConfig::default())
    }

    pub fn with_kernel(kernel: Box<dyn KernelBundle>, config: WorkerConfig) -> Self {
        Self {
            state: WorkerState::new(config),
            kernel,
            objects: Vec::new(),
            options: LoadOptions::default(),
            next_id: 1,
            last: None,
        }
    }

    /// Replaces the worker configuration and starts from an empty cache.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.state.release_all(self.kernel.as_mut());
        self.state = WorkerState::new(config);
        self
    }

    /// Tessellation overrides sent with every LOAD_FILE.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    // ── Document Editing ────────────────────────────────────────────────

    /// Appends an object. Duplicate names are rejected.
    pub fn add(&mut self, spec: ObjectSpec) -> Result<&mut Self, HarnessError> {
        if self.objects.iter().any(|o| o.name == spec.name) {
            return Err(HarnessError::DuplicateName { name: spec.name });
        }
        self.objects.push(spec);
        Ok(self)
    }

    /// Appends an object even if its name is taken.
    pub fn add_unchecked(&mut self, spec: ObjectSpec) -> &mut Self {
        self.objects.push(spec);
        self
    }

    pub fn box_(
        &mut self,
        name: &str,
        length: f64,
        width: f64,
        height: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.add(box_spec(name, length, width, height))
    }

    pub fn cylinder(
        &mut self,
        name: &str,
        radius: f64,
        height: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.add(cylinder_spec(name, radius, height))
    }

    pub fn sphere(&mut self, name: &str, radius: f64) -> Result<&mut Self, HarnessError> {
        self.add(sphere_spec(name, radius))
    }

    pub fn cut(&mut self, name: &str, base: &str, tool: &str) -> Result<&mut Self, HarnessError> {
        self.add(cut_spec(name, base, tool))
    }

    pub fn fuse(&mut self, name: &str, shapes: &[&str]) -> Result<&mut Self, HarnessError> {
        self.add(fuse_spec(name, shapes))
    }

    pub fn common(&mut self, name: &str, shapes: &[&str]) -> Result<&mut Self, HarnessError> {
        self.add(common_spec(name, shapes))
    }

    pub fn sketch(
        &mut self,
        name: &str,
        geometry: Vec<SketchGeometry>,
    ) -> Result<&mut Self, HarnessError> {
        self.add(sketch_spec(name, geometry))
    }

    pub fn extrude(
        &mut self,
        name: &str,
        base: &str,
        dir: [f64; 3],
        length: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.add(extrusion_spec(name, base, dir, length))
    }

    pub fn object(&self, name: &str) -> Result<&ObjectSpec, HarnessError> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| HarnessError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    fn object_mut(&mut self, name: &str) -> Result<&mut ObjectSpec, HarnessError> {
        self.objects
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| HarnessError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    pub fn place(&mut self, name: &str, placement: Placement) -> Result<&mut Self, HarnessError> {
        self.object_mut(name)?.placement = Some(placement);
        Ok(self)
    }

    /// Sets an object's visibility flag.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> Result<&mut Self, HarnessError> {
        self.object_mut(name)?.visible = visible;
        Ok(self)
    }

    /// Edits an object's parameters in place.
    pub fn edit(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ObjectKind),
    ) -> Result<&mut Self, HarnessError> {
        f(&mut self.object_mut(name)?.kind);
        Ok(self)
    }

    /// Renames an object and every reference to it.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<&mut Self, HarnessError> {
        if self.objects.iter().any(|o| o.name == new) {
            return Err(HarnessError::DuplicateName {
                name: new.to_string(),
            });
        }
        self.object_mut(old)?.name = new.to_string();
        for spec in &mut self.objects {
            rename_references(&mut spec.kind, old, new);
        }
        Ok(self)
    }

    /// Removes an object. References to it are left dangling.
    pub fn remove(&mut self, name: &str) -> Result<ObjectSpec, HarnessError> {
        let pos = self
            .objects
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| HarnessError::ObjectNotFound {
                name: name.to_string(),
            })?;
        Ok(self.objects.remove(pos))
    }

    /// Reverses the document order.
    pub fn reverse(&mut self) -> &mut Self {
        self.objects.reverse();
        self
    }

    pub fn objects(&self) -> &[ObjectSpec] {
        &self.objects
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Sends the current document as a LOAD_FILE and records the reply.
    pub fn evaluate(&mut self) -> Result<&Evaluation, HarnessError> {
        let id = self.next_id();
        let request = WorkerRequest::LoadFile {
            id,
            payload: LoadFilePayload {
                content: DocumentContent {
                    objects: self.objects.clone(),
                    options: self.options,
                },
            },
        };
        let reply = dispatch(&mut self.state, request, self.kernel.as_mut());
        if reply.id() != id {
            return Err(HarnessError::AssertionFailed {
                detail: format!("reply id {} does not match request id {}", reply.id(), id),
            });
        }
        let evaluation = match reply {
            WorkerReply::DisplayShape {
                payload, hidden, ..
            } => Evaluation {
                shapes: payload,
                hidden: hidden.into_iter().collect(),
            },
            WorkerReply::Error { payload, .. } => {
                return Err(HarnessError::Worker {
                    message: payload.message,
                })
            }
            other => {
                return Err(HarnessError::Worker {
                    message: format!("unexpected reply {other:?}"),
                })
            }
        };
        Ok(self.last.insert(evaluation))
    }

    /// Runs only the evaluation pass, returning the handle per displayed
    /// object. Shares the cache with [`evaluate`](Self::evaluate).
    pub fn evaluate_handles(&mut self) -> Result<BTreeMap<String, ShapeHandle>, HarnessError> {
        let evaluator = Evaluator::new(self.state.config.import_failure);
        let outcome = evaluator.run(self.kernel.as_mut(), &mut self.state.cache, &self.objects)?;
        self.state.release_evicted(self.kernel.as_mut());
        Ok(outcome
            .shapes
            .into_iter()
            .map(|s| (s.name, s.entry.handle))
            .collect())
    }

    /// The most recent evaluation.
    pub fn last(&self) -> Result<&Evaluation, HarnessError> {
        self.last.as_ref().ok_or(HarnessError::NotEvaluated)
    }

    pub fn shape(&self, name: &str) -> Result<&DisplayEntry, HarnessError> {
        self.last()?.shape(name)
    }

    pub fn cache(&self) -> &ShapeCache {
        &self.state.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.cache.stats()
    }

    pub fn kernel(&self) -> &dyn KernelBundle {
        self.kernel.as_ref()
    }

    pub fn live_shapes(&self) -> usize {
        self.kernel.as_introspect().live_shapes()
    }

    // ── Inline Checks ───────────────────────────────────────────────────

    /// Face and edge-polyline counts of a displayed object.
    pub fn counts(&self, name: &str) -> Result<(usize, usize), HarnessError> {
        let entry = self.shape(name)?;
        Ok((entry.face_list.len(), entry.edge_list.len()))
    }

    /// Runs every mesh oracle on a displayed object.
    pub fn check_all(&self, name: &str) -> Result<Vec<OracleVerdict>, HarnessError> {
        Ok(oracle::check_entry(self.shape(name)?))
    }

    /// Fails with the first failing oracle.
    pub fn assert_sound(&self, name: &str) -> Result<(), HarnessError> {
        for verdict in self.check_all(name)? {
            if !verdict.passed {
                return Err(HarnessError::OracleFailure {
                    oracle: verdict.oracle_name,
                    detail: format!("[{}] {}", name, verdict.detail),
                });
            }
        }
        Ok(())
    }
}

fn rename_references(kind: &mut ObjectKind, old: &str, new: &str) {
    let swap = |r: &mut String| {
        if *r == old {
            *r = new.to_string();
        }
    };
    match kind {
        ObjectKind::Cut(p) => {
            p.base.iter_mut().for_each(swap);
            p.tool.iter_mut().for_each(swap);
        }
        ObjectKind::MultiFuse(p) | ObjectKind::MultiCommon(p) => {
            p.shapes.iter_mut().for_each(swap);
        }
        ObjectKind::Extrusion(p) => p.base.iter_mut().for_each(swap),
        _ => {}
    }
}
