use std::collections::BTreeSet;

use cad_types::{MassProps, ObjectKind, ObjectSpec};
use geom_kernel::{KernelBundle, ShapeHandle};
use tracing::{debug, instrument, warn};

use crate::cache::{CacheEntry, ShapeCache};
use crate::expand::expand_resolved;
use crate::hash::CacheKey;
use crate::index::ObjectIndex;
use crate::ops;
use crate::types::EvalError;

/// Builds kernel shapes for objects, one builder per kind, going through
/// the cache for every object and every operand.
///
/// `Ok(None)` means the object is absent: a reference did not resolve or
/// the kernel could not build it. Absence is never cached.
pub struct ShapeFactory<'a> {
    kernel: &'a mut dyn KernelBundle,
    cache: &'a mut ShapeCache,
    index: &'a ObjectIndex<'a>,
    hidden: BTreeSet<String>,
    in_progress: Vec<String>,
}

impl<'a> ShapeFactory<'a> {
    pub fn new(
        kernel: &'a mut dyn KernelBundle,
        cache: &'a mut ShapeCache,
        index: &'a ObjectIndex<'a>,
    ) -> Self {
        Self {
            kernel,
            cache,
            index,
            hidden: BTreeSet::new(),
            in_progress: Vec::new(),
        }
    }

    pub fn kernel(&mut self) -> &mut dyn KernelBundle {
        &mut *self.kernel
    }

    /// Resolves a referenced object by name.
    pub fn resolve_name(&mut self, name: &str) -> Result<Option<CacheEntry>, EvalError> {
        match self.index.get(name) {
            Some(spec) => self.resolve(spec),
            None => {
                debug!(name, "unresolved reference");
                Ok(None)
            }
        }
    }

    /// Returns the cached shape for `spec`, building and caching it on a miss.
    #[instrument(skip_all, fields(name = %spec.name, kind = spec.kind.type_name()))]
    pub fn resolve(&mut self, spec: &ObjectSpec) -> Result<Option<CacheEntry>, EvalError> {
        if self.in_progress.iter().any(|n| *n == spec.name) {
            warn!("reference cycle, treating as unresolved");
            return Ok(None);
        }
        // A missing operand anywhere below drops out of the expanded tree,
        // which could then collide with a smaller valid object.
        let tree = match expand_resolved(spec, self.index) {
            Ok(tree) => tree,
            Err(missing) => {
                debug!(%missing, "operand missing, object is absent");
                return Ok(None);
            }
        };
        let key = CacheKey::of(&tree)?;
        if let Some(entry) = self.cache.lookup(key) {
            if spec.kind.is_boolean() {
                for name in spec.kind.references() {
                    self.hide(name);
                }
            }
            return Ok(Some(entry));
        }

        self.in_progress.push(spec.name.clone());
        let built = self.build(spec);
        self.in_progress.pop();
        let Some(handle) = built? else {
            return Ok(None);
        };

        let metadata = match self.kernel.mass_properties(&handle) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "mass properties unavailable");
                MassProps::default()
            }
        };
        let entry = CacheEntry { handle, metadata };
        self.cache.insert(key, entry);
        Ok(Some(entry))
    }

    /// Marks an operand as consumed so the caller can hide it.
    pub fn hide(&mut self, name: &str) {
        self.hidden.insert(name.to_string());
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn into_hidden(self) -> BTreeSet<String> {
        self.hidden
    }

    fn build(&mut self, spec: &ObjectSpec) -> Result<Option<ShapeHandle>, EvalError> {
        let shape = match &spec.kind {
            ObjectKind::Box(p) => ops::primitive::make_box(self.kernel(), p),
            ObjectKind::Cylinder(p) => ops::primitive::make_cylinder(self.kernel(), p),
            ObjectKind::Sphere(p) => ops::primitive::make_sphere(self.kernel(), p),
            ObjectKind::Cone(p) => ops::primitive::make_cone(self.kernel(), p),
            ObjectKind::Torus(p) => ops::primitive::make_torus(self.kernel(), p),
            ObjectKind::Cut(p) => ops::boolean::cut(self, p)?,
            ObjectKind::MultiFuse(p) => {
                ops::boolean::fold(self, ops::boolean::BooleanKind::Fuse, &p.shapes)?
            }
            ObjectKind::MultiCommon(p) => {
                ops::boolean::fold(self, ops::boolean::BooleanKind::Common, &p.shapes)?
            }
            ObjectKind::Extrusion(p) => ops::extrude::extrude(self, p)?,
            ObjectKind::SketchObject(p) => ops::sketch::build(self.kernel(), p),
            ObjectKind::Any(p) if p.shape.is_empty() => {
                debug!("object carries no shape");
                None
            }
            ObjectKind::RawBrep(p) | ObjectKind::Any(p) => {
                Some(ops::import::import(self.kernel(), &spec.name, p)?)
            }
        };
        Ok(shape.and_then(|h| ops::placement::apply(self.kernel(), h, spec.placement.as_ref())))
    }
}
