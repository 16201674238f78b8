//! Construction-graph expansion.
//!
//! An object is replaced by a reference-free tree: every name it points at
//! is substituted with that object's own tree. The tree carries geometry
//! only (kind, parameters, placement), never the object's name or
//! visibility, so two structurally identical objects expand identically.

use cad_types::{
    BoxParams, ConeParams, CylinderParams, ObjectKind, ObjectSpec, Placement, RawBrepParams,
    SketchParams, SphereParams, TorusParams,
};
use serde::Serialize;
use tracing::warn;

use crate::index::ObjectIndex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedTree {
    pub kind: ExpandedKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

/// [`ObjectKind`] with references inlined. Unresolved references are
/// left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "parameters")]
pub enum ExpandedKind {
    Box(BoxParams),
    Cylinder(CylinderParams),
    Sphere(SphereParams),
    Cone(ConeParams),
    Torus(TorusParams),
    Cut {
        #[serde(skip_serializing_if = "Option::is_none")]
        base: Option<Box<ExpandedTree>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool: Option<Box<ExpandedTree>>,
    },
    MultiFuse {
        shapes: Vec<ExpandedTree>,
    },
    MultiCommon {
        shapes: Vec<ExpandedTree>,
    },
    Extrusion {
        #[serde(skip_serializing_if = "Option::is_none")]
        base: Option<Box<ExpandedTree>>,
        dir: [f64; 3],
        length_fwd: f64,
        length_rev: f64,
        solid: bool,
    },
    SketchObject(SketchParams),
    RawBrep(RawBrepParams),
    Any(RawBrepParams),
}

/// Expands `spec` against the objects in `index`.
pub fn expand(spec: &ObjectSpec, index: &ObjectIndex<'_>) -> ExpandedTree {
    Expander::new(spec, index).expand(spec)
}

/// Expands `spec`, failing with the first reference anywhere in the subtree
/// that did not resolve (missing, or part of a cycle).
pub fn expand_resolved(
    spec: &ObjectSpec,
    index: &ObjectIndex<'_>,
) -> Result<ExpandedTree, String> {
    let mut expander = Expander::new(spec, index);
    let tree = expander.expand(spec);
    match expander.unresolved {
        Some(name) => Err(name),
        None => Ok(tree),
    }
}

struct Expander<'a, 'i> {
    index: &'i ObjectIndex<'a>,
    stack: Vec<&'a str>,
    unresolved: Option<String>,
}

impl<'a, 'i> Expander<'a, 'i> {
    fn new(root: &'a ObjectSpec, index: &'i ObjectIndex<'a>) -> Self {
        Self {
            index,
            stack: vec![root.name.as_str()],
            unresolved: None,
        }
    }

    fn expand(&mut self, spec: &'a ObjectSpec) -> ExpandedTree {
        let kind = match &spec.kind {
            ObjectKind::Box(p) => ExpandedKind::Box(*p),
            ObjectKind::Cylinder(p) => ExpandedKind::Cylinder(*p),
            ObjectKind::Sphere(p) => ExpandedKind::Sphere(*p),
            ObjectKind::Cone(p) => ExpandedKind::Cone(*p),
            ObjectKind::Torus(p) => ExpandedKind::Torus(*p),
            ObjectKind::Cut(p) => ExpandedKind::Cut {
                base: self.reference(p.base.as_deref()).map(Box::new),
                tool: self.reference(p.tool.as_deref()).map(Box::new),
            },
            ObjectKind::MultiFuse(p) => ExpandedKind::MultiFuse {
                shapes: self.references(&p.shapes),
            },
            ObjectKind::MultiCommon(p) => ExpandedKind::MultiCommon {
                shapes: self.references(&p.shapes),
            },
            ObjectKind::Extrusion(p) => ExpandedKind::Extrusion {
                base: self.reference(p.base.as_deref()).map(Box::new),
                dir: p.dir,
                length_fwd: p.length_fwd,
                length_rev: p.length_rev,
                solid: p.solid,
            },
            ObjectKind::SketchObject(p) => ExpandedKind::SketchObject(p.clone()),
            ObjectKind::RawBrep(p) => ExpandedKind::RawBrep(p.clone()),
            ObjectKind::Any(p) => ExpandedKind::Any(p.clone()),
        };
        ExpandedTree {
            kind,
            placement: spec.placement,
        }
    }

    fn reference(&mut self, name: Option<&str>) -> Option<ExpandedTree> {
        let name = name?;
        let Some(target) = self.index.get(name) else {
            self.mark_unresolved(name);
            return None;
        };
        if self.stack.contains(&target.name.as_str()) {
            warn!(name = %target.name, "reference cycle, treating as unresolved");
            self.mark_unresolved(name);
            return None;
        }
        self.stack.push(target.name.as_str());
        let tree = self.expand(target);
        self.stack.pop();
        Some(tree)
    }

    fn references(&mut self, names: &[String]) -> Vec<ExpandedTree> {
        names
            .iter()
            .filter_map(|n| self.reference(Some(n.as_str())))
            .collect()
    }

    fn mark_unresolved(&mut self, name: &str) {
        if self.unresolved.is_none() {
            self.unresolved = Some(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cad_types::{CutParams, MultiShapeParams};

    fn boxed(name: &str, length: f64) -> ObjectSpec {
        ObjectSpec::new(
            name,
            ObjectKind::Box(BoxParams {
                length,
                ..BoxParams::default()
            }),
        )
    }

    #[test]
    fn references_are_inlined() {
        let objects = vec![
            boxed("A", 1.0),
            boxed("B", 2.0),
            ObjectSpec::new(
                "C",
                ObjectKind::Cut(CutParams {
                    base: Some("A".into()),
                    tool: Some("B".into()),
                }),
            ),
        ];
        let index = ObjectIndex::build(&objects);
        let tree = expand(&objects[2], &index);
        let ExpandedKind::Cut {
            base: Some(base),
            tool: Some(tool),
        } = tree.kind
        else {
            panic!("both operands should resolve");
        };
        let sized = |length| {
            ExpandedKind::Box(BoxParams {
                length,
                ..BoxParams::default()
            })
        };
        assert_eq!(base.kind, sized(1.0));
        assert_eq!(tool.kind, sized(2.0));
    }

    #[test]
    fn unresolved_names_are_omitted() {
        let objects = vec![
            boxed("A", 1.0),
            ObjectSpec::new(
                "F",
                ObjectKind::MultiFuse(MultiShapeParams {
                    shapes: vec!["A".into(), "ghost".into()],
                }),
            ),
        ];
        let index = ObjectIndex::build(&objects);
        let ExpandedKind::MultiFuse { shapes } = expand(&objects[1], &index).kind else {
            panic!("expected a fuse");
        };
        assert_eq!(shapes.len(), 1);
    }

    #[test]
    fn cycles_terminate() {
        let objects = vec![
            ObjectSpec::new(
                "A",
                ObjectKind::MultiFuse(MultiShapeParams {
                    shapes: vec!["B".into()],
                }),
            ),
            ObjectSpec::new(
                "B",
                ObjectKind::MultiFuse(MultiShapeParams {
                    shapes: vec!["A".into()],
                }),
            ),
        ];
        let index = ObjectIndex::build(&objects);
        let ExpandedKind::MultiFuse { shapes } = expand(&objects[0], &index).kind else {
            panic!("expected a fuse");
        };
        let ExpandedKind::MultiFuse { shapes: inner } = &shapes[0].kind else {
            panic!("expected a nested fuse");
        };
        assert!(inner.is_empty());
    }

    #[test]
    fn name_and_visibility_do_not_appear() {
        let objects = vec![boxed("A", 1.0), boxed("Other", 1.0).hidden()];
        let index = ObjectIndex::build(&objects);
        assert_eq!(expand(&objects[0], &index), expand(&objects[1], &index));
    }

    #[test]
    fn nested_missing_reference_is_reported() {
        let objects = vec![
            boxed("A", 1.0),
            boxed("B", 1.0),
            ObjectSpec::new(
                "F",
                ObjectKind::MultiFuse(MultiShapeParams {
                    shapes: vec!["A".into(), "ghost".into()],
                }),
            ),
            ObjectSpec::new(
                "C",
                ObjectKind::Cut(CutParams {
                    base: Some("F".into()),
                    tool: Some("B".into()),
                }),
            ),
        ];
        let index = ObjectIndex::build(&objects);
        assert_eq!(expand_resolved(&objects[3], &index), Err("ghost".to_string()));
        assert!(expand_resolved(&objects[0], &index).is_ok());
    }

    #[test]
    fn cycle_is_reported_unresolved() {
        let objects = vec![ObjectSpec::new(
            "A",
            ObjectKind::MultiFuse(MultiShapeParams {
                shapes: vec!["A".into()],
            }),
        )];
        let index = ObjectIndex::build(&objects);
        assert_eq!(expand_resolved(&objects[0], &index), Err("A".to_string()));
    }
}
