//! TruckKernel: real geometry kernel wrapping truck's API.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};
use truck_modeling::builder;
use truck_modeling::geometry::{Curve, Surface};
use truck_modeling::topology::{Face, Shell, Solid, Wire};
use truck_modeling::{EuclideanSpace, InnerSpace, Point3, Rad, Vector3};
use truck_topology::compress::CompressedSolid;

use crate::primitives;
use crate::traits::Kernel;
use crate::triangulation;
use crate::types::*;
use crate::wire_loops;

/// Tolerance handed to truck-shapeops for boolean operations.
const BOOLEAN_TOLERANCE: f64 = 0.05;
const DIRECTION_EPSILON: f64 = 1e-12;

/// A shape held by the kernel.
#[derive(Clone, Debug)]
pub(crate) enum TruckShape {
    Solid(Solid),
    Shell(Shell),
    Faces(Vec<Face>),
    /// Loose edges and wires, e.g. a sketch compound.
    Wires(Vec<Wire>),
}

impl TruckShape {
    pub(crate) fn shells(&self) -> Vec<Shell> {
        match self {
            TruckShape::Solid(solid) => solid.boundaries().clone(),
            TruckShape::Shell(shell) => vec![shell.clone()],
            TruckShape::Faces(faces) => vec![faces.iter().cloned().collect()],
            TruckShape::Wires(_) => Vec::new(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TruckShape::Solid(_) => "solid",
            TruckShape::Shell(_) => "shell",
            TruckShape::Faces(_) => "faces",
            TruckShape::Wires(_) => "wires",
        }
    }

    fn translated(&self, v: Vector3) -> TruckShape {
        match self {
            TruckShape::Solid(s) => TruckShape::Solid(builder::translated(s, v)),
            TruckShape::Shell(s) => TruckShape::Shell(builder::translated(s, v)),
            TruckShape::Faces(fs) => {
                TruckShape::Faces(fs.iter().map(|f| builder::translated(f, v)).collect())
            }
            TruckShape::Wires(ws) => {
                TruckShape::Wires(ws.iter().map(|w| builder::translated(w, v)).collect())
            }
        }
    }

    fn rotated(&self, axis: Vector3, angle: Rad<f64>) -> TruckShape {
        let o = Point3::origin();
        match self {
            TruckShape::Solid(s) => TruckShape::Solid(builder::rotated(s, o, axis, angle)),
            TruckShape::Shell(s) => TruckShape::Shell(builder::rotated(s, o, axis, angle)),
            TruckShape::Faces(fs) => TruckShape::Faces(
                fs.iter().map(|f| builder::rotated(f, o, axis, angle)).collect(),
            ),
            TruckShape::Wires(ws) => TruckShape::Wires(
                ws.iter().map(|w| builder::rotated(w, o, axis, angle)).collect(),
            ),
        }
    }
}

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    shapes: HashMap<u64, TruckShape>,
    /// In-memory scratch filesystem for imports.
    scratch: HashMap<String, Vec<u8>>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            shapes: HashMap::new(),
            scratch: HashMap::new(),
        }
    }

    fn store(&mut self, shape: TruckShape) -> ShapeHandle {
        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;
        debug!(handle = handle.0, kind = shape.kind(), "stored shape");
        self.shapes.insert(handle.0, shape);
        handle
    }

    pub(crate) fn get(&self, handle: &ShapeHandle) -> Result<&TruckShape, KernelError> {
        self.shapes
            .get(&handle.0)
            .ok_or(KernelError::ShapeNotFound { handle: *handle })
    }

    fn solid(&self, handle: &ShapeHandle) -> Result<Solid, KernelError> {
        match self.get(handle)? {
            TruckShape::Solid(solid) => Ok(solid.clone()),
            other => Err(KernelError::NotSupported {
                operation: format!("boolean on {}", other.kind()),
            }),
        }
    }

    /// Serializes a solid in the format [`Kernel::import_brep`] reads.
    pub fn export_brep(&self, handle: &ShapeHandle) -> Result<Vec<u8>, KernelError> {
        let solid = self.solid(handle)?;
        serde_json::to_vec(&solid.compress()).map_err(|e| KernelError::NotSupported {
            operation: format!("export: {e}"),
        })
    }

    pub(crate) fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of scratch entries not yet consumed by an import.
    pub fn pending_scratch(&self) -> usize {
        self.scratch.len()
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn vector(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn any_perpendicular(n: Vector3) -> Vector3 {
    let helper = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    n.cross(helper).normalize()
}

/// Solids assembled from the shells of several solids.
fn merge_solids(solids: Vec<Solid>) -> Result<Solid, KernelError> {
    let shells: Vec<Shell> = solids
        .iter()
        .flat_map(|s| s.boundaries().iter().cloned())
        .collect();
    Solid::try_new(shells).map_err(|e| KernelError::InvalidGeometry {
        reason: e.to_string(),
    })
}

impl Kernel for TruckKernel {
    #[instrument(skip(self))]
    fn make_box(
        &mut self,
        length: f64,
        width: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let solid = primitives::make_box(length, width, height)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    #[instrument(skip(self))]
    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let solid = primitives::make_cylinder(radius, height, angle)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    #[instrument(skip(self))]
    fn make_cone(
        &mut self,
        radius1: f64,
        radius2: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let solid = primitives::make_cone(radius1, radius2, height, angle)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    #[instrument(skip(self))]
    fn make_sphere(
        &mut self,
        radius: f64,
        lat_min: f64,
        lat_max: f64,
        longitude: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let solid = primitives::make_sphere(radius, lat_min, lat_max, longitude)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    #[instrument(skip(self))]
    fn make_torus(
        &mut self,
        radius1: f64,
        radius2: f64,
        angle1: f64,
        angle2: f64,
        angle3: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let solid = primitives::make_torus(radius1, radius2, angle1, angle2, angle3)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn make_line(&mut self, start: [f64; 3], end: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        if (point(end) - point(start)).magnitude() < DIRECTION_EPSILON {
            return Err(KernelError::InvalidGeometry {
                reason: "line segment has zero length".to_string(),
            });
        }
        let v0 = builder::vertex(point(start));
        let v1 = builder::vertex(point(end));
        let wire: Wire = std::iter::once(builder::line(&v0, &v1)).collect();
        Ok(self.store(TruckShape::Wires(vec![wire])))
    }

    fn make_circle(
        &mut self,
        center: [f64; 3],
        normal: [f64; 3],
        radius: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let n = vector(normal);
        if radius <= 0.0 || n.magnitude() < DIRECTION_EPSILON {
            return Err(KernelError::InvalidGeometry {
                reason: format!("circle needs a positive radius and a normal, got r={radius}"),
            });
        }
        let n = n.normalize();
        let c = point(center);
        let v = builder::vertex(c + any_perpendicular(n) * radius);
        let wire = builder::rsweep(&v, c, n, Rad(2.0 * std::f64::consts::PI));
        Ok(self.store(TruckShape::Wires(vec![wire])))
    }

    fn make_arc(
        &mut self,
        start: [f64; 3],
        transit: [f64; 3],
        end: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        let (a, m, b) = (point(start), point(transit), point(end));
        if (m - a).cross(b - a).magnitude() < DIRECTION_EPSILON {
            return Err(KernelError::InvalidGeometry {
                reason: "arc points are collinear".to_string(),
            });
        }
        let v0 = builder::vertex(a);
        let v1 = builder::vertex(b);
        let wire: Wire = std::iter::once(builder::circle_arc(&v0, &v1, m)).collect();
        Ok(self.store(TruckShape::Wires(vec![wire])))
    }

    fn make_compound(&mut self, parts: &[ShapeHandle]) -> Result<ShapeHandle, KernelError> {
        let shapes: Vec<TruckShape> = parts
            .iter()
            .map(|h| self.get(h).cloned())
            .collect::<Result<_, _>>()?;
        if shapes.is_empty() {
            return Err(KernelError::InvalidGeometry {
                reason: "empty compound".to_string(),
            });
        }
        let combined = if shapes.iter().all(|s| matches!(s, TruckShape::Wires(_))) {
            TruckShape::Wires(
                shapes
                    .into_iter()
                    .flat_map(|s| match s {
                        TruckShape::Wires(ws) => ws,
                        _ => Vec::new(),
                    })
                    .collect(),
            )
        } else if shapes.iter().all(|s| matches!(s, TruckShape::Solid(_))) {
            let solids = shapes
                .into_iter()
                .filter_map(|s| match s {
                    TruckShape::Solid(solid) => Some(solid),
                    _ => None,
                })
                .collect();
            TruckShape::Solid(merge_solids(solids)?)
        } else {
            return Err(KernelError::NotSupported {
                operation: "compound of mixed shape kinds".to_string(),
            });
        };
        Ok(self.store(combined))
    }

    #[instrument(skip(self))]
    fn boolean_union(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        let solid_a = self.solid(a)?;
        let solid_b = self.solid(b)?;
        let result = truck_shapeops::or(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck or() returned None".to_string(),
            }
        })?;
        Ok(self.store(TruckShape::Solid(result)))
    }

    #[instrument(skip(self))]
    fn boolean_subtract(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        let solid_a = self.solid(a)?;
        let mut solid_b = self.solid(b)?;
        // Subtraction = A ∩ ¬B. not() mutates in place.
        solid_b.not();
        let result = truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None for subtraction".to_string(),
            }
        })?;
        Ok(self.store(TruckShape::Solid(result)))
    }

    #[instrument(skip(self))]
    fn boolean_intersect(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        let solid_a = self.solid(a)?;
        let solid_b = self.solid(b)?;
        let result = truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None".to_string(),
            }
        })?;
        Ok(self.store(TruckShape::Solid(result)))
    }

    fn copy_shape(&mut self, shape: &ShapeHandle) -> Result<ShapeHandle, KernelError> {
        // Mapping rebuilds topology, so the copy shares nothing with the source.
        let copy = self.get(shape)?.translated(Vector3::new(0.0, 0.0, 0.0));
        Ok(self.store(copy))
    }

    fn translate(
        &mut self,
        shape: &ShapeHandle,
        offset: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        let moved = self.get(shape)?.translated(vector(offset));
        Ok(self.store(moved))
    }

    fn rotate(
        &mut self,
        shape: &ShapeHandle,
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let axis = vector(axis);
        if axis.magnitude() < DIRECTION_EPSILON {
            return Err(KernelError::InvalidGeometry {
                reason: "rotation axis has zero length".to_string(),
            });
        }
        let rotated = self.get(shape)?.rotated(axis.normalize(), Rad(angle));
        Ok(self.store(rotated))
    }

    #[instrument(skip(self))]
    fn make_face(&mut self, wires: &ShapeHandle) -> Result<ShapeHandle, KernelError> {
        let faces = match self.get(wires)? {
            TruckShape::Wires(ws) => wire_loops::faces_from_wires(ws)?,
            other => {
                return Err(KernelError::NotSupported {
                    operation: format!("face from {}", other.kind()),
                })
            }
        };
        Ok(self.store(TruckShape::Faces(faces)))
    }

    #[instrument(skip(self))]
    fn sweep(
        &mut self,
        shape: &ShapeHandle,
        offset: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        let v = vector(offset);
        if v.magnitude() < DIRECTION_EPSILON {
            return Err(KernelError::SweepFailed {
                reason: "sweep vector has zero length".to_string(),
            });
        }
        let swept = match self.get(shape)? {
            TruckShape::Faces(faces) => {
                let solids: Vec<Solid> = faces.iter().map(|f| builder::tsweep(f, v)).collect();
                if solids.len() == 1 {
                    TruckShape::Solid(solids.into_iter().next().ok_or_else(|| {
                        KernelError::SweepFailed {
                            reason: "no solid produced".to_string(),
                        }
                    })?)
                } else {
                    TruckShape::Solid(merge_solids(solids)?)
                }
            }
            TruckShape::Wires(wires) => {
                let faces: Shell = wires
                    .iter()
                    .flat_map(|w| {
                        let shell: Shell = builder::tsweep(w, v);
                        shell.face_iter().cloned().collect::<Vec<_>>()
                    })
                    .collect();
                TruckShape::Shell(faces)
            }
            other => {
                return Err(KernelError::NotSupported {
                    operation: format!("sweep of {}", other.kind()),
                })
            }
        };
        Ok(self.store(swept))
    }

    fn write_scratch(&mut self, name: &str, bytes: &[u8]) {
        self.scratch.insert(name.to_string(), bytes.to_vec());
    }

    #[instrument(skip(self))]
    fn import_brep(&mut self, name: &str) -> Result<ShapeHandle, KernelError> {
        let bytes = self
            .scratch
            .remove(name)
            .ok_or_else(|| KernelError::ScratchMissing {
                name: name.to_string(),
            })?;
        let compressed: CompressedSolid<Point3, Curve, Surface> = serde_json::from_slice(&bytes)
            .map_err(|e| KernelError::ImportFailed {
                reason: e.to_string(),
            })?;
        let solid = Solid::extract(compressed).map_err(|e| KernelError::ImportFailed {
            reason: e.to_string(),
        })?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn mass_properties(&mut self, shape: &ShapeHandle) -> Result<MassProps, KernelError> {
        let TruckShape::Solid(solid) = self.get(shape)? else {
            return Ok(MassProps::default());
        };
        let tolerance = crate::truck_introspect::bounds_of(self.get(shape)?)
            .map(|bb| (bb.diagonal() * 1e-3).max(1e-4))
            .unwrap_or(1e-2);
        let mesh = triangulation::triangulate_shells(solid.boundaries(), tolerance)?;
        Ok(crate::mass::from_mesh(&mesh))
    }

    #[instrument(skip(self))]
    fn triangulate(
        &mut self,
        shape: &ShapeHandle,
        tolerance: f64,
    ) -> Result<ShapeMesh, KernelError> {
        let shells = self.get(shape)?.shells();
        triangulation::triangulate_shells(&shells, tolerance)
    }

    fn sample_free_edges(
        &mut self,
        shape: &ShapeHandle,
        tangential_deflection: f64,
    ) -> Result<Vec<Vec<[f64; 3]>>, KernelError> {
        let TruckShape::Wires(wires) = self.get(shape)? else {
            return Ok(Vec::new());
        };
        let polylines = wires
            .iter()
            .map(|wire| {
                let mut line: Vec<[f64; 3]> = Vec::new();
                for edge in wire.edge_iter() {
                    let points = wire_loops::sample_edge(edge, tangential_deflection);
                    // consecutive edges share their joint
                    let skip = usize::from(!line.is_empty());
                    line.extend(points.into_iter().skip(skip).map(wire_loops::to_array));
                }
                line
            })
            .filter(|line| line.len() >= 2)
            .collect();
        Ok(polylines)
    }

    fn release(&mut self, shape: &ShapeHandle) {
        if self.shapes.remove(&shape.0).is_none() {
            warn!(handle = shape.0, "release of unknown shape");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KernelIntrospect;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn box_mass_properties() {
        let mut k = TruckKernel::new();
        let h = k.make_box(2.0, 2.0, 2.0).unwrap();
        let props = k.mass_properties(&h).unwrap();
        assert_relative_eq!(props.mass, 8.0, epsilon = 1e-6);
        for c in props.center_of_mass {
            assert_relative_eq!(c, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn translate_leaves_source_untouched() {
        let mut k = TruckKernel::new();
        let h = k.make_box(1.0, 1.0, 1.0).unwrap();
        let moved = k.translate(&h, [5.0, 0.0, 0.0]).unwrap();
        assert_ne!(h, moved);
        let src = k.bounding_box(&h).unwrap();
        let dst = k.bounding_box(&moved).unwrap();
        assert_relative_eq!(src.min[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(dst.min[0], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn rotation_moves_corner() {
        let mut k = TruckKernel::new();
        let h = k.make_box(1.0, 1.0, 1.0).unwrap();
        let r = k.rotate(&h, [0.0, 0.0, 1.0], PI / 2.0).unwrap();
        let bb = k.bounding_box(&r).unwrap();
        assert_relative_eq!(bb.min[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn union_of_overlapping_boxes() {
        let mut k = TruckKernel::new();
        let a = k.make_box(2.0, 2.0, 2.0).unwrap();
        let b0 = k.make_box(2.0, 2.0, 2.0).unwrap();
        let b = k.translate(&b0, [1.0, 1.0, 1.0]).unwrap();
        let u = k.boolean_union(&a, &b).unwrap();
        let props = k.mass_properties(&u).unwrap();
        assert_relative_eq!(props.mass, 15.0, epsilon = 1e-3);
    }

    #[test]
    fn boolean_on_wires_is_not_supported() {
        let mut k = TruckKernel::new();
        let a = k.make_box(1.0, 1.0, 1.0).unwrap();
        let line = k.make_line([0.0; 3], [1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            k.boolean_union(&a, &line),
            Err(KernelError::NotSupported { .. })
        ));
    }

    #[test]
    fn circle_face_sweeps_to_cylinder() {
        let mut k = TruckKernel::new();
        let c = k.make_circle([0.0; 3], [0.0, 0.0, 1.0], 1.0).unwrap();
        assert!(!k.has_faces(&c));
        let face = k.make_face(&c).unwrap();
        assert!(k.has_faces(&face));
        let solid = k.sweep(&face, [0.0, 0.0, 2.0]).unwrap();
        let props = k.mass_properties(&solid).unwrap();
        assert_relative_eq!(props.mass, 2.0 * PI, max_relative = 1e-2);
    }

    #[test]
    fn open_wire_sweeps_to_shell() {
        let mut k = TruckKernel::new();
        let line = k.make_line([0.0; 3], [1.0, 0.0, 0.0]).unwrap();
        let shell = k.sweep(&line, [0.0, 0.0, 1.0]).unwrap();
        assert_eq!(k.face_count(&shell), 1);
        assert!(k.mass_properties(&shell).unwrap().is_massless());
    }

    #[test]
    fn free_edges_sampled_for_wires_only() {
        let mut k = TruckKernel::new();
        let circle = k.make_circle([0.0; 3], [0.0, 0.0, 1.0], 1.0).unwrap();
        let lines = k.sample_free_edges(&circle, 0.01).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].len() > 8);
        let b = k.make_box(1.0, 1.0, 1.0).unwrap();
        assert!(k.sample_free_edges(&b, 0.01).unwrap().is_empty());
    }

    #[test]
    fn export_then_import_round_trips_a_solid() {
        let mut k = TruckKernel::new();
        let b = k.make_box(1.0, 2.0, 3.0).unwrap();
        let bytes = k.export_brep(&b).unwrap();
        k.write_scratch("part.brep", &bytes);
        let imported = k.import_brep("part.brep").unwrap();
        assert_eq!(k.face_count(&imported), 6);
        assert_eq!(k.pending_scratch(), 0);
    }

    #[test]
    fn malformed_import_fails_and_consumes_scratch() {
        let mut k = TruckKernel::new();
        k.write_scratch("bad.brep", b"not a brep");
        assert!(matches!(
            k.import_brep("bad.brep"),
            Err(KernelError::ImportFailed { .. })
        ));
        assert_eq!(k.pending_scratch(), 0);
        assert!(matches!(
            k.import_brep("bad.brep"),
            Err(KernelError::ScratchMissing { .. })
        ));
    }

    #[test]
    fn release_drops_shape() {
        let mut k = TruckKernel::new();
        let b = k.make_box(1.0, 1.0, 1.0).unwrap();
        assert_eq!(k.live_shapes(), 1);
        k.release(&b);
        assert_eq!(k.live_shapes(), 0);
        assert!(!k.contains(&b));
    }
}
