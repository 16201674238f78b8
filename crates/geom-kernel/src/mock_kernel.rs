//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Shapes are plain polyhedra. Rotational primitives become boxes of their
//! bounding extents, booleans are structural stand-ins (union concatenates,
//! subtract and intersect keep the first operand), and transforms are kept
//! as a location on the shape rather than applied to its nodes. Every
//! constructive call is counted so tests can tell a cache hit from a rebuild.

use std::collections::HashMap;
use std::f64::consts::PI;

use cad_types::Transform;

use crate::mass;
use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

const POINT_TOLERANCE: f64 = 1e-9;
/// Deflection used when a profile curve is turned into face boundary nodes.
const PROFILE_DEFLECTION: f64 = 0.01;
const MIN_ARC_SEGMENTS: usize = 4;
const MAX_ARC_SEGMENTS: usize = 512;
/// Payload prefix understood by [`MockKernel::import_brep`].
pub const MOCK_BREP_MAGIC: &str = "MOCKBREP";

#[derive(Debug, Clone)]
struct MockFace {
    /// Boundary loop, counter-clockwise seen from the face's front.
    nodes: Vec<[f64; 3]>,
    triangles: Vec<[u32; 3]>,
    reversed: bool,
}

impl MockFace {
    fn polygon(nodes: Vec<[f64; 3]>) -> Self {
        let triangles = (1..nodes.len().saturating_sub(1))
            .map(|i| [0, i as u32, i as u32 + 1])
            .collect();
        Self {
            nodes,
            triangles,
            reversed: false,
        }
    }

    fn mapped(&self, t: &Transform) -> Self {
        Self {
            nodes: self.nodes.iter().map(|p| t.apply_point(*p)).collect(),
            triangles: self.triangles.clone(),
            reversed: self.reversed,
        }
    }
}

#[derive(Debug, Clone)]
enum MockEdge {
    Polyline(Vec<[f64; 3]>),
    /// Closed boundary of a face, by node index.
    OnFace { face: usize, nodes: Vec<u32> },
}

#[derive(Debug, Clone)]
enum MockCurve {
    Segment {
        start: [f64; 3],
        end: [f64; 3],
    },
    /// Circular arc; a full circle has `sweep == 2π`.
    Arc {
        center: [f64; 3],
        normal: [f64; 3],
        /// Unit vector from the center to the start point.
        x_dir: [f64; 3],
        radius: f64,
        sweep: f64,
    },
}

impl MockCurve {
    fn mapped(&self, t: &Transform) -> Self {
        match self {
            MockCurve::Segment { start, end } => MockCurve::Segment {
                start: t.apply_point(*start),
                end: t.apply_point(*end),
            },
            MockCurve::Arc {
                center,
                normal,
                x_dir,
                radius,
                sweep,
            } => MockCurve::Arc {
                center: t.apply_point(*center),
                normal: t.apply_vector(*normal),
                x_dir: t.apply_vector(*x_dir),
                radius: *radius,
                sweep: *sweep,
            },
        }
    }

    fn sample(&self, deflection: f64) -> Vec<[f64; 3]> {
        match self {
            MockCurve::Segment { start, end } => vec![*start, *end],
            MockCurve::Arc {
                center,
                normal,
                x_dir,
                radius,
                sweep,
            } => {
                let y_dir = cross(*normal, *x_dir);
                let step = if deflection < *radius {
                    2.0 * (1.0 - deflection / radius).acos()
                } else {
                    PI / 2.0
                };
                let n = ((sweep / step).ceil() as usize).clamp(MIN_ARC_SEGMENTS, MAX_ARC_SEGMENTS);
                (0..=n)
                    .map(|i| {
                        let (s, c) = (sweep * i as f64 / n as f64).sin_cos();
                        [
                            center[0] + radius * (c * x_dir[0] + s * y_dir[0]),
                            center[1] + radius * (c * x_dir[1] + s * y_dir[1]),
                            center[2] + radius * (c * x_dir[2] + s * y_dir[2]),
                        ]
                    })
                    .collect()
            }
        }
    }
}

/// A synthetic shape with its geometry in local coordinates.
#[derive(Debug, Clone, Default)]
struct MockShape {
    faces: Vec<MockFace>,
    edges: Vec<MockEdge>,
    curves: Vec<MockCurve>,
    /// Encloses a volume.
    closed: bool,
    location: Option<Transform>,
}

impl MockShape {
    /// Geometry with the location applied and cleared.
    fn baked(&self) -> MockShape {
        let Some(t) = &self.location else {
            return self.clone();
        };
        MockShape {
            faces: self.faces.iter().map(|f| f.mapped(t)).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| match e {
                    MockEdge::Polyline(pts) => {
                        MockEdge::Polyline(pts.iter().map(|p| t.apply_point(*p)).collect())
                    }
                    other => other.clone(),
                })
                .collect(),
            curves: self.curves.iter().map(|c| c.mapped(t)).collect(),
            closed: self.closed,
            location: None,
        }
    }

    fn relocated(&self, next: Transform) -> MockShape {
        let mut shape = self.clone();
        let current = self.location.unwrap_or_default();
        shape.location = Some(current.then(&next));
        shape
    }

    fn append(&mut self, other: MockShape) {
        let offset = self.faces.len();
        self.faces.extend(other.faces);
        self.edges.extend(other.edges.into_iter().map(|e| match e {
            MockEdge::OnFace { face, nodes } => MockEdge::OnFace {
                face: face + offset,
                nodes,
            },
            poly => poly,
        }));
        self.curves.extend(other.curves);
    }

    fn model_points(&self) -> Vec<[f64; 3]> {
        let baked = self.baked();
        let mut points: Vec<[f64; 3]> = baked.faces.iter().flat_map(|f| f.nodes.clone()).collect();
        for e in &baked.edges {
            if let MockEdge::Polyline(pts) = e {
                points.extend(pts.iter().copied());
            }
        }
        for c in &baked.curves {
            points.extend(c.sample(PROFILE_DEFLECTION));
        }
        points
    }

    fn box_shape(origin: [f64; 3], size: [f64; 3]) -> MockShape {
        let [x0, y0, z0] = origin;
        let [x1, y1, z1] = [x0 + size[0], y0 + size[1], z0 + size[2]];
        let c = [
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let loops: [[usize; 4]; 6] = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        let edges: [(usize, usize); 12] = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 0),
            (4, 5),
            (5, 6),
            (6, 7),
            (7, 4),
            (0, 4),
            (1, 5),
            (2, 6),
            (3, 7),
        ];
        MockShape {
            faces: loops
                .iter()
                .map(|l| MockFace::polygon(l.iter().map(|&i| c[i]).collect()))
                .collect(),
            edges: edges
                .iter()
                .map(|&(a, b)| MockEdge::Polyline(vec![c[a], c[b]]))
                .collect(),
            curves: Vec::new(),
            closed: true,
            location: None,
        }
    }
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
pub struct MockKernel {
    next_handle: u64,
    shapes: HashMap<u64, MockShape>,
    scratch: HashMap<String, Vec<u8>>,
    operations: usize,
    fail_booleans: bool,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            shapes: HashMap::new(),
            scratch: HashMap::new(),
            operations: 0,
            fail_booleans: false,
        }
    }

    /// A kernel whose boolean operations always report failure.
    pub fn with_failing_booleans() -> Self {
        Self {
            fail_booleans: true,
            ..Self::new()
        }
    }

    /// Number of constructive calls made so far.
    pub fn operation_count(&self) -> usize {
        self.operations
    }

    pub fn pending_scratch(&self) -> usize {
        self.scratch.len()
    }

    /// Payload that [`Kernel::import_brep`] turns into a box.
    pub fn brep_payload(length: f64, width: f64, height: f64) -> Vec<u8> {
        format!("{MOCK_BREP_MAGIC} {length} {width} {height}").into_bytes()
    }

    fn store(&mut self, shape: MockShape) -> ShapeHandle {
        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;
        self.shapes.insert(handle.0, shape);
        handle
    }

    fn get(&self, handle: &ShapeHandle) -> Result<&MockShape, KernelError> {
        self.shapes
            .get(&handle.0)
            .ok_or(KernelError::ShapeNotFound { handle: *handle })
    }

    fn solid(&self, handle: &ShapeHandle) -> Result<MockShape, KernelError> {
        let shape = self.get(handle)?;
        if !shape.closed {
            return Err(KernelError::NotSupported {
                operation: "boolean on open shape".to_string(),
            });
        }
        Ok(shape.baked())
    }

    fn boolean(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
        combine: fn(MockShape, MockShape) -> MockShape,
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let sa = self.solid(a)?;
        let sb = self.solid(b)?;
        if self.fail_booleans {
            return Err(KernelError::BooleanFailed {
                reason: "mock kernel configured to fail booleans".to_string(),
            });
        }
        Ok(self.store(combine(sa, sb)))
    }

    fn bounded_box(
        &mut self,
        origin: [f64; 3],
        size: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        if size.iter().any(|s| !(s.is_finite() && *s > POINT_TOLERANCE)) {
            return Err(KernelError::InvalidGeometry {
                reason: format!("degenerate extents {size:?}"),
            });
        }
        Ok(self.store(MockShape::box_shape(origin, size)))
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn same_point(a: [f64; 3], b: [f64; 3]) -> bool {
    length(sub(a, b)) < 1e-7
}

fn positive(name: &str, v: f64) -> Result<(), KernelError> {
    if v.is_finite() && v > POINT_TOLERANCE {
        Ok(())
    } else {
        Err(KernelError::InvalidGeometry {
            reason: format!("{name} must be positive, got {v}"),
        })
    }
}

fn nonzero_angle(angle: f64) -> Result<(), KernelError> {
    if angle.is_finite() && angle.abs() > 1e-9 {
        Ok(())
    } else {
        Err(KernelError::InvalidGeometry {
            reason: format!("sweep angle must be non-zero, got {angle}"),
        })
    }
}

/// Joins open polylines at shared endpoints into closed node loops.
fn chain_loops(mut open: Vec<Vec<[f64; 3]>>) -> Result<Vec<Vec<[f64; 3]>>, KernelError> {
    let mut loops = Vec::new();
    while let Some(mut current) = open.pop() {
        loop {
            let (Some(&first), Some(&last)) = (current.first(), current.last()) else {
                break;
            };
            if current.len() > 2 && same_point(first, last) {
                current.pop();
                loops.push(current);
                break;
            }
            let next = open.iter().position(|p| {
                p.first().is_some_and(|q| same_point(*q, last))
                    || p.last().is_some_and(|q| same_point(*q, last))
            });
            let Some(i) = next else {
                return Err(KernelError::FaceFailed {
                    reason: "profile does not close".to_string(),
                });
            };
            let mut piece = open.swap_remove(i);
            if !piece.first().is_some_and(|q| same_point(*q, last)) {
                piece.reverse();
            }
            current.extend(piece.into_iter().skip(1));
        }
    }
    Ok(loops)
}

impl Kernel for MockKernel {
    fn make_box(
        &mut self,
        length: f64,
        width: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.bounded_box([0.0; 3], [length, width, height])
    }

    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        nonzero_angle(angle)?;
        self.bounded_box([-radius, -radius, 0.0], [2.0 * radius, 2.0 * radius, height])
    }

    fn make_cone(
        &mut self,
        radius1: f64,
        radius2: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        nonzero_angle(angle)?;
        if radius1 < 0.0 || radius2 < 0.0 {
            return Err(KernelError::InvalidGeometry {
                reason: "cone radii must be non-negative".to_string(),
            });
        }
        let r = radius1.max(radius2);
        self.bounded_box([-r, -r, 0.0], [2.0 * r, 2.0 * r, height])
    }

    fn make_sphere(
        &mut self,
        radius: f64,
        lat_min: f64,
        lat_max: f64,
        longitude: f64,
    ) -> Result<ShapeHandle, KernelError> {
        positive("radius", radius)?;
        nonzero_angle(longitude)?;
        let (z0, z1) = (radius * lat_min.sin(), radius * lat_max.sin());
        self.bounded_box([-radius, -radius, z0], [2.0 * radius, 2.0 * radius, z1 - z0])
    }

    fn make_torus(
        &mut self,
        radius1: f64,
        radius2: f64,
        angle1: f64,
        angle2: f64,
        angle3: f64,
    ) -> Result<ShapeHandle, KernelError> {
        positive("radius2", radius2)?;
        nonzero_angle(angle3)?;
        if angle2 <= angle1 || radius2 >= radius1 {
            return Err(KernelError::InvalidGeometry {
                reason: "torus section is empty or self-intersecting".to_string(),
            });
        }
        let outer = radius1 + radius2;
        self.bounded_box(
            [-outer, -outer, -radius2],
            [2.0 * outer, 2.0 * outer, 2.0 * radius2],
        )
    }

    fn make_line(&mut self, start: [f64; 3], end: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        if same_point(start, end) {
            return Err(KernelError::InvalidGeometry {
                reason: "line segment has zero length".to_string(),
            });
        }
        Ok(self.store(MockShape {
            curves: vec![MockCurve::Segment { start, end }],
            ..MockShape::default()
        }))
    }

    fn make_circle(
        &mut self,
        center: [f64; 3],
        normal: [f64; 3],
        radius: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        positive("radius", radius)?;
        let len = length(normal);
        if len < POINT_TOLERANCE {
            return Err(KernelError::InvalidGeometry {
                reason: "circle normal has zero length".to_string(),
            });
        }
        let n = scale(normal, 1.0 / len);
        let helper = if n[0].abs() < 0.9 {
            [1.0, 0.0, 0.0]
        } else {
            [0.0, 1.0, 0.0]
        };
        let x = cross(n, helper);
        let x_dir = scale(x, 1.0 / length(x));
        Ok(self.store(MockShape {
            curves: vec![MockCurve::Arc {
                center,
                normal: n,
                x_dir,
                radius,
                sweep: 2.0 * PI,
            }],
            ..MockShape::default()
        }))
    }

    fn make_arc(
        &mut self,
        start: [f64; 3],
        transit: [f64; 3],
        end: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let u = sub(transit, start);
        let v = sub(end, start);
        let w = cross(u, v);
        let w2 = dot(w, w);
        if w2 < 1e-18 {
            return Err(KernelError::InvalidGeometry {
                reason: "arc points are collinear".to_string(),
            });
        }
        // Circumcenter of the three points.
        let offset = scale(
            add(scale(cross(v, w), dot(u, u)), scale(cross(w, u), dot(v, v))),
            1.0 / (2.0 * w2),
        );
        let center = add(start, offset);
        let radius = length(offset);
        let normal = scale(w, 1.0 / w2.sqrt());
        let x_dir = scale(sub(start, center), 1.0 / radius);
        let to_end = sub(end, center);
        let mut sweep = dot(normal, cross(x_dir, to_end)).atan2(dot(x_dir, to_end));
        if sweep <= 0.0 {
            sweep += 2.0 * PI;
        }
        Ok(self.store(MockShape {
            curves: vec![MockCurve::Arc {
                center,
                normal,
                x_dir,
                radius,
                sweep,
            }],
            ..MockShape::default()
        }))
    }

    fn make_compound(&mut self, parts: &[ShapeHandle]) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        if parts.is_empty() {
            return Err(KernelError::InvalidGeometry {
                reason: "empty compound".to_string(),
            });
        }
        let mut combined = MockShape::default();
        let mut closed = true;
        for part in parts {
            let shape = self.get(part)?.baked();
            closed &= shape.closed;
            combined.append(shape);
        }
        combined.closed = closed;
        Ok(self.store(combined))
    }

    fn boolean_union(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        self.boolean(a, b, |mut a, b| {
            a.append(b);
            a
        })
    }

    fn boolean_subtract(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        self.boolean(a, b, |a, _| a)
    }

    fn boolean_intersect(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        self.boolean(a, b, |a, _| a)
    }

    fn copy_shape(&mut self, shape: &ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let copy = self.get(shape)?.clone();
        Ok(self.store(copy))
    }

    fn translate(
        &mut self,
        shape: &ShapeHandle,
        offset: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let moved = self.get(shape)?.relocated(Transform::translation(offset));
        Ok(self.store(moved))
    }

    fn rotate(
        &mut self,
        shape: &ShapeHandle,
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let len = length(axis);
        if len < POINT_TOLERANCE {
            return Err(KernelError::InvalidGeometry {
                reason: "rotation axis has zero length".to_string(),
            });
        }
        let rotated = self
            .get(shape)?
            .relocated(Transform::rotation(scale(axis, 1.0 / len), angle));
        Ok(self.store(rotated))
    }

    fn make_face(&mut self, wires: &ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let shape = self.get(wires)?.baked();
        if !shape.faces.is_empty() || shape.curves.is_empty() {
            return Err(KernelError::NotSupported {
                operation: "face from a shape without loose wires".to_string(),
            });
        }
        let mut closed_loops = Vec::new();
        let mut open = Vec::new();
        for curve in &shape.curves {
            let mut pts = curve.sample(PROFILE_DEFLECTION);
            let closes = pts
                .first()
                .zip(pts.last())
                .is_some_and(|(a, b)| same_point(*a, *b));
            if pts.len() > 2 && closes {
                pts.pop();
                closed_loops.push(pts);
            } else {
                open.push(pts);
            }
        }
        closed_loops.extend(chain_loops(open)?);

        let mut result = MockShape::default();
        for (face, nodes) in closed_loops.into_iter().enumerate() {
            let ring: Vec<u32> = (0..nodes.len() as u32).chain(std::iter::once(0)).collect();
            result.faces.push(MockFace::polygon(nodes));
            result.edges.push(MockEdge::OnFace { face, nodes: ring });
        }
        Ok(self.store(result))
    }

    fn sweep(
        &mut self,
        shape: &ShapeHandle,
        offset: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        if length(offset) < POINT_TOLERANCE {
            return Err(KernelError::SweepFailed {
                reason: "sweep vector has zero length".to_string(),
            });
        }
        let base = self.get(shape)?.baked();
        if base.closed {
            return Err(KernelError::NotSupported {
                operation: "sweep of a solid".to_string(),
            });
        }

        let mut result = MockShape::default();
        if !base.faces.is_empty() {
            for face in &base.faces {
                let n = face.nodes.len();
                let bottom_index = result.faces.len();
                // The base cap faces against the sweep direction.
                result.faces.push(MockFace {
                    reversed: true,
                    ..face.clone()
                });
                let top: Vec<[f64; 3]> = face.nodes.iter().map(|p| add(*p, offset)).collect();
                result.faces.push(MockFace::polygon(top.clone()));
                let ring: Vec<u32> = (0..n as u32).chain(std::iter::once(0)).collect();
                result.edges.push(MockEdge::OnFace {
                    face: bottom_index,
                    nodes: ring.clone(),
                });
                result.edges.push(MockEdge::OnFace {
                    face: bottom_index + 1,
                    nodes: ring,
                });
                for i in 0..n {
                    let j = (i + 1) % n;
                    result.faces.push(MockFace::polygon(vec![
                        face.nodes[i],
                        face.nodes[j],
                        top[j],
                        top[i],
                    ]));
                    result
                        .edges
                        .push(MockEdge::Polyline(vec![face.nodes[i], top[i]]));
                }
            }
            result.closed = true;
        } else {
            for curve in &base.curves {
                let pts = curve.sample(PROFILE_DEFLECTION);
                for pair in pts.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    result
                        .faces
                        .push(MockFace::polygon(vec![a, b, add(b, offset), add(a, offset)]));
                }
                result.edges.push(MockEdge::Polyline(pts.clone()));
                result.edges.push(MockEdge::Polyline(
                    pts.iter().map(|p| add(*p, offset)).collect(),
                ));
            }
        }
        Ok(self.store(result))
    }

    fn write_scratch(&mut self, name: &str, bytes: &[u8]) {
        self.scratch.insert(name.to_string(), bytes.to_vec());
    }

    fn import_brep(&mut self, name: &str) -> Result<ShapeHandle, KernelError> {
        self.operations += 1;
        let bytes = self
            .scratch
            .remove(name)
            .ok_or_else(|| KernelError::ScratchMissing {
                name: name.to_string(),
            })?;
        let malformed = || KernelError::ImportFailed {
            reason: format!("{name} is not a mock B-rep payload"),
        };
        let text = std::str::from_utf8(&bytes).map_err(|_| malformed())?;
        let mut fields = text.split_whitespace();
        if fields.next() != Some(MOCK_BREP_MAGIC) {
            return Err(malformed());
        }
        let dims: Vec<f64> = fields
            .map(|f| f.parse::<f64>().map_err(|_| malformed()))
            .collect::<Result<_, _>>()?;
        let [l, w, h] = dims[..] else {
            return Err(malformed());
        };
        let shape = MockShape::box_shape([0.0; 3], [l, w, h]);
        Ok(self.store(shape))
    }

    fn mass_properties(&mut self, shape: &ShapeHandle) -> Result<MassProps, KernelError> {
        if !self.get(shape)?.closed {
            return Ok(MassProps::default());
        }
        let mesh = self.triangulate(shape, PROFILE_DEFLECTION)?;
        Ok(mass::from_mesh(&mesh))
    }

    fn triangulate(
        &mut self,
        shape: &ShapeHandle,
        tolerance: f64,
    ) -> Result<ShapeMesh, KernelError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(KernelError::TessellationFailed {
                reason: format!("tolerance must be positive, got {tolerance}"),
            });
        }
        let shape = self.get(shape)?;
        let faces = shape
            .faces
            .iter()
            .map(|f| FaceTriangulation {
                nodes: f.nodes.clone(),
                normals: None,
                triangles: f.triangles.clone(),
                reversed: f.reversed,
                location: shape.location,
            })
            .collect();
        let edges = shape
            .edges
            .iter()
            .map(|e| match e {
                MockEdge::Polyline(pts) => EdgeDiscretization {
                    polygon: Some(pts.clone()),
                    location: shape.location,
                    on_triangulation: None,
                },
                MockEdge::OnFace { face, nodes } => EdgeDiscretization {
                    polygon: None,
                    location: None,
                    on_triangulation: Some(PolygonOnTriangulation {
                        face: *face,
                        nodes: nodes.clone(),
                    }),
                },
            })
            .collect();
        Ok(ShapeMesh { faces, edges })
    }

    fn sample_free_edges(
        &mut self,
        shape: &ShapeHandle,
        tangential_deflection: f64,
    ) -> Result<Vec<Vec<[f64; 3]>>, KernelError> {
        let baked = self.get(shape)?.baked();
        Ok(baked
            .curves
            .iter()
            .map(|c| c.sample(tangential_deflection))
            .collect())
    }

    fn release(&mut self, shape: &ShapeHandle) {
        self.shapes.remove(&shape.0);
    }
}

impl KernelIntrospect for MockKernel {
    fn contains(&self, shape: &ShapeHandle) -> bool {
        self.shapes.contains_key(&shape.0)
    }

    fn has_faces(&self, shape: &ShapeHandle) -> bool {
        self.face_count(shape) > 0
    }

    fn face_count(&self, shape: &ShapeHandle) -> usize {
        self.get(shape).map(|s| s.faces.len()).unwrap_or(0)
    }

    fn edge_count(&self, shape: &ShapeHandle) -> usize {
        self.get(shape)
            .map(|s| s.edges.len() + s.curves.len())
            .unwrap_or(0)
    }

    fn vertex_positions(&self, shape: &ShapeHandle) -> Vec<[f64; 3]> {
        let Ok(shape) = self.get(shape) else {
            return Vec::new();
        };
        let baked = shape.baked();
        let mut candidates: Vec<[f64; 3]> = Vec::new();
        for e in &baked.edges {
            match e {
                MockEdge::Polyline(pts) => {
                    candidates.extend(pts.first().into_iter().chain(pts.last()))
                }
                MockEdge::OnFace { face, nodes } => {
                    if let Some(f) = baked.faces.get(*face) {
                        candidates.extend(nodes.iter().filter_map(|&i| f.nodes.get(i as usize)));
                    }
                }
            }
        }
        for c in &baked.curves {
            let pts = c.sample(PROFILE_DEFLECTION);
            candidates.extend(pts.first().into_iter().chain(pts.last()));
        }
        let mut unique: Vec<[f64; 3]> = Vec::new();
        for p in candidates {
            if !unique.iter().any(|q| same_point(*q, p)) {
                unique.push(p);
            }
        }
        unique
    }

    fn bounding_box(&self, shape: &ShapeHandle) -> Option<BoundingBox> {
        let points = self.get(shape).ok()?.model_points();
        BoundingBox::from_points(&points)
    }

    fn live_shapes(&self) -> usize {
        self.shapes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_has_six_faces_twelve_edges_eight_vertices() {
        let mut k = MockKernel::new();
        let b = k.make_box(1.0, 2.0, 3.0).unwrap();
        assert_eq!(k.face_count(&b), 6);
        assert_eq!(k.edge_count(&b), 12);
        assert_eq!(k.vertex_positions(&b).len(), 8);
        let props = k.mass_properties(&b).unwrap();
        assert_relative_eq!(props.mass, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn transforms_are_kept_as_location() {
        let mut k = MockKernel::new();
        let b = k.make_box(1.0, 1.0, 1.0).unwrap();
        let r = k.rotate(&b, [0.0, 0.0, 1.0], PI / 2.0).unwrap();
        let t = k.translate(&r, [1.0, 0.0, 0.0]).unwrap();
        let mesh = k.triangulate(&t, 0.1).unwrap();
        assert!(mesh.faces.iter().all(|f| f.location.is_some()));
        let corners = k.vertex_positions(&t);
        assert!(corners
            .iter()
            .any(|p| same_point(*p, [1.0, 1.0, 0.0])));
        // Source untouched.
        let bb = k.bounding_box(&b).unwrap();
        assert_eq!(bb.min, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn failing_booleans_report_errors() {
        let mut k = MockKernel::with_failing_booleans();
        let a = k.make_box(1.0, 1.0, 1.0).unwrap();
        let b = k.make_box(1.0, 1.0, 1.0).unwrap();
        assert!(matches!(
            k.boolean_union(&a, &b),
            Err(KernelError::BooleanFailed { .. })
        ));
    }

    #[test]
    fn union_concatenates_operands() {
        let mut k = MockKernel::new();
        let a = k.make_box(1.0, 1.0, 1.0).unwrap();
        let b0 = k.make_box(1.0, 1.0, 1.0).unwrap();
        let b = k.translate(&b0, [3.0, 0.0, 0.0]).unwrap();
        let u = k.boolean_union(&a, &b).unwrap();
        assert_eq!(k.face_count(&u), 12);
        assert_relative_eq!(k.mass_properties(&u).unwrap().mass, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn square_profile_extrudes_to_closed_prism() {
        let mut k = MockKernel::new();
        let pts = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]];
        let lines: Vec<ShapeHandle> = (0..4)
            .map(|i| k.make_line(pts[i], pts[(i + 1) % 4]).unwrap())
            .collect();
        let profile = k.make_compound(&lines).unwrap();
        assert!(!k.has_faces(&profile));
        let face = k.make_face(&profile).unwrap();
        let prism = k.sweep(&face, [0.0, 0.0, 3.0]).unwrap();
        assert_eq!(k.face_count(&prism), 6);
        assert_relative_eq!(k.mass_properties(&prism).unwrap().mass, 12.0, epsilon = 1e-9);
        let mesh = k.triangulate(&prism, 0.1).unwrap();
        assert!(mesh.faces.iter().any(|f| f.reversed));
        assert!(mesh.edges.iter().any(|e| e.on_triangulation.is_some()));
    }

    #[test]
    fn arc_through_three_points() {
        let mut k = MockKernel::new();
        let arc = k
            .make_arc([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0])
            .unwrap();
        let lines = k.sample_free_edges(&arc, 0.001).unwrap();
        let last = *lines[0].last().unwrap();
        assert_relative_eq!(last[0], -1.0, epsilon = 1e-9);
        assert!(lines[0].iter().all(|p| (length(*p) - 1.0).abs() < 1e-9));
        assert!(lines[0].iter().all(|p| p[1] >= -1e-9));
    }

    #[test]
    fn finer_deflection_samples_more_points() {
        let mut k = MockKernel::new();
        let c = k.make_circle([0.0; 3], [0.0, 0.0, 1.0], 5.0).unwrap();
        let coarse = k.sample_free_edges(&c, 0.5).unwrap()[0].len();
        let fine = k.sample_free_edges(&c, 0.01).unwrap()[0].len();
        assert!(fine > coarse);
    }

    #[test]
    fn import_reads_mock_payload() {
        let mut k = MockKernel::new();
        k.write_scratch("a.brep", &MockKernel::brep_payload(1.0, 2.0, 3.0));
        let h = k.import_brep("a.brep").unwrap();
        assert_eq!(k.face_count(&h), 6);
        k.write_scratch("b.brep", b"garbage");
        assert!(matches!(
            k.import_brep("b.brep"),
            Err(KernelError::ImportFailed { .. })
        ));
        assert_eq!(k.pending_scratch(), 0);
    }

    #[test]
    fn operation_counter_tracks_construction() {
        let mut k = MockKernel::new();
        assert_eq!(k.operation_count(), 0);
        let b = k.make_box(1.0, 1.0, 1.0).unwrap();
        let _ = k.copy_shape(&b).unwrap();
        assert_eq!(k.operation_count(), 2);
    }
}
