use crate::types::*;

/// Core geometry kernel trait. All shapes live inside the kernel and are
/// addressed through [`ShapeHandle`]s. Constructive operations never
/// mutate their inputs; they return a new handle.
///
/// Angles are in radians. Implemented by TruckKernel (wraps real truck)
/// and MockKernel (deterministic test double).
pub trait Kernel {
    /// Box with one corner at the origin extending along +X, +Y, +Z.
    fn make_box(&mut self, length: f64, width: f64, height: f64)
        -> Result<ShapeHandle, KernelError>;

    /// Cylinder with its base centered at the origin, axis +Z.
    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Truncated cone, base radius `radius1` at z = 0, top radius `radius2`.
    fn make_cone(
        &mut self,
        radius1: f64,
        radius2: f64,
        height: f64,
        angle: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Sphere segment bounded by latitudes `lat_min..lat_max`, swept
    /// `longitude` around +Z.
    fn make_sphere(
        &mut self,
        radius: f64,
        lat_min: f64,
        lat_max: f64,
        longitude: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Torus about +Z. The tube profile spans `angle1..angle2`; the sweep
    /// around the main axis is `angle3`.
    fn make_torus(
        &mut self,
        radius1: f64,
        radius2: f64,
        angle1: f64,
        angle2: f64,
        angle3: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Straight edge between two points.
    fn make_line(&mut self, start: [f64; 3], end: [f64; 3]) -> Result<ShapeHandle, KernelError>;

    /// Full circle edge.
    fn make_circle(
        &mut self,
        center: [f64; 3],
        normal: [f64; 3],
        radius: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Circular arc through three points.
    fn make_arc(
        &mut self,
        start: [f64; 3],
        transit: [f64; 3],
        end: [f64; 3],
    ) -> Result<ShapeHandle, KernelError>;

    /// Groups shapes into a single compound.
    fn make_compound(&mut self, parts: &[ShapeHandle]) -> Result<ShapeHandle, KernelError>;

    /// Boolean union of two solids.
    fn boolean_union(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError>;

    /// Boolean intersection of two solids.
    fn boolean_intersect(
        &mut self,
        a: &ShapeHandle,
        b: &ShapeHandle,
    ) -> Result<ShapeHandle, KernelError>;

    /// Independent copy of a shape.
    fn copy_shape(&mut self, shape: &ShapeHandle) -> Result<ShapeHandle, KernelError>;

    fn translate(
        &mut self,
        shape: &ShapeHandle,
        offset: [f64; 3],
    ) -> Result<ShapeHandle, KernelError>;

    /// Rotation about an axis through the origin.
    fn rotate(
        &mut self,
        shape: &ShapeHandle,
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Planar face bounded by the closed loops formed by a shape's wires.
    fn make_face(&mut self, wires: &ShapeHandle) -> Result<ShapeHandle, KernelError>;

    /// Linear sweep (prism). Faces become solids, wires become shells.
    fn sweep(&mut self, shape: &ShapeHandle, vector: [f64; 3])
        -> Result<ShapeHandle, KernelError>;

    /// Stores bytes under `name` in the kernel's scratch store.
    fn write_scratch(&mut self, name: &str, bytes: &[u8]);

    /// Reads a serialized B-rep from the scratch store. The scratch entry is
    /// consumed whether or not the import succeeds.
    fn import_brep(&mut self, name: &str) -> Result<ShapeHandle, KernelError>;

    fn mass_properties(&mut self, shape: &ShapeHandle) -> Result<MassProps, KernelError>;

    /// Meshes every face of a shape at the given chordal tolerance.
    fn triangulate(
        &mut self,
        shape: &ShapeHandle,
        tolerance: f64,
    ) -> Result<ShapeMesh, KernelError>;

    /// Samples edges that bound no face (sketch profiles, loose wires).
    fn sample_free_edges(
        &mut self,
        shape: &ShapeHandle,
        tangential_deflection: f64,
    ) -> Result<Vec<Vec<[f64; 3]>>, KernelError>;

    /// Drops a shape. Unknown handles are ignored.
    fn release(&mut self, shape: &ShapeHandle);
}

/// Read-only queries on kernel shapes.
pub trait KernelIntrospect {
    fn contains(&self, shape: &ShapeHandle) -> bool;

    /// Whether the shape has at least one face.
    fn has_faces(&self, shape: &ShapeHandle) -> bool;

    fn face_count(&self, shape: &ShapeHandle) -> usize;

    /// Number of unique edges, including free ones.
    fn edge_count(&self, shape: &ShapeHandle) -> usize;

    /// Positions of all unique vertices in model space.
    fn vertex_positions(&self, shape: &ShapeHandle) -> Vec<[f64; 3]>;

    fn bounding_box(&self, shape: &ShapeHandle) -> Option<BoundingBox>;

    /// Number of live shapes held by the kernel.
    fn live_shapes(&self) -> usize;
}

/// Combined trait for callers that need both mutable Kernel access
/// and read-only KernelIntrospect access on the same object.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
