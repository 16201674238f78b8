//! KernelIntrospect implementation for TruckKernel.

use std::collections::HashSet;

use truck_modeling::topology::Edge;

use crate::traits::KernelIntrospect;
use crate::truck_kernel::{TruckKernel, TruckShape};
use crate::types::*;
use crate::wire_loops::{sample_edge, to_array};

/// Chordal tolerance used when sampling curved edges for bounds.
const BOUNDS_SAMPLE_TOLERANCE: f64 = 1e-3;

fn unique_edges(shape: &TruckShape) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    let mut push = |e: &Edge| {
        if seen.insert(e.id()) {
            edges.push(e.clone());
        }
    };
    match shape {
        TruckShape::Wires(wires) => wires.iter().flat_map(|w| w.edge_iter()).for_each(&mut push),
        other => other
            .shells()
            .iter()
            .flat_map(|s| s.edge_iter().collect::<Vec<_>>())
            .for_each(|e| push(&e)),
    }
    edges
}

/// Bounds from vertices plus sampled edge curves.
pub(crate) fn bounds_of(shape: &TruckShape) -> Option<BoundingBox> {
    let points: Vec<[f64; 3]> = unique_edges(shape)
        .iter()
        .flat_map(|e| sample_edge(e, BOUNDS_SAMPLE_TOLERANCE))
        .map(to_array)
        .collect();
    BoundingBox::from_points(&points)
}

impl KernelIntrospect for TruckKernel {
    fn contains(&self, shape: &ShapeHandle) -> bool {
        self.get(shape).is_ok()
    }

    fn has_faces(&self, shape: &ShapeHandle) -> bool {
        self.face_count(shape) > 0
    }

    fn face_count(&self, shape: &ShapeHandle) -> usize {
        match self.get(shape) {
            Ok(TruckShape::Faces(faces)) => faces.len(),
            Ok(other) => other.shells().iter().map(|s| s.len()).sum(),
            Err(_) => 0,
        }
    }

    fn edge_count(&self, shape: &ShapeHandle) -> usize {
        self.get(shape).map(|s| unique_edges(s).len()).unwrap_or(0)
    }

    fn vertex_positions(&self, shape: &ShapeHandle) -> Vec<[f64; 3]> {
        let Ok(shape) = self.get(shape) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut positions = Vec::new();
        for edge in unique_edges(shape) {
            for v in [edge.front(), edge.back()] {
                if seen.insert(v.id()) {
                    positions.push(to_array(v.point()));
                }
            }
        }
        positions
    }

    fn bounding_box(&self, shape: &ShapeHandle) -> Option<BoundingBox> {
        bounds_of(self.get(shape).ok()?)
    }

    fn live_shapes(&self) -> usize {
        self.shape_count()
    }
}
