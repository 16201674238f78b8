//! Face synthesis from loose profile wires.
//!
//! Sketch entities arrive as independent edges. Closed wires are taken
//! as-is; open edges are welded at coincident endpoints and chained into
//! loops. Loops are then nested: the largest loop is an outer boundary,
//! loops whose bounds fall inside an outer boundary become its holes.

use truck_modeling::topology::{Edge, Face, Vertex, Wire};
use truck_modeling::{BoundedCurve, InnerSpace, ParameterDivision1D, Point3, Vector3};

use crate::types::{BoundingBox, KernelError};

const JOIN_TOLERANCE: f64 = 1e-7;
const SAMPLE_TOLERANCE: f64 = 1e-2;

/// Samples an edge along its oriented curve.
pub(crate) fn sample_edge(edge: &Edge, tolerance: f64) -> Vec<Point3> {
    let curve = edge.oriented_curve();
    let range = curve.range_tuple();
    let (_params, points) = curve.parameter_division(range, tolerance);
    points
}

pub(crate) fn to_array(p: Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Groups wires into closed loops.
pub fn closed_loops(wires: &[Wire]) -> Result<Vec<Wire>, KernelError> {
    let mut loops = Vec::new();
    let mut open: Vec<Edge> = Vec::new();
    for wire in wires {
        if wire.is_closed() {
            loops.push(wire.clone());
        } else {
            open.extend(wire.edge_iter().cloned());
        }
    }
    if !open.is_empty() {
        loops.extend(chain(&open)?);
    }
    Ok(loops)
}

struct Segment {
    from: usize,
    to: usize,
    edge: Edge,
}

fn weld(pool: &mut Vec<Vertex>, p: Point3) -> usize {
    if let Some(i) = pool
        .iter()
        .position(|v| (v.point() - p).magnitude() < JOIN_TOLERANCE)
    {
        return i;
    }
    pool.push(truck_modeling::builder::vertex(p));
    pool.len() - 1
}

fn chain(edges: &[Edge]) -> Result<Vec<Wire>, KernelError> {
    let mut pool: Vec<Vertex> = Vec::new();
    let mut segments = Vec::with_capacity(edges.len());
    for edge in edges {
        let from = weld(&mut pool, edge.front().point());
        let to = weld(&mut pool, edge.back().point());
        if from == to {
            // zero-length
            continue;
        }
        let rebuilt = Edge::try_new(&pool[from], &pool[to], edge.oriented_curve()).map_err(|e| {
            KernelError::FaceFailed {
                reason: e.to_string(),
            }
        })?;
        segments.push(Segment {
            from,
            to,
            edge: rebuilt,
        });
    }

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    while let Some(first) = used.iter().position(|u| !u) {
        used[first] = true;
        let start = segments[first].from;
        let mut current = segments[first].to;
        let mut edges = vec![segments[first].edge.clone()];
        while current != start {
            let next = segments
                .iter()
                .enumerate()
                .find(|(i, s)| !used[*i] && (s.from == current || s.to == current));
            let Some((i, seg)) = next else {
                return Err(KernelError::FaceFailed {
                    reason: "profile does not close".to_string(),
                });
            };
            used[i] = true;
            if seg.from == current {
                edges.push(seg.edge.clone());
                current = seg.to;
            } else {
                edges.push(seg.edge.inverse());
                current = seg.from;
            }
        }
        loops.push(Wire::from_iter(edges));
    }
    Ok(loops)
}

struct LoopInfo {
    wire: Wire,
    bounds: BoundingBox,
    /// Newell normal, length proportional to enclosed area.
    area_normal: Vector3,
}

fn describe(wire: Wire) -> Option<LoopInfo> {
    let points: Vec<Point3> = wire
        .edge_iter()
        .flat_map(|e| {
            let mut pts = sample_edge(e, SAMPLE_TOLERANCE);
            pts.pop();
            pts
        })
        .collect();
    let arrays: Vec<[f64; 3]> = points.iter().map(|p| to_array(*p)).collect();
    let bounds = BoundingBox::from_points(&arrays)?;
    let mut area_normal = Vector3::new(0.0, 0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        area_normal += Vector3::new(
            (p.y - q.y) * (p.z + q.z),
            (p.z - q.z) * (p.x + q.x),
            (p.x - q.x) * (p.y + q.y),
        );
    }
    Some(LoopInfo {
        wire,
        bounds,
        area_normal,
    })
}

fn contains(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    (0..3).all(|i| {
        inner.min[i] >= outer.min[i] - JOIN_TOLERANCE
            && inner.max[i] <= outer.max[i] + JOIN_TOLERANCE
    })
}

/// Builds one planar face per outer loop, with nested loops as holes.
pub fn faces_from_wires(wires: &[Wire]) -> Result<Vec<Face>, KernelError> {
    let mut infos: Vec<LoopInfo> = closed_loops(wires)?
        .into_iter()
        .filter_map(describe)
        .collect();
    if infos.is_empty() {
        return Err(KernelError::FaceFailed {
            reason: "no closed loops".to_string(),
        });
    }
    infos.sort_by(|a, b| b.bounds.diagonal().total_cmp(&a.bounds.diagonal()));

    // (outer, holes)
    let mut groups: Vec<(LoopInfo, Vec<LoopInfo>)> = Vec::new();
    for info in infos {
        match groups.iter_mut().find(|(outer, _)| contains(&outer.bounds, &info.bounds)) {
            Some((_, holes)) => holes.push(info),
            None => groups.push((info, Vec::new())),
        }
    }

    groups
        .into_iter()
        .map(|(outer, holes)| {
            let mut boundary = vec![outer.wire];
            for hole in holes {
                if hole.area_normal.dot(outer.area_normal) > 0.0 {
                    boundary.push(hole.wire.inverse());
                } else {
                    boundary.push(hole.wire);
                }
            }
            truck_modeling::builder::try_attach_plane(&boundary).map_err(|e| {
                KernelError::FaceFailed {
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use truck_modeling::builder;

    fn segment(a: [f64; 3], b: [f64; 3]) -> Wire {
        let v0 = builder::vertex(Point3::new(a[0], a[1], a[2]));
        let v1 = builder::vertex(Point3::new(b[0], b[1], b[2]));
        Wire::from_iter(vec![builder::line(&v0, &v1)])
    }

    fn circle(center: [f64; 3], radius: f64) -> Wire {
        let c = Point3::new(center[0], center[1], center[2]);
        let v = builder::vertex(c + Vector3::new(radius, 0.0, 0.0));
        builder::rsweep(&v, c, Vector3::unit_z(), truck_modeling::Rad(2.0 * PI))
    }

    #[test]
    fn loose_segments_are_chained_regardless_of_direction() {
        let wires = vec![
            segment([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            segment([1.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            segment([1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
            segment([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let loops = closed_loops(&wires).unwrap();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_closed());
        assert_eq!(loops[0].len(), 4);
    }

    #[test]
    fn open_profile_is_rejected() {
        let wires = vec![
            segment([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            segment([1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
        ];
        assert!(matches!(
            closed_loops(&wires),
            Err(KernelError::FaceFailed { .. })
        ));
    }

    #[test]
    fn nested_circle_becomes_hole() {
        let wires = vec![circle([0.0, 0.0, 0.0], 0.5), circle([0.0, 0.0, 0.0], 2.0)];
        let faces = faces_from_wires(&wires).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].boundaries().len(), 2);
    }

    #[test]
    fn disjoint_loops_become_separate_faces() {
        let wires = vec![circle([0.0, 0.0, 0.0], 1.0), circle([5.0, 0.0, 0.0], 1.0)];
        let faces = faces_from_wires(&wires).unwrap();
        assert_eq!(faces.len(), 2);
    }
}
