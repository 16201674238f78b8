//! Primitive solids built from truck sweeps.
//!
//! truck has no built-in box/cylinder/sphere; everything is successive
//! sweeps. Rotational primitives are a planar profile in the XZ plane
//! revolved around +Z.

use std::f64::consts::PI;

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Face, Solid, Vertex, Wire};
use truck_modeling::{EuclideanSpace, InnerSpace, Point3, Rad, Vector3};

use crate::types::KernelError;

const LENGTH_EPSILON: f64 = 1e-9;

pub(crate) fn is_full_turn(angle: f64) -> bool {
    angle.abs() >= 2.0 * PI - 1e-9
}

fn positive(name: &str, value: f64) -> Result<(), KernelError> {
    if value > LENGTH_EPSILON && value.is_finite() {
        Ok(())
    } else {
        Err(KernelError::InvalidGeometry {
            reason: format!("{name} must be positive, got {value}"),
        })
    }
}

fn sweep_angle(angle: f64) -> Result<Rad<f64>, KernelError> {
    if !angle.is_finite() || angle.abs() < 1e-9 {
        return Err(KernelError::InvalidGeometry {
            reason: format!("sweep angle must be non-zero, got {angle}"),
        });
    }
    if is_full_turn(angle) {
        Ok(Rad(2.0 * PI))
    } else {
        Ok(Rad(angle))
    }
}

fn attach(wires: &[Wire]) -> Result<Face, KernelError> {
    builder::try_attach_plane(wires).map_err(|e| KernelError::FaceFailed {
        reason: e.to_string(),
    })
}

fn revolve(profile: Wire, angle: f64) -> Result<Solid, KernelError> {
    let face = attach(&[profile])?;
    Ok(builder::rsweep(
        &face,
        Point3::origin(),
        Vector3::unit_z(),
        sweep_angle(angle)?,
    ))
}

/// Full turn of an open profile running from one point on the Z axis to
/// another. The axis itself is not swept, so no zero-area faces appear.
fn revolve_about_axis(profile: Wire) -> Result<Solid, KernelError> {
    let shell = builder::cone(&profile, Vector3::unit_z(), Rad(2.0 * PI));
    Solid::try_new(vec![shell]).map_err(|e| KernelError::SweepFailed {
        reason: e.to_string(),
    })
}

/// Open polyline through `points`, skipping zero-length segments.
fn open_polyline(points: &[Point3]) -> Wire {
    let mut vertices: Vec<Vertex> = Vec::with_capacity(points.len());
    for p in points {
        let dup = vertices
            .last()
            .is_some_and(|v| (*p - v.point()).magnitude2() < LENGTH_EPSILON * LENGTH_EPSILON);
        if !dup {
            vertices.push(builder::vertex(*p));
        }
    }
    vertices
        .windows(2)
        .map(|pair| builder::line(&pair[0], &pair[1]))
        .collect()
}

/// Closed polygon through `points`, dropping consecutive duplicates.
pub(crate) fn polygon_wire(points: &[Point3]) -> Result<Wire, KernelError> {
    let mut unique: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        let dup = unique
            .last()
            .is_some_and(|q| (*p - *q).magnitude2() < LENGTH_EPSILON * LENGTH_EPSILON);
        if !dup {
            unique.push(*p);
        }
    }
    while unique.len() > 1
        && (unique[0] - unique[unique.len() - 1]).magnitude2() < LENGTH_EPSILON * LENGTH_EPSILON
    {
        unique.pop();
    }
    if unique.len() < 3 {
        return Err(KernelError::InvalidGeometry {
            reason: "profile collapses to fewer than three points".to_string(),
        });
    }
    let vertices: Vec<Vertex> = unique.iter().map(|p| builder::vertex(*p)).collect();
    let n = vertices.len();
    Ok((0..n)
        .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
        .collect())
}

/// Box via successive translational sweeps. Corner at the origin.
pub fn make_box(length: f64, width: f64, height: f64) -> Result<Solid, KernelError> {
    positive("length", length)?;
    positive("width", width)?;
    positive("height", height)?;
    let v = builder::vertex(Point3::origin());
    let edge = builder::tsweep(&v, Vector3::new(length, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, width, 0.0));
    Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)))
}

/// Cylinder along +Z. A full turn is a swept disc; a partial one is a
/// revolved rectangle.
pub fn make_cylinder(radius: f64, height: f64, angle: f64) -> Result<Solid, KernelError> {
    positive("radius", radius)?;
    positive("height", height)?;
    if is_full_turn(angle) {
        let v = builder::vertex(Point3::new(radius, 0.0, 0.0));
        let wire = builder::rsweep(&v, Point3::origin(), Vector3::unit_z(), Rad(2.0 * PI));
        let face = attach(&[wire])?;
        return Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)));
    }
    let profile = polygon_wire(&[
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(radius, 0.0, 0.0),
        Point3::new(radius, 0.0, height),
        Point3::new(0.0, 0.0, height),
    ])?;
    revolve(profile, angle)
}

/// Truncated cone. Either radius may be zero, not both.
pub fn make_cone(
    radius1: f64,
    radius2: f64,
    height: f64,
    angle: f64,
) -> Result<Solid, KernelError> {
    positive("height", height)?;
    if radius1 < 0.0 || radius2 < 0.0 || radius1.max(radius2) <= LENGTH_EPSILON {
        return Err(KernelError::InvalidGeometry {
            reason: format!(
                "cone radii must be non-negative and not both zero: {radius1}, {radius2}"
            ),
        });
    }
    if is_full_turn(angle) {
        return revolve_about_axis(open_polyline(&[
            Point3::new(0.0, 0.0, height),
            Point3::new(radius2, 0.0, height),
            Point3::new(radius1, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ]));
    }
    let profile = polygon_wire(&[
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(radius1, 0.0, 0.0),
        Point3::new(radius2, 0.0, height),
        Point3::new(0.0, 0.0, height),
    ])?;
    revolve(profile, angle)
}

/// Sphere segment: a meridian arc between two latitudes closed along the
/// axis, revolved by `longitude`.
pub fn make_sphere(
    radius: f64,
    lat_min: f64,
    lat_max: f64,
    longitude: f64,
) -> Result<Solid, KernelError> {
    positive("radius", radius)?;
    let half = PI / 2.0 + 1e-12;
    if lat_min >= lat_max || lat_min < -half || lat_max > half {
        return Err(KernelError::InvalidGeometry {
            reason: format!("latitude range {lat_min}..{lat_max} is empty or out of bounds"),
        });
    }
    let meridian = |lat: f64| Point3::new(radius * lat.cos(), 0.0, radius * lat.sin());
    let on_axis = |p: Point3| p.x.abs() < LENGTH_EPSILON;

    let start = builder::vertex(meridian(lat_min));
    let end = builder::vertex(meridian(lat_max));
    let mid = meridian((lat_min + lat_max) / 2.0);
    let top = if on_axis(end.point()) {
        None
    } else {
        Some(builder::vertex(Point3::new(0.0, 0.0, radius * lat_max.sin())))
    };
    let bottom = if on_axis(start.point()) {
        None
    } else {
        Some(builder::vertex(Point3::new(0.0, 0.0, radius * lat_min.sin())))
    };

    if is_full_turn(longitude) {
        // Axis to axis, top first: down the meridian.
        let mut edges: Vec<Edge> = Vec::with_capacity(3);
        if let Some(top) = &top {
            edges.push(builder::line(top, &end));
        }
        edges.push(builder::circle_arc(&end, &start, mid));
        if let Some(bottom) = &bottom {
            edges.push(builder::line(&start, bottom));
        }
        return revolve_about_axis(Wire::from_iter(edges));
    }

    let mut edges: Vec<Edge> = vec![builder::circle_arc(&start, &end, mid)];
    let top = match top {
        Some(v) => {
            edges.push(builder::line(&end, &v));
            v
        }
        None => end.clone(),
    };
    let bottom = bottom.unwrap_or_else(|| start.clone());
    edges.push(builder::line(&top, &bottom));
    if !on_axis(start.point()) {
        edges.push(builder::line(&bottom, &start));
    }
    revolve(Wire::from_iter(edges), longitude)
}

/// Torus around +Z. The tube section spans `angle1..angle2` around its
/// own center; a partial section is closed with a chord.
pub fn make_torus(
    radius1: f64,
    radius2: f64,
    angle1: f64,
    angle2: f64,
    angle3: f64,
) -> Result<Solid, KernelError> {
    positive("radius1", radius1)?;
    positive("radius2", radius2)?;
    if radius2 >= radius1 {
        return Err(KernelError::InvalidGeometry {
            reason: format!("tube radius {radius2} must be smaller than ring radius {radius1}"),
        });
    }
    if angle2 <= angle1 {
        return Err(KernelError::InvalidGeometry {
            reason: format!("tube section {angle1}..{angle2} is empty"),
        });
    }
    let center = Point3::new(radius1, 0.0, 0.0);
    let section = |t: f64| Point3::new(radius1 + radius2 * t.cos(), 0.0, radius2 * t.sin());

    let profile = if is_full_turn(angle2 - angle1) {
        let v = builder::vertex(section(0.0));
        builder::rsweep(&v, center, Vector3::unit_y(), Rad(2.0 * PI))
    } else {
        let start = builder::vertex(section(angle1));
        let end = builder::vertex(section(angle2));
        let arc = builder::circle_arc(&start, &end, section((angle1 + angle2) / 2.0));
        let chord = builder::line(&end, &start);
        Wire::from_iter(vec![arc, chord])
    };
    revolve(profile, angle3)
}
