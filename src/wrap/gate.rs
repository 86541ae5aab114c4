use std::cmp::Ordering;

use ordered_float::NotNan;

use crate::data::{circumcenter, Orientation, Point};
use crate::triangulation::{Edge, FaceLabel, Triangulation};
use crate::WrapError;

/// A boundary edge waiting in the queue. `edge` is canonical: its first
/// face carries [`FaceLabel::Inside`]. The priority is the squared radius
/// of the minimal Delaunay ball through the edge; bigger balls are carved
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
  pub edge: Edge,
  pub priority: NotNan<f64>,
}

impl Ord for Gate {
  fn cmp(&self, other: &Self) -> Ordering {
    // the edge comparison is only a deterministic tie-break
    self
      .priority
      .cmp(&other.priority)
      .then_with(|| self.edge.cmp(&other.edge))
  }
}

impl PartialOrd for Gate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Derived geometry of a gate.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAdjacencyInfo {
  /// Canonicalized so that `edge.face` is the INSIDE face.
  pub edge: Edge,
  pub cc_inside: Point,
  pub cc_outside: Point,
  pub outside_infinite: bool,
}

/// Canonicalize an edge so the INSIDE face comes first and derive both
/// circumcenters. The INSIDE face of a well-formed gate is always finite;
/// anything else is a logic error, not a recoverable condition.
pub fn gate_adjacency_info(
  dt: &Triangulation,
  edge: Edge,
  bbox_diag: f64,
) -> Result<EdgeAdjacencyInfo, WrapError> {
  let edge = if dt.label(edge.face) == FaceLabel::Inside {
    edge
  } else {
    dt.mirror_edge(edge)?
  };
  if dt.is_infinite(edge.face) {
    return Err(WrapError::Logic(format!(
      "inside face of gate {edge:?} is infinite"
    )));
  }

  let cc_inside = dt
    .circumcenter(edge.face)
    .ok_or_else(|| WrapError::Logic(format!("degenerate inside face at {edge:?}")))?;

  let out_face = dt.face(edge.face).neighbor(edge.sub);
  if dt.is_infinite(out_face) {
    let cc_outside = infinite_face_circumcenter(dt, edge, bbox_diag)?;
    Ok(EdgeAdjacencyInfo {
      edge,
      cc_inside,
      cc_outside,
      outside_infinite: true,
    })
  } else {
    let cc_outside = dt
      .circumcenter(out_face)
      .ok_or_else(|| WrapError::Logic(format!("degenerate outside face at {edge:?}")))?;
    Ok(EdgeAdjacencyInfo {
      edge,
      cc_inside,
      cc_outside,
      outside_infinite: false,
    })
  }
}

/// Synthetic circumcenter for an infinite outside face: displace a far
/// point from the edge midpoint, perpendicular to the edge and away from
/// the inside face's apex, then take the circumcenter of the edge
/// endpoints and that far point. Only used to orient the dual edge and to
/// score the gate.
fn infinite_face_circumcenter(
  dt: &Triangulation,
  edge: Edge,
  bbox_diag: f64,
) -> Result<Point, WrapError> {
  let seg = dt.edge_segment(edge);
  let p1 = seg.src;
  let p2 = seg.dst;
  let mid = seg.midpoint();

  let apex = dt.face(edge.face).vert(edge.sub);
  let apex_pt = dt.vertex(apex);

  let perp = (p2 - p1)
    .perpendicular()
    .normalized()
    .ok_or_else(|| WrapError::Logic(format!("zero-length gate edge {edge:?}")))?;
  let side = Orientation::new(&p1, &p2, apex_pt);
  let sign = if side.is_ccw() { -1.0 } else { 1.0 };

  // far enough that the point is guaranteed to lie outside the hull
  let displacement = 1.0e4 * bbox_diag.max(seg.length());
  let far = mid + perp * (sign * displacement);

  circumcenter(&p1, &p2, &far)
    .ok_or_else(|| WrapError::Logic(format!("degenerate far-side circumcenter at {edge:?}")))
}

/// Squared radius of the minimal Delaunay ball through the edge
/// `(p1, p2)`.
///
/// When the circumcenters lie on opposite sides of the edge the diameter
/// ball is itself Delaunay and wins. Otherwise two definitions are in
/// circulation; `modified` selects the variant that prefers the diameter
/// ball whenever the outside circumradius is the smaller one.
pub fn sq_minimal_ball_radius(
  p1: &Point,
  p2: &Point,
  info: &EdgeAdjacencyInfo,
  modified: bool,
) -> f64 {
  let min_ball_center = p1.midpoint(p2);
  let sq_min_ball_radius = p1.squared_distance(p2) / 4.0;
  let sq_inside_ball_radius = info.cc_inside.squared_distance(p1);

  if info.outside_infinite {
    if info.cc_inside.squared_distance(&min_ball_center) < sq_min_ball_radius {
      return sq_inside_ball_radius;
    }
    return sq_min_ball_radius;
  }

  if Orientation::new(p1, p2, &info.cc_inside) != Orientation::new(p1, p2, &info.cc_outside) {
    return sq_min_ball_radius;
  }

  let sq_outside_ball_radius = info.cc_outside.squared_distance(p1);

  if modified {
    if sq_outside_ball_radius < sq_inside_ball_radius {
      return sq_min_ball_radius;
    }
    return sq_inside_ball_radius;
  }
  sq_inside_ball_radius.min(sq_outside_ball_radius)
}
