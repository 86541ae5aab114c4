//! Read-only queries against the input point set.
//!
//! The oracle owns an immutable copy of the points in an R*-tree and
//! answers the handful of geometric questions the carving engine asks:
//! nearest point, triangle occupancy, first crossing of the offset surface
//! along a segment, and local neighborhoods. It is constructed once and
//! never mutated, so it can be shared freely between the engine and any
//! exporter.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rstar::{RTree, AABB};

use crate::data::{Bbox, LineSegment, Point, Triangle};
use crate::WrapError;

pub struct PointOracle {
  tree: RTree<[f64; 2]>,
  bbox: Bbox,
  len: usize,
}

impl PointOracle {
  pub fn from_points(points: Vec<Point>) -> PointOracle {
    let bbox = Bbox::from_points(points.iter());
    let len = points.len();
    let entries: Vec<[f64; 2]> = points.into_iter().map(Point::to_array).collect();
    PointOracle {
      tree: RTree::bulk_load(entries),
      bbox,
      len,
    }
  }

  /// Read a whitespace-separated `x y` pair per line. Blank lines are
  /// skipped; an empty or malformed file is an input error.
  pub fn load(path: &Path) -> Result<PointOracle, WrapError> {
    let file = File::open(path).map_err(|e| WrapError::Input {
      path: path.display().to_string(),
      reason: e.to_string(),
    })?;
    let points = parse_points(BufReader::new(file)).map_err(|reason| WrapError::Input {
      path: path.display().to_string(),
      reason,
    })?;
    if points.is_empty() {
      return Err(WrapError::Input {
        path: path.display().to_string(),
        reason: "no points found".to_string(),
      });
    }
    Ok(PointOracle::from_points(points))
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn bbox(&self) -> &Bbox {
    &self.bbox
  }

  pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
    self.tree.iter().map(|a| Point::from(*a))
  }

  /// The input point closest to `p`. `None` on an empty set.
  pub fn closest_point(&self, p: &Point) -> Option<Point> {
    self.tree.nearest_neighbor(&p.to_array()).map(|a| Point::from(*a))
  }

  /// Squared distance from `p` to the point set; 0 on an empty set.
  pub fn squared_distance(&self, p: &Point) -> f64 {
    self
      .tree
      .nearest_neighbor_iter_with_distance_2(&p.to_array())
      .next()
      .map(|(_, d_sq)| d_sq)
      .unwrap_or(0.0)
  }

  /// True iff some input point lies in the closed triangle `t`.
  pub fn do_intersect(&self, t: &Triangle) -> bool {
    let bbox = t.bbox();
    self
      .candidates_in(&bbox)
      .any(|candidate| t.contains(&candidate))
  }

  /// First crossing of the segment `p -> q` with the offset surface (the
  /// union of circles of radius `offset` around the input points).
  ///
  /// Candidates are restricted to points whose offset disk can reach the
  /// segment's bounding box and visited by increasing distance to `p`; the
  /// first candidate whose circle the segment crosses yields the
  /// intersection closest to `p` on that circle. `None` means the segment
  /// stays clear of the offset surface and is a normal answer, not an
  /// error.
  pub fn first_intersection(&self, p: &Point, q: &Point, offset: f64) -> Option<Point> {
    if self.len == 0 {
      return None;
    }
    let bbox = LineSegment::new(*p, *q).bbox().inflate(offset);
    let mut candidates: Vec<Point> = self.candidates_in(&bbox).collect();
    if candidates.is_empty() {
      return None;
    }
    candidates.sort_by(|a, b| {
      p.squared_distance(a)
        .total_cmp(&p.squared_distance(b))
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.y.total_cmp(&b.y))
    });
    candidates
      .iter()
      .find_map(|center| segment_circle_intersection(p, q, center, offset))
  }

  /// All input points within the segment's bounding box inflated by
  /// `margin`.
  pub fn local_points(&self, seg: &LineSegment, margin: f64) -> Vec<Point> {
    self.candidates_in(&seg.bbox().inflate(margin)).collect()
  }

  fn candidates_in(&self, bbox: &Bbox) -> impl Iterator<Item = Point> + '_ {
    let envelope = AABB::from_corners([bbox.x_min, bbox.y_min], [bbox.x_max, bbox.y_max]);
    self
      .tree
      .locate_in_envelope_intersecting(&envelope)
      .map(|a| Point::from(*a))
  }
}

pub fn parse_points<R: BufRead>(reader: R) -> Result<Vec<Point>, String> {
  let mut points = Vec::new();
  for (lineno, line) in reader.lines().enumerate() {
    let line = line.map_err(|e| e.to_string())?;
    let mut fields = line.split_whitespace();
    let Some(x) = fields.next() else { continue };
    let Some(y) = fields.next() else {
      return Err(format!("line {}: expected two coordinates", lineno + 1));
    };
    let x: f64 = x
      .parse()
      .map_err(|_| format!("line {}: bad x coordinate {:?}", lineno + 1, x))?;
    let y: f64 = y
      .parse()
      .map_err(|_| format!("line {}: bad y coordinate {:?}", lineno + 1, y))?;
    points.push(Point::new(x, y));
  }
  Ok(points)
}

/// Intersection of the segment `p -> q` with the circle around `center`,
/// as the solution of the 1-D quadratic in the segment parameter `t`. The
/// smallest root in `(0, 1]` wins; `t = 0` is deliberately excluded so a
/// segment starting on the circle reports the far crossing, if any.
fn segment_circle_intersection(p: &Point, q: &Point, center: &Point, radius: f64) -> Option<Point> {
  let dx = q.x - p.x;
  let dy = q.y - p.y;

  let a = dx * dx + dy * dy;
  if a == 0.0 {
    return None;
  }

  let ox = p.x - center.x;
  let oy = p.y - center.y;

  let b = 2.0 * (dx * ox + dy * oy);
  let c = ox * ox + oy * oy - radius * radius;

  let disc = b * b - 4.0 * a * c;
  if disc < 0.0 {
    return None;
  }

  let sqrt_disc = disc.sqrt();
  let t1 = (-b - sqrt_disc) / (2.0 * a);
  let t2 = (-b + sqrt_disc) / (2.0 * a);

  let mut t = f64::INFINITY;
  if t1 > 0.0 && t1 <= 1.0 {
    t = t.min(t1);
  }
  if t2 > 0.0 && t2 <= 1.0 {
    t = t.min(t2);
  }
  if t == f64::INFINITY {
    return None;
  }

  Some(Point::new(p.x + t * dx, p.y + t * dy))
}
