use super::{Bbox, Orientation, Point};

/// A triangle with counter-clockwise vertex order.
#[derive(Debug, Clone, Copy)]
pub struct Triangle(pub [Point; 3]);

impl Triangle {
  /// Orients the vertices counter-clockwise.
  ///
  /// # Panics
  ///
  /// Panics if the points are colinear.
  pub fn new_ccw(mut pts: [Point; 3]) -> Triangle {
    match Orientation::new(&pts[0], &pts[1], &pts[2]) {
      Orientation::CounterClockWise => Triangle(pts),
      Orientation::ClockWise => {
        pts.swap(0, 2);
        Triangle(pts)
      }
      Orientation::CoLinear => panic!("Cannot orient colinear points."),
    }
  }

  /// Membership in the closed triangle: boundary points count as inside.
  pub fn contains(&self, pt: &Point) -> bool {
    let [a, b, c] = &self.0;
    !Orientation::new(a, b, pt).is_cw()
      && !Orientation::new(b, c, pt).is_cw()
      && !Orientation::new(c, a, pt).is_cw()
  }

  /// Center of the circle through all three vertices, or `None` for a
  /// degenerate triangle.
  pub fn circumcenter(&self) -> Option<Point> {
    let [a, b, c] = &self.0;
    circumcenter(a, b, c)
  }

  pub fn bbox(&self) -> Bbox {
    Bbox::from_points(&self.0)
  }
}

/// Circumcenter of three points, computed relative to `a` for stability.
pub fn circumcenter(a: &Point, b: &Point, c: &Point) -> Option<Point> {
  let bx = b.x - a.x;
  let by = b.y - a.y;
  let cx = c.x - a.x;
  let cy = c.y - a.y;
  let d = 2.0 * (bx * cy - by * cx);
  if d == 0.0 {
    return None;
  }
  let b_sq = bx * bx + by * by;
  let c_sq = cx * cx + cy * cy;
  let ux = (cy * b_sq - by * c_sq) / d;
  let uy = (bx * c_sq - cx * b_sq) / d;
  let center = Point::new(a.x + ux, a.y + uy);
  center.is_finite().then_some(center)
}
