use super::Point;

/// Axis-aligned bounding box, built by accumulating points.
///
/// An empty box carries inverted infinities so that the first `extend`
/// sets all four bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
  pub x_min: f64,
  pub x_max: f64,
  pub y_min: f64,
  pub y_max: f64,
}

impl Bbox {
  pub fn empty() -> Bbox {
    Bbox {
      x_min: f64::INFINITY,
      x_max: f64::NEG_INFINITY,
      y_min: f64::INFINITY,
      y_max: f64::NEG_INFINITY,
    }
  }

  pub fn from_points<'a, I>(points: I) -> Bbox
  where
    I: IntoIterator<Item = &'a Point>,
  {
    let mut bbox = Bbox::empty();
    for p in points {
      bbox.extend(p);
    }
    bbox
  }

  pub fn extend(&mut self, p: &Point) {
    self.x_min = self.x_min.min(p.x);
    self.x_max = self.x_max.max(p.x);
    self.y_min = self.y_min.min(p.y);
    self.y_max = self.y_max.max(p.y);
  }

  pub fn is_empty(&self) -> bool {
    self.x_min > self.x_max
  }

  /// Grow the box by `margin` in all four directions.
  pub fn inflate(&self, margin: f64) -> Bbox {
    Bbox {
      x_min: self.x_min - margin,
      x_max: self.x_max + margin,
      y_min: self.y_min - margin,
      y_max: self.y_max + margin,
    }
  }

  pub fn diagonal(&self) -> f64 {
    if self.is_empty() {
      return 0.0;
    }
    let min = Point::new(self.x_min, self.y_min);
    let max = Point::new(self.x_max, self.y_max);
    min.squared_distance(&max).sqrt()
  }

  pub fn width(&self) -> f64 {
    self.x_max - self.x_min
  }

  pub fn height(&self) -> f64 {
    self.y_max - self.y_min
  }

  /// Corners in counter-clockwise order, starting at the lower left.
  pub fn corners(&self) -> [Point; 4] {
    [
      Point::new(self.x_min, self.y_min),
      Point::new(self.x_max, self.y_min),
      Point::new(self.x_max, self.y_max),
      Point::new(self.x_min, self.y_max),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extend_and_diagonal() {
    let mut bbox = Bbox::empty();
    assert!(bbox.is_empty());
    bbox.extend(&Point::new(0.0, 0.0));
    bbox.extend(&Point::new(3.0, 4.0));
    assert!(!bbox.is_empty());
    assert_eq!(bbox.diagonal(), 5.0);
    assert_eq!(bbox.width(), 3.0);
    assert_eq!(bbox.height(), 4.0);
  }

  #[test]
  fn inflate() {
    let bbox = Bbox::from_points(&[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
    let big = bbox.inflate(0.5);
    assert_eq!(big.x_min, 0.5);
    assert_eq!(big.x_max, 2.5);
    assert_eq!(big.y_min, 0.5);
    assert_eq!(big.y_max, 2.5);
  }

  #[test]
  fn single_point_has_zero_diagonal() {
    let bbox = Bbox::from_points(&[Point::new(7.0, -3.0)]);
    assert_eq!(bbox.diagonal(), 0.0);
  }
}
