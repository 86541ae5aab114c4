use serde::Serialize;

use crate::data::LineSegment;
use crate::oracle::PointOracle;

/// Shared state every policy evaluation sees.
pub struct PolicyContext<'a> {
  pub alpha: f64,
  pub offset: f64,
  pub bbox_diag: f64,
  pub oracle: &'a PointOracle,
}

/// The predicate deciding whether a gate may be carved through. Exactly
/// one variant is configured per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Traversability {
  /// Traversable iff the minimal Delaunay ball radius is at least `alpha`.
  ConstantAlpha,
  /// Interpolates an adaptive alpha between `alpha` and
  /// `alpha_max * bbox_diag` from how far the local points deviate from
  /// the gate. Sparse neighborhoods count as maximal deviation.
  DeviationBased {
    /// Upper bound of the adaptive alpha, in units of the bbox diagonal.
    alpha_max: f64,
    /// Below this many local points the deviation is forced to 1.
    point_threshold: usize,
    /// Sensitivity of the deviation score.
    deviation_factor: f64,
  },
  /// Probes perpendicular to the gate at regular samples; the gate is
  /// traversable iff any probe stays clear of the offset surface.
  IntersectionBased {
    /// Probe length, in units of the bbox diagonal.
    tolerance_factor: f64,
  },
}

impl Traversability {
  pub fn name(&self) -> &'static str {
    match self {
      Traversability::ConstantAlpha => "CONSTANT_ALPHA",
      Traversability::DeviationBased { .. } => "DEVIATION_BASED",
      Traversability::IntersectionBased { .. } => "INTERSECTION_BASED",
    }
  }

  /// `priority` is the gate's squared minimal Delaunay ball radius; `seg`
  /// its geometry.
  pub fn is_traversable(&self, priority: f64, seg: &LineSegment, ctx: &PolicyContext) -> bool {
    match *self {
      Traversability::ConstantAlpha => priority >= ctx.alpha * ctx.alpha,
      Traversability::DeviationBased {
        alpha_max,
        point_threshold,
        deviation_factor,
      } => {
        let dev = segment_deviation(seg, point_threshold, deviation_factor, ctx);
        let alpha_max = alpha_max * ctx.bbox_diag;
        let adaptive_alpha = alpha_max * (1.0 - dev) + ctx.alpha * dev;
        priority >= adaptive_alpha * adaptive_alpha
      }
      Traversability::IntersectionBased { tolerance_factor } => {
        probes_escape_offset_surface(seg, tolerance_factor * ctx.bbox_diag, ctx)
      }
    }
  }
}

/// Maximum deviation score over the gate chopped into `ceil(len / alpha)`
/// equal sub-segments.
fn segment_deviation(
  seg: &LineSegment,
  point_threshold: usize,
  deviation_factor: f64,
  ctx: &PolicyContext,
) -> f64 {
  let m = (seg.length() / ctx.alpha).ceil() as usize;

  let mut max_dev: f64 = 0.0;
  for i in 0..m {
    let t0 = i as f64 / m as f64;
    let t1 = (i + 1) as f64 / m as f64;
    let sub = LineSegment::new(seg.interpolate(t0), seg.interpolate(t1));
    let dev = subsegment_deviation(&sub, point_threshold, deviation_factor, ctx);
    if dev > max_dev {
      max_dev = dev;
    }
  }
  max_dev.clamp(0.0, 1.0)
}

fn subsegment_deviation(
  seg: &LineSegment,
  point_threshold: usize,
  deviation_factor: f64,
  ctx: &PolicyContext,
) -> f64 {
  let local = ctx.oracle.local_points(seg, ctx.offset + 4.0);

  // not enough points for a meaningful estimate
  if local.len() < point_threshold {
    return 1.0;
  }

  let mut avg_sq_deviation = 0.0;
  for pt in &local {
    avg_sq_deviation += seg.squared_distance_to(pt);
  }
  avg_sq_deviation /= local.len() as f64;

  let dev = deviation_factor * (avg_sq_deviation - ctx.offset * ctx.offset);
  dev.clamp(0.0, 1.0)
}

/// `ceil(len / alpha) - 1` interior samples, each probed perpendicular to
/// the gate over distance `tolerance`. Returns true iff some probe misses
/// the offset surface, i.e. the gate spans a void at this scale.
fn probes_escape_offset_surface(seg: &LineSegment, tolerance: f64, ctx: &PolicyContext) -> bool {
  let m = (seg.length() / ctx.alpha).ceil() as usize;
  let Some(perp) = (seg.dst - seg.src).perpendicular().normalized() else {
    return false;
  };

  for i in 1..m {
    let t0 = i as f64 / m as f64;
    let p0 = seg.interpolate(t0);
    let p1 = p0 + perp * tolerance;

    if ctx
      .oracle
      .first_intersection(&p0, &p1, ctx.offset)
      .is_none()
    {
      return true;
    }
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::Point;

  fn line_oracle() -> PointOracle {
    // dense points along y = 0
    let pts = (0..=100)
      .map(|i| Point::new(i as f64 / 10.0, 0.0))
      .collect();
    PointOracle::from_points(pts)
  }

  fn ctx<'a>(oracle: &'a PointOracle, alpha: f64, offset: f64) -> PolicyContext<'a> {
    PolicyContext {
      alpha,
      offset,
      bbox_diag: 10.0,
      oracle,
    }
  }

  #[test]
  fn constant_alpha_thresholds_on_squared_alpha() {
    let oracle = PointOracle::from_points(vec![]);
    let ctx = ctx(&oracle, 2.0, 0.5);
    let seg = LineSegment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    let policy = Traversability::ConstantAlpha;
    assert!(policy.is_traversable(4.0, &seg, &ctx));
    assert!(!policy.is_traversable(3.9, &seg, &ctx));
  }

  #[test]
  fn deviation_forces_full_score_on_sparse_neighborhoods() {
    let oracle = PointOracle::from_points(vec![Point::new(500.0, 500.0)]);
    let ctx = ctx(&oracle, 1.0, 0.5);
    let seg = LineSegment::new(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
    // no local points at all: deviation 1 makes the adaptive alpha equal
    // to plain alpha
    let policy = Traversability::DeviationBased {
      alpha_max: 10.0,
      point_threshold: 5,
      deviation_factor: 0.05,
    };
    assert!(policy.is_traversable(1.1, &seg, &ctx));
    assert!(!policy.is_traversable(0.9, &seg, &ctx));
  }

  #[test]
  fn deviation_is_conservative_near_tight_data() {
    let oracle = line_oracle();
    let ctx = ctx(&oracle, 1.0, 0.5);
    let policy = Traversability::DeviationBased {
      alpha_max: 2.0,
      point_threshold: 3,
      deviation_factor: 0.05,
    };
    // a gate right on top of the data gets a partial deviation score, so
    // the adaptive alpha is strictly above plain alpha and at most
    // alpha_max * bbox_diag = 20
    let seg = LineSegment::new(Point::new(2.0, 0.1), Point::new(4.0, 0.1));
    assert!(!policy.is_traversable(1.0, &seg, &ctx));
    assert!(policy.is_traversable(400.0, &seg, &ctx));
    // a gate with an empty neighborhood scores full deviation and drops
    // back to plain alpha
    let lonely = LineSegment::new(Point::new(2.0, 50.0), Point::new(4.0, 50.0));
    assert!(policy.is_traversable(1.1, &lonely, &ctx));
  }

  #[test]
  fn intersection_probes_hit_nearby_surface() {
    let oracle = line_oracle();
    let ctx = ctx(&oracle, 1.0, 0.5);
    let policy = Traversability::IntersectionBased {
      tolerance_factor: 0.2, // probe length 2
    };
    // gate slightly above the line, probing downward reaches the surface
    let seg = LineSegment::new(Point::new(8.0, 1.0), Point::new(2.0, 1.0));
    assert!(!policy.is_traversable(0.0, &seg, &ctx));
    // gate far above the line: every probe misses
    let far = LineSegment::new(Point::new(8.0, 9.0), Point::new(2.0, 9.0));
    assert!(policy.is_traversable(0.0, &far, &ctx));
  }

  #[test]
  fn intersection_with_no_interior_samples_is_not_traversable() {
    let oracle = line_oracle();
    let ctx = ctx(&oracle, 5.0, 0.5);
    // shorter than alpha: m = 1, no samples, no escape
    let seg = LineSegment::new(Point::new(0.0, 3.0), Point::new(2.0, 3.0));
    let policy = Traversability::IntersectionBased {
      tolerance_factor: 0.1,
    };
    assert!(!policy.is_traversable(100.0, &seg, &ctx));
  }
}
