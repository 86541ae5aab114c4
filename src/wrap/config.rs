use serde::Serialize;

use super::Traversability;
use crate::WrapError;

/// Everything the carving engine needs to know up front.
#[derive(Debug, Clone, Serialize)]
pub struct WrapConfig {
  /// Concavity scale: gates whose minimal Delaunay ball is smaller than
  /// this radius are never carved through.
  pub alpha: f64,
  /// Thickening radius of the offset surface around each input point.
  pub offset: f64,
  pub traversability: Traversability,
  /// Use the alternative minimal-ball radius when the diameter ball is
  /// not Delaunay (see [`super::sq_minimal_ball_radius`]).
  pub modified_min_ball: bool,
  pub max_iterations: u32,
  /// Offer a snapshot to the sink every N iterations; 0 disables.
  pub intermediate_steps: u32,
  /// No snapshots are offered past this iteration.
  pub export_step_limit: u32,
}

impl WrapConfig {
  pub fn new(alpha: f64, offset: f64) -> WrapConfig {
    WrapConfig {
      alpha,
      offset,
      traversability: Traversability::ConstantAlpha,
      modified_min_ball: false,
      max_iterations: 5000,
      intermediate_steps: 0,
      export_step_limit: 1000,
    }
  }

  pub fn validate(&self) -> Result<(), WrapError> {
    if !(self.alpha > 0.0) || !self.alpha.is_finite() {
      return Err(WrapError::Config(format!(
        "alpha must be a positive real, got {}",
        self.alpha
      )));
    }
    if !(self.offset > 0.0) || !self.offset.is_finite() {
      return Err(WrapError::Config(format!(
        "offset must be a positive real, got {}",
        self.offset
      )));
    }
    match self.traversability {
      Traversability::ConstantAlpha => {}
      Traversability::DeviationBased {
        alpha_max,
        deviation_factor,
        ..
      } => {
        if !(alpha_max > 0.0) {
          return Err(WrapError::Config(format!(
            "alpha_max must be positive, got {alpha_max}"
          )));
        }
        if deviation_factor < 0.0 {
          return Err(WrapError::Config(format!(
            "deviation_factor must be non-negative, got {deviation_factor}"
          )));
        }
      }
      Traversability::IntersectionBased { tolerance_factor } => {
        if !(tolerance_factor > 0.0) {
          return Err(WrapError::Config(format!(
            "tolerance_factor must be positive, got {tolerance_factor}"
          )));
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_bad_parameters() {
    assert!(WrapConfig::new(1.0, 0.5).validate().is_ok());
    assert!(WrapConfig::new(0.0, 0.5).validate().is_err());
    assert!(WrapConfig::new(1.0, -1.0).validate().is_err());
    assert!(WrapConfig::new(f64::NAN, 0.5).validate().is_err());

    let mut config = WrapConfig::new(1.0, 0.5);
    config.traversability = Traversability::IntersectionBased {
      tolerance_factor: 0.0,
    };
    assert!(config.validate().is_err());
  }
}
