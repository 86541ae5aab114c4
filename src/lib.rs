//! 2D alpha wrapping of point sets.
//!
//! Given an unordered set of points `P`, a concavity scale `alpha` and a
//! thickening radius `offset`, [`wrap::AlphaWrap`] carves an incremental
//! Delaunay triangulation from the outside in and extracts a watertight
//! polygonal boundary that encloses every point of `P` at distance `offset`
//! while never entering concavities narrower than roughly `alpha`.
//!
//! ```no_run
//! use alpha_wrap_2d::data::Point;
//! use alpha_wrap_2d::oracle::PointOracle;
//! use alpha_wrap_2d::wrap::{AlphaWrap, NullSink, WrapConfig};
//!
//! let pts = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.0)];
//! let oracle = PointOracle::from_points(pts);
//! let config = WrapConfig::new(2.0, 0.5);
//! let mut aw = AlphaWrap::new(&oracle, config)?;
//! aw.run(&mut NullSink)?;
//! for seg in aw.wrap_segments() {
//!   println!("{:?}", seg);
//! }
//! # Ok::<(), alpha_wrap_2d::WrapError>(())
//! ```

use thiserror::Error;

pub mod data;
pub mod export;
pub mod oracle;
pub mod triangulation;
pub mod wrap;

pub use data::Orientation;

#[derive(Debug, Error)]
pub enum WrapError {
  /// Rejected before the carver is entered.
  #[error("invalid configuration: {0}")]
  Config(String),
  /// The points file is missing, unreadable or empty.
  #[error("cannot read points from {path}: {reason}")]
  Input { path: String, reason: String },
  /// An internal invariant does not hold; the run is aborted.
  #[error("logic error: {0}")]
  Logic(String),
  /// Rule R2 saw an occupied triangle but the offset-surface query found
  /// no crossing. Indicates a precision mismatch between the two oracle
  /// predicates.
  #[error("rule R2 found an occupied face but no offset-surface crossing")]
  RuleTwoMismatch,
}
