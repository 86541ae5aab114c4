//! The carving engine.
//!
//! Starting from a bounding frame whose finite faces are INSIDE, the main
//! loop repeatedly pops the boundary edge with the largest minimal
//! Delaunay ball and either refines the triangulation with a Steiner
//! point on the offset surface (rules R1 and R2) or advances the
//! INSIDE/OUTSIDE frontier by one triangle. The wrap is the set of edges
//! separating differently labeled faces once the queue runs dry.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use ordered_float::NotNan;
use tracing::{debug, info, warn};

use crate::data::{Bbox, LineSegment, Point};
use crate::oracle::PointOracle;
use crate::triangulation::{Edge, FaceIdx, FaceLabel, SubIdx, Triangulation};
use crate::WrapError;

mod config;
mod gate;
mod stats;
mod timer;
mod traversability;

pub use config::WrapConfig;
pub use gate::{gate_adjacency_info, sq_minimal_ball_radius, EdgeAdjacencyInfo, Gate};
pub use stats::{
  ConfigStats, ExecutionStats, MetadataStats, OutputStats, TimingStats, WrapStatistics,
  STATISTICS_SCHEMA_VERSION,
};
pub use timer::{Phase, PhaseTimers};
pub use traversability::{PolicyContext, Traversability};

/// How a run ended. Hitting the iteration cap is a clean partial result,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  IterationCapReached,
  Cancelled,
}

/// A read-only view of the engine state, handed to [`SnapshotSink`]s
/// during the run and available through [`AlphaWrap::snapshot`] after it.
pub struct Snapshot<'a> {
  pub dt: &'a Triangulation,
  pub oracle: &'a PointOracle,
  pub queue: &'a BinaryHeap<Gate>,
  pub candidate: Option<&'a Gate>,
  pub wrap_edges: &'a [LineSegment],
  pub iteration: u32,
}

/// Receives intermediate snapshots. The callback is synchronous and owned
/// by the caller; it may block without harming correctness.
pub trait SnapshotSink {
  fn on_snapshot(&mut self, snapshot: &Snapshot<'_>);
}

/// Discards every snapshot.
pub struct NullSink;

impl SnapshotSink for NullSink {
  fn on_snapshot(&mut self, _snapshot: &Snapshot<'_>) {}
}

pub struct AlphaWrap<'a> {
  oracle: &'a PointOracle,
  config: WrapConfig,
  dt: Triangulation,
  queue: BinaryHeap<Gate>,
  bbox_diag: f64,
  wrap_edges: Vec<LineSegment>,
  statistics: WrapStatistics,
  timers: PhaseTimers,
  cancel: Option<Arc<AtomicBool>>,
}

impl<'a> AlphaWrap<'a> {
  /// Validate the configuration, insert the frame corners with margin
  /// `offset + bbox_diag / 10`, label faces by the infinite-face rule and
  /// seed the gate queue. An empty oracle produces an engine whose `run`
  /// returns immediately.
  pub fn new(oracle: &'a PointOracle, config: WrapConfig) -> Result<AlphaWrap<'a>, WrapError> {
    config.validate()?;

    let mut timers = PhaseTimers::new();
    timers.start(Phase::Total);
    timers.start(Phase::Init);

    let statistics = WrapStatistics::new(&config);

    let (bbox_diag, frame) = if oracle.is_empty() {
      let unit = Bbox::from_points(&[Point::new(-1.0, -1.0), Point::new(1.0, 1.0)]);
      (0.0, unit)
    } else {
      let diag = oracle.bbox().diagonal();
      let margin = config.offset + diag / 10.0;
      (diag, oracle.bbox().inflate(margin))
    };

    let mut dt = Triangulation::new_frame(&frame);

    let mut wrapper = if oracle.is_empty() {
      // nothing to enclose: no INSIDE region, no gates
      let finite: Vec<FaceIdx> = dt.finite_faces().collect();
      for f in finite {
        dt.set_label(f, FaceLabel::Outside);
      }
      AlphaWrap {
        oracle,
        config,
        dt,
        queue: BinaryHeap::new(),
        bbox_diag,
        wrap_edges: Vec::new(),
        statistics,
        timers,
        cancel: None,
      }
    } else {
      let mut wrapper = AlphaWrap {
        oracle,
        config,
        dt,
        queue: BinaryHeap::new(),
        bbox_diag,
        wrap_edges: Vec::new(),
        statistics,
        timers,
        cancel: None,
      };
      wrapper.rebuild_queue()?;
      wrapper
    };

    wrapper.timers.pause(Phase::Init);
    wrapper.timers.pause(Phase::Total);
    Ok(wrapper)
  }

  /// The run consults this flag between iterations and stops cleanly when
  /// it is raised.
  pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
    self.cancel = Some(flag);
  }

  pub fn config(&self) -> &WrapConfig {
    &self.config
  }

  pub fn triangulation(&self) -> &Triangulation {
    &self.dt
  }

  pub fn oracle(&self) -> &PointOracle {
    self.oracle
  }

  pub fn bbox_diag(&self) -> f64 {
    self.bbox_diag
  }

  /// The extracted wrap; empty before `run`.
  pub fn wrap_segments(&self) -> &[LineSegment] {
    &self.wrap_edges
  }

  pub fn statistics(&self) -> &WrapStatistics {
    &self.statistics
  }

  pub fn set_input_file(&mut self, name: &str) {
    self.statistics.config.input_file = Some(name.to_string());
  }

  pub fn snapshot(&self) -> Snapshot<'_> {
    Snapshot {
      dt: &self.dt,
      oracle: self.oracle,
      queue: &self.queue,
      candidate: None,
      wrap_edges: &self.wrap_edges,
      iteration: self.statistics.execution.n_iterations,
    }
  }

  fn policy_context(&self) -> PolicyContext<'a> {
    PolicyContext {
      alpha: self.config.alpha,
      offset: self.config.offset,
      bbox_diag: self.bbox_diag,
      oracle: self.oracle,
    }
  }

  fn is_gate(&self, e: Edge) -> bool {
    let other = self.dt.face(e.face).neighbor(e.sub);
    self.dt.label(e.face) != self.dt.label(other)
  }

  /// Score the edge and put it in the queue if it currently separates an
  /// INSIDE face from an OUTSIDE one.
  fn push_gate(&mut self, edge: Edge) -> Result<(), WrapError> {
    if !self.is_gate(edge) {
      return Ok(());
    }
    let info = gate_adjacency_info(&self.dt, edge, self.bbox_diag)?;
    let seg = self.dt.edge_segment(info.edge);
    let rho = sq_minimal_ball_radius(&seg.src, &seg.dst, &info, self.config.modified_min_ball);
    let Ok(priority) = NotNan::new(rho) else {
      warn!(?edge, "dropping gate with undefined priority");
      return Ok(());
    };
    self.queue.push(Gate {
      edge: info.edge,
      priority,
    });
    Ok(())
  }

  fn rebuild_queue(&mut self) -> Result<(), WrapError> {
    self.queue.clear();
    let edges: Vec<Edge> = self.dt.edges().collect();
    for edge in edges {
      self.push_gate(edge)?;
    }
    Ok(())
  }

  /// The main carving loop. See the module docs for the R1/R2 rules.
  pub fn run<S: SnapshotSink>(&mut self, sink: &mut S) -> Result<RunOutcome, WrapError> {
    self.timers.start(Phase::Total);
    self.timers.start(Phase::MainLoop);

    let mut iteration: u32 = 0;
    let mut outcome = RunOutcome::Completed;

    while let Some(candidate) = self.queue.pop() {
      if let Some(flag) = &self.cancel {
        if flag.load(AtomicOrdering::Relaxed) {
          info!(iteration, "cancellation requested, stopping");
          outcome = RunOutcome::Cancelled;
          break;
        }
      }

      iteration += 1;
      if iteration > self.config.max_iterations {
        info!(
          max_iterations = self.config.max_iterations,
          "reached maximum number of iterations, stopping"
        );
        iteration -= 1;
        outcome = RunOutcome::IterationCapReached;
        break;
      }
      debug!(iteration, queue_len = self.queue.len(), "iteration");

      if self.config.intermediate_steps > 0
        && iteration % self.config.intermediate_steps == 0
        && iteration < self.config.export_step_limit
      {
        sink.on_snapshot(&Snapshot {
          dt: &self.dt,
          oracle: self.oracle,
          queue: &self.queue,
          candidate: Some(&candidate),
          wrap_edges: &self.wrap_edges,
          iteration,
        });
      }

      // a gate can go stale when a neighboring carve relabels its inside
      // face; both faces then carry the same label
      self.timers.start(Phase::GateProcessing);
      if !self.is_gate(candidate.edge) {
        self.statistics.execution.n_stale_gates += 1;
        self.timers.pause(Phase::GateProcessing);
        continue;
      }
      let adjacency = gate_adjacency_info(&self.dt, candidate.edge, self.bbox_diag);
      self.timers.pause(Phase::GateProcessing);
      let adjacency = adjacency?;
      let c_in = adjacency.edge.face;

      let seg = self.dt.edge_segment(adjacency.edge);
      let ctx = self.policy_context();
      if !self
        .config
        .traversability
        .is_traversable(candidate.priority.into_inner(), &seg, &ctx)
      {
        continue;
      }

      if self.process_rule_1(&adjacency)? {
        self.statistics.execution.n_rule_1 += 1;
        debug!("steiner point inserted by R1");
        continue;
      }

      if self.process_rule_2(c_in, &adjacency)? {
        self.statistics.execution.n_rule_2 += 1;
        debug!("steiner point inserted by R2");
        continue;
      }

      // no refinement applies: advance the frontier through this face
      debug!(?c_in, "carving");
      self.dt.set_label(c_in, FaceLabel::Outside);
      for i in 0..3 {
        self.push_gate(Edge::new(c_in, SubIdx(i)))?;
      }
    }

    self.timers.pause(Phase::MainLoop);

    self.timers.start(Phase::Extraction);
    self.extract_wrap_surface();
    self.timers.pause(Phase::Extraction);
    self.timers.pause(Phase::Total);

    self.statistics.execution.n_iterations = iteration;
    self.statistics.output.n_vertices = self.dt.num_vertices();
    self.statistics.output.n_edges = self.wrap_edges.len();
    self.statistics.timings = TimingStats::from_timers(&self.timers);
    self.statistics.metadata.timestamp = time::OffsetDateTime::now_utc()
      .format(&time::format_description::well_known::Rfc3339)
      .unwrap_or_default();

    info!(
      iterations = iteration,
      rule_1 = self.statistics.execution.n_rule_1,
      rule_2 = self.statistics.execution.n_rule_2,
      wrap_edges = self.wrap_edges.len(),
      ?outcome,
      "wrap finished"
    );
    Ok(outcome)
  }

  /// R1: refine on the dual edge. A crossing of the segment between the
  /// two circumcenters and the offset surface becomes a Steiner point.
  fn process_rule_1(&mut self, adjacency: &EdgeAdjacencyInfo) -> Result<bool, WrapError> {
    self.timers.start(Phase::Rule1);
    let steiner = self.oracle.first_intersection(
      &adjacency.cc_outside,
      &adjacency.cc_inside,
      self.config.offset,
    );
    self.timers.pause(Phase::Rule1);

    match steiner {
      Some(s) => {
        self.insert_steiner_point(&s)?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// R2: refine on the inside face. If the face still overlaps the input
  /// points, project its circumcenter onto the point set and take the
  /// offset-surface crossing on the way there. A missing crossing after a
  /// positive overlap test is a precision mismatch and fatal.
  fn process_rule_2(
    &mut self,
    c_in: FaceIdx,
    adjacency: &EdgeAdjacencyInfo,
  ) -> Result<bool, WrapError> {
    self.timers.start(Phase::Rule2);
    let result = self.rule_2_inner(c_in, adjacency);
    self.timers.pause(Phase::Rule2);
    result
  }

  fn rule_2_inner(
    &mut self,
    c_in: FaceIdx,
    adjacency: &EdgeAdjacencyInfo,
  ) -> Result<bool, WrapError> {
    let triangle = self.dt.face_triangle(c_in);
    if !self.oracle.do_intersect(&triangle) {
      return Ok(false);
    }

    let Some(projection) = self.oracle.closest_point(&adjacency.cc_inside) else {
      return Ok(false);
    };
    match self
      .oracle
      .first_intersection(&adjacency.cc_inside, &projection, self.config.offset)
    {
      Some(s) => {
        self.insert_steiner_point(&s)?;
        Ok(true)
      }
      None => {
        self.statistics.execution.n_rule_2_failures += 1;
        Err(WrapError::RuleTwoMismatch)
      }
    }
  }

  /// Insert a Steiner point, classify the faces around it by the
  /// infinite-face rule and rebuild the queue from scratch; insertion
  /// invalidates queued edge references wholesale.
  fn insert_steiner_point(&mut self, s: &Point) -> Result<(), WrapError> {
    debug!(point = ?s, "inserting steiner point");
    let v = self.dt.insert(s)?;
    for f in self.dt.incident_faces(v) {
      let label = if self.dt.is_infinite(f) {
        FaceLabel::Outside
      } else {
        FaceLabel::Inside
      };
      self.dt.set_label(f, label);
    }

    self.timers.start(Phase::GateProcessing);
    let result = self.rebuild_queue();
    self.timers.pause(Phase::GateProcessing);
    result
  }

  /// The wrap surface: every finite edge whose incident faces disagree.
  fn extract_wrap_surface(&mut self) {
    let edges: Vec<LineSegment> = self
      .dt
      .edges()
      .filter(|&e| self.dt.is_finite_edge(e) && self.is_gate(e))
      .map(|e| self.dt.edge_segment(e))
      .collect();
    self.wrap_edges = edges;
  }

  /// Gates that are still traversable by the active policy. Zero after a
  /// completed run; possibly positive after hitting the iteration cap.
  pub fn traversable_gates_remaining(&self) -> Result<usize, WrapError> {
    let mut count = 0;
    for edge in self.dt.edges() {
      if !self.is_gate(edge) {
        continue;
      }
      let info = gate_adjacency_info(&self.dt, edge, self.bbox_diag)?;
      let seg = self.dt.edge_segment(info.edge);
      let rho = sq_minimal_ball_radius(&seg.src, &seg.dst, &info, self.config.modified_min_ball);
      let ctx = self.policy_context();
      if self.config.traversability.is_traversable(rho, &seg, &ctx) {
        count += 1;
      }
    }
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_input_exits_immediately() {
    let oracle = PointOracle::from_points(vec![]);
    let mut aw = AlphaWrap::new(&oracle, WrapConfig::new(1.0, 0.5)).unwrap();
    let outcome = aw.run(&mut NullSink).unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(aw.wrap_segments().len(), 0);
    assert_eq!(aw.statistics().execution.n_iterations, 0);
  }

  #[test]
  fn rejects_invalid_config() {
    let oracle = PointOracle::from_points(vec![Point::new(0.0, 0.0)]);
    assert!(matches!(
      AlphaWrap::new(&oracle, WrapConfig::new(-1.0, 0.5)),
      Err(WrapError::Config(_))
    ));
  }

  #[test]
  fn iteration_cap_yields_partial_result() {
    let pts = (0..20)
      .map(|i| Point::new(i as f64, (i % 3) as f64))
      .collect();
    let oracle = PointOracle::from_points(pts);
    let mut config = WrapConfig::new(0.8, 0.2);
    config.max_iterations = 3;
    let mut aw = AlphaWrap::new(&oracle, config).unwrap();
    let outcome = aw.run(&mut NullSink).unwrap();
    assert_eq!(outcome, RunOutcome::IterationCapReached);
    assert_eq!(aw.statistics().execution.n_iterations, 3);
  }

  #[test]
  fn cancel_flag_stops_the_loop() {
    let pts = (0..20)
      .map(|i| Point::new(i as f64, (i % 3) as f64))
      .collect();
    let oracle = PointOracle::from_points(pts);
    let mut aw = AlphaWrap::new(&oracle, WrapConfig::new(0.8, 0.2)).unwrap();
    let flag = Arc::new(AtomicBool::new(true));
    aw.set_cancel_flag(Arc::clone(&flag));
    let outcome = aw.run(&mut NullSink).unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
  }

  #[test]
  fn snapshots_arrive_at_the_configured_cadence() {
    struct Counter {
      seen: Vec<u32>,
    }
    impl SnapshotSink for Counter {
      fn on_snapshot(&mut self, snapshot: &Snapshot<'_>) {
        self.seen.push(snapshot.iteration);
      }
    }

    let pts = (0..10).map(|i| Point::new(i as f64, 0.0)).collect();
    let oracle = PointOracle::from_points(pts);
    let mut config = WrapConfig::new(1.0, 0.3);
    config.intermediate_steps = 2;
    let mut aw = AlphaWrap::new(&oracle, config).unwrap();
    let mut sink = Counter { seen: Vec::new() };
    aw.run(&mut sink).unwrap();
    assert!(!sink.seen.is_empty());
    assert!(sink.seen.iter().all(|i| i % 2 == 0));
  }
}
