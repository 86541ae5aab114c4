use std::time::{Duration, Instant};

/// Phases of a wrap run, for the timing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Total,
  Init,
  MainLoop,
  GateProcessing,
  Rule1,
  Rule2,
  Extraction,
}

const PHASE_COUNT: usize = 7;

impl Phase {
  fn index(self) -> usize {
    match self {
      Phase::Total => 0,
      Phase::Init => 1,
      Phase::MainLoop => 2,
      Phase::GateProcessing => 3,
      Phase::Rule1 => 4,
      Phase::Rule2 => 5,
      Phase::Extraction => 6,
    }
  }
}

/// Accumulating start/pause stopwatches, one per phase. Owned by the
/// engine and threaded through explicitly; there is no global registry.
#[derive(Debug)]
pub struct PhaseTimers {
  accumulated: [Duration; PHASE_COUNT],
  started: [Option<Instant>; PHASE_COUNT],
}

impl Default for PhaseTimers {
  fn default() -> Self {
    Self::new()
  }
}

impl PhaseTimers {
  pub fn new() -> PhaseTimers {
    PhaseTimers {
      accumulated: [Duration::ZERO; PHASE_COUNT],
      started: [None; PHASE_COUNT],
    }
  }

  /// Starting a running timer is a no-op.
  pub fn start(&mut self, phase: Phase) {
    let i = phase.index();
    if self.started[i].is_none() {
      self.started[i] = Some(Instant::now());
    }
  }

  /// Accumulates the elapsed time since the matching `start`.
  pub fn pause(&mut self, phase: Phase) {
    let i = phase.index();
    if let Some(t0) = self.started[i].take() {
      self.accumulated[i] += t0.elapsed();
    }
  }

  pub fn elapsed_ms(&self, phase: Phase) -> f64 {
    let i = phase.index();
    let mut total = self.accumulated[i];
    if let Some(t0) = self.started[i] {
      total += t0.elapsed();
    }
    total.as_secs_f64() * 1e3
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accumulates_across_start_pause_cycles() {
    let mut timers = PhaseTimers::new();
    assert_eq!(timers.elapsed_ms(Phase::Rule1), 0.0);
    timers.start(Phase::Rule1);
    timers.start(Phase::Rule1); // no-op
    timers.pause(Phase::Rule1);
    let once = timers.elapsed_ms(Phase::Rule1);
    timers.start(Phase::Rule1);
    timers.pause(Phase::Rule1);
    assert!(timers.elapsed_ms(Phase::Rule1) >= once);
    // pausing a stopped timer is harmless
    timers.pause(Phase::Rule1);
  }
}
