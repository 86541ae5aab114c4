use serde::Serialize;

use super::{Phase, PhaseTimers, Traversability};

pub const STATISTICS_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionStats {
  pub n_iterations: u32,
  pub n_rule_1: u32,
  pub n_rule_2: u32,
  pub n_stale_gates: u32,
  pub n_rule_2_failures: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputStats {
  pub n_vertices: usize,
  pub n_edges: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingStats {
  pub total_ms: f64,
  pub init_ms: f64,
  pub main_loop_ms: f64,
  pub gate_processing_ms: f64,
  pub rule_1_ms: f64,
  pub rule_2_ms: f64,
  pub extraction_ms: f64,
}

impl TimingStats {
  pub fn from_timers(timers: &PhaseTimers) -> TimingStats {
    TimingStats {
      total_ms: timers.elapsed_ms(Phase::Total),
      init_ms: timers.elapsed_ms(Phase::Init),
      main_loop_ms: timers.elapsed_ms(Phase::MainLoop),
      gate_processing_ms: timers.elapsed_ms(Phase::GateProcessing),
      rule_1_ms: timers.elapsed_ms(Phase::Rule1),
      rule_2_ms: timers.elapsed_ms(Phase::Rule2),
      extraction_ms: timers.elapsed_ms(Phase::Extraction),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigStats {
  pub input_file: Option<String>,
  pub alpha: f64,
  pub offset: f64,
  pub traversability_function: String,
  pub traversability_params: Traversability,
  pub modified_min_ball: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataStats {
  pub timestamp: String,
  pub version: String,
}

impl Default for MetadataStats {
  fn default() -> MetadataStats {
    MetadataStats {
      timestamp: String::new(),
      version: STATISTICS_SCHEMA_VERSION.to_string(),
    }
  }
}

/// Everything a run leaves behind besides the wrap itself.
#[derive(Debug, Clone, Serialize)]
pub struct WrapStatistics {
  pub config: ConfigStats,
  pub execution: ExecutionStats,
  pub output: OutputStats,
  pub timings: TimingStats,
  pub metadata: MetadataStats,
}

impl WrapStatistics {
  pub fn new(config: &super::WrapConfig) -> WrapStatistics {
    WrapStatistics {
      config: ConfigStats {
        input_file: None,
        alpha: config.alpha,
        offset: config.offset,
        traversability_function: config.traversability.name().to_string(),
        traversability_params: config.traversability,
        modified_min_ball: config.modified_min_ball,
      },
      execution: ExecutionStats::default(),
      output: OutputStats::default(),
      timings: TimingStats::default(),
      metadata: MetadataStats::default(),
    }
  }

  pub fn to_json_string(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wrap::WrapConfig;

  #[test]
  fn serializes_with_expected_shape() {
    let mut config = WrapConfig::new(2.0, 0.5);
    config.traversability = Traversability::DeviationBased {
      alpha_max: 0.2,
      point_threshold: 5,
      deviation_factor: 0.05,
    };
    let stats = WrapStatistics::new(&config);
    let value: serde_json::Value =
      serde_json::from_str(&stats.to_json_string().unwrap()).unwrap();
    assert_eq!(value["config"]["alpha"], 2.0);
    assert_eq!(
      value["config"]["traversability_function"],
      "DEVIATION_BASED"
    );
    assert_eq!(
      value["config"]["traversability_params"]["point_threshold"],
      5
    );
    assert_eq!(value["metadata"]["version"], STATISTICS_SCHEMA_VERSION);
    assert_eq!(value["execution"]["n_iterations"], 0);
  }
}
