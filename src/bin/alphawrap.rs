use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use alpha_wrap_2d::export::{render_svg, StyleConfig, StylePreset};
use alpha_wrap_2d::oracle::PointOracle;
use alpha_wrap_2d::wrap::{AlphaWrap, Snapshot, SnapshotSink, Traversability, WrapConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TraversabilityArg {
  ConstantAlpha,
  DeviationBased,
  IntersectionBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StyleArg {
  Default,
  Clean,
  OutsideFilled,
}

impl From<StyleArg> for StylePreset {
  fn from(arg: StyleArg) -> StylePreset {
    match arg {
      StyleArg::Default => StylePreset::Default,
      StyleArg::Clean => StylePreset::Clean,
      StyleArg::OutsideFilled => StylePreset::OutsideFilled,
    }
  }
}

/// Compute a 2D alpha wrap of a point set and export SVG snapshots plus a
/// JSON statistics file.
#[derive(Parser, Debug)]
#[command(name = "alphawrap", version)]
struct Args {
  /// Points file: one `x y` pair per line
  #[arg(long)]
  input: PathBuf,

  /// Results directory
  #[arg(long)]
  output: PathBuf,

  /// Append a unique timestamp suffix to the results directory
  #[arg(long)]
  output_use_subdir: bool,

  /// Concavity scale
  #[arg(long, default_value_t = 10.0)]
  alpha: f64,

  /// Thickening radius around each input point
  #[arg(long, default_value_t = 2.0)]
  offset: f64,

  #[arg(long, value_enum, default_value_t = TraversabilityArg::ConstantAlpha)]
  traversability: TraversabilityArg,

  /// Deviation-based: upper bound of the adaptive alpha, in units of the
  /// bbox diagonal
  #[arg(long, default_value_t = 0.2)]
  alpha_max: f64,

  /// Deviation-based: below this many local points the deviation score
  /// is forced to 1
  #[arg(long, default_value_t = 5)]
  point_threshold: usize,

  /// Deviation-based: sensitivity of the deviation score
  #[arg(long, default_value_t = 0.05)]
  deviation_factor: f64,

  /// Intersection-based: probe length in units of the bbox diagonal
  #[arg(long, default_value_t = 0.005)]
  tolerance_factor: f64,

  /// Alternative minimal-ball radius in the non-Delaunay case
  #[arg(long)]
  modified_min_ball: bool,

  /// Emit an intermediate snapshot every N iterations (0 disables)
  #[arg(long, default_value_t = 50)]
  intermediate_steps: u32,

  /// Stop emitting intermediate snapshots past this iteration
  #[arg(long, default_value_t = 1000)]
  export_step_limit: u32,

  /// Hard cap on main-loop iterations
  #[arg(long, default_value_t = 5000)]
  max_iterations: u32,

  /// Visualization preset
  #[arg(long, value_enum, default_value_t = StyleArg::Default)]
  style: StyleArg,
}

impl Args {
  fn traversability(&self) -> Traversability {
    match self.traversability {
      TraversabilityArg::ConstantAlpha => Traversability::ConstantAlpha,
      TraversabilityArg::DeviationBased => Traversability::DeviationBased {
        alpha_max: self.alpha_max,
        point_threshold: self.point_threshold,
        deviation_factor: self.deviation_factor,
      },
      TraversabilityArg::IntersectionBased => Traversability::IntersectionBased {
        tolerance_factor: self.tolerance_factor,
      },
    }
  }
}

/// Writes one SVG per offered snapshot into the output directory.
struct SvgExporter {
  dir: PathBuf,
  style: StyleConfig,
}

impl SvgExporter {
  fn write(&self, name: &str, svg: &str) {
    let path = self.dir.join(name);
    if let Err(e) = fs::write(&path, svg) {
      tracing::warn!(path = %path.display(), error = %e, "failed to write svg");
    }
  }
}

impl SnapshotSink for SvgExporter {
  fn on_snapshot(&mut self, snapshot: &Snapshot<'_>) {
    let name = format!("in_progress_iter_{}.svg", snapshot.iteration);
    self.write(&name, &render_svg(snapshot, &self.style));
  }
}

fn setup_output_dir(base: &Path, use_subdir: bool) -> Result<PathBuf> {
  let dir = if use_subdir {
    let stamp = time::OffsetDateTime::now_utc()
      .format(&time::format_description::well_known::Rfc3339)
      .unwrap_or_default()
      .replace(':', "-");
    base.join(format!("run_{stamp}"))
  } else {
    base.to_path_buf()
  };
  fs::create_dir_all(&dir)
    .with_context(|| format!("cannot create output directory {}", dir.display()))?;
  Ok(dir)
}

fn main() -> Result<()> {
  SubscriberBuilder::default().with_target(false).init();
  let args = Args::parse();

  let oracle = PointOracle::load(&args.input)
    .with_context(|| format!("loading points from {}", args.input.display()))?;
  tracing::info!(
    points = oracle.len(),
    input = %args.input.display(),
    "loaded point set"
  );

  let out_dir = setup_output_dir(&args.output, args.output_use_subdir)?;

  let config = WrapConfig {
    alpha: args.alpha,
    offset: args.offset,
    traversability: args.traversability(),
    modified_min_ball: args.modified_min_ball,
    max_iterations: args.max_iterations,
    intermediate_steps: args.intermediate_steps,
    export_step_limit: args.export_step_limit,
  };

  let mut wrapper = AlphaWrap::new(&oracle, config)?;
  wrapper.set_input_file(&args.input.display().to_string());

  let mut exporter = SvgExporter {
    dir: out_dir.clone(),
    style: StyleConfig::preset(args.style.into()),
  };

  let outcome = wrapper.run(&mut exporter)?;
  tracing::info!(?outcome, "run finished");

  exporter.write("final_result.svg", &render_svg(&wrapper.snapshot(), &exporter.style));

  let stats_path = out_dir.join("statistics.json");
  let json = wrapper
    .statistics()
    .to_json_string()
    .context("serializing statistics")?;
  fs::write(&stats_path, json)
    .with_context(|| format!("writing statistics to {}", stats_path.display()))?;
  tracing::info!(path = %stats_path.display(), "statistics exported");

  for (i, seg) in wrapper.wrap_segments().iter().enumerate().take(5) {
    tracing::debug!(i, ?seg, "wrap segment");
  }
  tracing::info!(
    wrap_edges = wrapper.wrap_segments().len(),
    vertices = wrapper.statistics().output.n_vertices,
    "wrap surface extracted"
  );

  Ok(())
}
