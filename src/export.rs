//! SVG rendering of triangulation snapshots.
//!
//! The exporter is a pure consumer of [`Snapshot`]: it never mutates the
//! engine and can be invoked from a [`crate::wrap::SnapshotSink`] at any
//! iteration as well as on the final state.

use std::fmt::Write as _;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::data::{Bbox, Point};
use crate::triangulation::FaceLabel;
use crate::wrap::Snapshot;

/// How the interior of a face is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum FillMode {
  None,
  Solid,
  Gradient,
  /// Solid base color with a seeded per-face variation.
  Varied,
}

#[derive(Debug, Clone)]
pub struct FaceFillStyle {
  pub mode: FillMode,
  pub opacity: f64,
  pub base_color: String,
  pub gradient_start: String,
  pub gradient_end: String,
  pub color_variation: f64,
  pub random_seed: u64,
}

impl FaceFillStyle {
  pub fn none() -> FaceFillStyle {
    FaceFillStyle {
      mode: FillMode::None,
      opacity: 1.0,
      base_color: String::new(),
      gradient_start: String::new(),
      gradient_end: String::new(),
      color_variation: 0.0,
      random_seed: 0,
    }
  }

  pub fn solid(color: &str, opacity: f64) -> FaceFillStyle {
    FaceFillStyle {
      mode: FillMode::Solid,
      base_color: color.to_string(),
      opacity,
      ..FaceFillStyle::none()
    }
  }

  pub fn gradient(start: &str, end: &str, opacity: f64) -> FaceFillStyle {
    FaceFillStyle {
      mode: FillMode::Gradient,
      gradient_start: start.to_string(),
      gradient_end: end.to_string(),
      opacity,
      ..FaceFillStyle::none()
    }
  }

  pub fn varied(base: &str, variation: f64, opacity: f64, seed: u64) -> FaceFillStyle {
    FaceFillStyle {
      mode: FillMode::Varied,
      base_color: base.to_string(),
      color_variation: variation,
      opacity,
      random_seed: seed,
      ..FaceFillStyle::none()
    }
  }
}

#[derive(Debug, Clone)]
pub struct SimpleStyle {
  pub color: String,
  pub opacity: f64,
  pub relative_stroke_width: f64,
}

impl SimpleStyle {
  fn new(color: &str, opacity: f64, relative_stroke_width: f64) -> SimpleStyle {
    SimpleStyle {
      color: color.to_string(),
      opacity,
      relative_stroke_width,
    }
  }
}

/// Visualization preset names accepted by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylePreset {
  Default,
  Clean,
  OutsideFilled,
}

#[derive(Debug, Clone)]
pub struct StyleConfig {
  pub inside_faces: FaceFillStyle,
  pub outside_faces: FaceFillStyle,
  pub stroke_width: f64,
  pub vertex_radius: f64,
  pub input_point_radius: f64,
  pub margin: f64,

  pub input_points: SimpleStyle,
  pub voronoi_diagram: SimpleStyle,
  pub delaunay_edges: SimpleStyle,
  pub queue_edges: SimpleStyle,
  pub candidate_edge: SimpleStyle,
  pub wrap_edges: SimpleStyle,

  pub draw_voronoi_diagram: bool,
  pub draw_queue_edges: bool,
  pub draw_candidate_edge: bool,
}

impl StyleConfig {
  pub fn preset(preset: StylePreset) -> StyleConfig {
    match preset {
      StylePreset::Default => StyleConfig::default_style(),
      StylePreset::Clean => StyleConfig::clean_style(),
      StylePreset::OutsideFilled => StyleConfig::outside_filled_style(),
    }
  }

  pub fn default_style() -> StyleConfig {
    StyleConfig {
      inside_faces: FaceFillStyle::gradient("#0e80dd", "#18aac4", 1.0),
      outside_faces: FaceFillStyle::none(),
      stroke_width: 2.0,
      vertex_radius: 3.0,
      input_point_radius: 2.5,
      margin: 15.0,
      input_points: SimpleStyle::new("black", 1.0, 1.0),
      voronoi_diagram: SimpleStyle::new("pink", 0.6, 1.0),
      delaunay_edges: SimpleStyle::new("gray", 1.0, 0.5),
      queue_edges: SimpleStyle::new("#20a83d", 1.0, 2.0),
      candidate_edge: SimpleStyle::new("#ff9900", 1.0, 2.0),
      wrap_edges: SimpleStyle::new("#b3001b", 1.0, 2.0),
      draw_voronoi_diagram: false,
      draw_queue_edges: true,
      draw_candidate_edge: true,
    }
  }

  pub fn clean_style() -> StyleConfig {
    StyleConfig {
      draw_voronoi_diagram: false,
      draw_queue_edges: false,
      draw_candidate_edge: false,
      ..StyleConfig::default_style()
    }
  }

  pub fn outside_filled_style() -> StyleConfig {
    StyleConfig {
      outside_faces: FaceFillStyle::gradient("#ff6b6b", "#ffd93d", 0.3),
      ..StyleConfig::default_style()
    }
  }
}

struct RgbColor {
  r: u8,
  g: u8,
  b: u8,
}

impl RgbColor {
  /// Parse `#rrggbb`; anything else comes back black.
  fn from_hex(hex: &str) -> RgbColor {
    let parse = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
      return RgbColor { r: 0, g: 0, b: 0 };
    }
    RgbColor {
      r: parse(&hex[0..2]),
      g: parse(&hex[2..4]),
      b: parse(&hex[4..6]),
    }
  }

  fn vary(&self, variation: f64, rng: &mut SmallRng) -> RgbColor {
    let jitter = |channel: u8, rng: &mut SmallRng| {
      let f = 1.0 + rng.gen_range(-variation..=variation);
      (f64::from(channel) * f).clamp(0.0, 255.0) as u8
    };
    RgbColor {
      r: jitter(self.r, rng),
      g: jitter(self.g, rng),
      b: jitter(self.b, rng),
    }
  }

  fn to_hex(&self) -> String {
    format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
  }
}

/// Canvas mapping from world coordinates (y up) to SVG (y down).
struct CanvasTransform {
  bbox: Bbox,
  margin: f64,
  scale: f64,
}

const CANVAS_TARGET: f64 = 800.0;

impl CanvasTransform {
  fn new(bbox: Bbox, margin: f64) -> CanvasTransform {
    let extent = bbox.width().max(bbox.height()).max(f64::MIN_POSITIVE);
    CanvasTransform {
      bbox,
      margin,
      scale: CANVAS_TARGET / extent,
    }
  }

  fn to_svg(&self, p: &Point) -> (f64, f64) {
    (
      (p.x - self.bbox.x_min) * self.scale + self.margin,
      (self.bbox.y_max - p.y) * self.scale + self.margin,
    )
  }

  fn width(&self) -> f64 {
    self.bbox.width() * self.scale + 2.0 * self.margin
  }

  fn height(&self) -> f64 {
    self.bbox.height() * self.scale + 2.0 * self.margin
  }
}

/// Render a snapshot into an SVG document.
pub fn render_svg(snapshot: &Snapshot<'_>, style: &StyleConfig) -> String {
  let dt = snapshot.dt;

  let mut bbox = Bbox::empty();
  for f in dt.finite_faces() {
    for p in dt.face_triangle(f).0 {
      bbox.extend(&p);
    }
  }
  for p in snapshot.oracle.points() {
    bbox.extend(&p);
  }
  if bbox.is_empty() {
    bbox = Bbox::from_points(&[Point::new(-1.0, -1.0), Point::new(1.0, 1.0)]);
  }
  let canvas = CanvasTransform::new(bbox, style.margin);

  let mut svg = String::new();
  let _ = writeln!(
    svg,
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.2} {:.2}">"#,
    canvas.width(),
    canvas.height(),
    canvas.width(),
    canvas.height()
  );

  write_defs(&mut svg, style);
  draw_faces(&mut svg, snapshot, style, &canvas);
  if style.draw_voronoi_diagram {
    draw_voronoi(&mut svg, snapshot, style, &canvas);
  }
  if style.draw_queue_edges {
    draw_queue_edges(&mut svg, snapshot, style, &canvas);
  }
  draw_wrap_edges(&mut svg, snapshot, style, &canvas);
  if style.draw_candidate_edge {
    draw_candidate(&mut svg, snapshot, style, &canvas);
  }
  draw_input_points(&mut svg, snapshot, style, &canvas);

  svg.push_str("</svg>\n");
  svg
}

fn write_defs(svg: &mut String, style: &StyleConfig) {
  let mut defs = String::new();
  for (id, fill) in [
    ("inside-fill", &style.inside_faces),
    ("outside-fill", &style.outside_faces),
  ] {
    if fill.mode == FillMode::Gradient {
      let _ = writeln!(
        defs,
        r##"  <linearGradient id="{id}" x1="0" y1="0" x2="1" y2="1">
    <stop offset="0%" stop-color="{}"/>
    <stop offset="100%" stop-color="{}"/>
  </linearGradient>"##,
        fill.gradient_start, fill.gradient_end
      );
    }
  }
  if !defs.is_empty() {
    let _ = writeln!(svg, "<defs>\n{defs}</defs>");
  }
}

fn draw_faces(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  let dt = snapshot.dt;
  let mut inside_rng = SmallRng::seed_from_u64(style.inside_faces.random_seed);
  let mut outside_rng = SmallRng::seed_from_u64(style.outside_faces.random_seed);

  for f in dt.finite_faces() {
    let inside = dt.label(f) == FaceLabel::Inside;
    let (fill_style, gradient_id, rng) = if inside {
      (&style.inside_faces, "inside-fill", &mut inside_rng)
    } else {
      (&style.outside_faces, "outside-fill", &mut outside_rng)
    };

    let fill = match fill_style.mode {
      FillMode::None => "none".to_string(),
      FillMode::Solid => fill_style.base_color.clone(),
      FillMode::Gradient => format!("url(#{gradient_id})"),
      FillMode::Varied => RgbColor::from_hex(&fill_style.base_color)
        .vary(fill_style.color_variation, rng)
        .to_hex(),
    };

    let tri = dt.face_triangle(f);
    let (x1, y1) = canvas.to_svg(&tri.0[0]);
    let (x2, y2) = canvas.to_svg(&tri.0[1]);
    let (x3, y3) = canvas.to_svg(&tri.0[2]);
    let _ = writeln!(
      svg,
      r#"<polygon points="{x1:.2},{y1:.2} {x2:.2},{y2:.2} {x3:.2},{y3:.2}" fill="{fill}" fill-opacity="{}" stroke="{}" stroke-opacity="{}" stroke-width="{:.2}"/>"#,
      fill_style.opacity,
      style.delaunay_edges.color,
      style.delaunay_edges.opacity,
      style.stroke_width * style.delaunay_edges.relative_stroke_width,
    );
  }
}

fn draw_voronoi(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  let dt = snapshot.dt;
  for edge in dt.edges() {
    let f = edge.face;
    let g = dt.face(f).neighbor(edge.sub);
    if dt.is_infinite(f) || dt.is_infinite(g) {
      continue;
    }
    let (Some(cf), Some(cg)) = (dt.circumcenter(f), dt.circumcenter(g)) else {
      continue;
    };
    draw_line(svg, canvas, &cf, &cg, &style.voronoi_diagram, style.stroke_width);
  }
}

fn draw_queue_edges(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  let dt = snapshot.dt;
  for gate in snapshot.queue.iter() {
    if !dt.is_finite_edge(gate.edge) {
      continue;
    }
    let seg = dt.edge_segment(gate.edge);
    draw_line(svg, canvas, &seg.src, &seg.dst, &style.queue_edges, style.stroke_width);
  }
}

fn draw_wrap_edges(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  for seg in snapshot.wrap_edges {
    draw_line(svg, canvas, &seg.src, &seg.dst, &style.wrap_edges, style.stroke_width);
  }
}

fn draw_candidate(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  let Some(gate) = snapshot.candidate else {
    return;
  };
  if !snapshot.dt.is_finite_edge(gate.edge) {
    return;
  }
  let seg = snapshot.dt.edge_segment(gate.edge);
  draw_line(svg, canvas, &seg.src, &seg.dst, &style.candidate_edge, style.stroke_width);
}

fn draw_input_points(svg: &mut String, snapshot: &Snapshot<'_>, style: &StyleConfig, canvas: &CanvasTransform) {
  for p in snapshot.oracle.points() {
    let (cx, cy) = canvas.to_svg(&p);
    let _ = writeln!(
      svg,
      r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{:.2}" fill="{}" fill-opacity="{}"/>"#,
      style.input_point_radius * style.input_points.relative_stroke_width,
      style.input_points.color,
      style.input_points.opacity,
    );
  }
}

fn draw_line(
  svg: &mut String,
  canvas: &CanvasTransform,
  p1: &Point,
  p2: &Point,
  style: &SimpleStyle,
  base_width: f64,
) {
  let (x1, y1) = canvas.to_svg(p1);
  let (x2, y2) = canvas.to_svg(p2);
  let _ = writeln!(
    svg,
    r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-opacity="{}" stroke-width="{:.2}"/>"#,
    style.color,
    style.opacity,
    base_width * style.relative_stroke_width,
  );
}
