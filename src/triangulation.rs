//! Incremental Delaunay triangulation of the whole plane.
//!
//! The triangulation is stored as an arena of triangle records with integer
//! indices for vertices and neighbors. A distinguished sentinel,
//! [`VertIdx::INFINITE`], completes the convex hull: every hull edge is
//! shared with an "infinite" face whose third corner is the sentinel, so
//! every face has exactly three neighbors and walking the mesh never falls
//! off an edge. Each face carries a mutable [`FaceLabel`] for the carving
//! frontier.
//!
//! The mesh is seeded with four frame corners and only ever grows by point
//! insertion strictly inside the frame, which keeps the hull fixed and the
//! infinite faces stable.

use claims::debug_assert_ok;
use geometry_predicates::incircle;

use crate::data::{circumcenter, Bbox, LineSegment, Orientation, Point, Triangle};
use crate::WrapError;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct FaceIdx(pub usize);
impl std::fmt::Debug for FaceIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "f{}", self.0)
  }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct VertIdx(pub usize);
impl std::fmt::Debug for VertIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "v{}", self.0)
  }
}

impl VertIdx {
  /// The conceptual point at infinity closing the triangulation.
  pub const INFINITE: VertIdx = VertIdx(0);

  pub fn is_infinite(&self) -> bool {
    *self == VertIdx::INFINITE
  }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct SubIdx(pub usize);
impl std::fmt::Debug for SubIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "s{}", self.0)
  }
}

impl SubIdx {
  pub fn ccw(self) -> Self {
    Self((self.0 + 1) % 3)
  }
  pub fn cw(self) -> Self {
    Self((self.0 + 2) % 3)
  }
}

/// A directed edge reference: the edge of `face` opposite vertex `sub`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct Edge {
  pub face: FaceIdx,
  pub sub: SubIdx,
}

impl Edge {
  pub fn new(face: FaceIdx, sub: SubIdx) -> Self {
    Self { face, sub }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLabel {
  Inside,
  Outside,
}

/// Triangle record: vertices in counter-clockwise order, `neighbors[i]`
/// across the edge opposite `vertices[i]`.
#[derive(Clone)]
pub struct Face {
  pub vertices: [VertIdx; 3],
  pub neighbors: [FaceIdx; 3],
  pub label: FaceLabel,
}

impl std::fmt::Debug for Face {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(
      fmt,
      "Face{{v=({}, {}, {}), n=({}, {}, {}), {:?}}}",
      self.vertices[0].0,
      self.vertices[1].0,
      self.vertices[2].0,
      self.neighbors[0].0,
      self.neighbors[1].0,
      self.neighbors[2].0,
      self.label
    )
  }
}

impl Face {
  pub fn vert(&self, idx: SubIdx) -> VertIdx {
    self.vertices[idx.0]
  }

  pub fn neighbor(&self, idx: SubIdx) -> FaceIdx {
    self.neighbors[idx.0]
  }

  pub fn is_infinite(&self) -> bool {
    self.vertices.contains(&VertIdx::INFINITE)
  }

  pub fn position_of(&self, v: VertIdx) -> Option<SubIdx> {
    self.vertices.iter().position(|x| *x == v).map(SubIdx)
  }

  fn neighbor_position(&self, idx: FaceIdx) -> Option<SubIdx> {
    self.neighbors.iter().position(|n| *n == idx).map(SubIdx)
  }

  fn update_neighbor(&mut self, from: FaceIdx, to: FaceIdx) -> Result<(), WrapError> {
    for i in 0..3 {
      if self.neighbors[i] == from {
        self.neighbors[i] = to;
        return Ok(());
      }
    }
    Err(WrapError::Logic(format!(
      "neighbor {from:?} not found while rewiring to {to:?}"
    )))
  }
}

/// Where a point lies relative to the triangulation.
#[derive(Debug, PartialEq, Eq)]
pub enum Location {
  InFace(FaceIdx),
  OnEdge(Edge),
  OnVertex(FaceIdx, SubIdx),
}

pub struct Triangulation {
  vertices: Vec<Point>,
  faces: Vec<Face>,
  /// One incident face per vertex, maintained on every face write.
  vertex_face: Vec<FaceIdx>,
  /// Finite face the point-location walk starts from.
  walk_start: FaceIdx,
}

impl Triangulation {
  /// Build the initial mesh from the four corners of `frame`: two finite
  /// faces split by a diagonal, ringed by four infinite faces. Finite
  /// faces start [`FaceLabel::Inside`], infinite ones
  /// [`FaceLabel::Outside`].
  pub fn new_frame(frame: &Bbox) -> Triangulation {
    let [a, b, c, d] = frame.corners();
    let f = |n: usize| FaceIdx(n);
    let v = |n: usize| VertIdx(n);
    let faces = vec![
      // (a, b, c) and (a, c, d)
      Face {
        vertices: [v(1), v(2), v(3)],
        neighbors: [f(3), f(1), f(2)],
        label: FaceLabel::Inside,
      },
      Face {
        vertices: [v(1), v(3), v(4)],
        neighbors: [f(4), f(5), f(0)],
        label: FaceLabel::Inside,
      },
      // infinite faces along the hull edges ab, bc, cd, da
      Face {
        vertices: [v(0), v(2), v(1)],
        neighbors: [f(0), f(5), f(3)],
        label: FaceLabel::Outside,
      },
      Face {
        vertices: [v(0), v(3), v(2)],
        neighbors: [f(0), f(2), f(4)],
        label: FaceLabel::Outside,
      },
      Face {
        vertices: [v(0), v(4), v(3)],
        neighbors: [f(1), f(3), f(5)],
        label: FaceLabel::Outside,
      },
      Face {
        vertices: [v(0), v(1), v(4)],
        neighbors: [f(1), f(4), f(2)],
        label: FaceLabel::Outside,
      },
    ];
    let tri = Triangulation {
      vertices: vec![Point::new(f64::NAN, f64::NAN), a, b, c, d],
      faces,
      vertex_face: vec![f(2), f(0), f(0), f(0), f(1)],
      walk_start: f(0),
    };
    debug_assert_ok!(tri.check_invariant());
    tri
  }

  pub fn num_vertices(&self) -> usize {
    // the sentinel is not a real vertex
    self.vertices.len() - 1
  }

  pub fn num_faces(&self) -> usize {
    self.faces.len()
  }

  /// # Panics
  ///
  /// Panics when asked for the coordinates of the infinite vertex.
  pub fn vertex(&self, v: VertIdx) -> &Point {
    assert!(!v.is_infinite(), "the infinite vertex has no coordinates");
    &self.vertices[v.0]
  }

  pub fn face(&self, f: FaceIdx) -> &Face {
    &self.faces[f.0]
  }

  pub fn is_infinite(&self, f: FaceIdx) -> bool {
    self.faces[f.0].is_infinite()
  }

  pub fn label(&self, f: FaceIdx) -> FaceLabel {
    self.faces[f.0].label
  }

  pub fn set_label(&mut self, f: FaceIdx, label: FaceLabel) {
    self.faces[f.0].label = label;
  }

  /// The two vertices of an edge, in the face's boundary order.
  pub fn edge_vertices(&self, e: Edge) -> (VertIdx, VertIdx) {
    let face = self.face(e.face);
    (face.vert(e.sub.ccw()), face.vert(e.sub.cw()))
  }

  /// Both endpoints are finite vertices.
  pub fn is_finite_edge(&self, e: Edge) -> bool {
    let (u, v) = self.edge_vertices(e);
    !u.is_infinite() && !v.is_infinite()
  }

  /// Endpoint coordinates of a finite edge.
  pub fn edge_segment(&self, e: Edge) -> LineSegment {
    let (u, v) = self.edge_vertices(e);
    LineSegment::new(*self.vertex(u), *self.vertex(v))
  }

  /// The same undirected edge, named from the face on the other side.
  pub fn mirror_edge(&self, e: Edge) -> Result<Edge, WrapError> {
    let g = self.face(e.face).neighbor(e.sub);
    let j = self
      .face(g)
      .neighbor_position(e.face)
      .ok_or_else(|| WrapError::Logic(format!("mirror of {e:?} lost its back-pointer")))?;
    Ok(Edge::new(g, j))
  }

  /// Every undirected edge exactly once, named from the lower face index.
  pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
    self.faces.iter().enumerate().flat_map(move |(fi, face)| {
      (0..3).filter_map(move |i| {
        let e = Edge::new(FaceIdx(fi), SubIdx(i));
        (FaceIdx(fi) < face.neighbor(SubIdx(i))).then_some(e)
      })
    })
  }

  pub fn finite_faces(&self) -> impl Iterator<Item = FaceIdx> + '_ {
    self
      .faces
      .iter()
      .enumerate()
      .filter(|(_, face)| !face.is_infinite())
      .map(|(fi, _)| FaceIdx(fi))
  }

  /// Geometry of a finite face.
  pub fn face_triangle(&self, f: FaceIdx) -> Triangle {
    let face = self.face(f);
    debug_assert!(!face.is_infinite());
    Triangle([
      *self.vertex(face.vertices[0]),
      *self.vertex(face.vertices[1]),
      *self.vertex(face.vertices[2]),
    ])
  }

  /// Circumcenter of a finite face; `None` when degenerate.
  pub fn circumcenter(&self, f: FaceIdx) -> Option<Point> {
    let face = self.face(f);
    if face.is_infinite() {
      return None;
    }
    circumcenter(
      self.vertex(face.vertices[0]),
      self.vertex(face.vertices[1]),
      self.vertex(face.vertices[2]),
    )
  }

  /// All faces around `v`, by rotation over shared edges.
  pub fn incident_faces(&self, v: VertIdx) -> Vec<FaceIdx> {
    let start = self.vertex_face[v.0];
    let mut out = Vec::new();
    let mut cur = start;
    loop {
      out.push(cur);
      let k = self
        .face(cur)
        .position_of(v)
        .expect("vertex_face hint points to a non-incident face");
      cur = self.face(cur).neighbor(k.ccw());
      if cur == start {
        break;
      }
      assert!(
        out.len() <= self.faces.len(),
        "incident-face walk does not close"
      );
    }
    out
  }

  /// Point location by orientation walk over finite faces.
  pub fn locate(&self, p: &Point) -> Result<Location, WrapError> {
    use Orientation::*;

    let mut cur = self.walk_start;
    let mut prev: Option<FaceIdx> = None;

    for _ in 0..3 * self.faces.len() + 9 {
      if self.is_infinite(cur) {
        return Err(WrapError::Logic(format!(
          "point {p:?} lies outside the frame"
        )));
      }
      let face = self.face(cur);

      for i in 0..3 {
        if self.vertex(face.vert(SubIdx(i))) == p {
          return Ok(Location::OnVertex(cur, SubIdx(i)));
        }
      }

      let mut orientations = [CoLinear; 3];
      for i in 0..3 {
        let e = Edge::new(cur, SubIdx(i));
        let (u, v) = self.edge_vertices(e);
        orientations[i] = Orientation::new(self.vertex(u), self.vertex(v), p);
      }

      // step across the first outward edge, avoiding an immediate backtrack
      let step = (0..3)
        .filter(|&i| orientations[i] == ClockWise)
        .map(|i| (i, face.neighbor(SubIdx(i))))
        .find(|(_, n)| Some(*n) != prev)
        .or_else(|| {
          (0..3)
            .find(|&i| orientations[i] == ClockWise)
            .map(|i| (i, face.neighbor(SubIdx(i))))
        });
      if let Some((_, next)) = step {
        prev = Some(cur);
        cur = next;
        continue;
      }

      let colinear = (0..3).filter(|&i| orientations[i] == CoLinear).count();
      return match colinear {
        0 => Ok(Location::InFace(cur)),
        1 => {
          let i = (0..3).find(|&i| orientations[i] == CoLinear).unwrap();
          Ok(Location::OnEdge(Edge::new(cur, SubIdx(i))))
        }
        _ => Err(WrapError::Logic(format!(
          "degenerate location for point {p:?}"
        ))),
      };
    }
    Err(WrapError::Logic(format!(
      "point location walk for {p:?} did not terminate"
    )))
  }

  /// Insert a point strictly inside the frame, restoring the empty-circle
  /// property with Lawson flips. Returns the existing index if the point
  /// is already a vertex.
  pub fn insert(&mut self, p: &Point) -> Result<VertIdx, WrapError> {
    let res = match self.locate(p)? {
      Location::OnVertex(f, s) => self.face(f).vert(s),
      Location::InFace(f) => self.split_face(f, p)?,
      Location::OnEdge(e) => self.split_edge(e, p)?,
    };
    // restart later walks near the insertion; the hint itself may be an
    // infinite face when the point landed on a hull edge
    if let Some(f) = self
      .incident_faces(res)
      .into_iter()
      .find(|&f| !self.is_infinite(f))
    {
      self.walk_start = f;
    }
    debug_assert_ok!(self.check_invariant());
    Ok(res)
  }

  fn add_vertex(&mut self, p: Point) -> VertIdx {
    let idx = VertIdx(self.vertices.len());
    self.vertices.push(p);
    self.vertex_face.push(FaceIdx(0)); // fixed by the first set_face
    idx
  }

  fn push_face(&mut self) -> FaceIdx {
    let idx = FaceIdx(self.faces.len());
    self.faces.push(Face {
      vertices: [VertIdx::INFINITE; 3],
      neighbors: [FaceIdx(0); 3],
      label: FaceLabel::Outside,
    });
    idx
  }

  fn set_face(&mut self, f: FaceIdx, face: Face) {
    for v in face.vertices {
      self.vertex_face[v.0] = f;
    }
    self.faces[f.0] = face;
  }

  /// 1-to-3 split of a finite face around an interior point.
  fn split_face(&mut self, f: FaceIdx, p: &Point) -> Result<VertIdx, WrapError> {
    let Face {
      vertices: [v0, v1, v2],
      neighbors: [n0, n1, n2],
      label,
    } = self.faces[f.0].clone();
    let v = self.add_vertex(*p);

    let fa = f;
    let fb = self.push_face();
    let fc = self.push_face();

    self.set_face(
      fa,
      Face {
        vertices: [v, v1, v2],
        neighbors: [n0, fb, fc],
        label,
      },
    );
    self.set_face(
      fb,
      Face {
        vertices: [v, v2, v0],
        neighbors: [n1, fc, fa],
        label,
      },
    );
    self.set_face(
      fc,
      Face {
        vertices: [v, v0, v1],
        neighbors: [n2, fa, fb],
        label,
      },
    );
    // n0 keeps pointing at fa's slot
    self.faces[n1.0].update_neighbor(f, fb)?;
    self.faces[n2.0].update_neighbor(f, fc)?;

    self.legalize(fa, SubIdx(0))?;
    self.legalize(fb, SubIdx(0))?;
    self.legalize(fc, SubIdx(0))?;
    Ok(v)
  }

  /// 2-to-4 split of the two faces sharing the edge the point lands on.
  /// The far face may be infinite (a point landing exactly on a hull
  /// edge); the wiring is purely combinatorial either way.
  fn split_edge(&mut self, e: Edge, p: &Point) -> Result<VertIdx, WrapError> {
    let f = e.face;
    let i = e.sub;
    let mirror = self.mirror_edge(e)?;
    let g = mirror.face;
    let j = mirror.sub;

    let Face {
      vertices: fv,
      neighbors: fn_,
      label: f_label,
    } = self.faces[f.0].clone();
    let Face {
      vertices: gv,
      neighbors: gn,
      label: g_label,
    } = self.faces[g.0].clone();

    let u0 = fv[i.0];
    let u1 = fv[i.ccw().0];
    let u2 = fv[i.cw().0];
    let w0 = gv[j.0];
    debug_assert_eq!(gv[j.ccw().0], u2);
    debug_assert_eq!(gv[j.cw().0], u1);

    let nf1 = fn_[i.ccw().0];
    let nf2 = fn_[i.cw().0];
    let ng1 = gn[j.ccw().0];
    let ng2 = gn[j.cw().0];

    let v = self.add_vertex(*p);
    let fa = f;
    let ga = g;
    let fb = self.push_face();
    let gb = self.push_face();

    self.set_face(
      fa,
      Face {
        vertices: [u0, u1, v],
        neighbors: [gb, fb, nf2],
        label: f_label,
      },
    );
    self.set_face(
      fb,
      Face {
        vertices: [u0, v, u2],
        neighbors: [ga, nf1, fa],
        label: f_label,
      },
    );
    self.set_face(
      ga,
      Face {
        vertices: [w0, u2, v],
        neighbors: [fb, gb, ng2],
        label: g_label,
      },
    );
    self.set_face(
      gb,
      Face {
        vertices: [w0, v, u1],
        neighbors: [fa, ng1, ga],
        label: g_label,
      },
    );
    self.faces[nf1.0].update_neighbor(f, fb)?;
    self.faces[ng1.0].update_neighbor(g, gb)?;

    self.legalize(fa, SubIdx(2))?;
    self.legalize(fb, SubIdx(1))?;
    self.legalize(ga, SubIdx(2))?;
    self.legalize(gb, SubIdx(1))?;
    Ok(v)
  }

  /// Restore the empty-circle property across the edge of `f` opposite
  /// `i`, where `f.vert(i)` is the freshly inserted vertex. Flips
  /// recurse outward; edges against infinite faces bound empty
  /// half-planes and never flip.
  fn legalize(&mut self, f: FaceIdx, i: SubIdx) -> Result<(), WrapError> {
    if self.is_infinite(f) {
      return Ok(());
    }
    let g = self.face(f).neighbor(i);
    if self.is_infinite(g) {
      return Ok(());
    }
    let j = self
      .face(g)
      .neighbor_position(f)
      .ok_or_else(|| WrapError::Logic(format!("{g:?} lost its back-pointer to {f:?}")))?;

    let a = self.face(f).vert(i);
    let c = self.face(f).vert(i.ccw());
    let d = self.face(f).vert(i.cw());
    let w = self.face(g).vert(j);

    let pa = *self.vertex(a);
    let pc = *self.vertex(c);
    let pd = *self.vertex(d);
    let pw = *self.vertex(w);

    // the flip is only valid on a strictly convex quad
    let side_c = Orientation::new(&pa, &pw, &pc);
    let side_d = Orientation::new(&pa, &pw, &pd);
    if side_c.is_colinear() || side_d.is_colinear() || side_c == side_d {
      return Ok(());
    }

    if incircle(pa.to_array(), pc.to_array(), pd.to_array(), pw.to_array()) > 0.0 {
      self.flip(f, i, g, j)?;
      // both replacement faces keep the new vertex at position 0
      self.legalize(f, SubIdx(0))?;
      self.legalize(g, SubIdx(0))?;
    }
    Ok(())
  }

  /// Replace the shared edge `(c, d)` of `f` and `g` by the diagonal
  /// `(a, w)`; the slots of `f` and `g` are reused.
  fn flip(&mut self, f: FaceIdx, i: SubIdx, g: FaceIdx, j: SubIdx) -> Result<(), WrapError> {
    let a = self.face(f).vert(i);
    let c = self.face(f).vert(i.ccw());
    let d = self.face(f).vert(i.cw());
    let w = self.face(g).vert(j);

    let q = self.face(f).neighbor(i.cw()); // across (a, c)
    let p = self.face(f).neighbor(i.ccw()); // across (d, a)
    let r = self.face(g).neighbor(j.ccw()); // across (c, w)
    let s = self.face(g).neighbor(j.cw()); // across (w, d)

    let f_label = self.faces[f.0].label;
    let g_label = self.faces[g.0].label;

    self.set_face(
      f,
      Face {
        vertices: [a, c, w],
        neighbors: [r, g, q],
        label: f_label,
      },
    );
    self.set_face(
      g,
      Face {
        vertices: [a, w, d],
        neighbors: [s, p, f],
        label: g_label,
      },
    );
    self.faces[r.0].update_neighbor(g, f)?;
    self.faces[p.0].update_neighbor(f, g)?;
    Ok(())
  }

  /// Structural soundness: mutual neighbor pointers, matching edge
  /// endpoints, counter-clockwise finite faces.
  pub fn check_invariant(&self) -> Result<(), WrapError> {
    for (fi, face) in self.faces.iter().enumerate() {
      let f = FaceIdx(fi);
      if face.vertices[0] == face.vertices[1]
        || face.vertices[1] == face.vertices[2]
        || face.vertices[0] == face.vertices[2]
      {
        return Err(WrapError::Logic(format!("{f:?} has repeated vertices")));
      }
      for i in 0..3 {
        let e = Edge::new(f, SubIdx(i));
        let mirror = self.mirror_edge(e)?;
        let (u, v) = self.edge_vertices(e);
        let (mu, mv) = self.edge_vertices(mirror);
        if (u, v) != (mv, mu) {
          return Err(WrapError::Logic(format!(
            "edge {e:?} and its mirror disagree on endpoints"
          )));
        }
      }
      if !face.is_infinite() {
        let [v0, v1, v2] = face.vertices;
        if Orientation::new(self.vertex(v0), self.vertex(v1), self.vertex(v2)).is_cw() {
          return Err(WrapError::Logic(format!("{f:?} is clockwise")));
        }
      }
    }
    for (vi, &hint) in self.vertex_face.iter().enumerate() {
      if self.face(hint).position_of(VertIdx(vi)).is_none() {
        return Err(WrapError::Logic(format!(
          "vertex_face hint of v{vi} is not incident"
        )));
      }
    }
    Ok(())
  }
}
