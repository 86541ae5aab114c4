mod scenarios {
  use std::collections::HashMap;

  use alpha_wrap_2d::data::Point;
  use alpha_wrap_2d::oracle::PointOracle;
  use alpha_wrap_2d::triangulation::{FaceLabel, Location};
  use alpha_wrap_2d::wrap::{
    AlphaWrap, NullSink, RunOutcome, Traversability, WrapConfig,
  };

  use rand::rngs::SmallRng;
  use rand::{Rng, SeedableRng};

  fn config(alpha: f64, offset: f64) -> WrapConfig {
    let mut config = WrapConfig::new(alpha, offset);
    // the scenario assertions below need complete runs
    config.max_iterations = 200_000;
    config
  }

  fn completed_wrap<'a>(oracle: &'a PointOracle, config: WrapConfig) -> AlphaWrap<'a> {
    let mut aw = AlphaWrap::new(oracle, config).expect("valid config");
    let outcome = aw.run(&mut NullSink).expect("run succeeds");
    assert_eq!(outcome, RunOutcome::Completed);
    aw
  }

  /// Every input point lies in (or on the boundary of) an INSIDE face.
  fn assert_contained(aw: &AlphaWrap, points: &[Point]) {
    let dt = aw.triangulation();
    for p in points {
      match dt.locate(p).expect("input point is inside the frame") {
        Location::InFace(f) => {
          assert_eq!(dt.label(f), FaceLabel::Inside, "point {p:?} not enclosed");
        }
        Location::OnEdge(e) => {
          let g = dt.face(e.face).neighbor(e.sub);
          assert!(
            dt.label(e.face) == FaceLabel::Inside || dt.label(g) == FaceLabel::Inside,
            "point {p:?} not enclosed"
          );
        }
        Location::OnVertex(..) => {}
      }
    }
  }

  /// The extracted wrap is exactly the set of finite label-changing edges.
  fn assert_extraction_matches_labels(aw: &AlphaWrap) {
    let dt = aw.triangulation();
    let expected = dt
      .edges()
      .filter(|&e| {
        dt.is_finite_edge(e) && dt.label(e.face) != dt.label(dt.face(e.face).neighbor(e.sub))
      })
      .count();
    assert_eq!(aw.wrap_segments().len(), expected);
  }

  /// Wrap vertices sit on (strict) or within (loose) the offset surface.
  fn assert_on_offset_surface(aw: &AlphaWrap, offset: f64, strict: bool) {
    for seg in aw.wrap_segments() {
      for p in [seg.src, seg.dst] {
        let d = aw.oracle().squared_distance(&p).sqrt();
        assert!(
          d <= offset + 1e-6,
          "wrap vertex {p:?} is {d} away from the point set"
        );
        if strict {
          assert!(
            d >= offset - 1e-6,
            "wrap vertex {p:?} is {d} away from the point set"
          );
        }
      }
    }
  }

  fn endpoint_key(p: &Point) -> (u64, u64) {
    (p.x.to_bits(), p.y.to_bits())
  }

  /// Every wrap vertex has even degree: the wrap is a union of closed
  /// curves.
  fn assert_closed(aw: &AlphaWrap) {
    let mut degree: HashMap<(u64, u64), usize> = HashMap::new();
    for seg in aw.wrap_segments() {
      *degree.entry(endpoint_key(&seg.src)).or_default() += 1;
      *degree.entry(endpoint_key(&seg.dst)).or_default() += 1;
    }
    for (key, deg) in degree {
      assert!(deg >= 2 && deg % 2 == 0, "vertex {key:?} has degree {deg}");
    }
  }

  /// Number of connected components of the wrap graph.
  fn component_count(aw: &AlphaWrap) -> usize {
    let segments = aw.wrap_segments();
    let mut ids: HashMap<(u64, u64), usize> = HashMap::new();
    for seg in segments {
      let next = ids.len();
      ids.entry(endpoint_key(&seg.src)).or_insert(next);
      let next = ids.len();
      ids.entry(endpoint_key(&seg.dst)).or_insert(next);
    }
    let mut parent: Vec<usize> = (0..ids.len()).collect();
    fn find(parent: &mut [usize], i: usize) -> usize {
      if parent[i] != i {
        let up = parent[i];
        let root = find(parent, up);
        parent[i] = root;
      }
      parent[i]
    }
    for seg in segments {
      let a = ids[&endpoint_key(&seg.src)];
      let b = ids[&endpoint_key(&seg.dst)];
      let ra = find(&mut parent, a);
      let rb = find(&mut parent, b);
      parent[ra] = rb;
    }
    let mut roots: Vec<usize> = (0..parent.len()).map(|i| find(&mut parent, i)).collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
  }

  fn inside_area(aw: &AlphaWrap) -> f64 {
    let dt = aw.triangulation();
    dt.finite_faces()
      .filter(|&f| dt.label(f) == FaceLabel::Inside)
      .map(|f| {
        let t = dt.face_triangle(f);
        let [a, b, c] = t.0;
        ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)) / 2.0
      })
      .sum()
  }

  #[test]
  fn empty_input_produces_nothing() {
    let oracle = PointOracle::from_points(vec![]);
    let aw = completed_wrap(&oracle, config(1.0, 0.1));
    assert_eq!(aw.wrap_segments().len(), 0);
    assert_eq!(aw.statistics().execution.n_iterations, 0);
    assert_eq!(aw.traversable_gates_remaining().unwrap(), 0);
  }

  #[test]
  fn single_point_is_enclosed() {
    let points = vec![Point::new(0.0, 0.0)];
    let oracle = PointOracle::from_points(points.clone());
    let aw = completed_wrap(&oracle, config(1.0, 0.1));

    // with alpha far above the frame scale nothing is carved and the wrap
    // is the frame itself, whose corners sit at sqrt(2) * offset
    assert!(aw.wrap_segments().len() >= 3);
    for seg in aw.wrap_segments() {
      for p in [seg.src, seg.dst] {
        let d = p.squared_distance(&points[0]).sqrt();
        assert!(d <= 0.1 * 1.5, "wrap vertex {p:?} too far from the point");
      }
    }
    assert_contained(&aw, &points);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(aw.traversable_gates_remaining().unwrap(), 0);
  }

  #[test]
  fn square_corners_are_wrapped() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(10.0, 0.0),
      Point::new(10.0, 10.0),
      Point::new(0.0, 10.0),
    ];
    let oracle = PointOracle::from_points(points.clone());
    let aw = completed_wrap(&oracle, config(3.0, 0.5));

    assert!(aw.wrap_segments().len() >= 3);
    assert_contained(&aw, &points);
    // corner disks are far apart, so every wrap vertex lies exactly on
    // the offset surface
    assert_on_offset_surface(&aw, 0.5, true);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(aw.traversable_gates_remaining().unwrap(), 0);
  }

  fn two_clusters() -> Vec<Point> {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut points = Vec::new();
    for center_x in [0.0, 100.0] {
      for _ in 0..50 {
        let r = rng.gen_range(0.0..1.0f64).sqrt();
        let phi = rng.gen_range(0.0..std::f64::consts::TAU);
        points.push(Point::new(center_x + r * phi.cos(), r * phi.sin()));
      }
    }
    points
  }

  #[test]
  fn far_clusters_get_disjoint_wraps() {
    let points = two_clusters();
    let oracle = PointOracle::from_points(points.clone());
    let aw = completed_wrap(&oracle, config(5.0, 0.5));

    assert_contained(&aw, &points);
    assert_on_offset_surface(&aw, 0.5, false);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(component_count(&aw), 2);
  }

  #[test]
  fn collinear_points_get_a_single_elongated_wrap() {
    let points: Vec<Point> = (0..100).map(|i| Point::new(i as f64, 0.0)).collect();
    let oracle = PointOracle::from_points(points.clone());
    let aw = completed_wrap(&oracle, config(2.0, 0.3));

    assert_contained(&aw, &points);
    // disks along the line are disjoint: wrap vertices are exactly on
    // the offset surface, so the band is offset wide on each side
    assert_on_offset_surface(&aw, 0.3, true);
    for seg in aw.wrap_segments() {
      for p in [seg.src, seg.dst] {
        assert!(p.y.abs() <= 0.3 + 1e-6);
        assert!((-0.3 - 1e-6..=99.3 + 1e-6).contains(&p.x));
      }
    }
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(component_count(&aw), 1);
  }

  /// ~200 points on a 280-degree arc of radius 8; the mouth opens toward
  /// positive x.
  fn c_shape() -> Vec<Point> {
    (0..200)
      .map(|i| {
        let deg = 40.0 + 280.0 * i as f64 / 199.0;
        let rad = deg.to_radians();
        Point::new(8.0 * rad.cos(), 8.0 * rad.sin())
      })
      .collect()
  }

  #[test]
  fn constant_alpha_enters_the_concavity() {
    let points = c_shape();
    let oracle = PointOracle::from_points(points.clone());
    let aw = completed_wrap(&oracle, config(2.0, 0.3));

    assert_contained(&aw, &points);
    assert_on_offset_surface(&aw, 0.3, false);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);

    // the alpha ball fits through the mouth, so the cavity center ends up
    // outside the wrap
    let dt = aw.triangulation();
    match dt.locate(&Point::new(0.0, 0.0)).unwrap() {
      Location::InFace(f) => assert_eq!(dt.label(f), FaceLabel::Outside),
      other => panic!("unexpected location {other:?}"),
    }
  }

  #[test]
  fn intersection_based_policy_wraps_the_same_shape() {
    let points = c_shape();
    let oracle = PointOracle::from_points(points.clone());
    let mut config = config(2.0, 0.3);
    config.traversability = Traversability::IntersectionBased {
      tolerance_factor: 0.005,
    };
    let aw = completed_wrap(&oracle, config);

    assert!(!aw.wrap_segments().is_empty());
    assert_contained(&aw, &points);
    assert_on_offset_surface(&aw, 0.3, false);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(aw.traversable_gates_remaining().unwrap(), 0);
  }

  #[test]
  fn deviation_based_policy_wraps_the_square() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(10.0, 0.0),
      Point::new(10.0, 10.0),
      Point::new(0.0, 10.0),
    ];
    let oracle = PointOracle::from_points(points.clone());
    let mut config = config(3.0, 0.5);
    config.traversability = Traversability::DeviationBased {
      alpha_max: 0.2,
      point_threshold: 5,
      deviation_factor: 0.05,
    };
    let aw = completed_wrap(&oracle, config);

    assert_contained(&aw, &points);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
    assert_eq!(aw.traversable_gates_remaining().unwrap(), 0);
  }

  #[test]
  fn modified_min_ball_variant_completes() {
    let points = vec![
      Point::new(0.0, 0.0),
      Point::new(10.0, 0.0),
      Point::new(10.0, 10.0),
      Point::new(0.0, 10.0),
      Point::new(5.0, 4.0),
    ];
    let oracle = PointOracle::from_points(points.clone());
    let mut config = config(3.0, 0.5);
    config.modified_min_ball = true;
    let aw = completed_wrap(&oracle, config);

    assert_contained(&aw, &points);
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
  }

  #[test]
  fn rerun_is_deterministic() {
    let points = two_clusters();
    let oracle = PointOracle::from_points(points);

    let aw1 = completed_wrap(&oracle, config(5.0, 0.5));
    let aw2 = completed_wrap(&oracle, config(5.0, 0.5));

    assert_eq!(aw1.wrap_segments(), aw2.wrap_segments());
    assert_eq!(
      aw1.statistics().execution.n_iterations,
      aw2.statistics().execution.n_iterations
    );
    assert_eq!(
      aw1.statistics().execution.n_rule_1,
      aw2.statistics().execution.n_rule_1
    );
    assert_eq!(
      aw1.triangulation().num_vertices(),
      aw2.triangulation().num_vertices()
    );
  }

  #[test]
  fn iteration_cap_leaves_consistent_state() {
    let points = c_shape();
    let oracle = PointOracle::from_points(points);
    let mut config = config(2.0, 0.3);
    config.max_iterations = 25;
    let mut aw = AlphaWrap::new(&oracle, config).unwrap();
    let outcome = aw.run(&mut NullSink).unwrap();

    assert_eq!(outcome, RunOutcome::IterationCapReached);
    assert_eq!(aw.statistics().execution.n_iterations, 25);
    // a partial labeling is still a valid wrap
    assert_extraction_matches_labels(&aw);
    assert_closed(&aw);
  }

  mod properties {
    use super::*;
    use proptest::prelude::*;
    use test_strategy::proptest;

    #[proptest(cases = 16)]
    fn larger_alpha_never_shrinks_the_enclosed_area(
      #[strategy(proptest::collection::vec((0.0..10.0f64, 0.0..10.0f64), 5..25))] pts: Vec<(
        f64,
        f64,
      )>,
    ) {
      let points: Vec<Point> = pts.iter().map(|&p| Point::from(p)).collect();
      let oracle = PointOracle::from_points(points);

      let small = completed_wrap(&oracle, config(0.4, 0.25));
      let large = completed_wrap(&oracle, config(4.0, 0.25));

      // a larger alpha admits fewer gates, carves less and can only keep
      // more area inside
      prop_assert!(inside_area(&large) >= inside_area(&small) - 1e-6);
    }

    #[proptest(cases = 16)]
    fn steiner_points_stay_within_the_offset_surface(
      #[strategy(proptest::collection::vec((0.0..10.0f64, 0.0..10.0f64), 3..20))] pts: Vec<(
        f64,
        f64,
      )>,
      #[strategy(0.1..0.5f64)] offset: f64,
    ) {
      let mut points: Vec<Point> = pts.iter().map(|&p| Point::from(p)).collect();
      // anchor the bbox so the frame gates are always wide enough to carve
      points.push(Point::new(0.0, 0.0));
      points.push(Point::new(10.0, 10.0));
      let oracle = PointOracle::from_points(points.clone());
      let aw = completed_wrap(&oracle, config(1.0, offset));

      for seg in aw.wrap_segments() {
        for p in [seg.src, seg.dst] {
          let d = aw.oracle().squared_distance(&p).sqrt();
          prop_assert!(d <= offset + 1e-6);
        }
      }
      assert_contained(&aw, &points);
      assert_extraction_matches_labels(&aw);
    }
  }
}
