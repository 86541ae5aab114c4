use criterion::{criterion_group, criterion_main, Criterion};

use alpha_wrap_2d::data::Point;
use alpha_wrap_2d::oracle::PointOracle;
use alpha_wrap_2d::wrap::{AlphaWrap, NullSink, WrapConfig};

fn ring(n: usize, radius: f64) -> Vec<Point> {
  (0..n)
    .map(|i| {
      let phi = std::f64::consts::TAU * i as f64 / n as f64;
      Point::new(radius * phi.cos(), radius * phi.sin())
    })
    .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
  let oracle_small = PointOracle::from_points(ring(50, 5.0));
  let oracle_large = PointOracle::from_points(ring(200, 5.0));

  c.bench_function("wrap ring(50)", |b| {
    b.iter(|| {
      let mut config = WrapConfig::new(1.0, 0.2);
      config.max_iterations = 100_000;
      let mut aw = AlphaWrap::new(&oracle_small, config).unwrap();
      aw.run(&mut NullSink).unwrap();
      aw.wrap_segments().len()
    })
  });
  c.bench_function("wrap ring(200)", |b| {
    b.iter(|| {
      let mut config = WrapConfig::new(1.0, 0.2);
      config.max_iterations = 100_000;
      let mut aw = AlphaWrap::new(&oracle_large, config).unwrap();
      aw.run(&mut NullSink).unwrap();
      aw.wrap_segments().len()
    })
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
