//! RANSAC over board-sized correspondence sets.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dartboard_core::{Correspondence, Homography, Point2};
use dartboard_registration::{ransac, Model, ProjectiveBoardFit, RansacParams, SampleStrategy};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 80 points on four rings, like the board cross points.
fn rings() -> Vec<Point2<f64>> {
    let mut pts = Vec::with_capacity(80);
    for r in [1.0, 0.94, 0.63, 0.57] {
        for k in 0..20 {
            let a = (9.0 + 18.0 * k as f64).to_radians();
            pts.push(Point2::new(r * a.sin(), -r * a.cos()));
        }
    }
    pts
}

fn scenario(outliers: usize) -> (Vec<Point2<f64>>, Vec<Point2<f64>>, Vec<Correspondence>) {
    let mut rng = StdRng::seed_from_u64(42);
    let template = rings();
    let h = Homography::new(Matrix3::new(0.95, 0.08, 0.02, -0.05, 1.02, -0.03, 0.04, 0.02, 1.0));
    let mut destinations: Vec<_> = template.iter().filter_map(|p| h.apply(p)).collect();
    let mut data: Vec<_> = (0..template.len())
        .map(|i| Correspondence::new(i, i))
        .collect();
    for k in 0..outliers {
        destinations.push(Point2::new(
            rng.random_range(-1.5..1.5),
            rng.random_range(-1.5..1.5),
        ));
        data.push(Correspondence::new(
            rng.random_range(0..template.len()),
            template.len() + k,
        ));
    }
    (template, destinations, data)
}

fn benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("projective_board_fit");

    for outliers in [0usize, 20, 60] {
        let (template, destinations, data) = scenario(outliers);
        let model = ProjectiveBoardFit::new(&template, &destinations);

        group.bench_function(BenchmarkId::new("residuals", outliers), |b| {
            let h = model.build(&data, &[0, 5, 10, 15]);
            let mut out = Vec::new();
            b.iter(|| {
                if let Some(h) = &h {
                    model.residuals(black_box(h), black_box(&data), &mut out);
                }
                black_box(out.len())
            })
        });

        for sampling in [SampleStrategy::WithoutReplacement, SampleStrategy::WithReplacement] {
            let params = RansacParams {
                inlier_threshold: 0.02,
                outlier_ratio: 0.45,
                sampling,
                ..RansacParams::default()
            };
            let id = format!("{outliers}/{sampling:?}");
            group.bench_function(BenchmarkId::new("ransac", id), |b| {
                b.iter(|| {
                    let mut rng = StdRng::seed_from_u64(7);
                    black_box(ransac(&model, black_box(&data), &params, &mut rng))
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
