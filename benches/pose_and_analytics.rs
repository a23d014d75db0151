//! Benchmarks for the pose solver, playback sampling and session analytics
//!
//! Run with: cargo bench

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ridevis_rs::analysis::compute_metrics;
use ridevis_rs::config::{AnalyticsConfig, Dimensions, RiderConfig};
use ridevis_rs::pose;
use ridevis_rs::session::{Frame, PlaybackEngine, Session, SessionConfig};
use ridevis_rs::types::{Stance, TelemetrySample};

/// Carving ride at 30 Hz with some board motion
fn ride(frames: usize) -> Session {
    let frames = (0..frames)
        .map(|i| {
            let phase = i as f64 / 30.0;
            let lean = 15.0 * phase.sin();
            let sample = TelemetrySample::new(
                20.0 + lean.abs(),
                lean,
                5.0 * phase.cos(),
                2.0 * (phase * 3.0).sin(),
                1.5 * (phase * 5.0).cos(),
            )
                .with_slope(4.0 + (phase * 0.1).sin())
                .with_accel(0.5 * (phase * 0.5).sin());
            Frame::new(i as f64 * 1000.0 / 30.0, sample)
        })
        .collect();
    Session::new("bench", Utc::now(), SessionConfig::from(RiderConfig::default()), frames)
        .unwrap_or_else(|e| panic!("bench session: {}", e))
}

fn bench_solve(c: &mut Criterion) {
    let dims = Dimensions::default();
    let mut group = c.benchmark_group("pose_solve");
    group.throughput(Throughput::Elements(1));

    for (name, sample) in [
        ("neutral", TelemetrySample::default()),
        ("deep_carve", TelemetrySample::new(80.0, 25.0, 30.0, 5.0, -3.0)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| pose::solve(black_box(&sample), &dims, Stance::Goofy))
        });
    }

    group.finish();
}

fn bench_playback_sampling(c: &mut Criterion) {
    let session = ride(30 * 60 * 5);
    let mut engine = PlaybackEngine::new();
    let mut rider = RiderConfig::default();
    if let Err(e) = engine.load_session(&session, None, &mut rider) {
        panic!("bench playback: {}", e);
    }
    let duration = session.duration_ms();

    c.bench_function("playback_sample_forward", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t = (t + 16.7) % duration;
            engine.sample_at(black_box(t))
        })
    });
}

fn bench_metrics(c: &mut Criterion) {
    let config = AnalyticsConfig::default();
    let mut group = c.benchmark_group("compute_metrics");

    for minutes in [1usize, 10, 30] {
        let session = ride(30 * 60 * minutes);
        group.throughput(Throughput::Elements(session.frame_count() as u64));
        group.bench_with_input(BenchmarkId::new("minutes", minutes), &session, |b, session| {
            b.iter(|| compute_metrics(black_box(session), &config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solve, bench_playback_sampling, bench_metrics);
criterion_main!(benches);
