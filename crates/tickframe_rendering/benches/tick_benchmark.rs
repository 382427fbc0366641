//! # Logic Tick Benchmark
//!
//! A full tick against the headless backend: submit every draw, settle,
//! render the sub-frames and advance. Measured for a static scene (every
//! mesh reused) and an animated one (every mesh staged and blended).

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickframe_rendering::{EngineConfig, FrameEngine, HeadlessBackend};
use tickframe_shared::Matrix4;

const FLOATS_PER_VERTEX: usize = 7;
const TRIANGLES_PER_DRAW: u32 = 32;

#[allow(clippy::cast_precision_loss)]
fn draw_buffer(phase: f32) -> Vec<f32> {
    let vertices = TRIANGLES_PER_DRAW as usize * 3;
    (0..vertices)
        .flat_map(|v| {
            let x = v as f32 * 0.25 + phase;
            [x, (v % 7) as f32, 0.0, 1.0, 0.0, 1.0, 0.0]
        })
        .collect()
}

fn engine() -> FrameEngine<HeadlessBackend> {
    let config = EngineConfig {
        target_fps: 60,
        ..EngineConfig::default()
    };
    FrameEngine::new(HeadlessBackend::new(), config).expect("default config is valid")
}

#[allow(clippy::cast_precision_loss)]
fn run_tick(engine: &mut FrameEngine<HeadlessBackend>, buffers: &[Vec<f32>]) {
    engine.begin_frame();
    engine.set_camera_perspective(45.0, 1.0, 10_000.0, true);
    engine.set_camera_matrix(Matrix4::translation(0.0, 0.0, -100.0));
    engine.bind_shader(0);
    for (uid, buffer) in (1_u32..).zip(buffers) {
        let transform = Matrix4::translation(uid as f32, 0.0, 0.0);
        engine.draw_triangles_persp(black_box(buffer), TRIANGLES_PER_DRAW, &transform, false, uid);
    }
    black_box(engine.end_frame());
    engine.backend_mut().take_frames();
}

fn bench_static_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_static");

    for draws in [16_usize, 128, 512] {
        let buffers: Vec<Vec<f32>> = (0..draws).map(|_| draw_buffer(0.0)).collect();
        let mut engine = engine();
        run_tick(&mut engine, &buffers);

        group.throughput(Throughput::Elements(draws as u64));
        group.bench_with_input(BenchmarkId::new("reused", draws), &buffers, |b, buffers| {
            b.iter(|| run_tick(&mut engine, buffers));
        });
    }

    group.finish();
}

fn bench_animated_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_animated");

    for draws in [16_usize, 128, 512] {
        let even: Vec<Vec<f32>> = (0..draws).map(|_| draw_buffer(0.0)).collect();
        let odd: Vec<Vec<f32>> = (0..draws).map(|_| draw_buffer(0.5)).collect();
        let mut engine = engine();
        run_tick(&mut engine, &even);

        group.throughput(Throughput::Elements(draws as u64));
        group.bench_function(BenchmarkId::new("staged", draws), |b| {
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                run_tick(&mut engine, if flip { &odd } else { &even });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_static_scene, bench_animated_scene);
criterion_main!(benches);
