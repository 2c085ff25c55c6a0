//! Episode Mixdown Performance Benchmark
//!
//! Measures the CPU-bound back half of an assembly run on a 10 minute stereo
//! episode: timeline composition, music layering and the final mixdown.
//!
//! **Goal:** Rendering should take a small fraction of the episode length
//! **Target:** >50x realtime for the full compose + mix + mixdown pass

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ppp_ae::assembly::{AssemblyLog, Compositor, MusicMixer, Renderer};
use ppp_ae::audio::{AudioClip, ResolvedClip};
use ppp_ae::config::RenderConfig;
use ppp_ae::model::{MusicRule, SegmentKind, Timing};
use ppp_common::FadeCurve;
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

const RATE: u32 = 44_100;
const CHANNELS: u16 = 2;
const EPISODE_SECONDS: f64 = 600.0;

fn clip(seconds: f64, level: f32) -> AudioClip {
    let frames = (seconds * RATE as f64) as usize;
    AudioClip::new(vec![level; frames * CHANNELS as usize], RATE, CHANNELS)
}

fn segments() -> Vec<(SegmentKind, ResolvedClip)> {
    vec![
        (SegmentKind::Intro, ResolvedClip::new(Uuid::new_v4(), clip(15.0, 0.2))),
        (SegmentKind::Content, ResolvedClip::new(Uuid::new_v4(), clip(575.0, 0.3))),
        (SegmentKind::Outro, ResolvedClip::new(Uuid::new_v4(), clip(15.0, 0.2))),
    ]
}

fn rules() -> Vec<MusicRule> {
    vec![
        MusicRule {
            id: Uuid::new_v4(),
            music_filename: "theme.wav".to_string(),
            apply_to_segments: vec![SegmentKind::Intro, SegmentKind::Outro],
            start_offset_s: 0.0,
            end_offset_s: 0.0,
            fade_in_s: 2.0,
            fade_out_s: 3.0,
            volume_db: -15.0,
        },
        MusicRule {
            id: Uuid::new_v4(),
            music_filename: "bed.wav".to_string(),
            apply_to_segments: vec![SegmentKind::Content],
            start_offset_s: 5.0,
            end_offset_s: 5.0,
            fade_in_s: 2.0,
            fade_out_s: 2.0,
            volume_db: -30.0,
        },
    ]
}

fn bench_episode_mixdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("episode_mixdown");
    group.sample_size(10);

    let compositor = Compositor::new(RATE, CHANNELS);
    let mixer = MusicMixer::new(RATE, CHANNELS, FadeCurve::EqualPower);
    let renderer = Renderer::new(RenderConfig::default());
    let timing = Timing::default();
    let rules = rules();

    let mut beds = HashMap::new();
    beds.insert("theme.wav".to_string(), clip(20.0, 0.5));
    beds.insert("bed.wav".to_string(), clip(45.0, 0.5));

    group.bench_function("compose_mix_render_10min", |b| {
        b.iter_batched(
            segments,
            |segments| {
                let start = Instant::now();
                let mut log = AssemblyLog::new();

                let timeline = compositor
                    .compose(segments, &timing, &mut log)
                    .expect("compose");
                let layers = mixer.mix(&rules, &timeline.placements, &beds, &mut log);
                let master = renderer.mixdown(timeline.foreground, &layers, &mut log);

                let realtime_factor = EPISODE_SECONDS / start.elapsed().as_secs_f64();
                if realtime_factor < 50.0 {
                    eprintln!(
                        "WARNING: Mixdown speed {:.2}x is below 50x realtime target",
                        realtime_factor
                    );
                }

                black_box(master);
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_music_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("music_layer");

    let mixer = MusicMixer::new(RATE, CHANNELS, FadeCurve::Linear);
    let compositor = Compositor::new(RATE, CHANNELS);
    let mut log = AssemblyLog::new();
    let timeline = compositor
        .compose(segments(), &Timing::default(), &mut log)
        .expect("compose");
    let rules = rules();
    let mut beds = HashMap::new();
    beds.insert("theme.wav".to_string(), clip(20.0, 0.5));
    beds.insert("bed.wav".to_string(), clip(45.0, 0.5));

    group.bench_function("loop_gain_fade", |b| {
        b.iter(|| {
            let mut log = AssemblyLog::new();
            let layers = mixer.mix(black_box(&rules), &timeline.placements, &beds, &mut log);
            black_box(layers);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_episode_mixdown, bench_music_layer);
criterion_main!(benches);
