//! Test helpers for assembly integration tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;

pub use audio_generator::{frames, read_wav, render_parts, write_wav, Part};
pub use fakes::{FailingSynthesizer, FakeGenerator, FakeSynthesizer, FakeTranscriber};

use ppp_ae::model::{MusicRule, Segment, SegmentKind, Source, Template, Timing};
use ppp_ae::services::{InMemoryTemplateStore, LocalAssetStore, SpeechSynthesizer};
use ppp_ae::{AssemblyEngine, AssemblyRequest, CleanupOptions, EngineConfig, Services};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Working sample rate of every test engine
pub const RATE: u32 = 8000;

/// Temporary root folder plus an engine wired to fakes
pub struct TestEnv {
    pub dir: TempDir,
    pub templates: Arc<InMemoryTemplateStore>,
    pub generator: Arc<FakeGenerator>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub engine: AssemblyEngine,
}

pub struct TestEnvBuilder {
    config: EngineConfig,
    generator: FakeGenerator,
    synthesizer: FakeSynthesizer,
    failing_synthesizer: Option<FailingSynthesizer>,
    transcriber: FakeTranscriber,
}

impl TestEnvBuilder {
    pub fn configure(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn generator(mut self, generator: FakeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn synthesizer(mut self, synthesizer: FakeSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn failing_synthesizer(mut self, synthesizer: FailingSynthesizer) -> Self {
        self.failing_synthesizer = Some(synthesizer);
        self
    }

    pub fn transcriber(mut self, transcriber: FakeTranscriber) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn build(mut self) -> TestEnv {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        self.config.output_dir = dir.path().join("out");

        let templates = Arc::new(InMemoryTemplateStore::new());
        let generator = Arc::new(self.generator);
        let synthesizer = Arc::new(self.synthesizer);
        let active_synthesizer: Arc<dyn SpeechSynthesizer> = match self.failing_synthesizer {
            Some(failing) => Arc::new(failing),
            None => synthesizer.clone(),
        };

        let services = Services {
            templates: templates.clone(),
            assets: Arc::new(LocalAssetStore::new(dir.path().join("uploads"))),
            generator: generator.clone(),
            synthesizer: active_synthesizer,
            transcriber: Arc::new(self.transcriber),
        };
        let engine = AssemblyEngine::new(self.config, services).unwrap();

        TestEnv {
            dir,
            templates,
            generator,
            synthesizer,
            engine,
        }
    }
}

impl TestEnv {
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder {
            config: EngineConfig {
                sample_rate: RATE,
                channels: 1,
                resolver_workers: 2,
                asset_retry_backoff_ms: 1,
                ..EngineConfig::default()
            },
            generator: FakeGenerator::default(),
            synthesizer: FakeSynthesizer::new(RATE),
            failing_synthesizer: None,
            transcriber: FakeTranscriber::default(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Write a mono WAV into the asset store at the engine's rate
    pub fn upload(&self, name: &str, parts: &[Part]) -> Vec<f32> {
        self.upload_at(name, parts, RATE)
    }

    pub fn upload_at(&self, name: &str, parts: &[Part], sample_rate: u32) -> Vec<f32> {
        let samples = render_parts(parts, sample_rate);
        self.upload_samples(name, &samples, sample_rate);
        samples
    }

    pub fn upload_samples(&self, name: &str, samples: &[f32], sample_rate: u32) {
        write_wav(&self.uploads().join(name), samples, sample_rate).unwrap();
    }

    pub async fn add_template(&self, template: Template) -> Uuid {
        let id = template.id;
        self.templates.insert(template).await.unwrap();
        id
    }

    /// Request with every cleanup switch off
    pub fn request(&self, template_id: Uuid, content: &str, output: &str) -> AssemblyRequest {
        AssemblyRequest {
            template_id,
            main_content_filename: content.to_string(),
            output_filename: output.to_string(),
            cleanup_options: CleanupOptions::none(),
            tts_overrides: HashMap::new(),
        }
    }
}

pub fn template(segments: Vec<Segment>, timing: Timing) -> Template {
    Template {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Test Show".to_string(),
        segments,
        background_music_rules: Vec::new(),
        timing,
    }
}

pub fn timing(content_start_offset_s: f64, outro_start_offset_s: f64) -> Timing {
    Timing {
        content_start_offset_s,
        outro_start_offset_s,
    }
}

pub fn content_segment() -> Segment {
    Segment {
        id: Uuid::new_v4(),
        kind: SegmentKind::Content,
        source: Source::Static {
            filename: String::new(),
        },
    }
}

pub fn static_segment(kind: SegmentKind, filename: &str) -> Segment {
    Segment {
        id: Uuid::new_v4(),
        kind,
        source: Source::Static {
            filename: filename.to_string(),
        },
    }
}

pub fn tts_segment(kind: SegmentKind, script: &str) -> Segment {
    Segment {
        id: Uuid::new_v4(),
        kind,
        source: Source::Tts {
            script: script.to_string(),
            voice_id: "test-voice".to_string(),
        },
    }
}

pub fn ai_segment(kind: SegmentKind, prompt: &str) -> Segment {
    Segment {
        id: Uuid::new_v4(),
        kind,
        source: Source::AiGenerated {
            prompt: prompt.to_string(),
            voice_id: "test-voice".to_string(),
        },
    }
}

pub fn music_rule(
    filename: &str,
    kinds: Vec<SegmentKind>,
    offsets: (f64, f64),
    fades: (f64, f64),
    volume_db: f64,
) -> MusicRule {
    MusicRule {
        id: Uuid::new_v4(),
        music_filename: filename.to_string(),
        apply_to_segments: kinds,
        start_offset_s: offsets.0,
        end_offset_s: offsets.1,
        fade_in_s: fades.0,
        fade_out_s: fades.1,
        volume_db,
    }
}

/// Sample at `seconds` of a mono rendering
pub fn sample_at(samples: &[f32], seconds: f64) -> f32 {
    samples[frames(seconds, RATE)]
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}

pub fn file_names(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
