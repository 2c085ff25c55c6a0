//! Source resolution
//!
//! Turns each non-content segment's declared [`Source`] into audio at the
//! working format. All segments of a request resolve concurrently with a
//! bounded worker count and share one cancellation token; the first failure
//! cancels the rest and is returned.

use crate::assembly::log::{AssemblyLog, Stage};
use crate::audio::decoder::SimpleDecoder;
use crate::audio::types::{AudioClip, ResolvedClip};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::{Segment, SegmentKind, Source};
use crate::services::asset_store::AssetStore;
use crate::services::retry::fetch_with_retry;
use crate::services::speech_synthesis::{SpeechSynthesizer, SynthesizedAudio};
use crate::services::text_generation::TextGenerator;
use futures::stream::{self, StreamExt, TryStreamExt};
use ppp_common::time::format_timestamp;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Resolver tuning taken from [`EngineConfig`]
#[derive(Debug, Clone)]
struct ResolverSettings {
    sample_rate: u32,
    channels: u16,
    workers: usize,
    generation_timeout: Duration,
    synthesis_timeout: Duration,
    fetch_attempts: u32,
    fetch_backoff: Duration,
    ai_cache_dir: Option<PathBuf>,
}

impl From<&EngineConfig> for ResolverSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            workers: config.resolver_workers.max(1),
            generation_timeout: config.generation_timeout(),
            synthesis_timeout: config.synthesis_timeout(),
            fetch_attempts: config.asset_fetch_attempts,
            fetch_backoff: Duration::from_millis(config.asset_retry_backoff_ms),
            ai_cache_dir: config.ai_cache_dir.clone(),
        }
    }
}

/// Resolves segment sources into clips
pub struct SourceResolver {
    assets: Arc<dyn AssetStore>,
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: ResolverSettings,
}

impl SourceResolver {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            assets,
            generator,
            synthesizer,
            settings: ResolverSettings::from(config),
        }
    }

    /// Resolve every non-content segment, in declaration order
    ///
    /// Runs at most `resolver_workers` resolutions at a time. The first
    /// error wins: remaining work is dropped and no partial clips are
    /// returned. Firing `cancel` aborts in-flight calls with
    /// [`Error::Cancelled`].
    pub async fn resolve_all(
        &self,
        segments: &[Segment],
        tts_overrides: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ResolvedClip>, AssemblyLog)> {
        let mut log = AssemblyLog::new();
        self.check_overrides(segments, tts_overrides, &mut log);

        let targets: Vec<&Segment> = segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Content)
            .collect();

        info!(
            segments = targets.len(),
            workers = self.settings.workers,
            "Resolving segment sources"
        );

        let token = cancel.child_token();

        let outcome: Result<Vec<(usize, ResolvedClip, AssemblyLog)>> =
            stream::iter(targets.into_iter().enumerate())
                .map(|(index, segment)| {
                    let token = token.clone();
                    async move {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => Err(Error::Cancelled),
                            result = self.resolve(segment, tts_overrides) => {
                                result.map(|(clip, notes)| (index, clip, notes))
                            }
                        }
                    }
                })
                .buffer_unordered(self.settings.workers)
                .try_collect()
                .await;

        let mut resolved = match outcome {
            Ok(resolved) => resolved,
            Err(e) => {
                token.cancel();
                tracing::warn!(error = %e, "Source resolution aborted");
                return Err(e);
            }
        };

        resolved.sort_by_key(|(index, _, _)| *index);

        let clips = resolved
            .into_iter()
            .map(|(_, clip, notes)| {
                log.append(notes);
                clip
            })
            .collect();

        Ok((clips, log))
    }

    /// Resolve one non-content segment
    pub async fn resolve(
        &self,
        segment: &Segment,
        tts_overrides: &HashMap<String, String>,
    ) -> Result<(ResolvedClip, AssemblyLog)> {
        let mut notes = AssemblyLog::new();

        let clip = match &segment.source {
            Source::Static { filename } => {
                let clip = self.load_asset(filename).await?;
                notes.info(
                    Stage::Sources,
                    format!(
                        "{} segment {}: static '{}' ({})",
                        segment.kind,
                        segment.id,
                        filename,
                        format_timestamp(clip.duration_seconds())
                    ),
                );
                clip
            }
            Source::AiGenerated { prompt, voice_id } => {
                let script = self.generate_script(prompt).await?;
                let audio = self.synthesize(&script, voice_id).await?;
                self.cache_ai_segment(segment.id, &audio, &mut notes).await;
                let clip = self.decode(audio.bytes, Some(audio.format)).await?;
                notes.info(
                    Stage::Sources,
                    format!(
                        "{} segment {}: AI script of {} words ({})",
                        segment.kind,
                        segment.id,
                        script.split_whitespace().count(),
                        format_timestamp(clip.duration_seconds())
                    ),
                );
                clip
            }
            Source::Tts { script, voice_id } => {
                let overridden = tts_overrides.get(&segment.id.to_string());
                let text = overridden.unwrap_or(script);
                let audio = self.synthesize(text, voice_id).await?;
                let clip = self.decode(audio.bytes, Some(audio.format)).await?;
                notes.info(
                    Stage::Sources,
                    format!(
                        "{} segment {}: TTS{} ({})",
                        segment.kind,
                        segment.id,
                        if overridden.is_some() { " with override script" } else { "" },
                        format_timestamp(clip.duration_seconds())
                    ),
                );
                clip
            }
        };

        debug!(segment_id = %segment.id, source = segment.source.label(), frames = clip.frames(), "Segment resolved");
        Ok((ResolvedClip::new(segment.id, clip), notes))
    }

    /// Fetch, decode and conform an asset
    pub async fn load_asset(&self, filename: &str) -> Result<AudioClip> {
        let bytes = fetch_with_retry(
            self.assets.as_ref(),
            filename,
            self.settings.fetch_attempts,
            self.settings.fetch_backoff,
        )
        .await?;

        let hint = SimpleDecoder::extension_hint(filename).map(str::to_string);
        self.decode(bytes, hint).await
    }

    /// Decode off the async runtime and convert to the working format
    async fn decode(&self, bytes: Vec<u8>, hint: Option<String>) -> Result<AudioClip> {
        let (rate, channels) = (self.settings.sample_rate, self.settings.channels);

        tokio::task::spawn_blocking(move || {
            SimpleDecoder::decode_bytes(bytes, hint.as_deref())?.conform(rate, channels)
        })
        .await
        .map_err(|e| Error::Decode(format!("Decode task failed: {}", e)))?
    }

    async fn generate_script(&self, prompt: &str) -> Result<String> {
        let timeout = self.settings.generation_timeout;
        let script = tokio::time::timeout(timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| Error::ScriptGeneration(format!("Timed out after {}s", timeout.as_secs())))??;

        if script.trim().is_empty() {
            return Err(Error::ScriptGeneration(
                "Generator returned an empty script".to_string(),
            ));
        }
        Ok(script)
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(Error::Synthesis("Nothing to synthesize: empty script".to_string()));
        }

        let timeout = self.settings.synthesis_timeout;
        tokio::time::timeout(timeout, self.synthesizer.synthesize(text, voice_id))
            .await
            .map_err(|_| Error::Synthesis(format!("Timed out after {}s", timeout.as_secs())))?
    }

    /// Keep a copy of synthesized AI audio; failure only logs
    async fn cache_ai_segment(&self, segment_id: Uuid, audio: &SynthesizedAudio, notes: &mut AssemblyLog) {
        let Some(dir) = &self.settings.ai_cache_dir else {
            return;
        };

        let path = dir.join(format!("{}.{}", segment_id, audio.format));
        let write = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &audio.bytes).await
        };

        match write.await {
            Ok(()) => debug!(path = %path.display(), "AI segment cached"),
            Err(e) => notes.error(
                Stage::Sources,
                format!("Could not cache AI segment {} at {}: {}", segment_id, path.display(), e),
            ),
        }
    }

    /// Warn about override keys that name no TTS segment
    fn check_overrides(
        &self,
        segments: &[Segment],
        tts_overrides: &HashMap<String, String>,
        log: &mut AssemblyLog,
    ) {
        let mut keys: Vec<&String> = tts_overrides.keys().collect();
        keys.sort();

        for key in keys {
            let targets_tts = segments.iter().any(|s| {
                s.id.to_string() == *key && matches!(s.source, Source::Tts { .. }) && s.kind != SegmentKind::Content
            });
            if !targets_tts {
                log.warn(
                    Stage::Sources,
                    format!("TTS override for '{}' ignored: no TTS segment with that id", key),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoder::{encode_wav, WavFormat};
    use crate::model::template::DEFAULT_VOICE_ID;
    use crate::services::asset_store::AssetError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const RATE: u32 = 8000;

    fn wav(seconds: f64) -> Vec<u8> {
        let frames = (seconds * RATE as f64) as usize;
        encode_wav(&AudioClip::new(vec![0.25; frames], RATE, 1), WavFormat::Float32).unwrap()
    }

    struct MapStore(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl AssetStore for MapStore {
        async fn fetch(&self, filename: &str) -> std::result::Result<Vec<u8>, AssetError> {
            self.0
                .get(filename)
                .cloned()
                .ok_or_else(|| AssetError::NotFound(filename.to_string()))
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("Script for {}", prompt))
        }
    }

    /// 0.1s of audio per word; records every request
    #[derive(Default)]
    struct WordSynth {
        requests: Mutex<Vec<(String, String)>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for WordSynth {
        async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SynthesizedAudio> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            self.requests
                .lock()
                .unwrap()
                .push((text.to_string(), voice_id.to_string()));
            Ok(SynthesizedAudio {
                bytes: wav(0.1 * text.split_whitespace().count() as f64),
                format: "wav".to_string(),
            })
        }
    }

    struct HangingSynth;

    #[async_trait]
    impl SpeechSynthesizer for HangingSynth {
        async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<SynthesizedAudio> {
            std::future::pending().await
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: RATE,
            channels: 1,
            resolver_workers: 2,
            asset_retry_backoff_ms: 1,
            ..EngineConfig::default()
        }
    }

    fn resolver(synth: Arc<dyn SpeechSynthesizer>, config: &EngineConfig) -> SourceResolver {
        let mut assets = HashMap::new();
        assets.insert("jingle.wav".to_string(), wav(1.5));
        SourceResolver::new(Arc::new(MapStore(assets)), Arc::new(EchoGenerator), synth, config)
    }

    fn segment(kind: SegmentKind, source: Source) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            kind,
            source,
        }
    }

    fn tts(script: &str) -> Source {
        Source::Tts {
            script: script.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolves_all_sources_in_order() {
        let synth = Arc::new(WordSynth::default());
        let resolver = resolver(synth.clone(), &config());
        let segments = vec![
            segment(SegmentKind::Intro, Source::Static { filename: "jingle.wav".to_string() }),
            segment(
                SegmentKind::Intro,
                Source::AiGenerated {
                    prompt: "the news".to_string(),
                    voice_id: "v2".to_string(),
                },
            ),
            segment(SegmentKind::Content, Source::Static { filename: String::new() }),
            segment(SegmentKind::Outro, tts("Thanks for listening")),
        ];

        let (clips, log) = resolver
            .resolve_all(&segments, &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(clips.len(), 3);
        assert_eq!(clips[0].segment_id, segments[0].id);
        assert_eq!(clips[1].segment_id, segments[1].id);
        assert_eq!(clips[2].segment_id, segments[3].id);
        assert_eq!(clips[0].clip.frames(), 12000);
        // "Script for the news" = 4 words
        assert_eq!(clips[1].clip.frames(), 3200);
        assert_eq!(clips[2].clip.frames(), 2400);
        assert_eq!(log.entries().len(), 3);

        let requests = synth.requests.lock().unwrap();
        assert!(requests.contains(&("Script for the news".to_string(), "v2".to_string())));
    }

    #[tokio::test]
    async fn test_tts_override_replaces_script() {
        let synth = Arc::new(WordSynth::default());
        let resolver = resolver(synth.clone(), &config());
        let outro = segment(SegmentKind::Outro, tts("Stored script here"));

        let mut overrides = HashMap::new();
        overrides.insert(outro.id.to_string(), "Bye".to_string());
        overrides.insert("not-a-segment".to_string(), "x".to_string());

        let (clips, log) = resolver
            .resolve_all(&[outro], &overrides, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(clips[0].clip.frames(), 800);
        assert_eq!(synth.requests.lock().unwrap()[0].0, "Bye");
        assert_eq!(log.warnings().count(), 1);
    }

    #[tokio::test]
    async fn test_override_ignored_for_static_segment() {
        let synth = Arc::new(WordSynth::default());
        let resolver = resolver(synth.clone(), &config());
        let intro = segment(SegmentKind::Intro, Source::Static { filename: "jingle.wav".to_string() });

        let mut overrides = HashMap::new();
        overrides.insert(intro.id.to_string(), "Hello".to_string());

        let (clips, log) = resolver
            .resolve_all(&[intro], &overrides, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(clips[0].clip.frames(), 12000);
        assert_eq!(log.warnings().count(), 1);
        assert!(synth.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_asset_fails_request() {
        let resolver = resolver(Arc::new(WordSynth::default()), &config());
        let segments = vec![
            segment(SegmentKind::Intro, tts("one two")),
            segment(SegmentKind::Intro, Source::Static { filename: "nope.wav".to_string() }),
        ];

        let result = resolver
            .resolve_all(&segments, &HashMap::new(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::AssetNotFound(ref f)) if f == "nope.wav"));
    }

    #[tokio::test]
    async fn test_worker_bound_respected() {
        let synth = Arc::new(WordSynth::default());
        let resolver = resolver(synth.clone(), &config());
        let segments: Vec<Segment> = (0..6)
            .map(|_| segment(SegmentKind::Intro, tts("a b")))
            .collect();

        resolver
            .resolve_all(&segments, &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(synth.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(synth.requests.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_synthesis_timeout_is_fatal() {
        let mut config = config();
        config.synthesis_timeout_s = 0;
        let resolver = resolver(Arc::new(HangingSynth), &config);

        let result = resolver
            .resolve_all(
                &[segment(SegmentKind::Outro, tts("hello"))],
                &HashMap::new(),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(Error::Synthesis(ref m)) if m.contains("Timed out")));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight() {
        let resolver = resolver(Arc::new(HangingSynth), &config());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = resolver
            .resolve_all(
                &[segment(SegmentKind::Outro, tts("hello"))],
                &HashMap::new(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_empty_tts_script_is_synthesis_error() {
        let resolver = resolver(Arc::new(WordSynth::default()), &config());
        let result = resolver
            .resolve_all(
                &[segment(SegmentKind::Outro, tts("  "))],
                &HashMap::new(),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(Error::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_ai_cache_failure_is_logged_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let mut config = config();
        config.ai_cache_dir = Some(blocker);
        let resolver = resolver(Arc::new(WordSynth::default()), &config);

        let ai = segment(
            SegmentKind::Intro,
            Source::AiGenerated {
                prompt: "x".to_string(),
                voice_id: "v".to_string(),
            },
        );
        let (clips, log) = resolver
            .resolve_all(&[ai], &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(clips.len(), 1);
        assert!(log.into_lines().iter().any(|l| l.starts_with("ERROR: Could not cache")));
    }

    #[tokio::test]
    async fn test_ai_cache_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config();
        config.ai_cache_dir = Some(dir.path().join("ai_segments"));
        let resolver = resolver(Arc::new(WordSynth::default()), &config);

        let ai = segment(
            SegmentKind::Intro,
            Source::AiGenerated {
                prompt: "x".to_string(),
                voice_id: "v".to_string(),
            },
        );
        resolver
            .resolve_all(&[ai.clone()], &HashMap::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(dir.path().join("ai_segments").join(format!("{}.wav", ai.id)).exists());
    }
}
