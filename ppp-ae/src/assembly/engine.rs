//! Assembly entry point
//!
//! [`AssemblyEngine::assemble`] drives one request through the pipeline:
//!
//! ```text
//! template lookup ─┬─ source resolution (concurrent) ─┬─ compose ─ music ─ render/export
//!                  └─ content fetch ─ cleanup ────────┘
//! ```
//!
//! Sources and content cleanup run side by side and share the request's
//! cancellation token; everything after them is a single-threaded pass over
//! buffers owned by the request. Runs share nothing mutable, so one engine
//! can serve concurrent requests.

use crate::assembly::cleanup::{CleanedContent, ContentCleaner};
use crate::assembly::compositor::Compositor;
use crate::assembly::log::{AssemblyLog, Stage};
use crate::assembly::music_mixer::MusicMixer;
use crate::assembly::render::{output_path, Renderer};
use crate::assembly::source_resolver::SourceResolver;
use crate::audio::types::{AudioClip, ResolvedClip};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::{AssemblyRequest, AssemblyResult, EpisodeMetadata, SegmentKind, Template};
use crate::services::asset_store::AssetStore;
use crate::services::speech_synthesis::SpeechSynthesizer;
use crate::services::template_store::TemplateStore;
use crate::services::text_generation::{metadata_prompt, parse_metadata, TextGenerator};
use crate::services::transcription::{transcript_text, Transcriber};
use ppp_common::time::format_timestamp;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// External collaborators of an engine
#[derive(Clone)]
pub struct Services {
    pub templates: Arc<dyn TemplateStore>,
    pub assets: Arc<dyn AssetStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
}

/// Episode assembly engine
pub struct AssemblyEngine {
    config: EngineConfig,
    templates: Arc<dyn TemplateStore>,
    generator: Arc<dyn TextGenerator>,
    transcriber: Arc<dyn Transcriber>,
    resolver: SourceResolver,
    cleaner: ContentCleaner,
    compositor: Compositor,
    mixer: MusicMixer,
    renderer: Renderer,
}

impl AssemblyEngine {
    pub fn new(config: EngineConfig, services: Services) -> Result<Self> {
        if config.sample_rate == 0 || config.channels == 0 {
            return Err(Error::Config(format!(
                "Working format {}Hz/{}ch is invalid",
                config.sample_rate, config.channels
            )));
        }

        let resolver = SourceResolver::new(
            services.assets,
            services.generator.clone(),
            services.synthesizer,
            &config,
        );
        let cleaner = ContentCleaner::new(config.cleanup.clone())?;
        let compositor = Compositor::new(config.sample_rate, config.channels);
        let mixer = MusicMixer::new(config.sample_rate, config.channels, config.render.fade_curve);
        let renderer = Renderer::new(config.render.clone());

        Ok(Self {
            templates: services.templates,
            generator: services.generator,
            transcriber: services.transcriber,
            resolver,
            cleaner,
            compositor,
            mixer,
            renderer,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assemble one episode
    ///
    /// Any error aborts the run and leaves no file at the output path.
    /// Warnings and notes are returned in [`AssemblyResult::log`].
    pub async fn assemble(
        &self,
        request: &AssemblyRequest,
        cancel: &CancellationToken,
    ) -> Result<AssemblyResult> {
        let started = Instant::now();

        if request.main_content_filename.trim().is_empty() {
            return Err(Error::Validation("Main content filename is empty".to_string()));
        }
        let output = output_path(&self.config.output_dir, &request.output_filename)?;

        let template = self.templates.load(request.template_id).await?;
        template.validate()?;

        info!(
            template_id = %template.id,
            template = %template.name,
            content = %request.main_content_filename,
            "Assembling episode"
        );

        let mut log = AssemblyLog::new();

        let sources = self
            .resolver
            .resolve_all(&template.segments, &request.tts_overrides, cancel);
        let content = self.prepare_content(request, cancel);
        let ((clips, source_log), cleaned) = tokio::try_join!(sources, content)?;

        log.append(cleaned.log);
        log.append(source_log);

        check_cancelled(cancel)?;
        let segments = arrange(&template, clips, cleaned.clip)?;
        let timeline = self.compositor.compose(segments, &template.timing, &mut log)?;

        let beds = self.load_music_beds(&template, cancel).await?;
        check_cancelled(cancel)?;
        let layers = self.mixer.mix(
            &template.background_music_rules,
            &timeline.placements,
            &beds,
            &mut log,
        );

        let master = self.renderer.mixdown(timeline.foreground, &layers, &mut log);
        check_cancelled(cancel)?;
        self.renderer.export(&master, &output)?;

        let duration_s = master.duration_seconds();
        log.info(
            Stage::Render,
            format!(
                "Episode rendered to {} ({})",
                output.display(),
                format_timestamp(duration_s)
            ),
        );

        info!(
            output = %output.display(),
            duration_s,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assembly complete"
        );

        Ok(AssemblyResult {
            output_path: output,
            duration_s,
            log: log.into_lines(),
        })
    }

    /// Suggest a title and summary for an episode file in the asset store
    pub async fn generate_metadata(
        &self,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<EpisodeMetadata> {
        let clip = cancellable(cancel, self.resolver.load_asset(filename)).await?;

        let timeout = self.config.transcription_timeout();
        let words = cancellable(cancel, async {
            tokio::time::timeout(timeout, self.transcriber.transcribe(&clip))
                .await
                .map_err(|_| Error::Transcription(format!("Timed out after {}s", timeout.as_secs())))?
        })
        .await?;

        let transcript = transcript_text(&words);
        if transcript.trim().is_empty() {
            return Err(Error::Transcription(format!("No speech found in '{}'", filename)));
        }

        let timeout = self.config.generation_timeout();
        let reply = cancellable(cancel, async {
            tokio::time::timeout(timeout, self.generator.generate(&metadata_prompt(&transcript)))
                .await
                .map_err(|_| Error::ScriptGeneration(format!("Timed out after {}s", timeout.as_secs())))?
        })
        .await?;

        let metadata = parse_metadata(&reply)?;
        info!(file = filename, title = %metadata.title, "Episode metadata generated");
        Ok(metadata)
    }

    /// Fetch the main recording and clean it
    async fn prepare_content(
        &self,
        request: &AssemblyRequest,
        cancel: &CancellationToken,
    ) -> Result<CleanedContent> {
        let raw = cancellable(cancel, self.resolver.load_asset(&request.main_content_filename)).await?;
        debug!(
            frames = raw.frames(),
            duration_s = raw.duration_seconds(),
            "Main content loaded"
        );

        self.cleaner
            .clean(
                raw,
                &request.cleanup_options,
                self.transcriber.as_ref(),
                self.config.transcription_timeout(),
                cancel,
            )
            .await
    }

    /// Decoded beds for every rule that targets a placed segment type
    ///
    /// Missing files are left out; the mixer warns and skips their rules.
    async fn load_music_beds(
        &self,
        template: &Template,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, AudioClip>> {
        let kinds: HashSet<SegmentKind> = template.segments.iter().map(|s| s.kind).collect();
        let mut beds = HashMap::new();

        for rule in &template.background_music_rules {
            if beds.contains_key(&rule.music_filename)
                || !rule.apply_to_segments.iter().any(|k| kinds.contains(k))
            {
                continue;
            }

            match cancellable(cancel, self.resolver.load_asset(&rule.music_filename)).await {
                Ok(clip) => {
                    beds.insert(rule.music_filename.clone(), clip);
                }
                Err(Error::AssetNotFound(name)) => {
                    debug!(music = %name, "Music bed missing");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(beds)
    }
}

/// Template-ordered clips with the cleaned content at the anchor
fn arrange(
    template: &Template,
    clips: Vec<ResolvedClip>,
    content: AudioClip,
) -> Result<Vec<(SegmentKind, ResolvedClip)>> {
    let mut by_id: HashMap<Uuid, ResolvedClip> =
        clips.into_iter().map(|c| (c.segment_id, c)).collect();
    let mut content = Some(content);

    template
        .segments
        .iter()
        .map(|segment| {
            let clip = if segment.kind == SegmentKind::Content {
                content
                    .take()
                    .map(|clip| ResolvedClip::new(segment.id, clip))
            } else {
                by_id.remove(&segment.id)
            };

            clip.map(|c| (segment.kind, c)).ok_or_else(|| {
                Error::Validation(format!("Segment {} has no resolved audio", segment.id))
            })
        })
        .collect()
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
