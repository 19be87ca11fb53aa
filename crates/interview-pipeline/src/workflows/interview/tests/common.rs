use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::workflows::interview::analysis::{
    AnalysisStage, AnalyzerSet, AudioExtractor, AudioTrack, AuthenticityAnalyzer,
    AuthenticitySignals, CapabilityError, FacialAnalyzer, FacialSignals, SpeechAnalyzer,
    SpeechSignals, TechnicalScorer,
};
use crate::workflows::interview::domain::{
    InterviewDefinition, InterviewId, InterviewSettings, MediaRef, Question, Sentiment,
};
use crate::workflows::interview::media::MediaKind;
use crate::workflows::interview::memory::{InMemoryInterviewRepository, InMemoryMediaStore};
use crate::workflows::interview::monitoring::{
    AudioObservation, MonitoringPolicy, ScreenObservation, SignalEvaluator, SystemEvents,
    TelemetrySnapshot, WebcamObservation,
};
use crate::workflows::interview::repository::MediaStore;
use crate::workflows::interview::service::{AnswerSubmission, InterviewPipelineService};

pub(super) const INTERVIEW: &str = "int-backend";
pub(super) const ADA: &str = "ada@example.com";
pub(super) const GRACE: &str = "grace@example.com";
pub(super) const OUTSIDER: &str = "mallory@example.com";

pub(super) fn interview_id() -> InterviewId {
    InterviewId(INTERVIEW.to_string())
}

pub(super) fn questions(count: usize) -> Vec<Question> {
    (0..count)
        .map(|index| Question {
            text: format!("Question {}", index + 1),
            media_ref: None,
            max_duration_seconds: 120,
            order: index as u32 + 1,
        })
        .collect()
}

/// Interview with `question_count` questions and the given invitees.
pub(super) fn interview(
    question_count: usize,
    settings: InterviewSettings,
    invitees: &[&str],
) -> InterviewDefinition {
    let mut definition = InterviewDefinition::new(
        interview_id(),
        "Backend Engineer",
        questions(question_count),
        settings,
    );
    let invited_at = Utc
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    for invitee in invitees {
        definition.invite(invitee, invited_at);
    }
    definition
}

pub(super) fn retakes_allowed() -> InterviewSettings {
    InterviewSettings {
        allow_retakes: true,
        ..InterviewSettings::default()
    }
}

pub(super) fn pipeline_config(analysis_timeout: Duration) -> PipelineConfig {
    PipelineConfig {
        analysis_timeout,
        max_upload_bytes: 1024,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Event {
    Started(AnalysisStage),
    Finished(AnalysisStage),
}

/// Capability double implementing every analysis trait.
///
/// Each recording gets one uniform score (default 0.5) that every sub-score reports, so the
/// expected answer score is the scripted value. The transcript is the media reference, which
/// lets the transcript-based stages find the score again.
#[derive(Default)]
pub(super) struct ScriptedCapabilities {
    scores: Mutex<HashMap<String, f64>>,
    delays: Mutex<HashMap<AnalysisStage, Duration>>,
    failures: Mutex<Vec<AnalysisStage>>,
    events: Mutex<Vec<Event>>,
    calls: Mutex<HashMap<AnalysisStage, usize>>,
    live_artifacts: AtomicUsize,
    released: AtomicUsize,
}

impl ScriptedCapabilities {
    pub(super) fn score(&self, media: &MediaRef, score: f64) {
        self.scores
            .lock()
            .expect("scores mutex")
            .insert(media.0.clone(), score);
    }

    pub(super) fn delay(&self, stage: AnalysisStage, delay: Duration) {
        self.delays.lock().expect("delays mutex").insert(stage, delay);
    }

    pub(super) fn fail(&self, stage: AnalysisStage) {
        self.failures.lock().expect("failures mutex").push(stage);
    }

    pub(super) fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events mutex").clone()
    }

    pub(super) fn calls(&self, stage: AnalysisStage) -> usize {
        self.calls
            .lock()
            .expect("calls mutex")
            .get(&stage)
            .copied()
            .unwrap_or(0)
    }

    pub(super) fn live_artifacts(&self) -> usize {
        self.live_artifacts.load(Ordering::SeqCst)
    }

    pub(super) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub(super) fn analyzers(self: &Arc<Self>) -> AnalyzerSet {
        AnalyzerSet {
            facial: self.clone(),
            audio: self.clone(),
            speech: self.clone(),
            authenticity: self.clone(),
            technical: self.clone(),
        }
    }

    fn score_for(&self, key: &str) -> f64 {
        self.scores
            .lock()
            .expect("scores mutex")
            .get(key)
            .copied()
            .unwrap_or(0.5)
    }

    async fn run_stage(&self, stage: AnalysisStage) -> Result<(), CapabilityError> {
        self.events
            .lock()
            .expect("events mutex")
            .push(Event::Started(stage));
        *self
            .calls
            .lock()
            .expect("calls mutex")
            .entry(stage)
            .or_default() += 1;

        let delay = self.delays.lock().expect("delays mutex").get(&stage).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.events
            .lock()
            .expect("events mutex")
            .push(Event::Finished(stage));
        if self.failures.lock().expect("failures mutex").contains(&stage) {
            return Err(CapabilityError::Failed(format!("{stage} capability offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl FacialAnalyzer for ScriptedCapabilities {
    async fn analyze(&self, media: &MediaRef) -> Result<FacialSignals, CapabilityError> {
        self.run_stage(AnalysisStage::Facial).await?;
        let score = self.score_for(&media.0);
        Ok(FacialSignals {
            confidence: score,
            engagement: score,
        })
    }
}

#[async_trait]
impl AudioExtractor for ScriptedCapabilities {
    async fn extract(&self, media: &MediaRef) -> Result<AudioTrack, CapabilityError> {
        self.run_stage(AnalysisStage::AudioExtraction).await?;
        self.live_artifacts.fetch_add(1, Ordering::SeqCst);
        Ok(AudioTrack {
            source: media.clone(),
            handle: format!("{}.pcm", media.0),
            sample_rate: 16_000,
            samples: vec![0; 16],
        })
    }

    async fn release(&self, _track: AudioTrack) -> Result<(), CapabilityError> {
        self.live_artifacts.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SpeechAnalyzer for ScriptedCapabilities {
    async fn transcribe(&self, track: &AudioTrack) -> Result<SpeechSignals, CapabilityError> {
        self.run_stage(AnalysisStage::Speech).await?;
        Ok(SpeechSignals {
            clarity: self.score_for(&track.source.0),
            transcription: track.source.0.clone(),
        })
    }
}

#[async_trait]
impl AuthenticityAnalyzer for ScriptedCapabilities {
    async fn assess(&self, transcription: &str) -> Result<AuthenticitySignals, CapabilityError> {
        self.run_stage(AnalysisStage::Authenticity).await?;
        Ok(AuthenticitySignals {
            authenticity: self.score_for(transcription),
            sentiment: Sentiment::Positive,
        })
    }
}

#[async_trait]
impl TechnicalScorer for ScriptedCapabilities {
    async fn score(&self, transcription: &str) -> Result<f64, CapabilityError> {
        self.run_stage(AnalysisStage::TechnicalAccuracy).await?;
        Ok(self.score_for(transcription))
    }
}

pub(super) type TestService =
    InterviewPipelineService<InMemoryInterviewRepository, InMemoryMediaStore>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<InMemoryInterviewRepository>,
    pub(super) media: Arc<InMemoryMediaStore>,
    pub(super) capabilities: Arc<ScriptedCapabilities>,
}

impl Harness {
    pub(super) fn new(definition: InterviewDefinition) -> Self {
        Self::with_timeout(definition, Duration::from_secs(5))
    }

    pub(super) fn with_timeout(
        definition: InterviewDefinition,
        analysis_timeout: Duration,
    ) -> Self {
        let repository = Arc::new(InMemoryInterviewRepository::with_interviews([definition]));
        let media = Arc::new(InMemoryMediaStore::default());
        let capabilities = Arc::new(ScriptedCapabilities::default());
        let service = InterviewPipelineService::with_components(
            repository.clone(),
            media.clone(),
            capabilities.analyzers(),
            SignalEvaluator::standard(&MonitoringPolicy::default()),
            &pipeline_config(analysis_timeout),
        );
        Self {
            service: Arc::new(service),
            repository,
            media,
            capabilities,
        }
    }

    /// Store a recording whose analysis yields `score` for every sub-score.
    pub(super) fn recording(&self, score: f64) -> MediaRef {
        let media = self
            .media
            .store(vec![1, 2, 3, 4], MediaKind::Mp4)
            .expect("media stored");
        self.capabilities.score(&media, score);
        media
    }

    pub(super) fn submission(&self, question_index: usize, score: f64) -> AnswerSubmission {
        AnswerSubmission {
            question_index,
            media_ref: self.recording(score),
            duration_seconds: 45,
            telemetry: None,
        }
    }
}

/// Telemetry that raises no standard flag.
pub(super) fn clean_telemetry() -> TelemetrySnapshot {
    TelemetrySnapshot {
        screen: ScreenObservation {
            observed_at: None,
            active_window: "Interview - Backend Engineer".to_string(),
            tab_changes: 0,
        },
        webcam: WebcamObservation {
            observed_at: None,
            face_visible: true,
            multiple_faces: false,
            looking_away: false,
            speaking: true,
        },
        audio: AudioObservation {
            observed_at: None,
            background_noise: 0.1,
            multiple_speakers: false,
            sudden_changes: false,
        },
        system: SystemEvents {
            observed_at: None,
            clipboard_access: false,
            keyboard_shortcuts: Vec::new(),
            browser_actions: Vec::new(),
        },
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
