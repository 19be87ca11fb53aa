//! Per-answer analysis orchestration.
//!
//! Task graph for one answer:
//!
//! ```text
//! facial ──────────────────────────────────────────────┐
//! extract audio ─► speech ─┬─► authenticity ─┐         ├─► join ─► AnalysisResult
//!                          └─► technical ────┴─ join ──┘
//! ```
//!
//! Every stage runs under the configured deadline. The extracted audio track is released once
//! the speech branch settles, whatever the outcome.

mod artifact;
mod baseline;
mod capabilities;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::domain::{AnalysisResult, MediaRef};
use super::repository::MediaStore;
use artifact::ArtifactGuard;

pub use baseline::{
    BaselineAudioExtractor, BaselineFacialAnalyzer, BaselineSpeechAnalyzer,
    KeywordTechnicalScorer, LexiconAuthenticityAnalyzer,
};
pub use capabilities::{
    AnalysisStage, AudioExtractor, AudioTrack, AuthenticityAnalyzer, AuthenticitySignals,
    CapabilityError, FacialAnalyzer, FacialSignals, SpeechAnalyzer, SpeechSignals,
    TechnicalScorer,
};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// The capabilities the pool drives.
#[derive(Clone)]
pub struct AnalyzerSet {
    pub facial: Arc<dyn FacialAnalyzer>,
    pub audio: Arc<dyn AudioExtractor>,
    pub speech: Arc<dyn SpeechAnalyzer>,
    pub authenticity: Arc<dyn AuthenticityAnalyzer>,
    pub technical: Arc<dyn TechnicalScorer>,
}

impl AnalyzerSet {
    pub fn baseline<M: MediaStore + 'static>(media: Arc<M>) -> Self {
        Self {
            facial: Arc::new(BaselineFacialAnalyzer::new(media.clone())),
            audio: Arc::new(BaselineAudioExtractor::new(media)),
            speech: Arc::new(BaselineSpeechAnalyzer),
            authenticity: Arc::new(LexiconAuthenticityAnalyzer),
            technical: Arc::new(KeywordTechnicalScorer::default()),
        }
    }
}

/// Analysis could not be completed; nothing is recorded and the submission may be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("analysis failed at {stage} stage: {cause}")]
pub struct AnalysisFailed {
    pub stage: AnalysisStage,
    pub cause: CapabilityError,
}

impl AnalysisFailed {
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, CapabilityError::Timeout(_))
    }
}

struct SpokenSignals {
    speech: SpeechSignals,
    authenticity: AuthenticitySignals,
    technical_accuracy: f64,
}

pub struct ResponseAnalyzerPool {
    analyzers: AnalyzerSet,
    stage_timeout: Duration,
}

impl ResponseAnalyzerPool {
    pub fn new(analyzers: AnalyzerSet, stage_timeout: Duration) -> Self {
        Self {
            analyzers,
            stage_timeout,
        }
    }

    /// Run every capability for one recording and merge their output. Flags are left empty for
    /// the caller to fill from telemetry.
    pub async fn analyze(&self, media: &MediaRef) -> Result<AnalysisResult, AnalysisFailed> {
        let started = Instant::now();
        let (facial, spoken) = tokio::join!(
            self.bounded(AnalysisStage::Facial, self.analyzers.facial.analyze(media)),
            self.speech_branch(media),
        );
        let facial = facial?;
        let spoken = spoken?;

        debug!(
            media = %media,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answer analysis finished"
        );

        Ok(AnalysisResult {
            confidence: unit(facial.confidence),
            clarity: unit(spoken.speech.clarity),
            engagement: unit(facial.engagement),
            authenticity: unit(spoken.authenticity.authenticity),
            technical_accuracy: unit(spoken.technical_accuracy),
            transcription: spoken.speech.transcription,
            sentiment: spoken.authenticity.sentiment,
            flags: BTreeSet::new(),
        })
    }

    async fn speech_branch(&self, media: &MediaRef) -> Result<SpokenSignals, AnalysisFailed> {
        let track = self
            .bounded(
                AnalysisStage::AudioExtraction,
                self.analyzers.audio.extract(media),
            )
            .await?;
        let artifact = ArtifactGuard::new(track, self.analyzers.audio.clone());
        let outcome = self.assess_speech(artifact.track()).await;
        artifact.release().await;
        outcome
    }

    async fn assess_speech(&self, track: &AudioTrack) -> Result<SpokenSignals, AnalysisFailed> {
        let speech = self
            .bounded(AnalysisStage::Speech, self.analyzers.speech.transcribe(track))
            .await?;

        let (authenticity, technical_accuracy) = tokio::join!(
            self.bounded(
                AnalysisStage::Authenticity,
                self.analyzers.authenticity.assess(&speech.transcription),
            ),
            self.bounded(
                AnalysisStage::TechnicalAccuracy,
                self.analyzers.technical.score(&speech.transcription),
            ),
        );

        Ok(SpokenSignals {
            authenticity: authenticity?,
            technical_accuracy: technical_accuracy?,
            speech,
        })
    }

    async fn bounded<T, F>(&self, stage: AnalysisStage, call: F) -> Result<T, AnalysisFailed>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let cause = match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(cause)) => cause,
            Err(_) => CapabilityError::Timeout(self.stage_timeout),
        };
        warn!(stage = stage.label(), error = %cause, "analysis stage failed");
        Err(AnalysisFailed { stage, cause })
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
