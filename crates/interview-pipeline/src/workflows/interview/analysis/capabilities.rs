use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::super::domain::{MediaRef, Sentiment};
use super::super::repository::MediaStoreError;

/// Pipeline stage names, in the order failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Facial,
    AudioExtraction,
    Speech,
    Authenticity,
    TechnicalAccuracy,
}

impl AnalysisStage {
    pub const fn label(self) -> &'static str {
        match self {
            AnalysisStage::Facial => "facial",
            AnalysisStage::AudioExtraction => "audio_extraction",
            AnalysisStage::Speech => "speech",
            AnalysisStage::Authenticity => "authenticity",
            AnalysisStage::TechnicalAccuracy => "technical_accuracy",
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("media unavailable: {0}")]
    Media(String),
    #[error("{0}")]
    Failed(String),
}

impl From<MediaStoreError> for CapabilityError {
    fn from(value: MediaStoreError) -> Self {
        CapabilityError::Media(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacialSignals {
    pub confidence: f64,
    pub engagement: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSignals {
    pub clarity: f64,
    pub transcription: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthenticitySignals {
    pub authenticity: f64,
    pub sentiment: Sentiment,
}

/// Intermediate audio extracted from a recording. Only lives for the duration of one analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTrack {
    pub source: MediaRef,
    pub handle: String,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

#[async_trait]
pub trait FacialAnalyzer: Send + Sync {
    async fn analyze(&self, media: &MediaRef) -> Result<FacialSignals, CapabilityError>;
}

/// Produces and releases the transient audio artifact the speech stage consumes.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, media: &MediaRef) -> Result<AudioTrack, CapabilityError>;
    async fn release(&self, track: AudioTrack) -> Result<(), CapabilityError>;
}

#[async_trait]
pub trait SpeechAnalyzer: Send + Sync {
    async fn transcribe(&self, track: &AudioTrack) -> Result<SpeechSignals, CapabilityError>;
}

#[async_trait]
pub trait AuthenticityAnalyzer: Send + Sync {
    async fn assess(&self, transcription: &str) -> Result<AuthenticitySignals, CapabilityError>;
}

#[async_trait]
pub trait TechnicalScorer: Send + Sync {
    async fn score(&self, transcription: &str) -> Result<f64, CapabilityError>;
}
