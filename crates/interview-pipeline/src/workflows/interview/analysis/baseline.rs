//! Deterministic heuristic capabilities used when no model-backed analyzers are configured.
//!
//! They derive stable signals from the stored recording bytes and the transcript so the
//! pipeline can run end to end; they make no claim to measure the candidate.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::super::domain::{MediaRef, Sentiment};
use super::super::repository::MediaStore;
use super::capabilities::{
    AudioExtractor, AudioTrack, AuthenticityAnalyzer, AuthenticitySignals, CapabilityError,
    FacialAnalyzer, FacialSignals, SpeechAnalyzer, SpeechSignals, TechnicalScorer,
};

const SAMPLE_RATE: u32 = 16_000;

const POSITIVE_WORDS: &[&str] = &[
    "achieved", "built", "delivered", "enjoy", "excited", "great", "improved", "learned",
    "passionate", "proud", "solved", "success",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "blame", "failed", "frustrated", "hate", "impossible", "never", "problem", "stuck",
    "terrible", "unfortunately", "worst",
];

fn fingerprint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub struct BaselineFacialAnalyzer<M> {
    media: Arc<M>,
}

impl<M> BaselineFacialAnalyzer<M> {
    pub fn new(media: Arc<M>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl<M: MediaStore + 'static> FacialAnalyzer for BaselineFacialAnalyzer<M> {
    async fn analyze(&self, media: &MediaRef) -> Result<FacialSignals, CapabilityError> {
        let bytes = self.media.read(media)?;
        let digest = fingerprint(&bytes);
        Ok(FacialSignals {
            confidence: 0.55 + (digest % 41) as f64 / 100.0,
            engagement: 0.50 + ((digest >> 16) % 46) as f64 / 100.0,
        })
    }
}

/// Decodes the recording into 16-bit samples held in memory and tracks how many tracks are
/// still outstanding.
pub struct BaselineAudioExtractor<M> {
    media: Arc<M>,
    sequence: AtomicU64,
    live: AtomicUsize,
}

impl<M> BaselineAudioExtractor<M> {
    pub fn new(media: Arc<M>) -> Self {
        Self {
            media,
            sequence: AtomicU64::new(0),
            live: AtomicUsize::new(0),
        }
    }

    pub fn live_artifacts(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<M: MediaStore + 'static> AudioExtractor for BaselineAudioExtractor<M> {
    async fn extract(&self, media: &MediaRef) -> Result<AudioTrack, CapabilityError> {
        let bytes = self.media.read(media)?;
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(AudioTrack {
            source: media.clone(),
            handle: format!("audio-{id:06}.pcm"),
            sample_rate: SAMPLE_RATE,
            samples,
        })
    }

    async fn release(&self, _track: AudioTrack) -> Result<(), CapabilityError> {
        self.live.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Clarity falls as sample-to-sample jitter rises. No speech-to-text is available, so the
/// transcript only describes what was captured.
#[derive(Debug, Default)]
pub struct BaselineSpeechAnalyzer;

#[async_trait]
impl SpeechAnalyzer for BaselineSpeechAnalyzer {
    async fn transcribe(&self, track: &AudioTrack) -> Result<SpeechSignals, CapabilityError> {
        if track.samples.len() < 2 {
            return Ok(SpeechSignals {
                clarity: 0.0,
                transcription: String::new(),
            });
        }

        let jitter: f64 = track
            .samples
            .windows(2)
            .map(|pair| (f64::from(pair[1]) - f64::from(pair[0])).abs())
            .sum::<f64>()
            / (track.samples.len() - 1) as f64;
        let clarity = 1.0 - (jitter / f64::from(u16::MAX)).min(1.0);
        let seconds = track.samples.len() as f64 / f64::from(track.sample_rate.max(1));

        Ok(SpeechSignals {
            clarity,
            transcription: format!("{seconds:.1} seconds of audio captured from {}", track.source),
        })
    }
}

/// Sentiment from a small lexicon; authenticity from lexical variety.
#[derive(Debug, Default)]
pub struct LexiconAuthenticityAnalyzer;

#[async_trait]
impl AuthenticityAnalyzer for LexiconAuthenticityAnalyzer {
    async fn assess(&self, transcription: &str) -> Result<AuthenticitySignals, CapabilityError> {
        let words = words(transcription);
        if words.is_empty() {
            return Ok(AuthenticitySignals {
                authenticity: 0.5,
                sentiment: Sentiment::Neutral,
            });
        }

        let positive = words
            .iter()
            .filter(|word| POSITIVE_WORDS.contains(&word.as_str()))
            .count();
        let negative = words
            .iter()
            .filter(|word| NEGATIVE_WORDS.contains(&word.as_str()))
            .count();
        let sentiment = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        };

        let distinct: BTreeSet<&String> = words.iter().collect();
        let variety = distinct.len() as f64 / words.len() as f64;

        Ok(AuthenticitySignals {
            authenticity: 0.4 + 0.6 * variety,
            sentiment,
        })
    }
}

/// Scores a transcript by how many distinct domain keywords it mentions.
#[derive(Debug)]
pub struct KeywordTechnicalScorer {
    keywords: Vec<String>,
}

impl KeywordTechnicalScorer {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordTechnicalScorer {
    fn default() -> Self {
        Self::new([
            "api",
            "architecture",
            "data",
            "debug",
            "deploy",
            "design",
            "performance",
            "scalable",
            "security",
            "test",
        ])
    }
}

#[async_trait]
impl TechnicalScorer for KeywordTechnicalScorer {
    async fn score(&self, transcription: &str) -> Result<f64, CapabilityError> {
        let words: BTreeSet<String> = words(transcription).into_iter().collect();
        let hits = self
            .keywords
            .iter()
            .filter(|keyword| words.contains(*keyword))
            .count();
        Ok((0.5 + 0.1 * hits as f64).min(1.0))
    }
}
