use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::scoring::presentation_score;

/// Identifier wrapper for interview definitions owned by the employer side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterviewId(pub String);

/// Identifier wrapper for candidate sessions (`sess-000001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Stable reference handed out by the media store for an uploaded recording.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MediaRef(pub String);

impl fmt::Display for InterviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate e-mails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Re-key an invitee map by normalized e-mail. The first record wins when two keys collide.
pub fn normalize_invitees(
    candidates: impl IntoIterator<Item = (String, CandidateRecord)>,
) -> BTreeMap<String, CandidateRecord> {
    let mut normalized = BTreeMap::new();
    for (email, record) in candidates {
        normalized.entry(normalize_email(&email)).or_insert(record);
    }
    normalized
}

fn deserialize_invitees<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, CandidateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, CandidateRecord>::deserialize(deserializer)?;
    Ok(normalize_invitees(raw))
}

/// A single prompt within an interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<MediaRef>,
    pub max_duration_seconds: u32,
    pub order: u32,
}

/// Employer controlled knobs that shape a candidate session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewSettings {
    pub time_limit_minutes: u32,
    pub allow_retakes: bool,
    pub require_camera_on: bool,
    pub monitor_screen_share: bool,
    pub prevent_copy_paste: bool,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            time_limit_minutes: 30,
            allow_retakes: false,
            require_camera_on: true,
            monitor_screen_share: true,
            prevent_copy_paste: true,
        }
    }
}

/// Progress of an invited candidate. Ordering follows the lifecycle so transitions can be
/// checked with a simple comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Invited,
    Started,
    Completed,
}

impl CandidateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CandidateStatus::Invited => "invited",
            CandidateStatus::Started => "started",
            CandidateStatus::Completed => "completed",
        }
    }
}

/// Invitation bookkeeping for one (interview, candidate) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub status: CandidateStatus,
    pub invited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    pub fn invited(at: DateTime<Utc>) -> Self {
        Self {
            status: CandidateStatus::Invited,
            invited_at: at,
            completed_at: None,
        }
    }

    /// Moves the status forward. Requests that would regress the status are ignored and
    /// reported as `false`.
    pub fn advance(&mut self, status: CandidateStatus, at: DateTime<Utc>) -> bool {
        if status <= self.status {
            return false;
        }
        self.status = status;
        if status == CandidateStatus::Completed {
            self.completed_at = Some(at);
        }
        true
    }
}

/// Interview as authored by the employer. The pipeline only reads questions and settings and
/// advances candidate statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewDefinition {
    pub id: InterviewId,
    pub title: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: InterviewSettings,
    #[serde(default, deserialize_with = "deserialize_invitees")]
    pub candidates: BTreeMap<String, CandidateRecord>,
}

impl InterviewDefinition {
    pub fn new(
        id: InterviewId,
        title: impl Into<String>,
        questions: Vec<Question>,
        settings: InterviewSettings,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            questions,
            settings,
            candidates: BTreeMap::new(),
        }
    }

    pub fn invite(&mut self, email: &str, at: DateTime<Utc>) {
        self.candidates
            .entry(normalize_email(email))
            .or_insert_with(|| CandidateRecord::invited(at));
    }

    pub fn candidate(&self, email: &str) -> Option<&CandidateRecord> {
        self.candidates.get(&normalize_email(email))
    }

    /// Frozen copy handed to a session so later edits never leak into an in-flight attempt.
    pub fn snapshot(&self) -> InterviewSnapshot {
        let mut questions = self.questions.clone();
        questions.sort_by_key(|question| question.order);
        InterviewSnapshot {
            interview_id: self.id.clone(),
            title: self.title.clone(),
            questions,
            settings: self.settings.clone(),
        }
    }
}

/// Questions (in presentation order) and settings captured when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSnapshot {
    pub interview_id: InterviewId,
    pub title: String,
    pub questions: Vec<Question>,
    pub settings: InterviewSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Merged output of the analyzer pool plus telemetry flags for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub confidence: f64,
    pub clarity: f64,
    pub engagement: f64,
    pub authenticity: f64,
    pub technical_accuracy: f64,
    pub transcription: String,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

impl AnalysisResult {
    pub fn sub_scores(&self) -> [f64; 5] {
        [
            self.confidence,
            self.clarity,
            self.engagement,
            self.authenticity,
            self.technical_accuracy,
        ]
    }
}

/// One recorded answer. Written once per question index and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub media_ref: MediaRef,
    pub duration_seconds: u32,
    pub analysis: AnalysisResult,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One candidate's attempt at one interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub candidate: CandidateIdentity,
    pub interview: InterviewSnapshot,
    pub answers: Vec<AnswerRecord>,
    pub overall_score: Option<f64>,
    pub rank: Option<u32>,
    pub completed: bool,
    pub superseded: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn interview_id(&self) -> &InterviewId {
        &self.interview.interview_id
    }

    pub fn question_count(&self) -> usize {
        self.interview.questions.len()
    }

    pub fn has_answer(&self, question_index: usize) -> bool {
        self.answers
            .iter()
            .any(|answer| answer.question_index == question_index)
    }

    pub fn state(&self) -> SessionState {
        if self.completed {
            SessionState::Completed
        } else if self.superseded {
            SessionState::Superseded
        } else {
            SessionState::InProgress
        }
    }

    pub fn behavior_summary(&self) -> BehaviorSummary {
        let mut suspicious_activities = BTreeSet::new();
        let mut flagged_answers = 0;
        for answer in &self.answers {
            if !answer.analysis.flags.is_empty() {
                flagged_answers += 1;
            }
            suspicious_activities.extend(answer.analysis.flags.iter().cloned());
        }
        BehaviorSummary {
            suspicious_activities,
            flagged_answers,
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            interview_id: self.interview_id().clone(),
            candidate_email: self.candidate.email.clone(),
            candidate_name: self.candidate.name.clone(),
            state: self.state().label(),
            answered: self.answers.len(),
            question_count: self.question_count(),
            overall_score: self.overall_score,
            overall_score_pct: self.overall_score.map(presentation_score),
            rank: self.rank,
            started_at: self.started_at,
            completed_at: self.completed_at,
            behavior: self.behavior_summary(),
            answers: self.answers.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed,
    Superseded,
}

impl SessionState {
    pub const fn label(self) -> &'static str {
        match self {
            SessionState::InProgress => "in_progress",
            SessionState::Completed => "completed",
            SessionState::Superseded => "superseded",
        }
    }
}

/// Session-wide roll-up of the telemetry flags raised on individual answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub suspicious_activities: BTreeSet<String>,
    pub flagged_answers: usize,
}

/// Sanitized representation of a session for API responses and employer results.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub interview_id: InterviewId,
    pub candidate_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
    pub state: &'static str,
    pub answered: usize,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub behavior: BehaviorSummary,
    pub answers: Vec<AnswerRecord>,
}
