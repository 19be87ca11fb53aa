use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::analysis::{AnalysisFailed, AnalyzerSet, ResponseAnalyzerPool};
use super::domain::{
    AnswerRecord, InterviewDefinition, InterviewId, MediaRef, Session, SessionId, SessionView,
};
use super::media::{RejectedUpload, RejectionReason, UploadPolicy};
use super::monitoring::{MonitoringPolicy, SignalEvaluator, SignalScope, TelemetrySnapshot};
use super::repository::{InterviewRepository, MediaStore, MediaStoreError, RepositoryError};
use super::scoring::{presentation_score, rank_sessions, RankingBoard, RankingEntry};
use super::sessions::{SessionError, SessionStart, SessionStateMachine};
use crate::config::PipelineConfig;

/// One recorded answer as submitted by the candidate's client.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question_index: usize,
    pub media_ref: MediaRef,
    pub duration_seconds: u32,
    pub telemetry: Option<TelemetrySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReceipt {
    pub session_id: SessionId,
    pub overall_score: f64,
    pub overall_score_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// Employer-facing results: the ranking plus every completed attempt with its behavior summary.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewResults {
    pub interview_id: InterviewId,
    pub title: String,
    pub ranking: Vec<RankingEntry>,
    pub sessions: Vec<SessionView>,
}

/// Coordinator sequencing session transitions, answer analysis, telemetry evaluation, and
/// ranking.
pub struct InterviewPipelineService<R, M> {
    sessions: Arc<SessionStateMachine<R>>,
    analyzers: Arc<ResponseAnalyzerPool>,
    signals: Arc<SignalEvaluator>,
    rankings: Arc<RankingBoard>,
    media: Arc<M>,
    uploads: UploadPolicy,
}

impl<R, M> InterviewPipelineService<R, M>
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    /// Service backed by the baseline capabilities and the standard monitoring rules.
    pub fn new(interviews: Arc<R>, media: Arc<M>, config: &PipelineConfig) -> Self {
        let analyzers = AnalyzerSet::baseline(media.clone());
        let signals = SignalEvaluator::standard(&MonitoringPolicy::default());
        Self::with_components(interviews, media, analyzers, signals, config)
    }

    pub fn with_components(
        interviews: Arc<R>,
        media: Arc<M>,
        analyzers: AnalyzerSet,
        signals: SignalEvaluator,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionStateMachine::new(interviews)),
            analyzers: Arc::new(ResponseAnalyzerPool::new(
                analyzers,
                config.analysis_timeout,
            )),
            signals: Arc::new(signals),
            rankings: Arc::new(RankingBoard::new()),
            media,
            uploads: UploadPolicy::new(config.max_upload_bytes),
        }
    }

    pub fn upload_limit(&self) -> usize {
        self.uploads.max_bytes
    }

    pub fn start_session(
        &self,
        interview_id: &InterviewId,
        candidate_email: &str,
        candidate_name: Option<String>,
    ) -> Result<SessionStart, PipelineError> {
        Ok(self
            .sessions
            .start(interview_id, candidate_email, candidate_name)?)
    }

    /// Validate and store a recording, returning the reference answers are submitted with.
    pub fn upload_media(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaRef, PipelineError> {
        let kind = self.uploads.validate(content_type, bytes.len())?;
        let size = bytes.len();
        let media = self.media.store(bytes, kind)?;
        info!(media = %media, size, kind = kind.extension(), "recording stored");
        Ok(media)
    }

    /// Analyze one answer and record it. The session permit is held until the record is
    /// written, so submissions for the same session are processed one at a time in arrival
    /// order. Nothing is recorded when analysis fails.
    pub async fn submit_answer(
        &self,
        session_id: &SessionId,
        submission: AnswerSubmission,
    ) -> Result<AnswerRecord, PipelineError> {
        let permit = self.sessions.acquire(session_id).await?;
        let context = self
            .sessions
            .answer_context(&permit, submission.question_index)?;

        if !self.media.contains(&submission.media_ref) {
            return Err(RejectedUpload::new(RejectionReason::UnknownMedia(
                submission.media_ref.0.clone(),
            ))
            .into());
        }

        let mut analysis = self.analyzers.analyze(&submission.media_ref).await?;
        if let Some(telemetry) = submission.telemetry.as_ref() {
            let scope = SignalScope::from_settings(&context.settings);
            analysis.flags = self.signals.evaluate_scoped(telemetry, &scope);
        }

        let record = AnswerRecord {
            question_index: submission.question_index,
            media_ref: submission.media_ref,
            duration_seconds: submission.duration_seconds,
            analysis,
            recorded_at: Utc::now(),
        };
        self.sessions.record_answer(&permit, record.clone())?;
        Ok(record)
    }

    /// Close the session and recompute the interview ranking.
    pub async fn complete_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CompletionReceipt, PipelineError> {
        let permit = self.sessions.acquire(session_id).await?;
        let completed = self.sessions.complete(&permit)?;
        drop(permit);

        self.rankings.note_completion(&completed.interview_id);
        let entries = self.recompute_ranking(&completed.interview_id);
        let rank = entries
            .iter()
            .find(|entry| entry.session_id == completed.session_id)
            .map(|entry| entry.rank);

        Ok(CompletionReceipt {
            session_id: completed.session_id,
            overall_score: completed.overall_score,
            overall_score_pct: presentation_score(completed.overall_score),
            rank,
        })
    }

    fn recompute_ranking(&self, interview_id: &InterviewId) -> Vec<RankingEntry> {
        loop {
            let epoch = self.rankings.epoch(interview_id);
            let entries = rank_sessions(self.sessions.ranking_candidates(interview_id));
            match self.rankings.commit(interview_id, epoch, entries, |committed| {
                self.sessions.apply_ranks(interview_id, committed)
            }) {
                Ok(committed) => {
                    info!(
                        interview_id = %interview_id,
                        epoch,
                        ranked = committed.len(),
                        "ranking committed"
                    );
                    return committed;
                }
                Err(conflict) => debug!(error = %conflict, "ranking recompute raced, retrying"),
            }
        }
    }

    pub fn ranking(&self, interview_id: &InterviewId) -> Result<Vec<RankingEntry>, PipelineError> {
        self.interview(interview_id)?;
        Ok(self.rankings.standings(interview_id))
    }

    pub fn session(&self, session_id: &SessionId) -> Result<Session, PipelineError> {
        Ok(self.sessions.session(session_id)?)
    }

    /// Completed sessions ordered by rank. Attempts that no longer count (earlier completions
    /// of a retaking candidate) follow the ranked ones, most recent first.
    pub fn results(&self, interview_id: &InterviewId) -> Result<InterviewResults, PipelineError> {
        let interview = self.interview(interview_id)?;
        let mut sessions: Vec<Session> = self
            .sessions
            .sessions_for(interview_id)
            .into_iter()
            .filter(|session| session.completed)
            .collect();
        sessions.sort_by(|left, right| match (left.rank, right.rank) {
            (Some(l), Some(r)) => l
                .cmp(&r)
                .then_with(|| left.completed_at.cmp(&right.completed_at))
                .then_with(|| left.id.cmp(&right.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => right.completed_at.cmp(&left.completed_at),
        });

        Ok(InterviewResults {
            interview_id: interview.id,
            title: interview.title,
            ranking: self.rankings.standings(interview_id),
            sessions: sessions.iter().map(Session::view).collect(),
        })
    }

    fn interview(&self, interview_id: &InterviewId) -> Result<InterviewDefinition, PipelineError> {
        self.sessions
            .interviews()
            .fetch(interview_id)?
            .ok_or_else(|| SessionError::UnknownInterview(interview_id.clone()).into())
    }
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Rejected(#[from] RejectedUpload),
    #[error(transparent)]
    Analysis(#[from] AnalysisFailed),
    #[error(transparent)]
    Media(#[from] MediaStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PipelineError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Analysis(_) | PipelineError::Rejected(_))
    }
}
