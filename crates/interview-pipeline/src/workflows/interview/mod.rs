//! Candidate response pipeline for asynchronous video interviews.
//!
//! A candidate starts a session against an invited interview, submits one recorded answer
//! per question, and completes the session. Each answer is analyzed by the capability pool,
//! annotated with flags from the monitoring telemetry captured while it was recorded, and
//! stored on the session. Completion scores the session and recomputes the interview ranking.

pub mod analysis;
pub mod domain;
pub mod media;
pub mod memory;
pub mod monitoring;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod sessions;

#[cfg(test)]
mod tests;

pub use analysis::{AnalysisFailed, AnalysisStage, AnalyzerSet, ResponseAnalyzerPool};
pub use domain::{
    AnalysisResult, AnswerRecord, BehaviorSummary, CandidateIdentity, CandidateRecord,
    CandidateStatus, InterviewDefinition, InterviewId, InterviewSettings, InterviewSnapshot,
    MediaRef, Question, Sentiment, Session, SessionId, SessionState, SessionView,
};
pub use media::{MediaKind, RejectedUpload, RejectionReason, UploadPolicy};
pub use memory::{InMemoryInterviewRepository, InMemoryMediaStore};
pub use monitoring::{MonitoringPolicy, SignalEvaluator, SignalRule, TelemetrySnapshot};
pub use repository::{InterviewRepository, MediaStore, MediaStoreError, RepositoryError};
pub use router::pipeline_router;
pub use scoring::{RankingBoard, RankingEntry};
pub use service::{
    AnswerSubmission, CompletionReceipt, InterviewPipelineService, InterviewResults,
    PipelineError,
};
pub use sessions::{SessionError, SessionStart, SessionStateMachine};
