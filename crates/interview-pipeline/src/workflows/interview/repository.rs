use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{CandidateRecord, CandidateStatus, InterviewDefinition, InterviewId, MediaRef};
use super::media::MediaKind;

/// Read access to employer-owned interview definitions plus the single mutation the pipeline
/// is allowed to make: advancing a candidate's status.
pub trait InterviewRepository: Send + Sync {
    fn fetch(&self, id: &InterviewId) -> Result<Option<InterviewDefinition>, RepositoryError>;

    /// Advance the candidate's status. Implementations must keep transitions monotonic and
    /// return the resulting record.
    fn advance_candidate(
        &self,
        id: &InterviewId,
        email: &str,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> Result<CandidateRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Opaque blob store for recorded answers. Write-once per reference; reads hand out shared
/// immutable buffers so concurrent analyzers can read the same recording.
pub trait MediaStore: Send + Sync {
    fn store(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<MediaRef, MediaStoreError>;
    fn read(&self, media: &MediaRef) -> Result<Arc<[u8]>, MediaStoreError>;
    fn contains(&self, media: &MediaRef) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("media {0} not found")]
    NotFound(MediaRef),
    #[error("media {0} already stored")]
    AlreadyStored(MediaRef),
    #[error("media store unavailable: {0}")]
    Unavailable(String),
}
