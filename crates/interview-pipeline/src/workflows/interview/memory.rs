//! In-process implementations of the interview and media collaborators, used by the API
//! binary and by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::domain::{
    normalize_email, normalize_invitees, CandidateRecord, CandidateStatus, InterviewDefinition,
    InterviewId, MediaRef,
};
use super::media::MediaKind;
use super::repository::{InterviewRepository, MediaStore, MediaStoreError, RepositoryError};

#[derive(Default, Clone)]
pub struct InMemoryInterviewRepository {
    records: Arc<Mutex<HashMap<InterviewId, InterviewDefinition>>>,
}

impl InMemoryInterviewRepository {
    pub fn with_interviews(interviews: impl IntoIterator<Item = InterviewDefinition>) -> Self {
        let repository = Self::default();
        for interview in interviews {
            repository.upsert(interview);
        }
        repository
    }

    /// Stand-in for the employer-side CRUD surface.
    pub fn upsert(&self, mut interview: InterviewDefinition) {
        interview.candidates = normalize_invitees(std::mem::take(&mut interview.candidates));
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(interview.id.clone(), interview);
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InterviewRepository for InMemoryInterviewRepository {
    fn fetch(&self, id: &InterviewId) -> Result<Option<InterviewDefinition>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    fn advance_candidate(
        &self,
        id: &InterviewId,
        email: &str,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> Result<CandidateRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        let record = guard
            .get_mut(id)
            .and_then(|interview| interview.candidates.get_mut(&normalize_email(email)))
            .ok_or(RepositoryError::NotFound)?;
        record.advance(status, at);
        Ok(record.clone())
    }
}

/// Write-once blob store keeping recordings in memory.
#[derive(Default)]
pub struct InMemoryMediaStore {
    blobs: Mutex<HashMap<MediaRef, Arc<[u8]>>>,
    sequence: AtomicU64,
}

impl InMemoryMediaStore {
    /// Seed a blob under a caller-chosen reference.
    pub fn insert(&self, media: MediaRef, bytes: Vec<u8>) -> Result<(), MediaStoreError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| MediaStoreError::Unavailable("media mutex poisoned".to_string()))?;
        if guard.contains_key(&media) {
            return Err(MediaStoreError::AlreadyStored(media));
        }
        guard.insert(media, Arc::from(bytes));
        Ok(())
    }
}

impl MediaStore for InMemoryMediaStore {
    fn store(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<MediaRef, MediaStoreError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let media = MediaRef(format!("media-{id:06}.{}", kind.extension()));
        self.insert(media.clone(), bytes)?;
        Ok(media)
    }

    fn read(&self, media: &MediaRef) -> Result<Arc<[u8]>, MediaStoreError> {
        let guard = self
            .blobs
            .lock()
            .map_err(|_| MediaStoreError::Unavailable("media mutex poisoned".to_string()))?;
        guard
            .get(media)
            .cloned()
            .ok_or_else(|| MediaStoreError::NotFound(media.clone()))
    }

    fn contains(&self, media: &MediaRef) -> bool {
        self.blobs
            .lock()
            .map(|guard| guard.contains_key(media))
            .unwrap_or(false)
    }
}
