use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::super::domain::InterviewId;
use super::RankingEntry;

#[derive(Debug, Default)]
struct Standing {
    epoch: u64,
    entries: Vec<RankingEntry>,
}

/// Interview-wide rankings guarded by a per-interview completion epoch.
///
/// Every completion bumps the epoch. A recompute reads the epoch, reads the completed
/// sessions, and commits only if the epoch has not moved in between; otherwise the commit is
/// refused with [`RankingConflict`] and the caller re-reads.
#[derive(Debug, Default)]
pub struct RankingBoard {
    standings: Mutex<HashMap<InterviewId, Standing>>,
}

/// A recompute raced with another completion. Retried internally, never shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ranking for interview {interview_id} moved from epoch {expected} to {actual}")]
pub struct RankingConflict {
    pub interview_id: InterviewId,
    pub expected: u64,
    pub actual: u64,
}

impl RankingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<InterviewId, Standing>> {
        self.standings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that a session of `interview_id` completed. Returns the new epoch.
    pub fn note_completion(&self, interview_id: &InterviewId) -> u64 {
        let mut standings = self.lock();
        let standing = standings.entry(interview_id.clone()).or_default();
        standing.epoch += 1;
        standing.epoch
    }

    pub fn epoch(&self, interview_id: &InterviewId) -> u64 {
        self.lock()
            .get(interview_id)
            .map(|standing| standing.epoch)
            .unwrap_or(0)
    }

    /// Replace the interview's ranking if nothing completed since `expected_epoch` was read.
    /// `write_back` runs inside the same critical section so per-session ranks never disagree
    /// with the board.
    pub fn commit<F>(
        &self,
        interview_id: &InterviewId,
        expected_epoch: u64,
        entries: Vec<RankingEntry>,
        write_back: F,
    ) -> Result<Vec<RankingEntry>, RankingConflict>
    where
        F: FnOnce(&[RankingEntry]),
    {
        let mut standings = self.lock();
        let standing = standings.entry(interview_id.clone()).or_default();
        if standing.epoch != expected_epoch {
            return Err(RankingConflict {
                interview_id: interview_id.clone(),
                expected: expected_epoch,
                actual: standing.epoch,
            });
        }
        write_back(&entries);
        standing.entries = entries.clone();
        Ok(entries)
    }

    pub fn standings(&self, interview_id: &InterviewId) -> Vec<RankingEntry> {
        self.lock()
            .get(interview_id)
            .map(|standing| standing.entries.clone())
            .unwrap_or_default()
    }
}
