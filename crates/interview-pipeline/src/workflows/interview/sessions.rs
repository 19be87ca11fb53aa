use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::domain::{
    normalize_email, AnswerRecord, CandidateIdentity, CandidateStatus, InterviewId,
    InterviewSettings, InterviewSnapshot, Question, Session, SessionId,
};
use super::repository::{InterviewRepository, RepositoryError};
use super::scoring::{overall_score, RankCandidate, RankingEntry};

/// State machine violations and lookups that failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("interview {0} not found")]
    UnknownInterview(InterviewId),
    #[error("interview {0} has no questions")]
    NoQuestions(InterviewId),
    #[error("{email} is not invited to interview {interview_id}")]
    NotInvited {
        interview_id: InterviewId,
        email: String,
    },
    #[error("{email} already has session {session_id} in progress")]
    AlreadyStarted { email: String, session_id: SessionId },
    #[error("{email} already completed interview {interview_id} and retakes are disabled")]
    RetakeNotAllowed {
        interview_id: InterviewId,
        email: String,
    },
    #[error("session {0} not found")]
    UnknownSession(SessionId),
    #[error("session {0} was superseded by a newer attempt")]
    SessionSuperseded(SessionId),
    #[error("session {0} is already completed")]
    SessionAlreadyCompleted(SessionId),
    #[error("question {question_index} is out of range ({question_count} questions)")]
    QuestionOutOfRange {
        question_index: usize,
        question_count: usize,
    },
    #[error("question {question_index} already answered in session {session_id}")]
    DuplicateAnswer {
        session_id: SessionId,
        question_index: usize,
    },
    #[error("{answered} of {required} questions answered")]
    IncompleteAnswers { answered: usize, required: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Returned to the candidate when a session opens.
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session_id: SessionId,
    pub interview: InterviewSnapshot,
    pub superseded: Option<SessionId>,
}

/// What the coordinator needs to process one answer.
#[derive(Debug, Clone)]
pub struct AnswerContext {
    pub question: Question,
    pub settings: InterviewSettings,
}

#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub session_id: SessionId,
    pub interview_id: InterviewId,
    pub candidate_email: String,
    pub overall_score: f64,
    pub completed_at: DateTime<Utc>,
}

/// Exclusive right to mutate one session. Permits are handed out in FIFO order, so concurrent
/// submissions for the same session queue instead of interleaving.
pub struct SessionPermit {
    session_id: SessionId,
    _guard: OwnedMutexGuard<()>,
}

struct SessionCell {
    state: Mutex<Session>,
    gate: Arc<AsyncMutex<()>>,
}

impl SessionCell {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Arena of sessions keyed by id plus the transitions that govern them.
pub struct SessionStateMachine<R> {
    interviews: Arc<R>,
    arena: RwLock<HashMap<SessionId, Arc<SessionCell>>>,
    sequence: AtomicU64,
}

impl<R> SessionStateMachine<R>
where
    R: InterviewRepository + 'static,
{
    pub fn new(interviews: Arc<R>) -> Self {
        Self {
            interviews,
            arena: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn interviews(&self) -> &Arc<R> {
        &self.interviews
    }

    fn next_session_id(&self) -> SessionId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        SessionId(format!("sess-{id:06}"))
    }

    fn cell(&self, session_id: &SessionId) -> Result<Arc<SessionCell>, SessionError> {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(session_id.clone()))
    }

    fn cells(&self) -> Vec<Arc<SessionCell>> {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Open a session for an invited candidate.
    pub fn start(
        &self,
        interview_id: &InterviewId,
        candidate_email: &str,
        candidate_name: Option<String>,
    ) -> Result<SessionStart, SessionError> {
        let interview = self
            .interviews
            .fetch(interview_id)?
            .ok_or_else(|| SessionError::UnknownInterview(interview_id.clone()))?;
        let email = normalize_email(candidate_email);
        if interview.candidate(&email).is_none() {
            return Err(SessionError::NotInvited {
                interview_id: interview_id.clone(),
                email,
            });
        }
        if interview.questions.is_empty() {
            return Err(SessionError::NoQuestions(interview_id.clone()));
        }

        // Held across check-and-insert so two concurrent starts cannot both pass the check.
        // Lock order: arena, then session cell, then repository.
        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);

        let mut active = None;
        let mut completed_before = false;
        for cell in arena.values() {
            let session = cell.lock();
            if session.interview_id() != interview_id || session.candidate.email != email {
                continue;
            }
            if session.completed {
                completed_before = true;
            } else if !session.superseded {
                active = Some((session.id.clone(), cell.clone()));
            }
        }

        let allow_retakes = interview.settings.allow_retakes;
        if !allow_retakes {
            if let Some((session_id, _)) = active {
                return Err(SessionError::AlreadyStarted { email, session_id });
            }
            if completed_before {
                return Err(SessionError::RetakeNotAllowed {
                    interview_id: interview_id.clone(),
                    email,
                });
            }
        }

        let now = Utc::now();
        let candidate =
            self.interviews
                .advance_candidate(interview_id, &email, CandidateStatus::Started, now)?;

        let superseded = active.map(|(session_id, cell)| {
            cell.lock().superseded = true;
            session_id
        });

        let snapshot = interview.snapshot();
        let session_id = self.next_session_id();
        let session = Session {
            id: session_id.clone(),
            candidate: CandidateIdentity {
                email: email.clone(),
                name: candidate_name,
            },
            interview: snapshot.clone(),
            answers: Vec::new(),
            overall_score: None,
            rank: None,
            completed: false,
            superseded: false,
            started_at: now,
            completed_at: None,
        };
        arena.insert(
            session_id.clone(),
            Arc::new(SessionCell {
                state: Mutex::new(session),
                gate: Arc::new(AsyncMutex::new(())),
            }),
        );

        info!(
            session_id = %session_id,
            interview_id = %interview_id,
            candidate = %email,
            candidate_status = candidate.status.label(),
            superseded = ?superseded,
            "interview session started"
        );

        Ok(SessionStart {
            session_id,
            interview: snapshot,
            superseded,
        })
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, session_id: &SessionId) -> Result<SessionPermit, SessionError> {
        let gate = self.cell(session_id)?.gate.clone();
        let guard = gate.lock_owned().await;
        Ok(SessionPermit {
            session_id: session_id.clone(),
            _guard: guard,
        })
    }

    /// Check that `question_index` can still be answered, before any analysis is spent on it.
    pub fn answer_context(
        &self,
        permit: &SessionPermit,
        question_index: usize,
    ) -> Result<AnswerContext, SessionError> {
        let cell = self.cell(&permit.session_id)?;
        let session = cell.lock();
        ensure_accepting_answer(&session, question_index)?;
        Ok(AnswerContext {
            question: session.interview.questions[question_index].clone(),
            settings: session.interview.settings.clone(),
        })
    }

    pub fn record_answer(
        &self,
        permit: &SessionPermit,
        record: AnswerRecord,
    ) -> Result<(), SessionError> {
        let cell = self.cell(&permit.session_id)?;
        let mut session = cell.lock();
        ensure_accepting_answer(&session, record.question_index)?;
        info!(
            session_id = %session.id,
            question_index = record.question_index,
            flags = record.analysis.flags.len(),
            "answer recorded"
        );
        session.answers.push(record);
        Ok(())
    }

    pub fn complete(&self, permit: &SessionPermit) -> Result<CompletedSession, SessionError> {
        let cell = self.cell(&permit.session_id)?;
        let mut session = cell.lock();
        ensure_open(&session)?;

        let required = session.question_count();
        let answered = session.answers.len();
        let score = match overall_score(&session.answers) {
            Some(score) if answered == required => score,
            _ => return Err(SessionError::IncompleteAnswers { answered, required }),
        };

        let now = Utc::now();
        match self.interviews.advance_candidate(
            session.interview_id(),
            &session.candidate.email,
            CandidateStatus::Completed,
            now,
        ) {
            Ok(_) => {}
            // Invitation withdrawn after the session started: the attempt still counts.
            Err(RepositoryError::NotFound) => warn!(
                session_id = %session.id,
                interview_id = %session.interview_id(),
                candidate = %session.candidate.email,
                "candidate no longer invited; completing without a status update"
            ),
            Err(error) => return Err(error.into()),
        }

        session.completed = true;
        session.completed_at = Some(now);
        session.overall_score = Some(score);

        info!(
            session_id = %session.id,
            interview_id = %session.interview_id(),
            overall_score = score,
            "interview session completed"
        );

        Ok(CompletedSession {
            session_id: session.id.clone(),
            interview_id: session.interview_id().clone(),
            candidate_email: session.candidate.email.clone(),
            overall_score: score,
            completed_at: now,
        })
    }

    pub fn session(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        Ok(self.cell(session_id)?.lock().clone())
    }

    pub fn sessions_for(&self, interview_id: &InterviewId) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .cells()
            .iter()
            .map(|cell| cell.lock())
            .filter(|session| session.interview_id() == interview_id)
            .map(|session| session.clone())
            .collect();
        sessions.sort_by(|left, right| left.id.cmp(&right.id));
        sessions
    }

    /// Completed sessions that count toward the interview's ranking: each candidate's most
    /// recently completed attempt.
    pub fn ranking_candidates(&self, interview_id: &InterviewId) -> Vec<RankCandidate> {
        let mut latest: HashMap<String, RankCandidate> = HashMap::new();
        for session in self.sessions_for(interview_id) {
            let (Some(score), Some(completed_at)) = (session.overall_score, session.completed_at)
            else {
                continue;
            };
            if !session.completed {
                continue;
            }
            let candidate = RankCandidate {
                session_id: session.id.clone(),
                candidate_email: session.candidate.email.clone(),
                overall_score: score,
                completed_at,
            };
            match latest.get(&candidate.candidate_email) {
                Some(existing)
                    if (existing.completed_at, &existing.session_id)
                        >= (candidate.completed_at, &candidate.session_id) => {}
                _ => {
                    latest.insert(candidate.candidate_email.clone(), candidate);
                }
            }
        }
        latest.into_values().collect()
    }

    /// Write committed ranks back to the interview's sessions. Sessions absent from `entries`
    /// lose any previous rank.
    pub fn apply_ranks(&self, interview_id: &InterviewId, entries: &[RankingEntry]) {
        let ranks: HashMap<&SessionId, u32> = entries
            .iter()
            .map(|entry| (&entry.session_id, entry.rank))
            .collect();
        for cell in self.cells() {
            let mut session = cell.lock();
            if session.interview_id() == interview_id {
                session.rank = ranks.get(&session.id).copied();
            }
        }
    }
}

fn ensure_open(session: &Session) -> Result<(), SessionError> {
    if session.completed {
        return Err(SessionError::SessionAlreadyCompleted(session.id.clone()));
    }
    if session.superseded {
        return Err(SessionError::SessionSuperseded(session.id.clone()));
    }
    Ok(())
}

fn ensure_accepting_answer(session: &Session, question_index: usize) -> Result<(), SessionError> {
    ensure_open(session)?;
    let question_count = session.question_count();
    if question_index >= question_count {
        return Err(SessionError::QuestionOutOfRange {
            question_index,
            question_count,
        });
    }
    if session.has_answer(question_index) {
        return Err(SessionError::DuplicateAnswer {
            session_id: session.id.clone(),
            question_index,
        });
    }
    Ok(())
}
