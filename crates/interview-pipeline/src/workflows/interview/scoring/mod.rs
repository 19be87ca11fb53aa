mod board;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnalysisResult, AnswerRecord, SessionId};

pub use board::{RankingBoard, RankingConflict};

/// Scores closer than this are treated as a tie.
const SCORE_RESOLUTION: f64 = 1e-9;

/// Mean of the five sub-scores of one answer.
pub fn answer_score(analysis: &AnalysisResult) -> f64 {
    let scores = analysis.sub_scores();
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Mean of per-answer means. Answers are folded in question order so the result does not
/// depend on the order they were submitted in.
pub fn overall_score(answers: &[AnswerRecord]) -> Option<f64> {
    if answers.is_empty() {
        return None;
    }
    let mut ordered: Vec<&AnswerRecord> = answers.iter().collect();
    ordered.sort_by_key(|answer| answer.question_index);
    let total: f64 = ordered
        .iter()
        .map(|answer| answer_score(&answer.analysis))
        .sum();
    Some(total / ordered.len() as f64)
}

/// Internal [0, 1] score rescaled to the [0, 100] range shown to employers.
pub fn presentation_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 100.0
}

fn score_key(score: f64) -> i64 {
    (score / SCORE_RESOLUTION).round() as i64
}

/// A completed session eligible for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankCandidate {
    pub session_id: SessionId,
    pub candidate_email: String,
    pub overall_score: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub session_id: SessionId,
    pub candidate_email: String,
    pub overall_score: f64,
    pub rank: u32,
}

/// Standard competition ranking ("1224"): descending score, tied scores share a rank and the
/// following rank skips the tied count. Within a tie, earlier completion is listed first, then
/// session id.
pub fn rank_sessions(mut candidates: Vec<RankCandidate>) -> Vec<RankingEntry> {
    candidates.sort_by(|left, right| {
        score_key(right.overall_score)
            .cmp(&score_key(left.overall_score))
            .then_with(|| left.completed_at.cmp(&right.completed_at))
            .then_with(|| left.session_id.cmp(&right.session_id))
    });

    let mut entries: Vec<RankingEntry> = Vec::with_capacity(candidates.len());
    for (position, candidate) in candidates.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(previous)
                if score_key(previous.overall_score).cmp(&score_key(candidate.overall_score))
                    == Ordering::Equal =>
            {
                previous.rank
            }
            _ => position as u32 + 1,
        };
        entries.push(RankingEntry {
            session_id: candidate.session_id,
            candidate_email: candidate.candidate_email,
            overall_score: candidate.overall_score,
            rank,
        });
    }
    entries
}
