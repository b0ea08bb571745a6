//! The "best match" capability and its offline implementations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::OracleError;

/// A candidate as presented to an oracle.
///
/// `index` is the candidate's position in the list handed to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub index: usize,
    pub title: String,
}

/// Picks the candidate a vote title actually refers to.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Return the `index` of the best-matching candidate.
    async fn match_best_candidate(
        &self,
        target: &str,
        candidates: &[Candidate],
    ) -> Result<usize, OracleError>;
}

/// Always picks the first candidate.
///
/// Ballot sheets usually name the decided document first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidate;

#[async_trait]
impl Oracle for FirstCandidate {
    async fn match_best_candidate(
        &self,
        _target: &str,
        candidates: &[Candidate],
    ) -> Result<usize, OracleError> {
        candidates
            .first()
            .map(|c| c.index)
            .ok_or(OracleError::NoCandidates)
    }
}

/// Ranks candidates by the number of title words they share with the target.
///
/// Words shorter than three characters are ignored. Ties go to the earlier
/// candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TitleOverlap;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

impl TitleOverlap {
    pub fn score(target: &str, title: &str) -> usize {
        let target = words(target);
        words(title).intersection(&target).count()
    }
}

#[async_trait]
impl Oracle for TitleOverlap {
    async fn match_best_candidate(
        &self,
        target: &str,
        candidates: &[Candidate],
    ) -> Result<usize, OracleError> {
        let mut best: Option<(usize, usize)> = None;
        for c in candidates {
            let score = Self::score(target, &c.title);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((c.index, score));
            }
        }
        best.map(|(index, _)| index).ok_or(OracleError::NoCandidates)
    }
}

/// Returns a fixed answer and counts how often it was asked.
#[derive(Debug, Default)]
pub struct FixedOracle {
    answer: usize,
    calls: AtomicUsize,
}

impl FixedOracle {
    pub fn new(answer: usize) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for FixedOracle {
    async fn match_best_candidate(
        &self,
        _target: &str,
        _candidates: &[Candidate],
    ) -> Result<usize, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}
