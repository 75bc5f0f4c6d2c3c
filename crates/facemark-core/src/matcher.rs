//! Best-match selection over a candidate set.
//!
//! Plain linear scan, O(M·N) for M candidates. Fine for a room-sized
//! roster; anything larger needs an index in front of this module.

use crate::scorer::{self, ScoreWeights};
use crate::types::{Candidate, Fingerprint};

/// Accept/reject outcome of one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Match { identity: String, score: f32 },
    NoMatch,
}

/// Scan result plus diagnostics, populated even on `NoMatch`.
#[derive(Debug, Clone)]
pub struct Selection {
    pub decision: Decision,
    /// Best (identity, score) seen regardless of tolerance; `None` only
    /// when no candidate could be compared at all.
    pub closest: Option<(String, f32)>,
    /// Candidates dropped because their fingerprints were incomparable.
    pub skipped: usize,
}

/// Scan `candidates` for the best score against `query`.
///
/// Candidates that fail scoring are skipped without aborting the scan.
/// The running maximum uses strict `>`, so the first candidate to reach
/// the top score wins ties, and the decision itself is strict: a best
/// score exactly equal to `tolerance` is a `NoMatch`.
pub fn select_best(
    query: &Fingerprint,
    candidates: &[Candidate],
    tolerance: f32,
    weights: &ScoreWeights,
) -> Selection {
    let mut best: Option<(usize, f32)> = None;
    let mut skipped = 0usize;

    for (index, candidate) in candidates.iter().enumerate() {
        let combined = match scorer::score(query, &candidate.fingerprint, weights) {
            Ok(s) => s.combined,
            Err(err) => {
                tracing::warn!(
                    identity = %candidate.identity,
                    error = %err,
                    "skipping incomparable candidate"
                );
                skipped += 1;
                continue;
            }
        };

        let is_better = match best {
            None => true,
            Some((_, top)) => combined > top,
        };
        if is_better {
            best = Some((index, combined));
        }
    }

    match best {
        Some((index, top)) => {
            let identity = candidates[index].identity.clone();
            let decision = if top > tolerance {
                Decision::Match {
                    identity: identity.clone(),
                    score: top,
                }
            } else {
                Decision::NoMatch
            };
            Selection {
                decision,
                closest: Some((identity, top)),
                skipped,
            }
        }
        None => Selection {
            decision: Decision::NoMatch,
            closest: None,
            skipped,
        },
    }
}
