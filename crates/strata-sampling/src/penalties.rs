//! History-driven repetition, frequency and presence penalties.
//!
//! For a token seen `count > 0` times in the window, applied in this order:
//! 1. repeat: positive logits are divided by `penalty_repeat`, non-positive
//!    ones multiplied (once, independent of `count`)
//! 2. frequency: `logit -= count * penalty_freq`
//! 3. presence: `logit -= penalty_present` (once)

use std::collections::HashMap;

use strata_abi::{SamplingParams, Token};

use crate::candidates::Candidates;
use crate::history::HistoryRing;

/// Resolve `penalty_last_n` against the history: -1 = everything stored,
/// larger-than-stored is clamped, 0 disables.
pub fn window_len(penalty_last_n: i32, history: &HistoryRing) -> usize {
    match penalty_last_n {
        n if n < 0 => history.len(),
        n => (n as usize).min(history.len()),
    }
}

/// Token counts over the last `n` accepted tokens.
pub fn token_counts(history: &HistoryRing, n: usize) -> HashMap<Token, u32> {
    let mut counts = HashMap::with_capacity(n);
    for i in 0..n {
        *counts.entry(history.rat(i)).or_insert(0) += 1;
    }
    counts
}

/// Apply all three penalties to `cur`. `nl_token` keeps its pre-penalty
/// logit unless `penalize_nl` is set.
pub fn apply_penalties(
    cur: &mut Candidates,
    history: &HistoryRing,
    params: &SamplingParams,
    nl_token: Option<Token>,
) {
    if !params.penalties_enabled() {
        return;
    }
    let n = window_len(params.penalty_last_n, history);
    if n == 0 {
        return;
    }
    let counts = token_counts(history, n);

    let nl_saved = nl_token
        .filter(|_| !params.penalize_nl)
        .and_then(|nl| cur.find(nl).map(|i| (i, cur.as_slice()[i].logit)));

    for c in cur.iter_mut() {
        let Some(&count) = counts.get(&c.id) else {
            continue;
        };
        penalize(
            &mut c.logit,
            count,
            params.penalty_repeat,
            params.penalty_freq,
            params.penalty_present,
        );
    }

    if let Some((i, logit)) = nl_saved {
        cur.data_mut()[i].logit = logit;
    }
}

/// Penalty for a single logit with `count` occurrences in the window.
#[inline]
pub fn penalize(logit: &mut f32, count: u32, repeat: f32, freq: f32, present: f32) {
    if count == 0 {
        return;
    }
    if *logit <= 0.0 {
        *logit *= repeat;
    } else {
        *logit /= repeat;
    }
    *logit -= count as f32 * freq;
    *logit -= present;
}
