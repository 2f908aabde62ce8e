//! Stateless truncation and reweighting stages.
//!
//! None of these read history. Parameters outside their useful range make
//! the stage a no-op rather than an error, and every truncating stage keeps
//! at least `min_keep` (and never fewer than one) candidates.

use strata_abi::{SamplerKind, SamplingParams};
use tracing::trace;

use crate::candidates::{Candidates, TokenData};

/// Run the configured filter chain in order.
pub fn apply_chain(cur: &mut Candidates, params: &SamplingParams) {
    for &kind in &params.samplers {
        apply(kind, cur, params);
        trace!(stage = kind.as_str(), remaining = cur.len(), "filter applied");
    }
}

/// Dispatch one stage with its parameters from `params`.
pub fn apply(kind: SamplerKind, cur: &mut Candidates, params: &SamplingParams) {
    let min_keep = params.min_keep;
    match kind {
        SamplerKind::TopK => top_k(cur, params.top_k, min_keep),
        SamplerKind::TfsZ => tail_free(cur, params.tfs_z, min_keep),
        SamplerKind::TypicalP => typical(cur, params.typical_p, min_keep),
        SamplerKind::TopP => top_p(cur, params.top_p, min_keep),
        SamplerKind::MinP => min_p(cur, params.min_p, min_keep),
        SamplerKind::Temperature => temperature(cur, params),
    }
}

/// Keep the `k` highest-scoring candidates. `k <= 0` or `k >= len` keeps all.
pub fn top_k(cur: &mut Candidates, k: i32, min_keep: usize) {
    if k <= 0 {
        return;
    }
    let k = (k as usize).max(min_keep);
    if k >= cur.len() {
        return;
    }
    cur.sort();
    cur.truncate(k);
}

/// Nucleus: smallest prefix whose cumulative probability reaches `p`.
pub fn top_p(cur: &mut Candidates, p: f32, min_keep: usize) {
    if p >= 1.0 {
        return;
    }
    cur.softmax();

    let mut cum = 0.0f32;
    let mut last_idx = cur.len();
    for (i, c) in cur.iter().enumerate() {
        cum += c.p;
        if cum >= p && i + 1 >= min_keep {
            last_idx = i + 1;
            break;
        }
    }
    cur.truncate(last_idx);
}

/// Keep candidates with probability at least `p` times the top probability.
pub fn min_p(cur: &mut Candidates, p: f32, min_keep: usize) {
    if p <= 0.0 || cur.is_empty() {
        return;
    }
    cur.softmax();

    let threshold = p * cur.as_slice()[0].p;
    let keep = cur
        .iter()
        .enumerate()
        .skip(1)
        .find(|(i, c)| c.p < threshold && *i >= min_keep)
        .map_or(cur.len(), |(i, _)| i);
    cur.truncate(keep);
}

/// Tail-free sampling: cut where the curvature of the sorted probability
/// curve has accumulated more than `z` of its total mass.
pub fn tail_free(cur: &mut Candidates, z: f32, min_keep: usize) {
    if z >= 1.0 || cur.len() <= 2 {
        return;
    }
    cur.softmax();

    let first: Vec<f32> = cur
        .as_slice()
        .windows(2)
        .map(|w| w[0].p - w[1].p)
        .collect();
    let mut second: Vec<f32> = first.windows(2).map(|w| (w[0] - w[1]).abs()).collect();

    let sum: f32 = second.iter().sum();
    if sum > 1e-6 {
        second.iter_mut().for_each(|d| *d /= sum);
    } else {
        let uniform = 1.0 / second.len() as f32;
        second.iter_mut().for_each(|d| *d = uniform);
    }

    let mut cum = 0.0f32;
    let mut last_idx = cur.len();
    for (i, d) in second.iter().enumerate() {
        cum += d;
        if cum > z && i >= min_keep {
            last_idx = i;
            break;
        }
    }
    cur.truncate(last_idx);
}

/// Locally typical sampling: prefer tokens whose surprise is close to the
/// entropy of the distribution, keeping cumulative mass `p` of them.
/// Leaves the set in typicality order, not score order.
pub fn typical(cur: &mut Candidates, p: f32, min_keep: usize) {
    if p >= 1.0 {
        return;
    }
    cur.softmax();

    let entropy = entropy(cur);
    let mut shifted: Vec<(f32, TokenData)> = cur
        .iter()
        .map(|c| ((-c.p.ln() - entropy).abs(), *c))
        .collect();
    shifted.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

    let mut cum = 0.0f32;
    let mut last_idx = shifted.len();
    for (i, (_, c)) in shifted.iter().enumerate() {
        cum += c.p;
        if cum > p && i + 1 >= min_keep {
            last_idx = i + 1;
            break;
        }
    }

    shifted.truncate(last_idx.max(1));
    cur.replace_unsorted(shifted.into_iter().map(|(_, c)| c).collect());
}

/// Temperature stage; entropy-scaled when `dynatemp_range > 0`.
pub fn temperature(cur: &mut Candidates, params: &SamplingParams) {
    if params.dynatemp_range > 0.0 {
        let min_temp = (params.temp - params.dynatemp_range).max(0.0);
        let max_temp = params.temp + params.dynatemp_range;
        entropy_temperature(cur, min_temp, max_temp, params.dynatemp_exponent);
    } else {
        scale_logits(cur, params.temp);
    }
}

/// Divide every logit by `temp` (> 0). Order is preserved.
pub fn scale_logits(cur: &mut Candidates, temp: f32) {
    let was_sorted = cur.is_sorted();
    for c in cur.iter_mut() {
        c.logit /= temp;
    }
    cur.assume_sorted(was_sorted);
}

/// Dynamic temperature: map normalized entropy of the set into
/// `[min_temp, max_temp]` (shaped by `exponent`), scale, and refresh
/// probabilities.
pub fn entropy_temperature(cur: &mut Candidates, min_temp: f32, max_temp: f32, exponent: f32) {
    if cur.len() <= 1 {
        return;
    }
    let max_entropy = (cur.len() as f32).ln();
    cur.softmax();

    let normalized = entropy(cur) / max_entropy;
    // A zero temperature would turn every logit into +-inf.
    let dyn_temp = (min_temp + (max_temp - min_temp) * normalized.powf(exponent)).max(1e-6);
    trace!(entropy = normalized, temp = dyn_temp, "dynamic temperature");

    scale_logits(cur, dyn_temp);
    cur.softmax();
}

/// Shannon entropy (nats) of the current probabilities. Call after softmax.
pub(crate) fn entropy(cur: &Candidates) -> f32 {
    -cur
        .iter()
        .filter(|c| c.p > 0.0)
        .map(|c| c.p * c.p.ln())
        .sum::<f32>()
}
