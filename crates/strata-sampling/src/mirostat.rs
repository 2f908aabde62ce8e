//! Mirostat: entropy-targeting sampling with a feedback-controlled
//! surprise threshold `mu` (https://arxiv.org/abs/2007.14966).
//!
//! After every draw, `mu += eta * (tau - observed_surprise)`, so the long-run
//! average surprise of emitted tokens settles near `tau` (bits).

use rand::Rng;
use strata_abi::Token;
use tracing::trace;

use crate::candidates::Candidates;
use crate::decision::draw_index;
use crate::errors::Result;
use crate::filters::top_k;

/// Number of top candidates used to estimate the Zipf exponent (v1).
pub const MIROSTAT_M: usize = 100;

/// Feedback state carried across steps. Reset together with history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feedback {
    mu: f32,
}

impl Feedback {
    /// Start at `2 * tau`.
    pub fn new(tau: f32) -> Self {
        Self { mu: 2.0 * tau }
    }

    #[inline]
    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn reset(&mut self, tau: f32) {
        *self = Self::new(tau);
    }

    /// Nudge the threshold toward keeping average surprise at `tau`.
    pub fn update(&mut self, observed: f32, tau: f32, eta: f32) {
        self.mu += eta * (tau - observed);
        trace!(observed, mu = self.mu, "mirostat feedback");
    }
}

/// Mirostat v1: estimate the Zipf exponent from the head of the
/// distribution, derive `k` from `mu`, top-k, draw.
pub fn sample_v1<R: Rng + ?Sized>(
    cur: &mut Candidates,
    rng: &mut R,
    feedback: &mut Feedback,
    tau: f32,
    eta: f32,
    m: usize,
    n_vocab: usize,
) -> Result<Token> {
    cur.softmax();

    // Fewer than two live candidates: nothing to fit, draw from the whole set.
    if let Some(s_hat) = zipf_exponent(cur, m) {
        let epsilon_hat = s_hat - 1.0;
        let k = ((epsilon_hat * 2.0f32.powf(feedback.mu()))
            / (1.0 - (n_vocab as f32).powf(-epsilon_hat)))
        .powf(1.0 / s_hat);

        // k < 1 (or NaN) still narrows to a single candidate.
        top_k(cur, (k as i32).max(1), 1);
    }

    draw_and_update(cur, rng, feedback, tau, eta)
}

/// Mirostat v2: drop every candidate whose surprise exceeds `mu`
/// (keeping at least one), draw.
pub fn sample_v2<R: Rng + ?Sized>(
    cur: &mut Candidates,
    rng: &mut R,
    feedback: &mut Feedback,
    tau: f32,
    eta: f32,
) -> Result<Token> {
    cur.softmax();

    let mu = feedback.mu();
    let keep = cur
        .iter()
        .position(|c| -c.p.log2() > mu)
        .unwrap_or(cur.len());
    cur.truncate(keep);

    draw_and_update(cur, rng, feedback, tau, eta)
}

/// Least-squares fit of `s` in `p_i ∝ i^-s` over the top `m` candidates.
///
/// Only the prefix with `p > 0` takes part (masked candidates sort last).
/// `None` when fewer than two such candidates exist.
fn zipf_exponent(cur: &Candidates, m: usize) -> Option<f32> {
    let probs = cur.as_slice();
    let live = probs.iter().take_while(|c| c.p > 0.0).count();
    let n = m.saturating_sub(1).min(live.saturating_sub(1));
    if n == 0 {
        return None;
    }

    let mut sum_ti_bi = 0.0f32;
    let mut sum_ti_sq = 0.0f32;
    for i in 0..n {
        let t_i = ((i + 2) as f32 / (i + 1) as f32).ln();
        let b_i = (probs[i].p / probs[i + 1].p).ln();
        sum_ti_bi += t_i * b_i;
        sum_ti_sq += t_i * t_i;
    }
    Some(sum_ti_bi / sum_ti_sq)
}

fn draw_and_update<R: Rng + ?Sized>(
    cur: &mut Candidates,
    rng: &mut R,
    feedback: &mut Feedback,
    tau: f32,
    eta: f32,
) -> Result<Token> {
    let idx = draw_index(cur, rng)?;
    let picked = cur.as_slice()[idx];
    feedback.update(-picked.p.log2(), tau, eta);
    Ok(picked.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zipf_logits(n: usize) -> Vec<f32> {
        (0..n).map(|i| -((i + 1) as f32).ln()).collect()
    }

    #[test]
    fn feedback_moves_toward_target() {
        let mut fb = Feedback::new(5.0);
        assert_eq!(fb.mu(), 10.0);
        fb.update(7.0, 5.0, 0.1);
        assert!((fb.mu() - 9.8).abs() < 1e-6);
        fb.update(1.0, 5.0, 0.1);
        assert!((fb.mu() - 10.2).abs() < 1e-6);
        fb.reset(3.0);
        assert_eq!(fb.mu(), 6.0);
    }

    #[test]
    fn v2_truncates_by_surprise() {
        let mut rng = StdRng::seed_from_u64(3);
        // probabilities .5 .25 .125 .125 → surprises 1 2 3 3 bits
        let logits = [8.0f32.ln(), 4.0f32.ln(), 2.0f32.ln(), 2.0f32.ln()];
        let mut fb = Feedback { mu: 1.5 };
        let mut cur = Candidates::from_logits(&logits, &[]);
        let t = sample_v2(&mut cur, &mut rng, &mut fb, 5.0, 0.1).unwrap();
        assert_eq!(t, Token(0));
        assert_eq!(cur.len(), 1);
        // observed surprise 0 after renormalizing a single candidate
        assert!((fb.mu() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zipf_exponent_recovers_slope() {
        let mut cur = Candidates::from_logits(&zipf_logits(500), &[]);
        cur.softmax();
        let s = zipf_exponent(&cur, MIROSTAT_M).unwrap();
        assert!((s - 1.0).abs() < 1e-2, "s = {s}");
    }

    #[test]
    fn zipf_exponent_ignores_masked_tail() {
        let mut logits = zipf_logits(50);
        for l in logits.iter_mut().skip(10) {
            *l = f32::NEG_INFINITY;
        }
        let mut cur = Candidates::from_logits(&logits, &[]);
        cur.softmax();
        let s = zipf_exponent(&cur, MIROSTAT_M).unwrap();
        assert!((s - 1.0).abs() < 1e-2, "s = {s}");

        let mut single = Candidates::from_logits(&[0.0, f32::NEG_INFINITY], &[]);
        single.softmax();
        assert_eq!(zipf_exponent(&single, MIROSTAT_M), None);
    }

    fn average_surprise(version: u8, draws: usize) -> f32 {
        let mut rng = StdRng::seed_from_u64(42);
        let (tau, eta) = (5.0, 0.1);
        let logits: Vec<f32> = (0..1000).map(|i| -1.2 * ((i + 1) as f32).ln()).collect();
        let mut fb = Feedback::new(tau);
        let mut total = 0.0f32;
        for _ in 0..draws {
            let before = fb.mu();
            let mut cur = Candidates::from_logits(&logits, &[]);
            let picked = match version {
                1 => sample_v1(&mut cur, &mut rng, &mut fb, tau, eta, MIROSTAT_M, logits.len()),
                _ => sample_v2(&mut cur, &mut rng, &mut fb, tau, eta),
            };
            picked.unwrap();
            // mu moved by eta * (tau - observed)
            total += tau - (fb.mu() - before) / eta;
        }
        total / draws as f32
    }

    #[test]
    fn v2_holds_average_surprise_near_tau() {
        let avg = average_surprise(2, 3000);
        assert!((avg - 5.0).abs() < 0.25, "avg = {avg}");
    }

    #[test]
    fn v1_holds_average_surprise_near_tau() {
        let avg = average_surprise(1, 3000);
        assert!((avg - 5.0).abs() < 0.25, "avg = {avg}");
    }
}
