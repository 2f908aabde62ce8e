//! Decision engine: how the final token is chosen for one step.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use strata_abi::{SamplingParams, Token};

use crate::candidates::Candidates;
use crate::errors::{Result, SamplingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirostatVersion {
    V1,
    V2,
}

/// The mutually exclusive ways a step can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// `temp == 0`, no probabilities requested: argmax without softmax.
    Greedy,
    /// `temp < 0`, or `temp == 0` with `n_probs > 0`: softmax, take the top.
    GreedyWithProbs,
    /// Temperature, then a feedback-controlled draw.
    Mirostat(MirostatVersion),
    /// Full filter chain, then a weighted draw.
    Stochastic,
}

impl DecisionMode {
    pub fn select(params: &SamplingParams) -> Self {
        if params.temp < 0.0 || (params.temp == 0.0 && params.n_probs > 0) {
            DecisionMode::GreedyWithProbs
        } else if params.temp == 0.0 {
            DecisionMode::Greedy
        } else {
            match params.mirostat {
                1 => DecisionMode::Mirostat(MirostatVersion::V1),
                2 => DecisionMode::Mirostat(MirostatVersion::V2),
                _ => DecisionMode::Stochastic,
            }
        }
    }

    /// History penalties run by default only when the step is stochastic.
    #[inline]
    pub fn is_stochastic(self) -> bool {
        matches!(self, DecisionMode::Mirostat(_) | DecisionMode::Stochastic)
    }

    /// Whether the candidate probabilities are meaningful after the step.
    #[inline]
    pub fn materializes_probs(self) -> bool {
        !matches!(self, DecisionMode::Greedy)
    }
}

/// Argmax over logits; no softmax.
pub fn sample_greedy(cur: &Candidates) -> Result<Token> {
    cur.argmax().ok_or_else(no_candidates)
}

/// Softmax, then take index 0. The distribution stays in `cur`.
pub fn sample_greedy_with_probs(cur: &mut Candidates) -> Result<Token> {
    cur.softmax();
    cur.get(0).map(|c| c.id).ok_or_else(no_candidates)
}

/// Softmax, then draw one position from the categorical distribution.
pub fn draw_index<R: Rng + ?Sized>(cur: &mut Candidates, rng: &mut R) -> Result<usize> {
    if cur.is_empty() {
        return Err(no_candidates());
    }
    cur.softmax();
    let dist = WeightedIndex::new(cur.iter().map(|c| c.p))
        .map_err(|e| SamplingError::Distribution(e.to_string()))?;
    Ok(dist.sample(rng))
}

/// Softmax, then draw one token from the categorical distribution.
pub fn sample_dist<R: Rng + ?Sized>(cur: &mut Candidates, rng: &mut R) -> Result<Token> {
    let idx = draw_index(cur, rng)?;
    Ok(cur.as_slice()[idx].id)
}

fn no_candidates() -> SamplingError {
    SamplingError::Distribution("no candidates".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mode_selection_follows_temperature_then_mirostat() {
        let mut p = SamplingParams::default();
        assert_eq!(DecisionMode::select(&p), DecisionMode::Stochastic);

        p.mirostat = 2;
        assert_eq!(
            DecisionMode::select(&p),
            DecisionMode::Mirostat(MirostatVersion::V2)
        );

        p.temp = 0.0;
        assert_eq!(DecisionMode::select(&p), DecisionMode::Greedy);

        p.n_probs = 5;
        assert_eq!(DecisionMode::select(&p), DecisionMode::GreedyWithProbs);

        p.n_probs = 0;
        p.temp = -1.0;
        assert_eq!(DecisionMode::select(&p), DecisionMode::GreedyWithProbs);
    }

    #[test]
    fn unknown_mirostat_version_falls_back_to_chain() {
        let p = SamplingParams {
            mirostat: 7,
            ..SamplingParams::default()
        };
        assert_eq!(DecisionMode::select(&p), DecisionMode::Stochastic);
    }

    #[test]
    fn both_greedy_paths_agree() {
        let logits = [1.0, 3.0, 2.0, 0.5, 0.1];
        let cur = Candidates::from_logits(&logits, &[]);
        assert_eq!(sample_greedy(&cur).unwrap(), Token(1));

        let mut cur = Candidates::from_logits(&logits, &[]);
        assert_eq!(sample_greedy_with_probs(&mut cur).unwrap(), Token(1));
        assert!(cur.get(0).unwrap().p > cur.get(1).unwrap().p);
    }

    #[test]
    fn draws_follow_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut hits = [0usize; 3];
        for _ in 0..4000 {
            let mut cur = Candidates::from_logits(&[0.0, 2.0_f32.ln(), f32::NEG_INFINITY], &[]);
            let t = sample_dist(&mut cur, &mut rng).unwrap();
            hits[t.0 as usize] += 1;
        }
        assert_eq!(hits[2], 0);
        let ratio = hits[1] as f32 / hits[0] as f32;
        assert!((ratio - 2.0).abs() < 0.3, "ratio = {ratio}");
    }

    #[test]
    fn fully_masked_set_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cur = Candidates::from_logits(&[f32::NEG_INFINITY; 3], &[]);
        assert!(matches!(
            sample_dist(&mut cur, &mut rng),
            Err(SamplingError::Distribution(_))
        ));
    }
}
