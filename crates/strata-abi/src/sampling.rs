use std::fmt;

use serde::{Deserialize, Serialize};

use crate::samplers::{SamplerKind, deserialize_lenient};
use crate::token::LogitBias;

/// Seed value meaning "draw a fresh seed from OS entropy at init".
pub const SEED_RANDOM: u64 = u64::MAX;

/// User-tunable sampling parameters for one session.
///
/// Out-of-range values are not errors: each stage treats them as "disabled"
/// (e.g. `top_k <= 0`, `top_p >= 1.0`, `tfs_z >= 1.0`, `min_p <= 0.0`).
///
/// Decision precedence, evaluated per call:
/// - `temp < 0`, or `temp == 0` with `n_probs > 0` → greedy, probabilities kept
/// - `temp == 0` → greedy argmax, no softmax
/// - `mirostat` 1 or 2 → temperature, then mirostat (the filter chain is skipped)
/// - otherwise → filter chain in `samplers` order, then a weighted draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// RNG seed; [`SEED_RANDOM`] picks one at init.
    pub seed: u64,
    /// Capacity of the accepted-token history ring.
    pub n_prev: usize,
    /// Number of (token, probability) pairs to expose after a sample (0 = none).
    pub n_probs: usize,
    /// Floor on the number of candidates any truncating filter may leave.
    pub min_keep: usize,

    // Sampling filters
    pub top_k: i32,
    pub top_p: f32,
    pub min_p: f32,
    pub tfs_z: f32,
    pub typical_p: f32,
    pub temp: f32,
    /// > 0 enables entropy-scaled temperature in `[temp - range, temp + range]`.
    pub dynatemp_range: f32,
    pub dynatemp_exponent: f32,

    // Token penalties
    /// Window over history: 0 disables, -1 means the whole history.
    pub penalty_last_n: i32,
    pub penalty_repeat: f32,
    pub penalty_freq: f32,
    pub penalty_present: f32,
    pub penalize_nl: bool,
    /// Never emit end-of-sequence (biases it to -inf at init).
    pub ignore_eos: bool,

    // Mirostat options: 0 = off, 1 = v1, 2 = v2
    pub mirostat: u8,
    /// Target surprise (bits).
    pub mirostat_tau: f32,
    /// Learning rate of the surprise threshold.
    pub mirostat_eta: f32,

    /// Filter order. Unknown names are dropped when deserializing.
    #[serde(deserialize_with = "deserialize_lenient")]
    pub samplers: Vec<SamplerKind>,

    /// Grammar source (empty = unconstrained). Compiled once at session init.
    pub grammar: String,

    /// Per-token additive logit bias, bound once at session init.
    pub logit_bias: Vec<LogitBias>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            seed: SEED_RANDOM,
            n_prev: 64,
            n_probs: 0,
            min_keep: 1,
            top_k: 40,
            top_p: 0.95,
            min_p: 0.05,
            tfs_z: 1.0,
            typical_p: 1.0,
            temp: 0.8,
            dynatemp_range: 0.0,
            dynatemp_exponent: 1.0,
            penalty_last_n: 64,
            penalty_repeat: 1.0,
            penalty_freq: 0.0,
            penalty_present: 0.0,
            penalize_nl: false,
            ignore_eos: false,
            mirostat: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            samplers: SamplerKind::default_order(),
            grammar: String::new(),
            logit_bias: Vec::new(),
        }
    }
}

impl SamplingParams {
    /// Greedy params: argmax over the biased (and grammar-masked) logits.
    pub fn greedy() -> Self {
        Self {
            temp: 0.0,
            ..Self::default()
        }
    }

    /// True when any history penalty would change a logit.
    pub fn penalties_enabled(&self) -> bool {
        self.penalty_last_n != 0
            && (self.penalty_repeat != 1.0 || self.penalty_freq != 0.0 || self.penalty_present != 0.0)
    }

    /// Human-readable chain, e.g. `logits -> bias -> penalties -> top_k -> ... -> dist`.
    pub fn chain_description(&self) -> String {
        let mut out = String::from("logits -> bias");
        if !self.grammar.is_empty() {
            out.push_str(" -> grammar");
        }
        out.push_str(" -> penalties");

        if self.temp <= 0.0 {
            out.push_str(" -> greedy");
            return out;
        }
        if matches!(self.mirostat, 1 | 2) {
            out.push_str(" -> temperature -> mirostat");
            return out;
        }
        for kind in &self.samplers {
            out.push_str(" -> ");
            out.push_str(kind.as_str());
        }
        out.push_str(" -> dist");
        out
    }
}

impl fmt::Display for SamplingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\trepeat_last_n = {}, repeat_penalty = {:.3}, frequency_penalty = {:.3}, presence_penalty = {:.3}",
            self.penalty_last_n, self.penalty_repeat, self.penalty_freq, self.penalty_present
        )?;
        writeln!(
            f,
            "\ttop_k = {}, tfs_z = {:.3}, top_p = {:.3}, min_p = {:.3}, typical_p = {:.3}, temp = {:.3}",
            self.top_k, self.tfs_z, self.top_p, self.min_p, self.typical_p, self.temp
        )?;
        write!(
            f,
            "\tmirostat = {}, mirostat_lr = {:.3}, mirostat_ent = {:.3}",
            self.mirostat, self.mirostat_eta, self.mirostat_tau
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let mut params = SamplingParams::default();
        params.seed = 1234;
        params.logit_bias.push(LogitBias::new(2, -3.0));
        let json = serde_json::to_string(&params).unwrap();
        let decoded: SamplingParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, decoded);
    }

    #[test]
    fn missing_fields_take_defaults_and_unknown_samplers_are_dropped() {
        let params: SamplingParams =
            serde_json::from_str(r#"{"temp": 0.5, "samplers": ["min-p", "wat", "temperature"]}"#)
                .unwrap();
        assert_eq!(params.temp, 0.5);
        assert_eq!(params.n_prev, 64);
        assert_eq!(params.samplers, vec![SamplerKind::MinP, SamplerKind::Temperature]);
    }

    #[test]
    fn chain_description_follows_mode() {
        let mut params = SamplingParams::default();
        params.samplers = vec![SamplerKind::TopK, SamplerKind::Temperature];
        assert_eq!(
            params.chain_description(),
            "logits -> bias -> penalties -> top_k -> temperature -> dist"
        );

        params.mirostat = 2;
        assert!(params.chain_description().ends_with("temperature -> mirostat"));

        // unknown versions run the filter chain
        params.mirostat = 3;
        assert!(params.chain_description().ends_with("top_k -> temperature -> dist"));

        assert!(SamplingParams::greedy().chain_description().ends_with("greedy"));
    }

    #[test]
    fn penalties_disabled_by_neutral_values() {
        let mut params = SamplingParams::default();
        assert!(!params.penalties_enabled());
        params.penalty_present = 0.5;
        assert!(params.penalties_enabled());
        params.penalty_last_n = 0;
        assert!(!params.penalties_enabled());
    }
}
