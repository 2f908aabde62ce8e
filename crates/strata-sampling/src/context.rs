//! Sampling context: one per generation sequence.
//!
//! Per step: logits → bias → grammar mask → penalties → decision. The caller
//! then reports the emitted token through [`SamplingContext::accept`], exactly
//! once, before the next `sample`.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use strata_abi::{LogitBias, SEED_RANDOM, SamplingParams, Token, Vocab};
use tracing::{debug, trace, warn};

use crate::candidates::Candidates;
use crate::decision::{self, DecisionMode, MirostatVersion};
use crate::errors::{Result, SamplingError};
use crate::filters;
use crate::grammar::{GrammarCompiler, GrammarGate};
use crate::history::HistoryRing;
use crate::mirostat::{self, Feedback, MIROSTAT_M};
use crate::penalties;

/// Root rule every compiled grammar starts from.
pub const GRAMMAR_ROOT: &str = "root";

/// Context = {config} + {history} + {mirostat feedback} + {grammar state} + {rng}.
///
/// Not meant to be shared across threads; fork with `clone()` instead. A clone
/// shares only the read-only vocabulary with its source.
pub struct SamplingContext {
    params: SamplingParams,
    vocab: Arc<dyn Vocab>,

    /// `params.logit_bias` plus derived entries (EOS ban), fixed at init.
    logit_bias: Vec<LogitBias>,

    /// Live grammar state and the freshly compiled state `reset` rewinds to.
    grammar: Option<Box<dyn GrammarGate>>,
    grammar_initial: Option<Box<dyn GrammarGate>>,

    prev: HistoryRing,
    feedback: Feedback,
    rng: StdRng,

    /// Working set of the last step (reused allocation).
    cur: Candidates,
    prepared: bool,
    probs_valid: bool,
}

impl SamplingContext {
    /// Bind configuration, compile the grammar, resolve logit bias.
    ///
    /// Grammar problems surface here and never during sampling.
    pub fn new(
        vocab: Arc<dyn Vocab>,
        params: SamplingParams,
        compiler: Option<&dyn GrammarCompiler>,
    ) -> Result<Self> {
        let n_vocab = vocab.n_vocab();
        if n_vocab == 0 {
            return Err(SamplingError::EmptyVocab);
        }

        let grammar = if params.grammar.is_empty() {
            None
        } else {
            let compiler = compiler.ok_or(SamplingError::GrammarUnavailable)?;
            let gate = compiler
                .compile(&params.grammar, GRAMMAR_ROOT)
                .map_err(|e| SamplingError::Grammar(format!("{e:#}")))?;
            Some(gate)
        };

        let mut logit_bias = params.logit_bias.clone();
        if params.ignore_eos {
            logit_bias.push(LogitBias::new(vocab.eos_token(), f32::NEG_INFINITY));
        }

        if params.mirostat > 2 {
            warn!(
                mirostat = params.mirostat,
                "unknown mirostat version; using the filter chain"
            );
        }

        let seed = resolve_seed(params.seed);
        debug!(
            n_vocab,
            seed,
            n_prev = params.n_prev,
            grammar = grammar.is_some(),
            chain = %params.chain_description(),
            "sampling context initialized"
        );

        Ok(Self {
            prev: HistoryRing::new(params.n_prev),
            feedback: Feedback::new(params.mirostat_tau),
            rng: StdRng::seed_from_u64(seed),
            cur: Candidates::default(),
            prepared: false,
            probs_valid: false,
            grammar_initial: grammar.clone(),
            grammar,
            logit_bias,
            vocab,
            params,
        })
    }

    /// Clear history and mirostat feedback, rewind the grammar. Config and
    /// RNG stream are kept.
    pub fn reset(&mut self) {
        self.prev.clear();
        self.feedback.reset(self.params.mirostat_tau);
        self.grammar = self.grammar_initial.clone();
        self.cur = Candidates::default();
        self.prepared = false;
        self.probs_valid = false;
        debug!("sampling context reset");
    }

    /// Re-seed the RNG (`SEED_RANDOM` draws a fresh seed).
    pub fn set_seed(&mut self, seed: u64) {
        let seed = resolve_seed(seed);
        self.rng = StdRng::seed_from_u64(seed);
        debug!(seed, "sampling rng reseeded");
    }

    // ────────────────────────────────────────────────────────────────────────────────
    // Accessors
    // ────────────────────────────────────────────────────────────────────────────────

    #[inline]
    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    #[inline]
    pub fn history(&self) -> &HistoryRing {
        &self.prev
    }

    /// Current mirostat threshold.
    #[inline]
    pub fn mirostat_mu(&self) -> f32 {
        self.feedback.mu()
    }

    #[inline]
    pub fn mode(&self) -> DecisionMode {
        DecisionMode::select(&self.params)
    }

    /// Working candidates of the last `prepare`/`sample` call.
    #[inline]
    pub fn candidates(&self) -> &Candidates {
        &self.cur
    }

    /// Up to `n_probs` (token, probability) pairs from the last step, in the
    /// order the decision saw them. Empty when the step never computed
    /// probabilities (pure greedy) or `n_probs == 0`.
    pub fn top_probs(&self) -> Vec<(Token, f32)> {
        if !self.probs_valid {
            return Vec::new();
        }
        self.cur
            .iter()
            .take(self.params.n_probs)
            .map(|c| (c.id, c.p))
            .collect()
    }

    /// Most recently accepted token. Panics if nothing was accepted yet.
    pub fn last(&self) -> Token {
        self.prev.rat(0)
    }

    /// `i`-th most recent accepted token (0 = last).
    pub fn prev(&self, i: usize) -> Token {
        self.prev.rat(i)
    }

    /// Text of the last `n` accepted tokens, oldest first.
    pub fn prev_str(&self, n: usize) -> Result<String> {
        let tokens = self.prev.last_n(n);
        let mut out = String::with_capacity(8 * tokens.len());
        for token in tokens {
            let piece = self
                .vocab
                .decode_token(token)
                .map_err(SamplingError::Detokenize)?;
            out.push_str(&piece);
        }
        Ok(out)
    }

    // ────────────────────────────────────────────────────────────────────────────────
    // Per-step API
    // ────────────────────────────────────────────────────────────────────────────────

    /// Build the working set from `logits`: bias, grammar mask, and (if asked)
    /// history penalties. `logits` is copied, never mutated.
    ///
    /// Follow with [`Self::decide`] to pick from exactly this set, e.g. greedy
    /// decoding with penalties.
    pub fn prepare(&mut self, logits: &[f32], apply_penalties: bool) -> Result<&Candidates> {
        let n_vocab = self.vocab.n_vocab();
        if logits.len() < n_vocab {
            return Err(SamplingError::LogitsLength {
                expected: n_vocab,
                got: logits.len(),
            });
        }

        self.cur.rebuild(&logits[..n_vocab], &self.logit_bias);
        self.prepared = true;
        self.probs_valid = false;

        if let Some(grammar) = &self.grammar {
            grammar.mask(&mut self.cur);
        }
        if apply_penalties {
            penalties::apply_penalties(
                &mut self.cur,
                &self.prev,
                &self.params,
                self.vocab.nl_token(),
            );
        }
        Ok(&self.cur)
    }

    /// Choose the next token. Does not record it: call [`Self::accept`].
    ///
    /// History penalties apply in the stochastic modes only; greedy callers
    /// that want them go through `prepare(logits, true)` + `decide()`.
    pub fn sample(&mut self, logits: &[f32]) -> Result<Token> {
        self.prepare(logits, self.mode().is_stochastic())?;
        self.decide()
    }

    /// Run the decision on the set built by the last [`Self::prepare`].
    /// Each prepared set is consumed by one decision.
    pub fn decide(&mut self) -> Result<Token> {
        if !self.prepared {
            return Err(SamplingError::NotPrepared);
        }
        self.prepared = false;

        let mode = self.mode();
        let token = match mode {
            DecisionMode::Greedy => decision::sample_greedy(&self.cur)?,
            DecisionMode::GreedyWithProbs => decision::sample_greedy_with_probs(&mut self.cur)?,
            DecisionMode::Mirostat(version) => {
                let (tau, eta) = (self.params.mirostat_tau, self.params.mirostat_eta);
                filters::temperature(&mut self.cur, &self.params);
                match version {
                    MirostatVersion::V1 => mirostat::sample_v1(
                        &mut self.cur,
                        &mut self.rng,
                        &mut self.feedback,
                        tau,
                        eta,
                        MIROSTAT_M,
                        self.vocab.n_vocab(),
                    )?,
                    MirostatVersion::V2 => mirostat::sample_v2(
                        &mut self.cur,
                        &mut self.rng,
                        &mut self.feedback,
                        tau,
                        eta,
                    )?,
                }
            }
            DecisionMode::Stochastic => {
                filters::apply_chain(&mut self.cur, &self.params);
                decision::sample_dist(&mut self.cur, &mut self.rng)?
            }
        };
        self.probs_valid = mode.materializes_probs();

        trace!(?mode, token = token.0, remaining = self.cur.len(), "sampled");
        Ok(token)
    }

    /// Commit an emitted token: advance the grammar (if `apply_grammar`),
    /// then record it in history.
    pub fn accept(&mut self, token: Token, apply_grammar: bool) {
        if apply_grammar {
            if let Some(grammar) = self.grammar.as_mut() {
                grammar.commit(token);
            }
        }
        self.prev.push(token);
    }
}

impl Clone for SamplingContext {
    fn clone(&self) -> Self {
        debug!(history = self.prev.len(), mu = self.feedback.mu(), "sampling context cloned");
        Self {
            params: self.params.clone(),
            vocab: Arc::clone(&self.vocab),
            logit_bias: self.logit_bias.clone(),
            grammar: self.grammar.clone(),
            grammar_initial: self.grammar_initial.clone(),
            prev: self.prev.clone(),
            feedback: self.feedback,
            rng: self.rng.clone(),
            cur: self.cur.clone(),
            prepared: self.prepared,
            probs_valid: self.probs_valid,
        }
    }
}

fn resolve_seed(seed: u64) -> u64 {
    if seed == SEED_RANDOM {
        rand::random()
    } else {
        seed
    }
}
