//! Strata sampling: turns one row of logits into the next token.
//!
//! [`SamplingContext`] owns the session state (history, mirostat feedback,
//! grammar state, RNG). The stages it composes are public so hosts can run
//! them on their own candidate sets.

pub mod candidates;
pub mod context;
pub mod decision;
pub mod errors;
pub mod filters;
pub mod grammar;
pub mod history;
pub mod mirostat;
pub mod penalties;

pub use candidates::{Candidates, TokenData};
pub use context::{GRAMMAR_ROOT, SamplingContext};
pub use decision::{DecisionMode, MirostatVersion};
pub use errors::{Result, SamplingError};
pub use grammar::{GrammarCompiler, GrammarGate, GrammarGateClone};
pub use history::HistoryRing;
pub use mirostat::Feedback;

pub use strata_abi::{LogitBias, SEED_RANDOM, SamplerKind, SamplingParams, Token, Vocab};
