//! Grammar gate: the sampler's view of an external constraint engine.
//!
//! The engine is opaque. The sampler only asks it to mask forbidden
//! candidates before any other stage runs, and tells it which token was
//! committed. Compilation happens once, at session init.

use crate::candidates::Candidates;

pub trait GrammarGate: GrammarGateClone + Send {
    /// Set the logit of every candidate the current grammar state forbids to `-inf`.
    fn mask(&self, cur: &mut Candidates);

    /// Advance the grammar state past an emitted token.
    fn commit(&mut self, token: strata_abi::Token);
}

/// Object-safe deep copy, so forked sessions never share grammar state.
/// Implemented for every `Clone` gate; implementors don't write this by hand.
pub trait GrammarGateClone {
    fn clone_box(&self) -> Box<dyn GrammarGate>;
}

impl<T> GrammarGateClone for T
where
    T: GrammarGate + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn GrammarGate> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn GrammarGate> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Builds a gate from grammar source text.
pub trait GrammarCompiler {
    fn compile(&self, source: &str, root: &str) -> anyhow::Result<Box<dyn GrammarGate>>;
}

/// Compilers are often plain closures in tests and glue code.
impl<F> GrammarCompiler for F
where
    F: Fn(&str, &str) -> anyhow::Result<Box<dyn GrammarGate>>,
{
    fn compile(&self, source: &str, root: &str) -> anyhow::Result<Box<dyn GrammarGate>> {
        self(source, root)
    }
}
