use crate::token::Token;

/// Read-only view of a model vocabulary, owned by the model layer.
///
/// Samplers only need the size and a few special tokens; `decode_token` is
/// used for history-to-text convenience and never by the sampling decision.
pub trait Vocab: Send + Sync {
    /// Number of entries (= length of one logits row). Must be > 0.
    fn n_vocab(&self) -> usize;

    /// Model's EOS token.
    fn eos_token(&self) -> Token;

    /// Newline token, if the vocabulary has a dedicated one.
    fn nl_token(&self) -> Option<Token> {
        None
    }

    /// Decode a single token ID into a UTF-8 fragment.
    fn decode_token(&self, token: Token) -> Result<String, String>;
}
