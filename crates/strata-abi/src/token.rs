use serde::{Deserialize, Serialize};

/// Wrapper for a model token (ID). Using a newtype avoids accidental
/// mixing with unrelated `i32`s and keeps conversions explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub i32);

// Using i32 matches llama.cpp's `llama_token`. If a backend uses u32, convert
// at the glue layer and keep this type consistent in core.

impl Token {
    /// Sentinel for "no token". Never a valid vocabulary entry.
    pub const NULL: Token = Token(-1);

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Index into a vocabulary-sized table, if the id is non-negative.
    #[inline]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<i32> for Token {
    #[inline]
    fn from(value: i32) -> Self {
        Token(value)
    }
}

impl From<Token> for i32 {
    #[inline]
    fn from(token: Token) -> i32 {
        token.0
    }
}

/// Additive logit adjustment for a single token, bound once per session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogitBias {
    pub token: Token,
    pub bias: f32,
}

impl LogitBias {
    #[inline]
    pub fn new(token: impl Into<Token>, bias: f32) -> Self {
        Self {
            token: token.into(),
            bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_token_has_no_index() {
        assert!(Token::NULL.is_null());
        assert_eq!(Token::NULL.index(), None);
        assert_eq!(Token(7).index(), Some(7));
    }

    #[test]
    fn token_serializes_as_bare_integer() {
        let json = serde_json::to_string(&LogitBias::new(15, -1.5)).unwrap();
        assert_eq!(json, r#"{"token":15,"bias":-1.5}"#);
    }
}
