//! Bounded recency buffer of accepted tokens.
//!
//! Fixed arena + head index; logical index 0 is the most recent token.
//! Unwritten slots hold [`Token::NULL`], and reading one through [`HistoryRing::rat`]
//! means history was consulted before it was populated: that aborts.

use strata_abi::Token;

#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<Token>,
    /// Physical index of the next write.
    head: usize,
    len: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Token::NULL; capacity],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append, evicting the oldest entry when full. No-op at capacity 0.
    pub fn push(&mut self, token: Token) {
        let cap = self.capacity();
        if cap == 0 {
            return;
        }
        self.slots[self.head] = token;
        self.head = (self.head + 1) % cap;
        self.len = (self.len + 1).min(cap);
    }

    /// Logical → physical: 0 is the slot written last.
    #[inline]
    fn physical(&self, i: usize) -> usize {
        let cap = self.capacity();
        (self.head + cap - 1 - i) % cap
    }

    /// Reverse-at: `rat(0)` is the most recent token.
    ///
    /// Panics if `i >= len()` or if the slot still holds the null sentinel.
    pub fn rat(&self, i: usize) -> Token {
        assert!(
            i < self.len,
            "history index {i} out of range (len {})",
            self.len
        );
        let token = self.slots[self.physical(i)];
        assert!(
            !token.is_null(),
            "null token in the sampling history - should not happen"
        );
        token
    }

    /// Non-panicking `rat`.
    pub fn get(&self, i: usize) -> Option<Token> {
        (i < self.len)
            .then(|| self.slots[self.physical(i)])
            .filter(|t| !t.is_null())
    }

    /// Most recent first.
    pub fn iter_recent(&self) -> impl Iterator<Item = Token> + '_ {
        (0..self.len).map(move |i| self.rat(i))
    }

    /// The last `n` tokens, oldest first (clamped to what is stored).
    pub fn last_n(&self, n: usize) -> Vec<Token> {
        let n = n.min(self.len);
        (0..n).rev().map(|i| self.rat(i)).collect()
    }

    /// Forget everything; capacity is kept.
    pub fn clear(&mut self) {
        self.slots.fill(Token::NULL);
        self.head = 0;
        self.len = 0;
    }
}
