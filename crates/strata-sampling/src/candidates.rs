//! Candidate set: the live sampling pool for one decoding step.
//!
//! Logits are authoritative; probabilities are derived by [`Candidates::softmax`]
//! and go stale as soon as any stage touches a logit. Every rank-based stage
//! must see the set sorted (descending logit, ascending id on ties), so the
//! set tracks whether that order currently holds.

use std::cmp::Ordering;

use strata_abi::{LogitBias, Token};

/// One (token, score) pair under consideration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenData {
    pub id: Token,
    pub logit: f32,
    pub p: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Candidates {
    data: Vec<TokenData>,
    sorted: bool,
}

/// Descending logit; ties broken by ascending id so runs are reproducible.
#[inline]
fn by_score(a: &TokenData, b: &TokenData) -> Ordering {
    b.logit.total_cmp(&a.logit).then_with(|| a.id.cmp(&b.id))
}

impl Candidates {
    /// One candidate per vocabulary entry, with `bias` folded into the logits.
    pub fn from_logits(logits: &[f32], bias: &[LogitBias]) -> Self {
        let mut cur = Self::default();
        cur.rebuild(logits, bias);
        cur
    }

    /// Refill in place (reuses the allocation across decode steps).
    /// Bias entries outside the vocabulary are ignored; repeated ids accumulate.
    pub fn rebuild(&mut self, logits: &[f32], bias: &[LogitBias]) {
        self.data.clear();
        self.data.reserve(logits.len());
        self.data.extend(logits.iter().enumerate().map(|(i, &logit)| TokenData {
            id: Token(i as i32),
            logit,
            p: 0.0,
        }));

        for lb in bias {
            if let Some(c) = lb.token.index().and_then(|i| self.data.get_mut(i)) {
                c.logit += lb.bias;
            }
        }
        self.sorted = false;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    #[inline]
    pub fn as_slice(&self) -> &[TokenData] {
        &self.data
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&TokenData> {
        self.data.get(i)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, TokenData> {
        self.data.iter()
    }

    /// Mutable access for stages that rewrite logits. Clears the sorted flag.
    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TokenData> {
        self.sorted = false;
        self.data.iter_mut()
    }

    /// Position of `token` in the current order.
    pub fn find(&self, token: Token) -> Option<usize> {
        self.data.iter().position(|c| c.id == token)
    }

    /// Stable sort by score, if not already in order.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.data.sort_by(by_score);
            self.sorted = true;
        }
    }

    /// Highest logit (lowest id on ties), without touching probabilities.
    pub fn argmax(&self) -> Option<Token> {
        self.data
            .iter()
            .min_by(|a, b| by_score(a, b))
            .map(|c| c.id)
    }

    /// Sort, then recompute probabilities from logits (max-subtracted).
    ///
    /// Masked entries (`-inf`) get probability 0. If everything is masked the
    /// probabilities are all 0 and any weighted draw will refuse the set.
    pub fn softmax(&mut self) {
        if self.data.is_empty() {
            return;
        }
        self.sort();

        let max = self.data[0].logit;
        let mut sum = 0.0f32;
        for c in self.data.iter_mut() {
            c.p = if c.logit == f32::NEG_INFINITY {
                0.0
            } else if c.logit == max {
                1.0
            } else {
                (c.logit - max).exp()
            };
            sum += c.p;
        }
        if sum > 0.0 {
            for c in self.data.iter_mut() {
                c.p /= sum;
            }
        }
    }

    /// Keep the first `n` entries in the current order; never drops below one.
    pub fn truncate(&mut self, n: usize) {
        self.data.truncate(n.max(1));
    }

    /// Replace contents with a reordered subset (typical-p). Order is not
    /// score order afterwards.
    pub(crate) fn replace_unsorted(&mut self, data: Vec<TokenData>) {
        self.data = data;
        self.sorted = false;
    }

    /// Mark the current order as score order after a stage that only
    /// rescaled logits monotonically.
    pub(crate) fn assume_sorted(&mut self, sorted: bool) {
        self.sorted = sorted;
    }

    pub(crate) fn data_mut(&mut self) -> &mut [TokenData] {
        &mut self.data
    }
}

impl<'a> IntoIterator for &'a Candidates {
    type Item = &'a TokenData;
    type IntoIter = std::slice::Iter<'a, TokenData>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
