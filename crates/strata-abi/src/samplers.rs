//! Filter kinds for the sampling chain and their name tables.
//!
//! Filter orderings arrive from user-facing config (JSON, CLI strings), so
//! every kind has a canonical name, a few alternative spellings, and a
//! single-character code. Lookups go through process-wide immutable tables.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One stateless stage of the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    TopK,
    TfsZ,
    TypicalP,
    TopP,
    MinP,
    Temperature,
}

static CANONICAL_NAMES: Lazy<HashMap<&'static str, SamplerKind>> = Lazy::new(|| {
    SamplerKind::ALL
        .iter()
        .map(|&kind| (kind.as_str(), kind))
        .collect()
});

// Names are written several ways across frontends; accept the common ones.
static ALT_NAMES: Lazy<HashMap<&'static str, SamplerKind>> = Lazy::new(|| {
    HashMap::from([
        ("top-k", SamplerKind::TopK),
        ("top-p", SamplerKind::TopP),
        ("nucleus", SamplerKind::TopP),
        ("typical-p", SamplerKind::TypicalP),
        ("typical", SamplerKind::TypicalP),
        ("min-p", SamplerKind::MinP),
        ("tfs-z", SamplerKind::TfsZ),
        ("tfs", SamplerKind::TfsZ),
        ("temp", SamplerKind::Temperature),
    ])
});

static CHAR_CODES: Lazy<HashMap<char, SamplerKind>> = Lazy::new(|| {
    SamplerKind::ALL
        .iter()
        .map(|&kind| (kind.as_char(), kind))
        .collect()
});

impl SamplerKind {
    pub const ALL: [SamplerKind; 6] = [
        SamplerKind::TopK,
        SamplerKind::TfsZ,
        SamplerKind::TypicalP,
        SamplerKind::TopP,
        SamplerKind::MinP,
        SamplerKind::Temperature,
    ];

    /// Default chain order: `k f y p m t`.
    pub fn default_order() -> Vec<SamplerKind> {
        Self::ALL.to_vec()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SamplerKind::TopK => "top_k",
            SamplerKind::TfsZ => "tfs_z",
            SamplerKind::TypicalP => "typical_p",
            SamplerKind::TopP => "top_p",
            SamplerKind::MinP => "min_p",
            SamplerKind::Temperature => "temperature",
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            SamplerKind::TopK => 'k',
            SamplerKind::TfsZ => 'f',
            SamplerKind::TypicalP => 'y',
            SamplerKind::TopP => 'p',
            SamplerKind::MinP => 'm',
            SamplerKind::Temperature => 't',
        }
    }

    /// Single-name lookup. Alternative spellings only when `allow_alt`.
    pub fn from_name(name: &str, allow_alt: bool) -> Option<SamplerKind> {
        CANONICAL_NAMES
            .get(name)
            .or_else(|| allow_alt.then(|| ALT_NAMES.get(name)).flatten())
            .copied()
    }

    /// Parse an ordering from names. Unknown names are skipped, duplicates kept.
    pub fn from_names<S: AsRef<str>>(names: &[S], allow_alt: bool) -> Vec<SamplerKind> {
        names
            .iter()
            .filter_map(|n| Self::from_name(n.as_ref(), allow_alt))
            .collect()
    }

    /// Parse an ordering from a compact code string such as `"kfypmt"`.
    pub fn from_chars(codes: &str) -> Vec<SamplerKind> {
        codes
            .chars()
            .filter_map(|c| CHAR_CODES.get(&c).copied())
            .collect()
    }
}

/// Serde helper: deserialize an ordering from names, dropping unknown ones
/// instead of failing the whole config.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Vec<SamplerKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(SamplerKind::from_names(&names, true))
}
