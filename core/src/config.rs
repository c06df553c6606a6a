use crate::IndexError;
use serde::{Deserialize, Serialize};

/// Most decimal digits an f64 weight can carry; larger scales overflow the
/// rounding arithmetic.
pub const MAX_PRECISION: u32 = 15;

/// How inverse document frequency is computed from `N` documents and a
/// term's document frequency `df`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfWeighting {
    /// `ln((1 + N) / (1 + df)) + 1`
    #[default]
    Smoothed,
    /// `ln(N / df) + 1`
    Raw,
}

impl IdfWeighting {
    pub fn idf(self, num_docs: u32, df: u32) -> f64 {
        let n = num_docs as f64;
        let df = df as f64;
        match self {
            IdfWeighting::Smoothed => ((1.0 + n) / (1.0 + df)).ln() + 1.0,
            IdfWeighting::Raw => (n / df.max(1.0)).ln() + 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Shortest n-gram, in words
    pub min_ngram: usize,
    /// Longest n-gram, in words
    pub max_ngram: usize,
    /// Tokens with fewer characters are dropped before n-gram extraction
    pub min_token_len: usize,
    pub idf: IdfWeighting,
    /// Decimal digits kept on exported weights
    pub precision: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { min_ngram: 1, max_ngram: 3, min_token_len: 1, idf: IdfWeighting::Smoothed, precision: 4 }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.min_ngram == 0 {
            return Err(IndexError::InvalidConfig("min_ngram must be at least 1".into()));
        }
        if self.min_ngram > self.max_ngram {
            return Err(IndexError::InvalidConfig(format!(
                "min_ngram ({}) exceeds max_ngram ({})",
                self.min_ngram, self.max_ngram
            )));
        }
        if self.min_token_len == 0 {
            return Err(IndexError::InvalidConfig("min_token_len must be at least 1".into()));
        }
        if self.precision > MAX_PRECISION {
            return Err(IndexError::InvalidConfig(format!(
                "precision ({}) exceeds {MAX_PRECISION} decimal digits",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Round to `precision` decimal digits.
pub fn round_weight(weight: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (weight * scale).round() / scale
}
