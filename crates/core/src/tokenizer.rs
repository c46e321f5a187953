//! Tokenizer capability used for token-budget trimming.

use crate::error::TokenizerError;

/// Turns text into token ids.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError>;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.encode(text)?.len())
    }
}

/// Heuristic tokenizer: roughly 4 bytes per token.
///
/// Used when no vocabulary is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateTokenizer;

impl Tokenizer for EstimateTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(text
            .as_bytes()
            .chunks(4)
            .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
            .collect())
    }

    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.len().div_ceil(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_counts_four_bytes_per_token() {
        let t = EstimateTokenizer;
        assert_eq!(t.count("").unwrap(), 0);
        assert_eq!(t.count("abcd").unwrap(), 1);
        assert_eq!(t.count("abcde").unwrap(), 2);
        assert_eq!(t.encode("abcdefgh").unwrap().len(), t.count("abcdefgh").unwrap());
    }
}
