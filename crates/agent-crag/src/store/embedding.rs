//! Offline embeddings

use agent_llm::EmbeddingProvider;
use async_trait::async_trait;

const DEFAULT_DIMENSIONS: usize = 512;

/// Hashed bag-of-words embedder
///
/// Each lowercase alphanumeric token adds weight to one of `dimensions`
/// buckets chosen by FNV-1a. Needs no network or API key; texts sharing
/// vocabulary score higher. The empty string and texts with no tokens map to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl LexicalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
        {
            let bucket = fnv1a(&token.to_lowercase()) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for LexicalEmbedder {
    async fn embed(&self, inputs: &[String]) -> agent_llm::Result<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|text| self.embed_one(text)).collect())
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
