//! Embedder boundary (§6, §10.4): a callable `embed(text) -> R^D` with a
//! fixed `D`. The core's vector index and hybrid search depend only on this
//! trait, never on a concrete model, so a remote embedder is a legitimate
//! drop-in replacement for the local default below.

use crate::error::CoreResult;

pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> CoreResult<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Default local embedder backed by a static-embedding model
/// (`model2vec-rs`): no network call, no ONNX runtime, suitable as the
/// out-of-the-box implementation of the embedder boundary.
pub struct StaticModelEmbedder {
    model: model2vec_rs::model::StaticModel,
    dimension: usize,
}

impl StaticModelEmbedder {
    pub fn load(model_path: &str, dimension: usize) -> CoreResult<Self> {
        let model = model2vec_rs::model::StaticModel::from_pretrained(model_path, None, None, None)
            .map_err(|e| crate::error::CoreError::external("model2vec-rs", e.to_string()))?;
        Ok(StaticModelEmbedder { model, dimension })
    }
}

impl Embedder for StaticModelEmbedder {
    fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
        let embeddings = self.model.encode(&[text.to_string()]);
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::CoreError::external("model2vec-rs", "empty embedding batch"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for tests and for deployments that have not yet
/// wired a real model: hashes tokens into a fixed-width vector, giving
/// reproducible, comparably-similar vectors for textually similar inputs
/// without any model dependency.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        HashingEmbedder { dimension }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimension];
        for tok in crate::lexical::tokenize(text) {
            let hash = xxhash_rust::xxh3::xxh3_64(tok.as_bytes());
            let idx = (hash as usize) % self.dimension;
            v[idx] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
