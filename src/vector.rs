//! Vector Index (C3): dense-vector cosine similarity over page blocks.
//! Mirrors the data-parallel scoring idiom this codebase already uses for
//! ranked candidate search, generalized from a fixed weighted blend to a
//! pure cosine ranking that Hybrid Search (C4) fuses with the lexical side.

use rayon::prelude::*;

use crate::error::{CoreError, CoreResult};
use crate::model::ChapterPath;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub reg_id: String,
    pub page_num: u32,
    pub block_id: String,
    pub chapter_path: ChapterPath,
    pub content_text_truncated: String,
    pub vector: Vec<f32>,
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Truncate `text` to at most `limit` characters, the `vector_content_limit`
/// knob (§6 configuration table, §10.1). Character-safe, not byte-sliced.
pub fn truncate_for_embedding(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub struct VectorIndex {
    records: Vec<VectorRecord>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn build(records: Vec<VectorRecord>) -> Self {
        let dimension = records.first().map(|r| r.vector.len());
        VectorIndex { records, dimension }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Ranked query by cosine similarity against `query_vector`. Same
    /// tie-break as the lexical index for cross-index determinism.
    pub fn query(
        &self,
        query_vector: &[f32],
        reg_ids: Option<&[String]>,
        chapter_scope: Option<&ChapterPath>,
        limit: usize,
    ) -> CoreResult<Vec<(VectorRecord, f64)>> {
        if self.is_empty() {
            return Err(CoreError::IndexMissing {
                reg_id: None,
                detail: "vector index has no records".to_string(),
            });
        }
        if let Some(expected) = self.dimension {
            if query_vector.len() != expected {
                return Err(CoreError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f64)> = self
            .records
            .par_iter()
            .enumerate()
            .filter(|(_, rec)| {
                reg_ids
                    .map(|ids| ids.iter().any(|id| id == &rec.reg_id))
                    .unwrap_or(true)
                    && chapter_scope
                        .map(|scope| rec.chapter_path.starts_with(scope))
                        .unwrap_or(true)
            })
            .map(|(idx, rec)| (idx, cosine_similarity(query_vector, &rec.vector)))
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| tie_break_key(&self.records[*ia]).cmp(&tie_break_key(&self.records[*ib])))
        });
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| (self.records[idx].clone(), score))
            .collect())
    }
}

fn tie_break_key(r: &VectorRecord) -> (String, u32, String) {
    (r.reg_id.clone(), r.page_num, r.block_id.clone())
}
