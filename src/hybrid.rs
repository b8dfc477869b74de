//! Hybrid Search (C4): queries both indices, fuses ranks with Reciprocal
//! Rank Fusion, and emits a single ordered `SearchResult` list. Generalizes
//! this codebase's prior weighted-blend hybrid search into true RRF per the
//! fusion formula in §4.4.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::embed::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::lexical::LexicalIndex;
use crate::model::{ChapterPath, RegulationInfo};
use crate::vector::VectorIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub reg_id: String,
    pub page_num: u32,
    pub chapter_path: ChapterPath,
    pub block_id: String,
    pub snippet: String,
    pub score: f64,
}

/// Infer a `reg_ids` scope from free text when the caller left it unset
/// (§4.4). Fails open: if nothing matches, every known regulation is
/// searched rather than returning an empty set.
pub fn infer_scope(query_text: &str, regulations: &[RegulationInfo]) -> Option<Vec<String>> {
    let matched: Vec<String> = regulations
        .iter()
        .filter(|r| r.matches_query(query_text))
        .map(|r| r.reg_id.clone())
        .collect();
    if matched.is_empty() {
        None
    } else {
        Some(matched)
    }
}

fn rrf_term(k: u32, rank: Option<usize>) -> f64 {
    match rank {
        Some(r) => 1.0 / (k as f64 + (r + 1) as f64),
        None => 0.0,
    }
}

pub struct HybridSearch<'a> {
    pub lexical: &'a LexicalIndex,
    pub vector: &'a VectorIndex,
    pub embedder: &'a dyn Embedder,
    pub rrf_k: u32,
    pub fts_weight: f64,
    pub vector_weight: f64,
}

impl<'a> HybridSearch<'a> {
    #[tracing::instrument(skip(self), fields(limit))]
    pub fn search(
        &self,
        query_text: &str,
        reg_ids: Option<&[String]>,
        chapter_scope: Option<&ChapterPath>,
        limit: usize,
    ) -> CoreResult<Vec<SearchResult>> {
        if query_text.trim().is_empty() {
            return Err(CoreError::validation("query text must not be empty"));
        }
        let candidate_k = (limit * 3).max(30);

        let lexical_result = self.lexical.query(query_text, reg_ids, chapter_scope, candidate_k);
        let query_vector = self.embedder.embed(query_text);
        let vector_result = match query_vector {
            Ok(v) => self.vector.query(&v, reg_ids, chapter_scope, candidate_k),
            Err(e) => Err(e),
        };

        let (lex_hits, vec_hits) = match (lexical_result, vector_result) {
            (Err(lex_err), Err(_vec_err)) => {
                tracing::warn!("both lexical and vector indices unavailable");
                return Err(lex_err);
            }
            (Ok(lex), Err(e)) => {
                tracing::warn!(error = %e, "vector index unavailable, falling back to lexical only");
                (lex, Vec::new())
            }
            (Err(e), Ok(vec)) => {
                tracing::warn!(error = %e, "lexical index unavailable, falling back to vector only");
                (Vec::new(), vec)
            }
            (Ok(lex), Ok(vec)) => (lex, vec),
        };

        let mut fused: HashMap<(String, u32, String), FusedCandidate> = HashMap::new();

        for (rank, (record, _score)) in lex_hits.iter().enumerate() {
            let key = (record.reg_id.clone(), record.page_num, record.block_id.clone());
            fused.entry(key).or_insert_with(|| FusedCandidate {
                reg_id: record.reg_id.clone(),
                page_num: record.page_num,
                chapter_path: record.chapter_path.clone(),
                block_id: record.block_id.clone(),
                snippet: record.short_preview.clone(),
                lex_rank: None,
                vec_rank: None,
            })
            .lex_rank = Some(rank);
        }

        for (rank, (record, _score)) in vec_hits.iter().enumerate() {
            let key = (record.reg_id.clone(), record.page_num, record.block_id.clone());
            let entry = fused.entry(key).or_insert_with(|| FusedCandidate {
                reg_id: record.reg_id.clone(),
                page_num: record.page_num,
                chapter_path: record.chapter_path.clone(),
                block_id: record.block_id.clone(),
                snippet: record.content_text_truncated.clone(),
                lex_rank: None,
                vec_rank: None,
            });
            entry.vec_rank = Some(rank);
        }

        let mut results: Vec<SearchResult> = fused
            .into_values()
            .map(|c| {
                let score = self.fts_weight * rrf_term(self.rrf_k, c.lex_rank)
                    + self.vector_weight * rrf_term(self.rrf_k, c.vec_rank);
                SearchResult {
                    reg_id: c.reg_id,
                    page_num: c.page_num,
                    chapter_path: c.chapter_path,
                    block_id: c.block_id,
                    snippet: c.snippet,
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    (a.reg_id.clone(), a.page_num, a.block_id.clone())
                        .cmp(&(b.reg_id.clone(), b.page_num, b.block_id.clone()))
                })
        });
        results.truncate(limit);
        Ok(results)
    }
}

struct FusedCandidate {
    reg_id: String,
    page_num: u32,
    chapter_path: ChapterPath,
    block_id: String,
    snippet: String,
    lex_rank: Option<usize>,
    vec_rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use crate::lexical::LexicalRecord;
    use crate::vector::VectorRecord;

    fn build_pair() -> (LexicalIndex, VectorIndex, HashingEmbedder) {
        let embedder = HashingEmbedder::new(16);
        let lex = LexicalIndex::build(vec![
            LexicalRecord {
                reg_id: "R".into(),
                page_num: 1,
                block_id: "b1".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text: "母线失压处理".into(),
                short_preview: "母线失压处理".into(),
            },
            LexicalRecord {
                reg_id: "R".into(),
                page_num: 2,
                block_id: "b2".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text: "系统电压恢复".into(),
                short_preview: "系统电压恢复".into(),
            },
        ]);
        let vec_idx = VectorIndex::build(vec![
            VectorRecord {
                reg_id: "R".into(),
                page_num: 1,
                block_id: "b1".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text_truncated: "母线失压处理".into(),
                vector: embedder.embed("母线失压处理").unwrap(),
            },
            VectorRecord {
                reg_id: "R".into(),
                page_num: 2,
                block_id: "b2".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text_truncated: "系统电压恢复".into(),
                vector: embedder.embed("系统电压恢复").unwrap(),
            },
        ]);
        (lex, vec_idx, embedder)
    }

    #[test]
    fn s1_basic_hybrid_search_ranks_matching_block_first() {
        let (lex, vec_idx, embedder) = build_pair();
        let search = HybridSearch {
            lexical: &lex,
            vector: &vec_idx,
            embedder: &embedder,
            rrf_k: 60,
            fts_weight: 0.4,
            vector_weight: 0.6,
        };
        let results = search
            .search("母线失压", Some(&["R".to_string()]), None, 5)
            .unwrap();
        assert_eq!(results[0].reg_id, "R");
        assert_eq!(results[0].page_num, 1);
        assert_eq!(results[0].block_id, "b1");
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn empty_query_is_validation_error() {
        let (lex, vec_idx, embedder) = build_pair();
        let search = HybridSearch {
            lexical: &lex,
            vector: &vec_idx,
            embedder: &embedder,
            rrf_k: 60,
            fts_weight: 0.4,
            vector_weight: 0.6,
        };
        let err = search.search("   ", None, None, 5).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rank_fusion_monotonicity() {
        // Block that wins both sub-rankings must outrank one that loses both.
        let embedder = HashingEmbedder::new(16);
        let lex = LexicalIndex::build(vec![
            LexicalRecord {
                reg_id: "R".into(),
                page_num: 1,
                block_id: "winner".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text: "电压控制 电压控制 电压控制".into(),
                short_preview: "winner".into(),
            },
            LexicalRecord {
                reg_id: "R".into(),
                page_num: 2,
                block_id: "loser".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text: "完全不相关的内容".into(),
                short_preview: "loser".into(),
            },
        ]);
        let vec_idx = VectorIndex::build(vec![
            VectorRecord {
                reg_id: "R".into(),
                page_num: 1,
                block_id: "winner".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text_truncated: "电压控制".into(),
                vector: embedder.embed("电压控制").unwrap(),
            },
            VectorRecord {
                reg_id: "R".into(),
                page_num: 2,
                block_id: "loser".into(),
                chapter_path: ChapterPath::new(vec![]),
                content_text_truncated: "完全不相关的内容".into(),
                vector: embedder.embed("完全不相关的内容").unwrap(),
            },
        ]);
        let search = HybridSearch {
            lexical: &lex,
            vector: &vec_idx,
            embedder: &embedder,
            rrf_k: 60,
            fts_weight: 0.4,
            vector_weight: 0.6,
        };
        let results = search.search("电压控制", None, None, 10).unwrap();
        let winner_pos = results.iter().position(|r| r.block_id == "winner").unwrap();
        let loser_pos = results.iter().position(|r| r.block_id == "loser").unwrap();
        assert!(winner_pos < loser_pos);
    }
}
