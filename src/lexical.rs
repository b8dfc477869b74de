//! Lexical Index (C2): a full-text inverted index over page blocks with
//! BM25 ranking. Tokenization segments CJK runs into character bigrams and
//! keeps ASCII runs whole (§4.2); no stop-word filtering, since technical
//! prepositions like 见 carry weight in this corpus.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::{CoreError, CoreResult};
use crate::model::ChapterPath;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// One indexed content block. Indices hold only ids back into the Page
/// Store (§3); `content_text` here is the tokenization target, kept
/// alongside the id fields purely so BM25 scoring doesn't need a second
/// lookup per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalRecord {
    pub reg_id: String,
    pub page_num: u32,
    pub block_id: String,
    pub chapter_path: ChapterPath,
    pub content_text: String,
    pub short_preview: String,
}

/// Split `text` into tokens: CJK characters become individual unigrams
/// (cheap character n-grams, acceptable per §4.2), contiguous ASCII
/// alphanumeric runs become single whole tokens, everything else (spaces,
/// punctuation) is a separator.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut ascii_run = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            ascii_run.push(ch.to_ascii_lowercase());
            continue;
        }
        if !ascii_run.is_empty() {
            tokens.push(std::mem::take(&mut ascii_run));
        }
        if ch.is_whitespace() || ch.is_ascii_punctuation() {
            continue;
        }
        // Non-ASCII, non-whitespace: treat every character (CJK or other
        // scripts) as its own unigram token.
        tokens.push(ch.to_string());
    }
    if !ascii_run.is_empty() {
        tokens.push(ascii_run);
    }
    tokens
}

struct IndexedDoc {
    record: LexicalRecord,
    term_freqs: HashMap<String, u32>,
    doc_len: u32,
}

pub struct LexicalIndex {
    docs: Vec<IndexedDoc>,
    doc_freq: HashMap<String, u32>,
    avg_doc_len: f64,
}

impl LexicalIndex {
    /// Build from scratch over every record, matching §4.2 invariant (c):
    /// the index is rebuildable from the Page Store alone.
    pub fn build(records: Vec<LexicalRecord>) -> Self {
        let mut docs = Vec::with_capacity(records.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len: u64 = 0;

        for record in records {
            let tokens = tokenize(&record.content_text);
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for tok in &tokens {
                *term_freqs.entry(tok.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += tokens.len() as u64;
            docs.push(IndexedDoc {
                record,
                term_freqs,
                doc_len: tokens.len() as u32,
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        LexicalIndex {
            docs,
            doc_freq,
            avg_doc_len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score_doc(&self, doc: &IndexedDoc, query_terms: &[String]) -> f64 {
        let mut score = 0.0;
        for term in query_terms {
            let tf = *doc.term_freqs.get(term).unwrap_or(&0) as f64;
            if tf == 0.0 {
                continue;
            }
            let idf = self.idf(term);
            let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (doc.doc_len as f64 / self.avg_doc_len.max(1.0)));
            score += idf * (tf * (BM25_K1 + 1.0)) / denom;
        }
        score
    }

    /// Ranked query with optional scope filters. Ties broken by
    /// `(reg_id, page_num, block_id)` ascending for determinism (§4.2).
    pub fn query(
        &self,
        query_text: &str,
        reg_ids: Option<&[String]>,
        chapter_scope: Option<&ChapterPath>,
        limit: usize,
    ) -> CoreResult<Vec<(LexicalRecord, f64)>> {
        if self.is_empty() {
            return Err(CoreError::IndexMissing {
                reg_id: None,
                detail: "lexical index has no records".to_string(),
            });
        }
        let query_terms = tokenize(query_text);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f64)> = self
            .docs
            .par_iter()
            .enumerate()
            .filter(|(_, doc)| {
                reg_ids
                    .map(|ids| ids.iter().any(|id| id == &doc.record.reg_id))
                    .unwrap_or(true)
                    && chapter_scope
                        .map(|scope| doc.record.chapter_path.starts_with(scope))
                        .unwrap_or(true)
            })
            .map(|(idx, doc)| (idx, self.score_doc(doc, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| tie_break_key(&self.docs[*ia].record).cmp(&tie_break_key(&self.docs[*ib].record)))
        });
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| (self.docs[idx].record.clone(), score))
            .collect())
    }
}

fn tie_break_key(r: &LexicalRecord) -> (String, u32, String) {
    (r.reg_id.clone(), r.page_num, r.block_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(reg_id: &str, page_num: u32, block_id: &str, text: &str) -> LexicalRecord {
        LexicalRecord {
            reg_id: reg_id.to_string(),
            page_num,
            block_id: block_id.to_string(),
            chapter_path: ChapterPath::new(vec!["第一章".into()]),
            content_text: text.to_string(),
            short_preview: text.chars().take(40).collect(),
        }
    }

    #[test]
    fn tokenize_splits_cjk_unigrams_and_keeps_ascii_whole() {
        let tokens = tokenize("母线失压 220kV");
        assert_eq!(
            tokens,
            vec!["母", "线", "失", "压", "220kv"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn no_stopword_filtering_see_preposition_carries_weight() {
        let tokens = tokenize("见第六章");
        assert!(tokens.contains(&"见".to_string()));
    }

    #[test]
    fn basic_query_ranks_matching_block_first() {
        let index = LexicalIndex::build(vec![
            rec("R", 1, "b1", "母线失压处理方案"),
            rec("R", 2, "b2", "系统电压恢复"),
        ]);
        let hits = index.query("母线失压", None, None, 5).unwrap();
        assert_eq!(hits[0].0.block_id, "b1");
        assert!(hits[0].1 > 0.0);
    }

    #[test]
    fn empty_index_reports_index_missing() {
        let index = LexicalIndex::build(vec![]);
        let err = index.query("anything", None, None, 5).unwrap_err();
        assert!(matches!(err, CoreError::IndexMissing { .. }));
    }

    #[test]
    fn chapter_scope_filters_by_prefix() {
        let mut a = rec("R", 1, "b1", "电压控制 A");
        a.chapter_path = ChapterPath::new(vec!["A".into()]);
        let mut b = rec("R", 2, "b2", "电压控制 B");
        b.chapter_path = ChapterPath::new(vec!["B".into()]);
        let index = LexicalIndex::build(vec![a, b]);
        let scope = ChapterPath::new(vec!["A".into()]);
        let hits = index.query("电压", None, Some(&scope), 100).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.block_id, "b1");
    }

    #[test]
    fn tie_break_is_deterministic() {
        let index = LexicalIndex::build(vec![
            rec("R", 2, "b2", "电压"),
            rec("R", 1, "b1", "电压"),
        ]);
        let hits = index.query("电压", None, None, 10).unwrap();
        // identical scores: tie-break orders by (reg_id, page_num, block_id)
        assert_eq!(hits[0].0.page_num, 1);
        assert_eq!(hits[1].0.page_num, 2);
    }
}
