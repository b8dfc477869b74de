use serde::{Deserialize, Serialize};

/// Manifest record for one ingested regulation. Lives at
/// `<data_dir>/pages/<reg_id>/info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationInfo {
    pub reg_id: String,
    pub title: String,
    pub source_filename: String,
    pub total_pages: u32,
    /// Unix seconds at ingest time.
    pub ingested_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Dimensionality of vectors indexed for this regulation. `None` until
    /// the vector index has been built at least once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_dimension: Option<usize>,
}

impl RegulationInfo {
    /// Whether `query_text` plausibly concerns this regulation, used by
    /// hybrid search to infer a `reg_ids` scope when the caller left it
    /// unset. Matches case-insensitively against keywords and scope text.
    pub fn matches_query(&self, query_text: &str) -> bool {
        let q = query_text.to_lowercase();
        if q.is_empty() {
            return false;
        }
        let keyword_hit = self
            .keywords
            .iter()
            .any(|k| q.contains(&k.to_lowercase()) || k.to_lowercase().contains(&q));
        let scope_hit = self
            .scope
            .as_deref()
            .map(|s| q.contains(&s.to_lowercase()) || s.to_lowercase().contains(&q))
            .unwrap_or(false);
        let title_hit = self.title.to_lowercase().contains(&q) || q.contains(&self.title.to_lowercase());
        keyword_hit || scope_hit || title_hit
    }
}
