use serde::{Deserialize, Serialize};

use super::block::BlockId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: u32,
    pub col: u32,
    pub text: String,
}

/// Table metadata attached to a `ContentBlock` with `kind = Table`. A single
/// instance describes one page-local segment; cross-page reassembly is the
/// Table Registry's job, not this type's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// True when this segment's last row continues onto the next page.
    pub truncated: bool,
    pub row_count: u32,
    pub col_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub col_headers: Vec<String>,
    pub cells: Vec<TableCell>,
}

impl TableMeta {
    /// Cell count matches `row_count * col_count` for a closed (non-truncated)
    /// table; truncated segments may legitimately violate this pending
    /// stitching, so callers should only assert it when `!truncated`.
    pub fn is_rectangular(&self) -> bool {
        self.cells.len() as u32 == self.row_count * self.col_count
    }
}

/// One logical table's registry entry: the ordered chain of page-local
/// segments that together make up the full table, plus enough metadata to
/// answer `search_tables` without re-loading every segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub table_id: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Segment block ids in document order, one per page the table spans.
    pub segment_block_ids: Vec<BlockId>,
    pub cross_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Per-regulation table registry: the arena of logical tables plus a reverse
/// index from any segment's `block_id` back to its logical `table_id`. Kept
/// as the single relation; `ContentBlock` never back-points into it (§9).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRegistry {
    pub tables: std::collections::BTreeMap<String, TableEntry>,
    pub segment_to_table: std::collections::BTreeMap<BlockId, String>,
}

impl TableRegistry {
    pub fn table_for_segment(&self, block_id: &str) -> Option<&TableEntry> {
        self.segment_to_table
            .get(block_id)
            .and_then(|table_id| self.tables.get(table_id))
    }
}

/// Result of reassembling a logical table's segments into one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchedTable {
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub row_headers: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<StitchedCell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchedCell {
    pub col: u32,
    pub text: String,
}
