use serde::{Deserialize, Serialize};

use super::table::TableMeta;

/// Identifier unique within a regulation; stable across re-reads of the same
/// ingested generation. Parsers are expected to derive it deterministically
/// (e.g. `page_num` + ordinal) so re-running the same ingest twice reuses
/// the same ids.
pub type BlockId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Table,
    Heading,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub block_id: BlockId,
    pub kind: BlockKind,
    /// Position of this block within its page, starting at 0.
    pub ordinal: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableMeta>,
}

impl ContentBlock {
    pub fn is_table(&self) -> bool {
        matches!(self.kind, BlockKind::Table)
    }
}
