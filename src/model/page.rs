use serde::{Deserialize, Serialize};

use super::annotation::Annotation;
use super::block::ContentBlock;
use super::chapter::ChapterPath;

/// A single physical page of a regulation, uniquely identified by
/// `(reg_id, page_num)`. Persisted verbatim (including `rendered_text`) so
/// re-reads never re-derive rendering and risk divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_num: u32,
    #[serde(default)]
    pub chapter_path: ChapterPath,
    pub blocks: Vec<ContentBlock>,
    pub rendered_text: String,
    #[serde(default)]
    pub continues_from_prev: bool,
    #[serde(default)]
    pub continues_to_next: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Page {
    /// The page's last content block, if any — used by the table stitcher
    /// to test whether a page ends in a truncated table.
    pub fn last_block(&self) -> Option<&ContentBlock> {
        self.blocks.last()
    }

    /// The page's first content block, if any — used by the stitcher to
    /// test whether a page opens with a table continuation.
    pub fn first_block(&self) -> Option<&ContentBlock> {
        self.blocks.first()
    }
}
