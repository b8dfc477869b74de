use serde::{Deserialize, Serialize};

use super::block::BlockId;

/// A page-local footnote-like element, e.g. `注1: "仅限 220kV 以上"`. Labels
/// are unique within a page; the same label may reappear on other pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub label: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorates: Vec<BlockId>,
}
