use serde::{Deserialize, Serialize};

/// Ordered sequence of heading titles from root to leaf, e.g.
/// `["第六章 电压控制", "6.1 一般规定"]`. A newtype over `Vec<String>` so
/// prefix comparison (the scope filter in C2/C3/C4) reads as a named method
/// rather than ad hoc slice slicing wherever it is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterPath(pub Vec<String>);

impl ChapterPath {
    pub fn new(segments: Vec<String>) -> Self {
        ChapterPath(segments)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when `self` begins with every segment of `prefix`, in order.
    /// This is a pure sequence comparison (§9), not substring matching.
    pub fn starts_with(&self, prefix: &ChapterPath) -> bool {
        if prefix.0.len() > self.0.len() {
            return false;
        }
        self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub fn segment(&self, level: usize) -> Option<&str> {
        self.0.get(level).map(|s| s.as_str())
    }
}

impl From<Vec<String>> for ChapterPath {
    fn from(v: Vec<String>) -> Self {
        ChapterPath(v)
    }
}

/// One node of the chapter forest. `page_start <= page_end`, and every
/// child's range is contained in its parent's (validated at build time in
/// `toc::build_toc`, not re-checked by this type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocItem {
    pub title: String,
    pub level: u32,
    pub page_start: u32,
    pub page_end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
}

impl TocItem {
    pub fn contains_page(&self, page_num: u32) -> bool {
        page_num >= self.page_start && page_num <= self.page_end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TocTree {
    pub nodes: Vec<TocItem>,
}
