//! TOC & Chapter Navigator (C7): builds the chapter forest from per-page
//! `chapter_path` sequences and answers page/section lookups against it.
//! Tree construction accumulates page ranges in a `BTreeMap` keyed by path
//! segment so sibling order is deterministic regardless of traversal order
//! (§4.7), the same ordered-collection idiom this codebase already favors
//! for directory/page traversal.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::model::{ChapterPath, Page, TocItem, TocTree};

const UNTITLED: &str = "(untitled)";

struct BuildNode {
    page_start: u32,
    page_end: u32,
    children: BTreeMap<String, BuildNode>,
    child_order: Vec<String>,
}

impl BuildNode {
    fn new(page_num: u32) -> Self {
        BuildNode {
            page_start: page_num,
            page_end: page_num,
            children: BTreeMap::new(),
            child_order: Vec::new(),
        }
    }

    fn extend(&mut self, page_num: u32) {
        self.page_start = self.page_start.min(page_num);
        self.page_end = self.page_end.max(page_num);
    }
}

/// Build the chapter forest. A page's `chapter_path` segments become a
/// root-to-leaf chain of nodes whose page ranges grow to cover every page
/// that touches them. Pages with an empty path attach to a synthetic
/// `(untitled)` node at level 1 (§4.7).
pub fn build_toc(pages: &[Page]) -> TocTree {
    let mut roots: BTreeMap<String, BuildNode> = BTreeMap::new();
    let mut root_order: Vec<String> = Vec::new();

    for page in pages {
        let segments: Vec<String> = if page.chapter_path.is_empty() {
            vec![UNTITLED.to_string()]
        } else {
            page.chapter_path.0.clone()
        };

        let root_key = segments[0].clone();
        if !roots.contains_key(&root_key) {
            root_order.push(root_key.clone());
        }
        let mut node = roots.entry(root_key).or_insert_with(|| BuildNode::new(page.page_num));
        node.extend(page.page_num);

        for seg in &segments[1..] {
            if !node.children.contains_key(seg) {
                node.child_order.push(seg.clone());
            }
            node = node
                .children
                .entry(seg.clone())
                .or_insert_with(|| BuildNode::new(page.page_num));
            node.extend(page.page_num);
        }
    }

    fn into_items(order: &[String], map: &BTreeMap<String, BuildNode>, level: u32) -> Vec<TocItem> {
        let mut items: Vec<TocItem> = order
            .iter()
            .map(|title| {
                let node = &map[title];
                TocItem {
                    title: title.clone(),
                    level,
                    page_start: node.page_start,
                    page_end: node.page_end,
                    section_number: parse_section_number(title),
                    children: into_items(&node.child_order, &node.children, level + 1),
                }
            })
            .collect();
        items.sort_by_key(|item| item.page_start);
        items
    }

    TocTree {
        nodes: into_items(&root_order, &roots, 1),
    }
}

/// Parse a leading section number from a heading title, e.g. "第六章" ->
/// "6", "6.1.2 一般规定" -> "6.1.2". Returns `None` when no recognizable
/// prefix is present.
pub fn parse_section_number(title: &str) -> Option<String> {
    static CHAPTER_RE: once_lock::Lazy<Regex> =
        once_lock::Lazy::new(|| Regex::new(r"^第([0-9一二三四五六七八九十百]+)章").unwrap());
    static DOTTED_RE: once_lock::Lazy<Regex> =
        once_lock::Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)").unwrap());

    if let Some(caps) = DOTTED_RE.captures(title) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = CHAPTER_RE.captures(title) {
        let numeral = &caps[1];
        if let Ok(n) = numeral.parse::<u32>() {
            return Some(n.to_string());
        }
        return chinese_numeral_to_u32(numeral).map(|n| n.to_string());
    }
    None
}

fn chinese_numeral_to_u32(s: &str) -> Option<u32> {
    let digits: std::collections::HashMap<char, u32> = [
        ('零', 0), ('一', 1), ('二', 2), ('三', 3), ('四', 4),
        ('五', 5), ('六', 6), ('七', 7), ('八', 8), ('九', 9),
    ]
    .into_iter()
    .collect();

    if s == "十" {
        return Some(10);
    }
    if let Some(rest) = s.strip_prefix('十') {
        return digits.get(&rest.chars().next()?).map(|d| 10 + d);
    }
    if let Some(idx) = s.find('十') {
        let (tens_part, rest) = s.split_at(idx);
        let tens_digit = *digits.get(&tens_part.chars().next()?)?;
        let ones: &str = &rest[rest.chars().next().unwrap().len_utf8()..];
        let ones_digit = if ones.is_empty() {
            0
        } else {
            *digits.get(&ones.chars().next()?)?
        };
        return Some(tens_digit * 10 + ones_digit);
    }
    if s.chars().count() == 1 {
        return digits.get(&s.chars().next()?).copied();
    }
    None
}

/// Truncate a tree to `max_level` (inclusive); `None` returns the full tree.
pub fn truncate_tree(tree: &TocTree, max_level: Option<u32>) -> TocTree {
    fn truncate_item(item: &TocItem, max_level: Option<u32>) -> TocItem {
        let keep_children = max_level.map(|m| item.level < m).unwrap_or(true);
        TocItem {
            title: item.title.clone(),
            level: item.level,
            page_start: item.page_start,
            page_end: item.page_end,
            section_number: item.section_number.clone(),
            children: if keep_children {
                item.children.iter().map(|c| truncate_item(c, max_level)).collect()
            } else {
                Vec::new()
            },
        }
    }
    TocTree {
        nodes: tree.nodes.iter().map(|n| truncate_item(n, max_level)).collect(),
    }
}

/// Flat list with parent indices, an alternative view over the same tree
/// (§4.7 `get_chapter_structure`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlatTocNode {
    pub title: String,
    pub level: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub section_number: Option<String>,
    pub parent: Option<usize>,
}

pub fn flatten_tree(tree: &TocTree) -> Vec<FlatTocNode> {
    let mut out = Vec::new();
    fn walk(item: &TocItem, parent: Option<usize>, out: &mut Vec<FlatTocNode>) {
        let idx = out.len();
        out.push(FlatTocNode {
            title: item.title.clone(),
            level: item.level,
            page_start: item.page_start,
            page_end: item.page_end,
            section_number: item.section_number.clone(),
            parent,
        });
        for child in &item.children {
            walk(child, Some(idx), out);
        }
    }
    for root in &tree.nodes {
        walk(root, None, &mut out);
    }
    out
}

pub fn page_chapter_info(pages: &[Page], page_num: u32) -> CoreResult<ChapterPath> {
    pages
        .iter()
        .find(|p| p.page_num == page_num)
        .map(|p| p.chapter_path.clone())
        .ok_or_else(|| CoreError::PageNotFound {
            reg_id: String::new(),
            page_num,
        })
}

/// Find the `TocItem` whose `section_number` matches, searching depth-first.
pub fn resolve_section<'a>(tree: &'a TocTree, section_number: &str) -> Option<&'a TocItem> {
    fn search<'a>(items: &'a [TocItem], section_number: &str) -> Option<&'a TocItem> {
        for item in items {
            if item.section_number.as_deref() == Some(section_number) {
                return Some(item);
            }
            if let Some(found) = search(&item.children, section_number) {
                return Some(found);
            }
        }
        None
    }
    search(&tree.nodes, section_number)
}

/// Minimal `Lazy` so this module does not need an extra dependency purely
/// for memoizing two regexes.
mod once_lock {
    use std::sync::OnceLock;

    pub struct Lazy<T> {
        cell: OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Lazy {
                cell: OnceLock::new(),
                init,
            }
        }
    }

    impl<T> std::ops::Deref for Lazy<T> {
        type Target = T;
        fn deref(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}
