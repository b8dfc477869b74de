//! Annotation & Reference Resolver (C6): annotation lookup by label, plus
//! cross-reference phrase classification against a small grammar (§4.6).
//! The classifier is a tagged dispatch over pattern kinds; extending it
//! means adding a variant to `ReferenceKind`, not subclassing (§9).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::model::{Annotation, Page, TableRegistry};
use crate::normalize::{normalize, normalized_eq};
use crate::tables::find_table_by_caption;
use crate::toc::{resolve_section, TocTree};

/// Locate an annotation by label, following the precedence order in §4.6:
/// exact match, then normalized-equality match, then prefix match. Within
/// a precedence class, prefer the page closest to `page_hint`. Returns the
/// page it was found on alongside the annotation, since callers resolving a
/// cross-reference phrase need a page range, not just the annotation body.
pub fn lookup_annotation_with_page(
    pages: &[Page],
    reg_id: &str,
    label: &str,
    page_hint: Option<u32>,
) -> CoreResult<(u32, Annotation)> {
    let search_order: Vec<&Page> = match page_hint {
        Some(hint) => {
            let mut ordered: Vec<&Page> = pages.iter().collect();
            ordered.sort_by_key(|p| (p.page_num as i64 - hint as i64).abs());
            ordered
        }
        None => pages.iter().collect(),
    };

    for precedence in [MatchPrecedence::Exact, MatchPrecedence::Normalized, MatchPrecedence::Prefix] {
        let mut best: Option<(&Page, &Annotation)> = None;
        for page in &search_order {
            for ann in &page.annotations {
                if matches_precedence(&ann.label, label, precedence) {
                    match best {
                        None => best = Some((page, ann)),
                        Some((best_page, _)) => {
                            if let Some(hint) = page_hint {
                                let this_dist = (page.page_num as i64 - hint as i64).abs();
                                let best_dist = (best_page.page_num as i64 - hint as i64).abs();
                                if this_dist < best_dist {
                                    best = Some((page, ann));
                                }
                            }
                        }
                    }
                }
            }
        }
        if let Some((page, ann)) = best {
            return Ok((page.page_num, ann.clone()));
        }
    }

    Err(CoreError::AnnotationNotFound {
        reg_id: reg_id.to_string(),
        label: label.to_string(),
    })
}

/// Locate an annotation by label (§4.6), discarding the page it was found
/// on. Thin wrapper over `lookup_annotation_with_page` for callers that only
/// need the annotation body (the tool surface's `lookup_annotation` op).
pub fn lookup_annotation(
    pages: &[Page],
    reg_id: &str,
    label: &str,
    page_hint: Option<u32>,
) -> CoreResult<Annotation> {
    lookup_annotation_with_page(pages, reg_id, label, page_hint).map(|(_, ann)| ann)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchPrecedence {
    Exact,
    Normalized,
    Prefix,
}

fn matches_precedence(stored: &str, query: &str, precedence: MatchPrecedence) -> bool {
    match precedence {
        MatchPrecedence::Exact => stored == query,
        MatchPrecedence::Normalized => normalized_eq(stored, query),
        MatchPrecedence::Prefix => normalize(stored).starts_with(&normalize(query)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Chapter,
    Table,
    Annotation,
    Page,
}

impl ReferenceKind {
    /// Specificity used to rank multiple admissible candidates (§4.6): more
    /// constrained patterns (a direct page number) rank above looser ones
    /// (a bare chapter reference).
    fn specificity(self) -> u8 {
        match self {
            ReferenceKind::Page => 4,
            ReferenceKind::Annotation => 3,
            ReferenceKind::Table => 2,
            ReferenceKind::Chapter => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    pub kind: ReferenceKind,
    pub target_id: String,
    pub page_start: u32,
    pub page_end: u32,
}

struct Patterns {
    chapter: Regex,
    section: Regex,
    table: Regex,
    annotation_note: Regex,
    annotation_scheme: Regex,
    page_direct: Regex,
    page_prefixed: Regex,
}

fn patterns() -> Patterns {
    Patterns {
        chapter: Regex::new(r"见?第([0-9一二三四五六七八九十百]+)章").unwrap(),
        section: Regex::new(r"见?第([0-9一二三四五六七八九十百]+)节").unwrap(),
        table: Regex::new(r"[见参]?[见]?表\s*([0-9A-Za-z]+-[0-9A-Za-z]+)").unwrap(),
        annotation_note: Regex::new(r"见?注\s*([0-9①②③④⑤⑥⑦⑧⑨⑩⑪⑫⑬⑭⑮⑯⑰⑱⑲⑳一二三四五六七八九十]+)").unwrap(),
        annotation_scheme: Regex::new(r"方案\s*([A-Za-z])").unwrap(),
        page_direct: Regex::new(r"[Pp]\s*(\d+)").unwrap(),
        page_prefixed: Regex::new(r"第\s*(\d+)\s*页").unwrap(),
    }
}

/// Classify `phrase` against the reference grammar and return every
/// admissible candidate ranked by specificity, most specific first (§4.6).
/// Resolution into a concrete page range requires the TOC, the table
/// registry, and the page set for this regulation (so annotation and table
/// candidates can be resolved to the page(s) that actually carry them, not
/// a placeholder range); candidates that cannot be resolved (e.g. an
/// unknown chapter number, a caption with no matching table, a label with
/// no matching annotation) are omitted rather than erroring individually —
/// the caller only sees `ReferenceNotResolved` if nothing resolves.
pub fn resolve_reference(
    toc: &TocTree,
    table_registry: &TableRegistry,
    pages: &[Page],
    reg_id: &str,
    phrase: &str,
) -> CoreResult<Vec<ReferenceTarget>> {
    let p = patterns();
    let mut candidates = Vec::new();

    if let Some(caps) = p.page_prefixed.captures(phrase).or_else(|| p.page_direct.captures(phrase)) {
        if let Ok(n) = caps[1].parse::<u32>() {
            candidates.push(ReferenceTarget {
                kind: ReferenceKind::Page,
                target_id: n.to_string(),
                page_start: n,
                page_end: n,
            });
        }
    }

    if let Some(caps) = p.annotation_note.captures(phrase) {
        let label = format!("注{}", &caps[1]);
        if let Ok((page_num, ann)) = lookup_annotation_with_page(pages, reg_id, &label, None) {
            candidates.push(ReferenceTarget {
                kind: ReferenceKind::Annotation,
                target_id: ann.label,
                page_start: page_num,
                page_end: page_num,
            });
        }
    }
    if let Some(caps) = p.annotation_scheme.captures(phrase) {
        let label = format!("方案{}", &caps[1]);
        if let Ok((page_num, ann)) = lookup_annotation_with_page(pages, reg_id, &label, None) {
            candidates.push(ReferenceTarget {
                kind: ReferenceKind::Annotation,
                target_id: ann.label,
                page_start: page_num,
                page_end: page_num,
            });
        }
    }

    if let Some(caps) = p.table.captures(phrase) {
        let needle = format!("表{}", &caps[1]);
        if let Some(entry) = find_table_by_caption(table_registry, &needle) {
            candidates.push(ReferenceTarget {
                kind: ReferenceKind::Table,
                target_id: entry.table_id.clone(),
                page_start: entry.start_page,
                page_end: entry.end_page,
            });
        }
    }

    if let Some(caps) = p.chapter.captures(phrase).or_else(|| p.section.captures(phrase)) {
        let numeral = &caps[1];
        if let Some(section_number) = crate::toc::parse_section_number(&format!("第{numeral}章")) {
            if let Some(item) = resolve_section(toc, &section_number) {
                candidates.push(ReferenceTarget {
                    kind: ReferenceKind::Chapter,
                    target_id: section_number,
                    page_start: item.page_start,
                    page_end: item.page_end,
                });
            }
        }
    }

    if candidates.is_empty() {
        return Err(CoreError::ReferenceNotResolved {
            phrase: phrase.to_string(),
        });
    }

    candidates.sort_by(|a, b| b.kind.specificity().cmp(&a.kind.specificity()));
    Ok(candidates)
}
