//! Table Registry & Stitcher (C5): detects cross-page table continuation
//! and reassembles logical tables (§4.5). The registry is the single
//! relation between segments and their logical table; `ContentBlock` never
//! back-points into it (§9).

use crate::error::{CoreError, CoreResult};
use crate::model::{
    BlockKind, Page, StitchedCell, StitchedTable, TableEntry, TableMeta, TableRegistry,
};

/// Scan a regulation's pages left to right and build the table registry.
/// A page's last block continuing into a leading table block on the next
/// page chains both into the same logical table; the chain extends while
/// the condition keeps holding, and breaks at the first page where it does
/// not (§4.5 edge cases: ambiguous continuation is treated as broken).
pub fn build_registry(pages: &[Page]) -> TableRegistry {
    let mut registry = TableRegistry::default();
    let mut next_table_num: u32 = 1;

    let mut page_idx = 0usize;
    while page_idx < pages.len() {
        let page = &pages[page_idx];
        let Some(last) = page.last_block() else {
            page_idx += 1;
            continue;
        };
        if !last.is_table() {
            page_idx += 1;
            continue;
        }
        let table_meta = last.table.as_ref();
        let starts_truncated = table_meta.map(|t| t.truncated).unwrap_or(false);

        let mut segment_block_ids = vec![last.block_id.clone()];
        let mut caption = table_meta.and_then(|t| t.caption.clone());
        let start_page = page.page_num;
        let mut end_page = page.page_num;
        let mut cross_page = false;

        if starts_truncated {
            let mut cursor = page_idx + 1;
            let mut chain_open = true;
            while chain_open && cursor < pages.len() {
                let next_page = &pages[cursor];
                let Some(first) = next_page.first_block() else {
                    break;
                };
                let continuation_candidate = next_page.continues_from_prev && first.is_table();
                if !continuation_candidate {
                    break;
                }
                cross_page = true;
                segment_block_ids.push(first.block_id.clone());
                end_page = next_page.page_num;
                if caption.is_none() {
                    caption = first.table.as_ref().and_then(|t| t.caption.clone());
                }
                let still_truncated = first.table.as_ref().map(|t| t.truncated).unwrap_or(false);
                chain_open = still_truncated;
                cursor += 1;
            }
        }

        if segment_block_ids.len() > 1 || cross_page {
            let table_id = format!("T{}", next_table_num);
            next_table_num += 1;
            for block_id in &segment_block_ids {
                registry
                    .segment_to_table
                    .insert(block_id.clone(), table_id.clone());
            }
            registry.tables.insert(
                table_id.clone(),
                TableEntry {
                    table_id,
                    start_page,
                    end_page,
                    segment_block_ids,
                    cross_page: true,
                    caption,
                },
            );
        }

        page_idx += 1;
    }

    registry
}

/// Reassemble a logical table's segments into one stitched value (§4.5).
/// Row and column headers are taken from the first segment; duplicate
/// header rows repeated at the top of continuation segments are suppressed
/// structurally (by position), not by text comparison.
pub fn get_full_table(
    registry: &TableRegistry,
    pages: &[Page],
    reg_id: &str,
    table_id: &str,
) -> CoreResult<StitchedTable> {
    let entry = registry
        .tables
        .get(table_id)
        .ok_or_else(|| CoreError::TableNotFound {
            reg_id: reg_id.to_string(),
            table_id: table_id.to_string(),
        })?;

    let mut row_headers = Vec::new();
    let mut columns = Vec::new();
    let mut rows: Vec<Vec<StitchedCell>> = Vec::new();

    for (seg_idx, block_id) in entry.segment_block_ids.iter().enumerate() {
        let table_meta = find_table_meta(pages, block_id).ok_or_else(|| CoreError::IntegrityError {
            reg_id: reg_id.to_string(),
            detail: format!("segment block {block_id} missing or not a table"),
        })?;

        if seg_idx == 0 {
            row_headers = table_meta.row_headers.clone();
            columns = table_meta.col_headers.clone();
        }

        let header_row_count = if seg_idx == 0 { 0 } else { count_duplicate_header_rows(table_meta) };

        let segment_rows = rows_from_cells(table_meta);
        for row in segment_rows.into_iter().skip(header_row_count) {
            rows.push(row);
        }
    }

    Ok(StitchedTable {
        table_id: table_id.to_string(),
        caption: entry.caption.clone(),
        row_headers,
        columns,
        rows,
    })
}

fn find_table_meta<'a>(pages: &'a [Page], block_id: &str) -> Option<&'a TableMeta> {
    pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .find(|b| b.block_id == block_id && b.kind == BlockKind::Table)
        .and_then(|b| b.table.as_ref())
}

fn rows_from_cells(meta: &TableMeta) -> Vec<Vec<StitchedCell>> {
    let mut rows: Vec<Vec<StitchedCell>> = vec![Vec::new(); meta.row_count as usize];
    for cell in &meta.cells {
        if let Some(row) = rows.get_mut(cell.row as usize) {
            row.push(StitchedCell {
                col: cell.col,
                text: cell.text.clone(),
            });
        }
    }
    rows
}

/// Detect a header row repeated at the top of a continuation segment: the
/// segment's first row whose cell texts equal the column headers is a
/// duplicate and is suppressed. Structural (position-based), not textual
/// de-duplication applied to the whole table.
fn count_duplicate_header_rows(meta: &TableMeta) -> usize {
    if meta.col_headers.is_empty() || meta.row_count == 0 {
        return 0;
    }
    let first_row: Vec<&str> = meta
        .cells
        .iter()
        .filter(|c| c.row == 0)
        .map(|c| c.text.as_str())
        .collect();
    let headers: Vec<&str> = meta.col_headers.iter().map(|s| s.as_str()).collect();
    if first_row == headers {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTablesMode {
    Lexical,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableHit {
    pub reg_id: String,
    pub table_id: String,
    pub caption: Option<String>,
    pub score: f64,
}

/// Look up a logical table whose caption contains `needle` (case-insensitive
/// substring match), e.g. resolving a "见表6-2" cross-reference phrase
/// against stored captions like "表6-2 电压限值" (§4.6). Iteration order over
/// `registry.tables` is the `BTreeMap`'s ascending `table_id` order, so ties
/// resolve deterministically to the lowest `table_id`.
pub fn find_table_by_caption<'a>(registry: &'a TableRegistry, needle: &str) -> Option<&'a TableEntry> {
    let needle_lower = needle.to_lowercase();
    registry
        .tables
        .values()
        .find(|entry| {
            entry
                .caption
                .as_ref()
                .map(|c| c.to_lowercase().contains(&needle_lower))
                .unwrap_or(false)
        })
}

/// Match table captions and cell text against `query` (§4.5). Mode selects
/// which signal to score on; `hybrid` simply sums both simple scores since
/// tables have no separate dense-vector index of their own in this design.
pub fn search_tables(
    registry: &TableRegistry,
    pages: &[Page],
    reg_id: &str,
    query: &str,
    mode: SearchTablesMode,
) -> CoreResult<Vec<TableHit>> {
    if registry.tables.is_empty() {
        return Err(CoreError::RegistryNotBuilt {
            reg_id: reg_id.to_string(),
        });
    }
    let query_lower = query.to_lowercase();
    let mut hits = Vec::new();

    for (table_id, entry) in &registry.tables {
        let caption_score = entry
            .caption
            .as_ref()
            .map(|c| text_match_score(&c.to_lowercase(), &query_lower))
            .unwrap_or(0.0);

        let cell_score = entry
            .segment_block_ids
            .iter()
            .filter_map(|block_id| find_table_meta(pages, block_id))
            .flat_map(|meta| meta.cells.iter())
            .map(|cell| text_match_score(&cell.text.to_lowercase(), &query_lower))
            .fold(0.0f64, f64::max);

        let score = match mode {
            SearchTablesMode::Lexical => caption_score.max(cell_score),
            SearchTablesMode::Semantic => cell_score,
            SearchTablesMode::Hybrid => caption_score + cell_score,
        };

        if score > 0.0 {
            hits.push(TableHit {
                reg_id: reg_id.to_string(),
                table_id: table_id.clone(),
                caption: entry.caption.clone(),
                score,
            });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.table_id.cmp(&b.table_id))
    });
    Ok(hits)
}

fn text_match_score(haystack: &str, needle: &str) -> f64 {
    if needle.is_empty() {
        return 0.0;
    }
    if haystack.contains(needle) {
        1.0
    } else {
        0.0
    }
}
