//! Integration coverage for S2 (cross-page table stitching), S3 (annotation
//! normalization), and S4 (reference classification), through `ToolSurface`.

use regdex::config::Config;
use regdex::embed::{Embedder, HashingEmbedder};
use regdex::model::{
    Annotation, BlockKind, ChapterPath, ContentBlock, Page, RegulationInfo, TableCell, TableMeta,
};
use regdex::store::PageStore;
use regdex::tools::ToolSurface;
use tempfile::TempDir;

fn surface(tmp: &TempDir) -> ToolSurface {
    let store = PageStore::new(tmp.path());
    let embedder: Box<dyn Embedder> = Box::new(HashingEmbedder::new(32));
    ToolSurface::new(store, embedder, Config::default())
}

fn info(reg_id: &str, total_pages: u32) -> RegulationInfo {
    RegulationInfo {
        reg_id: reg_id.to_string(),
        title: "Regulation".to_string(),
        source_filename: "reg.pdf".to_string(),
        total_pages,
        ingested_at: 0,
        description: None,
        keywords: vec![],
        scope: None,
        vector_dimension: None,
    }
}

fn table_cells(rows: &[[&str; 3]]) -> Vec<TableCell> {
    let mut cells = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            cells.push(TableCell {
                row: r as u32,
                col: c as u32,
                text: text.to_string(),
            });
        }
    }
    cells
}

#[test]
fn s2_cross_page_table_stitching_via_tool_surface() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);

    let page10 = Page {
        page_num: 10,
        chapter_path: ChapterPath::new(vec!["第六章".into()]),
        blocks: vec![ContentBlock {
            block_id: "blk10".into(),
            kind: BlockKind::Table,
            ordinal: 0,
            text: "表6-2".into(),
            table: Some(TableMeta {
                caption: Some("表6-2 电压限值".into()),
                truncated: true,
                row_count: 4,
                col_count: 3,
                row_headers: vec!["r1".into(), "r2".into(), "r3".into(), "r4".into()],
                col_headers: vec!["c1".into(), "c2".into(), "c3".into()],
                cells: table_cells(&[
                    ["r1", "r1b", "r1c"],
                    ["r2", "r2b", "r2c"],
                    ["r3", "r3b", "r3c"],
                    ["r4", "r4b", "r4c"],
                ]),
            }),
        }],
        rendered_text: String::new(),
        continues_from_prev: false,
        continues_to_next: true,
        annotations: vec![],
    };
    let page11 = Page {
        page_num: 11,
        chapter_path: ChapterPath::new(vec!["第六章".into()]),
        blocks: vec![ContentBlock {
            block_id: "blk11".into(),
            kind: BlockKind::Table,
            ordinal: 0,
            text: "表6-2续".into(),
            table: Some(TableMeta {
                caption: None,
                truncated: false,
                row_count: 5,
                col_count: 3,
                row_headers: vec![],
                col_headers: vec!["c1".into(), "c2".into(), "c3".into()],
                cells: table_cells(&[
                    ["c1", "c2", "c3"],
                    ["r5", "r5b", "r5c"],
                    ["r6", "r6b", "r6c"],
                    ["r7", "r7b", "r7c"],
                    ["r8", "r8b", "r8c"],
                ]),
            }),
        }],
        rendered_text: String::new(),
        continues_from_prev: true,
        continues_to_next: false,
        annotations: vec![],
    };

    s.ingest(info("R", 2), vec![page10, page11]).unwrap();

    let hits = s
        .search_tables("电压限值", Some("R"), regdex::tables::SearchTablesMode::Lexical)
        .unwrap();
    assert_eq!(hits.len(), 1);
    let table_id = hits[0].table_id.clone();

    let stitched = s.get_table_by_id("R", &table_id).unwrap();
    assert_eq!(stitched.columns.len(), 3);
    assert_eq!(stitched.rows.len(), 8);
    assert_eq!(stitched.rows[0][0].text, "r1");
    assert_eq!(stitched.rows[7][0].text, "r8");
}

#[test]
fn s3_annotation_lookup_with_normalization() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    let pages = vec![Page {
        page_num: 25,
        chapter_path: ChapterPath::new(vec![]),
        blocks: vec![],
        rendered_text: String::new(),
        continues_from_prev: false,
        continues_to_next: false,
        annotations: vec![Annotation {
            label: "注①".into(),
            body: "仅限 220kV 以上".into(),
            decorates: vec![],
        }],
    }];
    s.ingest(info("R", 25), {
        let mut all = (1..25)
            .map(|n| Page {
                page_num: n,
                chapter_path: ChapterPath::new(vec![]),
                blocks: vec![],
                rendered_text: String::new(),
                continues_from_prev: false,
                continues_to_next: false,
                annotations: vec![],
            })
            .collect::<Vec<_>>();
        all.extend(pages);
        all
    })
    .unwrap();

    let ann = s.lookup_annotation("R", "注1", Some(25)).unwrap();
    assert_eq!(ann.label, "注①");
    assert_eq!(ann.body, "仅限 220kV 以上");
}

#[test]
fn s4_reference_classification_chapter() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    let mut pages = Vec::new();
    for n in 1..=95u32 {
        let path = if n >= 80 { vec!["第六章".to_string()] } else { vec!["第一章".to_string()] };
        pages.push(Page {
            page_num: n,
            chapter_path: ChapterPath::new(path),
            blocks: vec![],
            rendered_text: String::new(),
            continues_from_prev: false,
            continues_to_next: false,
            annotations: vec![],
        });
    }
    s.ingest(info("R", 95), pages).unwrap();

    let candidates = s.resolve_reference("R", "见第六章").unwrap();
    assert_eq!(candidates[0].kind, regdex::reference::ReferenceKind::Chapter);
    assert_eq!(candidates[0].page_start, 80);
    assert_eq!(candidates[0].page_end, 95);
}

#[test]
fn s4_reference_classification_table_resolves_real_page_range() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);

    let page10 = Page {
        page_num: 10,
        chapter_path: ChapterPath::new(vec!["第六章".into()]),
        blocks: vec![ContentBlock {
            block_id: "blk10".into(),
            kind: BlockKind::Table,
            ordinal: 0,
            text: "表6-2".into(),
            table: Some(TableMeta {
                caption: Some("表6-2 电压限值".into()),
                truncated: false,
                row_count: 1,
                col_count: 1,
                row_headers: vec!["r1".into()],
                col_headers: vec!["c1".into()],
                cells: vec![TableCell {
                    row: 0,
                    col: 0,
                    text: "r1".into(),
                }],
            }),
        }],
        rendered_text: String::new(),
        continues_from_prev: false,
        continues_to_next: false,
        annotations: vec![],
    };
    s.ingest(info("R", 10), {
        let mut all = (1..10)
            .map(|n| Page {
                page_num: n,
                chapter_path: ChapterPath::new(vec![]),
                blocks: vec![],
                rendered_text: String::new(),
                continues_from_prev: false,
                continues_to_next: false,
                annotations: vec![],
            })
            .collect::<Vec<_>>();
        all.push(page10);
        all
    })
    .unwrap();

    let candidates = s.resolve_reference("R", "参见表6-2").unwrap();
    assert_eq!(candidates[0].kind, regdex::reference::ReferenceKind::Table);
    assert_eq!(candidates[0].page_start, 10);
    assert_eq!(candidates[0].page_end, 10);
}

#[test]
fn s4_reference_classification_annotation_resolves_real_page() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    let mut pages: Vec<Page> = (1..25)
        .map(|n| Page {
            page_num: n,
            chapter_path: ChapterPath::new(vec![]),
            blocks: vec![],
            rendered_text: String::new(),
            continues_from_prev: false,
            continues_to_next: false,
            annotations: vec![],
        })
        .collect();
    pages.push(Page {
        page_num: 25,
        chapter_path: ChapterPath::new(vec![]),
        blocks: vec![],
        rendered_text: String::new(),
        continues_from_prev: false,
        continues_to_next: false,
        annotations: vec![Annotation {
            label: "注①".into(),
            body: "仅限 220kV 以上".into(),
            decorates: vec![],
        }],
    });
    s.ingest(info("R", 25), pages).unwrap();

    let candidates = s.resolve_reference("R", "见注1").unwrap();
    assert_eq!(candidates[0].kind, regdex::reference::ReferenceKind::Annotation);
    assert_eq!(candidates[0].target_id, "注①");
    assert_eq!(candidates[0].page_start, 25);
    assert_eq!(candidates[0].page_end, 25);
}

#[test]
fn get_table_by_id_on_unknown_regulation_is_not_found_not_registry_missing() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    let err = s.get_table_by_id("NOPE", "T1").unwrap_err();
    assert!(matches!(err, regdex::error::CoreError::RegulationNotFound { .. }));
}
