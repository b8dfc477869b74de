//! Integration coverage for S1 (basic hybrid search), S5 (ingest-then-delete),
//! and S6 (chapter scope filtering), exercised through the public `ToolSurface`
//! rather than any individual component.

use regdex::config::Config;
use regdex::embed::{Embedder, HashingEmbedder};
use regdex::model::{BlockKind, ChapterPath, ContentBlock, Page, RegulationInfo};
use regdex::store::PageStore;
use regdex::tools::ToolSurface;
use tempfile::TempDir;

fn block(id: &str, ordinal: u32, text: &str) -> ContentBlock {
    ContentBlock {
        block_id: id.to_string(),
        kind: BlockKind::Text,
        ordinal,
        text: text.to_string(),
        table: None,
    }
}

fn page(n: u32, path: Vec<&str>, blocks: Vec<ContentBlock>) -> Page {
    Page {
        page_num: n,
        chapter_path: ChapterPath::new(path.into_iter().map(String::from).collect()),
        blocks,
        rendered_text: String::new(),
        continues_from_prev: false,
        continues_to_next: false,
        annotations: vec![],
    }
}

fn surface(tmp: &TempDir) -> ToolSurface {
    let store = PageStore::new(tmp.path());
    let embedder: Box<dyn Embedder> = Box::new(HashingEmbedder::new(32));
    ToolSurface::new(store, embedder, Config::default())
}

fn info(reg_id: &str, total_pages: u32, keywords: Vec<&str>) -> RegulationInfo {
    RegulationInfo {
        reg_id: reg_id.to_string(),
        title: format!("{reg_id} Title"),
        source_filename: format!("{reg_id}.pdf"),
        total_pages,
        ingested_at: 0,
        description: None,
        keywords: keywords.into_iter().map(String::from).collect(),
        scope: None,
        vector_dimension: None,
    }
}

#[test]
fn s1_basic_hybrid_search() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    let pages = vec![
        page(1, vec!["第一章"], vec![block("b1", 0, "母线失压处理")]),
        page(2, vec!["第一章"], vec![block("b2", 0, "系统电压恢复")]),
    ];
    s.ingest(info("R", 2, vec!["电力系统"]), pages).unwrap();

    let results = s
        .smart_search("母线失压", Some(vec!["R".to_string()]), None, 5)
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].reg_id, "R");
    assert_eq!(results[0].page_num, 1);
    assert_eq!(results[0].block_id, "b1");
    assert!(results[0].score > 0.0);
}

#[test]
fn s5_ingest_then_delete_invariant() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    s.ingest(
        info("R1", 1, vec![]),
        vec![page(1, vec!["A"], vec![block("b1", 0, "电压控制相关内容")])],
    )
    .unwrap();
    s.ingest(
        info("R2", 1, vec![]),
        vec![page(1, vec!["A"], vec![block("b2", 0, "电压控制相关内容")])],
    )
    .unwrap();

    let before = s.smart_search("电压控制", None, None, 100).unwrap();
    let reg_ids: Vec<_> = before.iter().map(|r| r.reg_id.clone()).collect();
    assert!(reg_ids.contains(&"R1".to_string()));
    assert!(reg_ids.contains(&"R2".to_string()));

    s.remove_regulation("R1").unwrap();

    let after = s.smart_search("电压控制", None, None, 100).unwrap();
    assert!(after.iter().all(|r| r.reg_id != "R1"));
    assert!(after.iter().any(|r| r.reg_id == "R2"));

    let remaining = s.list_regulations().unwrap();
    assert!(remaining.iter().all(|r| r.reg_id != "R1"));
}

#[test]
fn s6_scope_filtering_by_chapter_prefix() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    s.ingest(
        info("R", 2, vec![]),
        vec![
            page(1, vec!["A"], vec![block("ba", 0, "电压调节措施")]),
            page(2, vec!["B"], vec![block("bb", 0, "电压调节措施")]),
        ],
    )
    .unwrap();

    let scope = ChapterPath::new(vec!["A".to_string()]);
    let results = s
        .smart_search("电压", Some(vec!["R".to_string()]), Some(scope), 100)
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chapter_path.starts_with(&ChapterPath::new(vec!["A".to_string()]))));
}

#[test]
fn page_load_bounds_invariant() {
    let tmp = TempDir::new().unwrap();
    let s = surface(&tmp);
    s.ingest(
        info("R", 2, vec![]),
        vec![
            page(1, vec![], vec![block("b1", 0, "x")]),
            page(2, vec![], vec![block("b2", 0, "y")]),
        ],
    )
    .unwrap();

    assert!(s.read_page_range("R", 1, 2).is_ok());
    assert!(s.read_page_range("R", 0, 1).is_err());
    assert!(s.read_page_range("R", 1, 3).is_err());
}
