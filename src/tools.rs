//! Tool Surface (C8): the nine externally visible operations, each with
//! validated arguments, a deterministic result shape, and typed errors
//! (§4.8). This is the only component reasoning agents call directly; it
//! owns no state of its own beyond what it needs to hold the other
//! components together; indices are lazily built from the Page Store and
//! rebuilt whenever ingest or delete commits a write.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::hybrid::{infer_scope, HybridSearch, SearchResult};
use crate::lexical::{LexicalIndex, LexicalRecord};
use crate::model::{
    Annotation, BlockKind, ChapterPath, Page, RegulationInfo, StitchedTable, TableRegistry, TocTree,
};
use crate::reference::{lookup_annotation as resolve_annotation, resolve_reference as classify_reference, ReferenceTarget};
use crate::store::PageStore;
use crate::tables::{build_registry, get_full_table, search_tables as search_tables_impl, SearchTablesMode, TableHit};
use crate::toc::{build_toc, flatten_tree, truncate_tree, FlatTocNode};
use crate::vector::{truncate_for_embedding, VectorIndex, VectorRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub pages: Vec<Page>,
    pub stitched_tables: Vec<StitchedTable>,
    /// Names any table whose segments are only partially contained in the
    /// requested range, per the conservative boundary policy in §9.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial_table_ids: Vec<String>,
}

pub struct ToolSurface {
    store: PageStore,
    embedder: Box<dyn Embedder>,
    config: Config,
    lexical: RwLock<Option<LexicalIndex>>,
    vector: RwLock<Option<VectorIndex>>,
    table_registries: RwLock<HashMap<String, TableRegistry>>,
    tocs: RwLock<HashMap<String, TocTree>>,
}

impl ToolSurface {
    pub fn new(store: PageStore, embedder: Box<dyn Embedder>, config: Config) -> Self {
        ToolSurface {
            store,
            embedder,
            config,
            lexical: RwLock::new(None),
            vector: RwLock::new(None),
            table_registries: RwLock::new(HashMap::new()),
            tocs: RwLock::new(HashMap::new()),
        }
    }

    /// Ingest a regulation: persist it (C1), then, if configured, build its
    /// table registry and chapter tree, then rebuild the global lexical and
    /// vector indices from the Page Store (§4.1, §10.1 `table_registry_autobuild`).
    #[tracing::instrument(skip(self, pages), fields(reg_id = %info.reg_id))]
    pub fn ingest(&self, info: RegulationInfo, pages: Vec<Page>) -> CoreResult<()> {
        self.store.save_regulation(&info, &pages)?;

        if self.config.table_registry_autobuild {
            let registry = build_registry(&pages);
            self.store.save_table_registry(&info.reg_id, &registry)?;
            self.table_registries
                .write()
                .unwrap()
                .insert(info.reg_id.clone(), registry);
        }

        let toc = build_toc(&pages);
        self.tocs.write().unwrap().insert(info.reg_id.clone(), toc);

        self.rebuild_search_indices()?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_regulation(&self, reg_id: &str) -> CoreResult<()> {
        self.store.delete_regulation(reg_id)?;
        self.table_registries.write().unwrap().remove(reg_id);
        self.tocs.write().unwrap().remove(reg_id);
        self.rebuild_search_indices()?;
        Ok(())
    }

    /// Rebuild C2/C3 from every regulation currently in the Page Store
    /// (§4.2 invariant (c)). Invoked after every write so readers always see
    /// an index consistent with the latest commit.
    #[tracing::instrument(skip(self))]
    pub fn rebuild_search_indices(&self) -> CoreResult<()> {
        let regulations = self.store.list_regulations()?;
        let mut lexical_records = Vec::new();
        let mut vector_records = Vec::new();

        for info in &regulations {
            let pages = self.store.load_pages(&info.reg_id)?;
            for page in &pages {
                for block in &page.blocks {
                    lexical_records.push(LexicalRecord {
                        reg_id: info.reg_id.clone(),
                        page_num: page.page_num,
                        block_id: block.block_id.clone(),
                        chapter_path: page.chapter_path.clone(),
                        content_text: block.text.clone(),
                        short_preview: block.text.chars().take(120).collect(),
                    });

                    let truncated = truncate_for_embedding(&block.text, self.config.vector_content_limit);
                    let vector = self.embedder.embed(&truncated)?;
                    vector_records.push(VectorRecord {
                        reg_id: info.reg_id.clone(),
                        page_num: page.page_num,
                        block_id: block.block_id.clone(),
                        chapter_path: page.chapter_path.clone(),
                        content_text_truncated: truncated,
                        vector,
                    });
                }
            }
        }

        *self.lexical.write().unwrap() = Some(LexicalIndex::build(lexical_records));
        *self.vector.write().unwrap() = Some(VectorIndex::build(vector_records));
        Ok(())
    }

    fn registry_for(&self, reg_id: &str) -> CoreResult<TableRegistry> {
        if let Some(r) = self.table_registries.read().unwrap().get(reg_id) {
            return Ok(r.clone());
        }
        self.store
            .load_table_registry(reg_id)?
            .ok_or_else(|| CoreError::RegistryNotBuilt {
                reg_id: reg_id.to_string(),
            })
    }

    fn toc_for(&self, reg_id: &str) -> CoreResult<TocTree> {
        if let Some(t) = self.tocs.read().unwrap().get(reg_id) {
            return Ok(t.clone());
        }
        let pages = self.store.load_pages(reg_id)?;
        Ok(build_toc(&pages))
    }

    fn require_known_reg_id(&self, reg_id: &str) -> CoreResult<()> {
        self.store.load_info(reg_id).map(|_| ())
    }

    // ---- 1. list_regulations ------------------------------------------------

    pub fn list_regulations(&self) -> CoreResult<Vec<RegulationInfo>> {
        self.store.list_regulations()
    }

    // ---- 2. get_toc -----------------------------------------------------------

    pub fn get_toc(&self, reg_id: &str, max_level: Option<u32>) -> CoreResult<TocTree> {
        self.require_known_reg_id(reg_id)?;
        let tree = self.toc_for(reg_id)?;
        Ok(truncate_tree(&tree, max_level))
    }

    pub fn get_chapter_structure(&self, reg_id: &str) -> CoreResult<Vec<FlatTocNode>> {
        self.require_known_reg_id(reg_id)?;
        let tree = self.toc_for(reg_id)?;
        Ok(flatten_tree(&tree))
    }

    pub fn get_page_chapter_info(&self, reg_id: &str, page_num: u32) -> CoreResult<ChapterPath> {
        let page = self.store.load_page(reg_id, page_num)?;
        Ok(page.chapter_path)
    }

    pub fn resolve_section(&self, reg_id: &str, section_number: &str) -> CoreResult<crate::model::TocItem> {
        self.require_known_reg_id(reg_id)?;
        let tree = self.toc_for(reg_id)?;
        crate::toc::resolve_section(&tree, section_number)
            .cloned()
            .ok_or_else(|| CoreError::SectionNotFound {
                reg_id: reg_id.to_string(),
                section_number: section_number.to_string(),
            })
    }

    // ---- 3. smart_search --------------------------------------------------

    #[tracing::instrument(skip(self, reg_ids))]
    pub fn smart_search(
        &self,
        query: &str,
        reg_ids: Option<Vec<String>>,
        chapter_scope: Option<ChapterPath>,
        limit: i64,
    ) -> CoreResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(CoreError::validation("query must not be empty"));
        }
        if limit < 0 {
            return Err(CoreError::validation("limit must not be negative"));
        }
        let limit = limit as usize;

        let resolved_scope = match reg_ids {
            Some(ids) => {
                for id in &ids {
                    self.require_known_reg_id(id)?;
                }
                Some(ids)
            }
            None => {
                let regulations = self.store.list_regulations()?;
                infer_scope(query, &regulations)
            }
        };

        let lexical_guard = self.lexical.read().unwrap();
        let vector_guard = self.vector.read().unwrap();
        let lexical = lexical_guard.as_ref().ok_or_else(|| CoreError::IndexMissing {
            reg_id: None,
            detail: "call rebuild_search_indices (or ingest) before searching".to_string(),
        })?;
        let vector = vector_guard.as_ref().ok_or_else(|| CoreError::IndexMissing {
            reg_id: None,
            detail: "call rebuild_search_indices (or ingest) before searching".to_string(),
        })?;

        let search = HybridSearch {
            lexical,
            vector,
            embedder: self.embedder.as_ref(),
            rrf_k: self.config.rrf_k,
            fts_weight: self.config.fts_weight,
            vector_weight: self.config.vector_weight,
        };
        search.search(query, resolved_scope.as_deref(), chapter_scope.as_ref(), limit)
    }

    // ---- 4. read_page_range -------------------------------------------------

    pub fn read_page_range(&self, reg_id: &str, start: u32, end: u32) -> CoreResult<PageContent> {
        if start == 0 || end < start {
            return Err(CoreError::validation(format!(
                "invalid page range [{start}, {end}]"
            )));
        }
        let pages: Vec<Page> = (start..=end)
            .map(|n| self.store.load_page(reg_id, n))
            .collect::<CoreResult<_>>()?;

        let registry = self.registry_for(reg_id).unwrap_or_default();
        let all_pages = self.store.load_pages(reg_id)?;

        let mut table_ids_touched: Vec<String> = Vec::new();
        for page in &pages {
            for block in &page.blocks {
                if block.kind == BlockKind::Table {
                    if let Some(entry) = registry.table_for_segment(&block.block_id) {
                        if !table_ids_touched.contains(&entry.table_id) {
                            table_ids_touched.push(entry.table_id.clone());
                        }
                    }
                }
            }
        }

        let mut stitched_tables = Vec::new();
        let mut partial_table_ids = Vec::new();
        for table_id in table_ids_touched {
            let entry = &registry.tables[&table_id];
            let fully_contained = entry.start_page >= start && entry.end_page <= end;
            if fully_contained {
                stitched_tables.push(get_full_table(&registry, &all_pages, reg_id, &table_id)?);
            } else {
                partial_table_ids.push(table_id);
            }
        }

        Ok(PageContent {
            pages,
            stitched_tables,
            partial_table_ids,
        })
    }

    // ---- 5. read_chapter_content --------------------------------------------

    pub fn read_chapter_content(
        &self,
        reg_id: &str,
        section_number: &str,
        include_children: bool,
    ) -> CoreResult<PageContent> {
        let item = self.resolve_section(reg_id, section_number)?;
        let (mut start, mut end) = (item.page_start, item.page_end);
        if include_children {
            for child in &item.children {
                start = start.min(child.page_start);
                end = end.max(child.page_end);
            }
        }
        self.read_page_range(reg_id, start, end)
    }

    // ---- 6. search_tables ----------------------------------------------------

    pub fn search_tables(
        &self,
        query: &str,
        reg_id: Option<&str>,
        mode: SearchTablesMode,
    ) -> CoreResult<Vec<TableHit>> {
        if query.trim().is_empty() {
            return Err(CoreError::validation("query must not be empty"));
        }
        let reg_ids: Vec<String> = match reg_id {
            Some(id) => {
                self.require_known_reg_id(id)?;
                vec![id.to_string()]
            }
            None => self.store.list_regulations()?.into_iter().map(|r| r.reg_id).collect(),
        };

        let mut all_hits = Vec::new();
        for reg_id in reg_ids {
            let registry = match self.registry_for(&reg_id) {
                Ok(r) => r,
                Err(CoreError::RegistryNotBuilt { .. }) => continue,
                Err(e) => return Err(e),
            };
            let pages = self.store.load_pages(&reg_id)?;
            all_hits.extend(search_tables_impl(&registry, &pages, &reg_id, query, mode)?);
        }
        all_hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.table_id.cmp(&b.table_id))
        });
        Ok(all_hits)
    }

    // ---- 7. get_table_by_id ----------------------------------------------------

    pub fn get_table_by_id(&self, reg_id: &str, table_id: &str) -> CoreResult<StitchedTable> {
        self.require_known_reg_id(reg_id)?;
        let registry = self.registry_for(reg_id)?;
        let pages = self.store.load_pages(reg_id)?;
        get_full_table(&registry, &pages, reg_id, table_id)
    }

    // ---- 8. lookup_annotation ----------------------------------------------------

    pub fn lookup_annotation(
        &self,
        reg_id: &str,
        label: &str,
        page_hint: Option<u32>,
    ) -> CoreResult<Annotation> {
        if label.trim().is_empty() {
            return Err(CoreError::validation("label must not be empty"));
        }
        self.require_known_reg_id(reg_id)?;
        let pages = self.store.load_pages(reg_id)?;
        resolve_annotation(&pages, reg_id, label, page_hint)
    }

    // ---- 9. resolve_reference ----------------------------------------------------

    pub fn resolve_reference(&self, reg_id: &str, phrase: &str) -> CoreResult<Vec<ReferenceTarget>> {
        if phrase.trim().is_empty() {
            return Err(CoreError::validation("phrase must not be empty"));
        }
        self.require_known_reg_id(reg_id)?;
        let toc = self.toc_for(reg_id)?;
        let registry = self.registry_for(reg_id).unwrap_or_default();
        let pages = self.store.load_pages(reg_id)?;
        classify_reference(&toc, &registry, &pages, reg_id, phrase)
    }
}
