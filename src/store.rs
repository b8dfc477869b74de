//! Page Store (C1): persists each regulation under
//! `<data_dir>/pages/<reg_id>/` as one `info.json` manifest, one
//! `page_NNNNN.json` per page, and `table_registry.json`. Writes are atomic
//! via write-to-temp-then-rename at the directory level (§9); a reader
//! either sees the previous generation or the new one, never a partial mix.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{CoreError, CoreResult};
use crate::model::{Page, RegulationInfo, TableRegistry};

pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        PageStore {
            root: data_dir.into(),
        }
    }

    fn pages_root(&self) -> PathBuf {
        self.root.join("pages")
    }

    fn reg_dir(&self, reg_id: &str) -> PathBuf {
        self.pages_root().join(reg_id)
    }

    fn info_path(&self, reg_id: &str) -> PathBuf {
        self.reg_dir(reg_id).join("info.json")
    }

    fn page_path(&self, reg_id: &str, page_num: u32) -> PathBuf {
        self.reg_dir(reg_id).join(format!("page_{:05}.json", page_num))
    }

    fn registry_path(&self, reg_id: &str) -> PathBuf {
        self.reg_dir(reg_id).join("table_registry.json")
    }

    /// Enumerate every regulation currently persisted, sorted by `reg_id`
    /// for deterministic output. Directories that fail to parse as a
    /// manifest are skipped rather than aborting the listing.
    pub fn list_regulations(&self) -> CoreResult<Vec<RegulationInfo>> {
        let pages_root = self.pages_root();
        if !pages_root.exists() {
            return Ok(Vec::new());
        }
        let mut infos = Vec::new();
        let walker = WalkBuilder::new(&pages_root)
            .max_depth(Some(1))
            .standard_filters(false)
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.path() == pages_root {
                continue;
            }
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let reg_id = entry.file_name().to_string_lossy().to_string();
            if let Ok(info) = self.load_info(&reg_id) {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.reg_id.cmp(&b.reg_id));
        Ok(infos)
    }

    pub fn load_info(&self, reg_id: &str) -> CoreResult<RegulationInfo> {
        let path = self.info_path(reg_id);
        let content = fs::read_to_string(&path).map_err(|_| CoreError::RegulationNotFound {
            reg_id: reg_id.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| CoreError::IntegrityError {
            reg_id: reg_id.to_string(),
            detail: format!("malformed manifest: {e}"),
        })
    }

    pub fn load_page(&self, reg_id: &str, page_num: u32) -> CoreResult<Page> {
        let info = self.load_info(reg_id)?;
        if page_num < 1 || page_num > info.total_pages {
            return Err(CoreError::PageNotFound {
                reg_id: reg_id.to_string(),
                page_num,
            });
        }
        let path = self.page_path(reg_id, page_num);
        let content = fs::read_to_string(&path).map_err(|_| CoreError::PageNotFound {
            reg_id: reg_id.to_string(),
            page_num,
        })?;
        serde_json::from_str(&content).map_err(|e| CoreError::IntegrityError {
            reg_id: reg_id.to_string(),
            detail: format!("malformed page {page_num}: {e}"),
        })
    }

    pub fn load_pages(&self, reg_id: &str) -> CoreResult<Vec<Page>> {
        let info = self.load_info(reg_id)?;
        (1..=info.total_pages)
            .map(|n| self.load_page(reg_id, n))
            .collect()
    }

    /// Atomically replace (or create) a regulation: all pages and the
    /// manifest are written to a sibling temp directory, then the temp
    /// directory is renamed over the final location. Any prior generation
    /// with the same `reg_id` is fully overwritten.
    #[tracing::instrument(skip(self, pages), fields(reg_id = %info.reg_id, total_pages = info.total_pages))]
    pub fn save_regulation(&self, info: &RegulationInfo, pages: &[Page]) -> CoreResult<()> {
        if pages.len() as u32 != info.total_pages {
            return Err(CoreError::IntegrityError {
                reg_id: info.reg_id.clone(),
                detail: format!(
                    "total_pages={} but {} pages given",
                    info.total_pages,
                    pages.len()
                ),
            });
        }
        for (idx, page) in pages.iter().enumerate() {
            let expected = (idx + 1) as u32;
            if page.page_num != expected {
                return Err(CoreError::IntegrityError {
                    reg_id: info.reg_id.clone(),
                    detail: format!(
                        "page sequence gap: expected page_num={expected}, got {}",
                        page.page_num
                    ),
                });
            }
        }

        let pages_root = self.pages_root();
        fs::create_dir_all(&pages_root).map_err(|e| {
            CoreError::external("filesystem", format!("creating {}: {e}", pages_root.display()))
        })?;

        let final_dir = self.reg_dir(&info.reg_id);
        let tmp_dir = pages_root.join(format!(".{}.tmp", info.reg_id));
        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir).ok();
        }
        fs::create_dir_all(&tmp_dir).map_err(|e| {
            CoreError::external("filesystem", format!("creating {}: {e}", tmp_dir.display()))
        })?;

        let info_json = serde_json::to_string_pretty(info)
            .map_err(|e| CoreError::external("serde_json", e.to_string()))?;
        fs::write(tmp_dir.join("info.json"), info_json)
            .map_err(|e| CoreError::external("filesystem", e.to_string()))?;

        for page in pages {
            let page_json = serde_json::to_string_pretty(page)
                .map_err(|e| CoreError::external("serde_json", e.to_string()))?;
            let name = format!("page_{:05}.json", page.page_num);
            fs::write(tmp_dir.join(name), page_json)
                .map_err(|e| CoreError::external("filesystem", e.to_string()))?;
        }

        // Stage the prior generation aside (rename, not remove) so `final_dir`
        // is never absent for longer than the gap between two renames: a
        // reader either finds the old generation at `final_dir`, the new one,
        // or — only in the instant between the two renames below — neither,
        // which is far narrower than the window a `remove_dir_all` of a
        // possibly large prior generation would leave open.
        let prev_dir = pages_root.join(format!(".{}.prev", info.reg_id));
        if prev_dir.exists() {
            fs::remove_dir_all(&prev_dir).ok();
        }
        let had_prev = final_dir.exists();
        if had_prev {
            fs::rename(&final_dir, &prev_dir).map_err(|e| {
                CoreError::external("filesystem", format!("staging prior generation aside: {e}"))
            })?;
        }
        fs::rename(&tmp_dir, &final_dir).map_err(|e| {
            CoreError::external("filesystem", format!("renaming into place: {e}"))
        })?;
        if had_prev {
            fs::remove_dir_all(&prev_dir).ok();
        }

        tracing::info!(reg_id = %info.reg_id, "regulation saved");
        Ok(())
    }

    pub fn save_table_registry(&self, reg_id: &str, registry: &TableRegistry) -> CoreResult<()> {
        let reg_dir = self.reg_dir(reg_id);
        if !reg_dir.exists() {
            return Err(CoreError::RegulationNotFound {
                reg_id: reg_id.to_string(),
            });
        }
        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| CoreError::external("serde_json", e.to_string()))?;
        let tmp_path = reg_dir.join("table_registry.json.tmp");
        fs::write(&tmp_path, json).map_err(|e| CoreError::external("filesystem", e.to_string()))?;
        fs::rename(&tmp_path, self.registry_path(reg_id))
            .map_err(|e| CoreError::external("filesystem", e.to_string()))?;
        Ok(())
    }

    pub fn load_table_registry(&self, reg_id: &str) -> CoreResult<Option<TableRegistry>> {
        let path = self.registry_path(reg_id);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).map_err(|e| CoreError::external("filesystem", e.to_string()))?;
        let registry = serde_json::from_str(&content).map_err(|e| CoreError::IntegrityError {
            reg_id: reg_id.to_string(),
            detail: format!("malformed table registry: {e}"),
        })?;
        Ok(Some(registry))
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_regulation(&self, reg_id: &str) -> CoreResult<()> {
        let dir = self.reg_dir(reg_id);
        if !dir.exists() {
            return Err(CoreError::RegulationNotFound {
                reg_id: reg_id.to_string(),
            });
        }
        fs::remove_dir_all(&dir).map_err(|e| CoreError::external("filesystem", e.to_string()))?;
        tracing::info!(reg_id = %reg_id, "regulation deleted");
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.root
    }
}
