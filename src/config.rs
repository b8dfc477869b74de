//! Layered configuration (§10.1): compiled-in defaults, then an optional
//! `config.toml`, then `REGDEX_*` environment variables, then explicit CLI
//! flags. Each tier overwrites scalars set by the previous one; missing or
//! malformed optional tiers are skipped with a `tracing::warn`, not a hard
//! failure, the same tolerance this codebase's layered rule loader applies
//! to its own optional tiers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub fts_weight: f64,
    pub vector_weight: f64,
    #[serde(default)]
    pub vector_dimension: Option<usize>,
    pub vector_content_limit: usize,
    pub rrf_k: u32,
    pub table_registry_autobuild: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            fts_weight: 0.4,
            vector_weight: 0.6,
            vector_dimension: None,
            vector_content_limit: 500,
            rrf_k: 60,
            table_registry_autobuild: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("regdex"))
        .unwrap_or_else(|| PathBuf::from("./regdex-data"))
}

/// Recursively merge `src` into `dst`. Objects merge key-by-key; any other
/// pairing (including arrays) has `src` overwrite `dst` wholesale, since the
/// configuration surface here is flat scalars, not the nested rule trees
/// this merge idiom was originally built for.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (k, v) in s {
                deep_merge(d.entry(k).or_insert(Value::Null), v);
            }
        }
        (dst, src) => *dst = src,
    }
}

fn read_toml_as_json(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let toml_val: toml::Value = toml::from_str(&content)?;
    let json_str = serde_json::to_string(&toml_val)?;
    Ok(serde_json::from_str(&json_str)?)
}

fn load_tier_into(dst: &mut Value, path: &Path, label: &str) {
    if !path.exists() {
        return;
    }
    match read_toml_as_json(path) {
        Ok(v) => deep_merge(dst, v),
        Err(e) => tracing::warn!(tier = label, error = %e, "config tier parse error, skipping"),
    }
}

fn env_overlay() -> Value {
    let mut obj = Map::new();
    let pairs = [
        ("REGDEX_DATA_DIR", "data_dir"),
        ("REGDEX_FTS_WEIGHT", "fts_weight"),
        ("REGDEX_VECTOR_WEIGHT", "vector_weight"),
        ("REGDEX_VECTOR_DIMENSION", "vector_dimension"),
        ("REGDEX_VECTOR_CONTENT_LIMIT", "vector_content_limit"),
        ("REGDEX_RRF_K", "rrf_k"),
        ("REGDEX_TABLE_REGISTRY_AUTOBUILD", "table_registry_autobuild"),
    ];
    for (env_key, field) in pairs {
        if let Ok(raw) = std::env::var(env_key) {
            let value = serde_json::from_str::<Value>(&raw)
                .unwrap_or_else(|_| Value::String(raw.clone()));
            obj.insert(field.to_string(), value);
        }
    }
    Value::Object(obj)
}

/// Load configuration from the default tiers. `explicit_config_path`, if
/// given, is used instead of `<cwd>/config.toml`; it is still optional — a
/// missing explicit path is treated as an absent tier, not an error, since
/// the caller may be relying entirely on environment/CLI overlays.
pub fn load_config(explicit_config_path: Option<&Path>) -> Config {
    let mut merged = serde_json::to_value(Config::default()).expect("Config always serializes");

    let config_path = explicit_config_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    load_tier_into(&mut merged, &config_path, "config.toml");

    deep_merge(&mut merged, env_overlay());

    serde_json::from_value(merged).unwrap_or_default()
}

/// Apply CLI-flag overrides, the highest-priority tier. Only `Some` fields
/// overwrite; `None` leaves the lower tiers' value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub fts_weight: Option<f64>,
    pub vector_weight: Option<f64>,
}

impl Config {
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(d) = overrides.data_dir {
            self.data_dir = d;
        }
        if let Some(w) = overrides.fts_weight {
            self.fts_weight = w;
        }
        if let Some(w) = overrides.vector_weight {
            self.vector_weight = w;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.fts_weight, 0.4);
        assert_eq!(cfg.vector_weight, 0.6);
        assert_eq!(cfg.rrf_k, 60);
        assert_eq!(cfg.vector_content_limit, 500);
        assert!(cfg.table_registry_autobuild);
    }

    #[test]
    fn missing_config_file_is_silently_skipped() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does_not_exist.toml");
        let cfg = load_config(Some(&missing));
        assert_eq!(cfg.rrf_k, 60);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "rrf_k = 80\nfts_weight = 0.5\n").unwrap();
        let cfg = load_config(Some(&path));
        assert_eq!(cfg.rrf_k, 80);
        assert_eq!(cfg.fts_weight, 0.5);
        // untouched field retains its default
        assert_eq!(cfg.vector_weight, 0.6);
    }

    #[test]
    fn deep_merge_scalars_overwrite() {
        let mut base = serde_json::json!({"rrf_k": 60, "fts_weight": 0.4});
        let overlay = serde_json::json!({"rrf_k": 90});
        deep_merge(&mut base, overlay);
        assert_eq!(base["rrf_k"], 90);
        assert_eq!(base["fts_weight"], 0.4);
    }
}
