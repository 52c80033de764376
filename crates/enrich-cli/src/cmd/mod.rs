pub mod config;
pub mod map;
pub mod reconcile;
pub mod schema;

use anyhow::Context as _;
use enrich_core::config::Config;
use enrich_core::notion::NotionStore;
use enrich_core::schema::SchemaDescriptor;
use std::path::{Path, PathBuf};

/// Global flags shared by every command.
pub struct Context {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| enrich_core::paths::config_path(&self.root))
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let cfg = match &self.config_path {
            Some(path) => Config::load_from(path),
            None => Config::load(&self.root),
        };
        cfg.with_context(|| format!("failed to load {}", self.config_file().display()))
    }
}

/// `--store` flag, else `store.store_id` from config.
pub fn store_id(cfg: &Config, flag: Option<&str>) -> anyhow::Result<String> {
    flag.map(str::to_string)
        .or_else(|| cfg.store.store_id.clone())
        .context("no store id: pass --store or set store.store_id in config")
}

pub fn open_store(cfg: &Config) -> anyhow::Result<NotionStore> {
    let token = cfg.store.token().context("store token unavailable")?;
    NotionStore::new(
        &cfg.store.base_url,
        &token,
        &cfg.store.api_version,
        cfg.store.timeout(),
    )
    .context("failed to build store client")
}

pub fn read_payload(path: &Path) -> anyhow::Result<serde_json::Value> {
    enrich_core::io::read_json(path)
        .with_context(|| format!("failed to read payload {}", path.display()))
}

pub fn read_schema(path: &Path) -> anyhow::Result<SchemaDescriptor> {
    let value = enrich_core::io::read_json(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    SchemaDescriptor::from_json(&value)
        .with_context(|| format!("invalid schema {}", path.display()))
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
