use std::path::{Path, PathBuf};

pub const ENRICH_DIR: &str = ".enrich";
pub const CONFIG_FILE: &str = ".enrich/config.yaml";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}
