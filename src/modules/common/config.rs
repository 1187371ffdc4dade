//! 应用配置
//!
//! 保存在 `<config_dir>/rust-scorch/config.json`, 可用 `RUST_SCORCH_CONFIG` 覆盖路径。
//! 文件不存在时使用默认值; 修复动作中的架构/系统版本字符串在反序列化时即被校验。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::UninstallerError;
use crate::modules::orchestrator::actions::{default_actions, RemediationAction};
use crate::modules::orchestrator::filter::{default_filters, Filter, FilterSet};

const APP_DIR: &str = "rust-scorch";
const CONFIG_FILE: &str = "config.json";
pub const CONFIG_ENV: &str = "RUST_SCORCH_CONFIG";
pub const DEFAULT_CATALOG_FILE: &str = "DataFile.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 目录文件与导出的 bundle 文件所在目录
    pub data_dir: PathBuf,
    pub catalog_file: String,
    /// 单个卸载进程的超时秒数, 未设置时无限等待
    pub process_timeout_secs: Option<u64>,
    pub filters: Vec<Filter>,
    pub remediation_actions: Vec<RemediationAction>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
            process_timeout_secs: None,
            filters: default_filters(),
            remediation_actions: default_actions(),
        }
    }
}

impl AppConfig {
    /// 按环境变量或默认位置加载
    pub fn load() -> Result<Self, UninstallerError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, UninstallerError> {
        if !path.exists() {
            tracing::debug!("配置文件不存在, 使用默认配置: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            UninstallerError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        tracing::debug!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, UninstallerError> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), UninstallerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn filter_set(&self) -> FilterSet {
        FilterSet::new(self.filters.clone())
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DataFiles")
}
