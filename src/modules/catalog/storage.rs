//! 目录持久化存储模块
//!
//! 整体目录与单个 bundle 都以带版本号的 JSON 信封保存,
//! 读取时先检查版本号, 拒绝比当前程序更新的格式。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::models::{Bundle, FileType};
use super::CatalogStore;
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils;

pub const CATALOG_SCHEMA_VERSION: u32 = 1;
pub const BUNDLE_FILE_SUFFIX: &str = ".bundle.json";

#[derive(Debug, Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    schema_version: u32,
    #[serde(default)]
    bundles: Vec<Bundle>,
    #[serde(default)]
    upgrade_codes: BTreeSet<String>,
    #[serde(default)]
    no_upgrade_code_product_codes: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BundleFile {
    schema_version: u32,
    bundle: Bundle,
}

fn check_schema(content: &str) -> Result<(), UninstallerError> {
    let header: SchemaHeader = serde_json::from_str(content)?;
    if header.schema_version > CATALOG_SCHEMA_VERSION {
        return Err(UninstallerError::UnsupportedSchema {
            found: header.schema_version,
            supported: CATALOG_SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), UninstallerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// 保存整个目录 (bundle 列表与两个孤立包索引)
pub fn save_catalog(store: &CatalogStore, path: &Path) -> Result<(), UninstallerError> {
    let file = CatalogFile {
        schema_version: CATALOG_SCHEMA_VERSION,
        bundles: store.bundles().to_vec(),
        upgrade_codes: store.upgrade_codes().clone(),
        no_upgrade_code_product_codes: store.no_upgrade_code_product_codes().clone(),
    };
    write_json(path, &file)?;

    tracing::info!("已保存目录文件: {} ({} 个 bundle)", path.display(), file.bundles.len());
    Ok(())
}

pub fn load_catalog(path: &Path) -> Result<CatalogStore, UninstallerError> {
    if !path.exists() {
        return Err(UninstallerError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    check_schema(&content)?;
    let file: CatalogFile = serde_json::from_str(&content)?;

    tracing::debug!(
        "已加载目录文件 {} (schema v{}, {} 个 bundle)",
        path.display(),
        file.schema_version,
        file.bundles.len()
    );
    Ok(CatalogStore::from_parts(
        file.bundles,
        file.upgrade_codes,
        file.no_upgrade_code_product_codes,
    ))
}

pub fn bundle_file_path(dir: &Path, bundle: &Bundle) -> PathBuf {
    let name = bundle.release_name.as_deref().unwrap_or(&bundle.name);
    dir.join(format!("{}{}", utils::sanitize_file_name(name), BUNDLE_FILE_SUFFIX))
}

/// 单个 bundle 导出为 `<dir>/<name>.bundle.json`
pub fn save_bundle(bundle: &Bundle, dir: &Path) -> Result<PathBuf, UninstallerError> {
    let path = bundle_file_path(dir, bundle);
    let file = BundleFile {
        schema_version: CATALOG_SCHEMA_VERSION,
        bundle: bundle.clone(),
    };
    write_json(&path, &file)?;
    tracing::debug!("已导出 bundle: {} -> {}", bundle.name, path.display());
    Ok(path)
}

pub fn load_bundle(path: &Path) -> Result<Bundle, UninstallerError> {
    let content = std::fs::read_to_string(path)?;
    check_schema(&content)?;
    let file: BundleFile = serde_json::from_str(&content)?;

    let mut bundle = file.bundle;
    bundle.file_type = FileType::CachedBinary;
    bundle.source_path = Some(path.to_path_buf());
    Ok(bundle)
}

/// 加载目录下所有 bundle 文件, 无法读取的文件记录警告后跳过
pub fn load_bundle_dir(dir: &Path) -> Result<Vec<Bundle>, UninstallerError> {
    if !dir.is_dir() {
        return Err(UninstallerError::NotFound(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().ends_with(BUNDLE_FILE_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut bundles = Vec::new();
    for path in paths {
        match load_bundle(&path) {
            Ok(bundle) => bundles.push(bundle),
            Err(e) => tracing::warn!("跳过无效的 bundle 文件 {}: {}", path.display(), e),
        }
    }
    Ok(bundles)
}
