//! Burn 包缓存目录探测
//!
//! bundle 是否已安装不落盘保存, 每次读取时都以缓存目录是否存在为准。

use std::path::{Path, PathBuf};

use super::models::Bundle;
use crate::modules::common::utils;

#[cfg(windows)]
const PACKAGE_CACHE_POLICY_KEY: &str = r"Software\Policies\Microsoft\WiX\Burn";
#[cfg(windows)]
const PACKAGE_CACHE_POLICY_VALUE: &str = "PackageCache";
const PACKAGE_CACHE_DIR_NAME: &str = "Package Cache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 优先读取组策略配置的缓存位置, 否则使用 %ProgramData%\Package Cache
    pub fn detect() -> Self {
        if let Some(root) = read_policy_cache_root() {
            tracing::debug!("使用策略配置的包缓存目录: {}", root.display());
            return Self::new(root);
        }

        let program_data = std::env::var("ProgramData")
            .or_else(|_| std::env::var("ALLUSERSPROFILE"))
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        Self::new(PathBuf::from(program_data).join(PACKAGE_CACHE_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_dir(&self, bundle: &Bundle) -> PathBuf {
        self.root.join(utils::normalize_guid(&bundle.bundle_id))
    }

    pub fn is_installed(&self, bundle: &Bundle) -> bool {
        self.bundle_dir(bundle).is_dir()
    }

    /// bundle 缓存目录中的卸载程序 (*.exe), 按文件名排序
    pub fn bundle_executables(&self, bundle: &Bundle) -> Vec<PathBuf> {
        let dir = self.bundle_dir(bundle);
        let Some(dir_str) = dir.to_str() else {
            tracing::warn!("包缓存路径包含无效字符: {}", dir.display());
            return Vec::new();
        };
        // 目录部分按字面匹配, 如 "Package Cache [x86]"
        let pattern = format!(
            "{}{}*.exe",
            glob::Pattern::escape(dir_str),
            std::path::MAIN_SEPARATOR
        );

        let mut executables: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
            Err(e) => {
                tracing::warn!("无法枚举包缓存 {}: {}", dir.display(), e);
                Vec::new()
            }
        };
        executables.sort();
        executables
    }
}

#[cfg(windows)]
fn read_policy_cache_root() -> Option<PathBuf> {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_32KEY};
    use winreg::RegKey;

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey_with_flags(PACKAGE_CACHE_POLICY_KEY, KEY_READ | KEY_WOW64_32KEY)
        .ok()?;
    let value: String = key.get_value(PACKAGE_CACHE_POLICY_VALUE).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

#[cfg(not(windows))]
fn read_policy_cache_root() -> Option<PathBuf> {
    None
}
