use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::modules::common::utils;

/// 包类型, 决定使用哪种卸载命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    #[default]
    Msi,
    Msu,
    Exe,
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageType::Msi => write!(f, "MSI"),
            PackageType::Msu => write!(f, "MSU"),
            PackageType::Exe => write!(f, "EXE"),
        }
    }
}

/// 单个可卸载单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub product_code: String,
    #[serde(default)]
    pub upgrade_code: Option<String>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_version: Option<String>,
    #[serde(default)]
    pub install_date: Option<NaiveDate>,
    #[serde(default)]
    pub install_location: Option<String>,
    #[serde(default)]
    pub info_url: Option<String>,
    /// 安装该包的 bundle 内部包 ID
    #[serde(default)]
    pub chaining_package_id: Option<String>,
    #[serde(default)]
    pub package_type: PackageType,
}

impl Package {
    pub fn new(product_code: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_code: product_code.into(),
            upgrade_code: None,
            product_name: product_name.into(),
            product_version: None,
            install_date: None,
            install_location: None,
            info_url: None,
            chaining_package_id: None,
            package_type: PackageType::Msi,
        }
    }

    pub fn with_upgrade_code(mut self, upgrade_code: impl Into<String>) -> Self {
        let code = upgrade_code.into();
        self.upgrade_code = if code.trim().is_empty() { None } else { Some(code) };
        self
    }

    pub fn with_type(mut self, package_type: PackageType) -> Self {
        self.package_type = package_type;
        self
    }

    pub fn with_chaining_package(mut self, id: impl Into<String>) -> Self {
        self.chaining_package_id = Some(id.into());
        self
    }

    /// 空字符串视同没有升级代码
    pub fn upgrade_code(&self) -> Option<&str> {
        self.upgrade_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// 产品代码比较忽略大小写和花括号
    pub fn has_product_code(&self, product_code: &str) -> bool {
        same_code(&self.product_code, product_code)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.product_name)
    }
}

/// 比较 GUID 形式的代码; 非 GUID (如 KB 编号) 按去空白后的原文比较
pub fn same_code(left: &str, right: &str) -> bool {
    normalize_code(left) == normalize_code(right)
}

/// 索引与比较用的代码规范化
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.starts_with('{') || trimmed.len() == 36 {
        utils::normalize_guid(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// bundle 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// 直接解析安装元数据 (WixPdb)
    #[default]
    Metadata,
    /// 由已保存的目录文件加载
    CachedBinary,
}

/// 链式安装包
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub selected: bool,
    /// 元数据文件所在路径
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    /// 元数据文件名 (不含扩展名)
    #[serde(default)]
    pub release_name: Option<String>,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl Bundle {
    pub fn new(bundle_id: &str, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            bundle_id: utils::normalize_guid(bundle_id),
            name: name.into(),
            version: version.into(),
            selected: false,
            source_path: None,
            release_name: None,
            file_type: FileType::Metadata,
            packages: Vec::new(),
        }
    }

    /// 名称含 "(KB" 的为系统更新类 bundle, 需排在产品 bundle 之后卸载
    pub fn is_update_bundle(&self) -> bool {
        self.name.contains("(KB")
    }

    pub fn same_id(&self, other_id: &str) -> bool {
        utils::normalize_guid(&self.bundle_id) == utils::normalize_guid(other_id)
    }

    pub fn find_package(&self, product_code: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.has_product_code(product_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_upgrade_code_is_treated_as_missing() {
        let package = Package::new("{A}", "demo").with_upgrade_code("  ");
        assert_eq!(package.upgrade_code(), None);

        let package = Package::new("{A}", "demo").with_upgrade_code("{U1}");
        assert_eq!(package.upgrade_code(), Some("{U1}"));
    }

    #[test]
    fn product_codes_compare_case_insensitively() {
        let package = Package::new("{ABCDEF01-2345-6789-ABCD-EF0123456789}", "demo");
        assert!(package.has_product_code("abcdef01-2345-6789-abcd-ef0123456789"));
        assert!(!package.has_product_code("2999226"));

        let msu = Package::new("2999226", "KB2999226").with_type(PackageType::Msu);
        assert!(msu.has_product_code("2999226"));
    }

    #[test]
    fn update_bundles_are_detected_by_kb_marker() {
        assert!(Bundle::new("{1}", "Update (KB1234)", "1.0").is_update_bundle());
        assert!(!Bundle::new("{2}", "Tool A", "1.0").is_update_bundle());
        assert!(!Bundle::new("{3}", "KB helper", "1.0").is_update_bundle());
    }

    #[test]
    fn bundle_id_is_normalized_on_creation() {
        let bundle = Bundle::new("ABCDEF01-2345-6789-ABCD-EF0123456789", "demo", "1.0");
        assert_eq!(bundle.bundle_id, "{abcdef01-2345-6789-abcd-ef0123456789}");
        assert!(bundle.same_id("{ABCDEF01-2345-6789-ABCD-EF0123456789}"));
    }
}
