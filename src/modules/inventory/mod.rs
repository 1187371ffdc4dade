pub mod guid;
pub mod registry;

use crate::modules::catalog::models::{normalize_code, Package};
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils;
use crate::modules::orchestrator::filter::FilterSet;

/// 已安装包的数据来源
pub trait InventoryReader {
    fn installed_packages(&self) -> Result<Vec<Package>, UninstallerError>;
}

/// 基于 Windows Installer 注册表数据的清单
///
/// 产品名称在返回前经过名称过滤器处理。
#[derive(Debug, Clone, Default)]
pub struct RegistryInventory {
    filters: FilterSet,
}

impl RegistryInventory {
    pub fn new(filters: FilterSet) -> Self {
        Self { filters }
    }
}

impl InventoryReader for RegistryInventory {
    fn installed_packages(&self) -> Result<Vec<Package>, UninstallerError> {
        let mut packages = registry::list_installed_packages()?;
        for package in &mut packages {
            package.product_name = self.filters.apply(&package.product_name);
        }
        dedupe_and_sort(&mut packages);
        Ok(packages)
    }
}

/// 同一产品可能登记在多个用户 SID 下, 按产品代码去重后按名称排序
pub fn dedupe_and_sort(packages: &mut Vec<Package>) {
    packages.retain(|p| !p.product_name.trim().is_empty() && !p.product_code.trim().is_empty());
    let mut seen = std::collections::HashSet::new();
    packages.retain(|p| seen.insert(normalize_code(&p.product_code)));
    packages.sort_by(|left, right| {
        left.product_name
            .to_lowercase()
            .cmp(&right.product_name.to_lowercase())
    });
}

pub fn apply_search_filter(packages: &mut Vec<Package>, search: Option<&str>) {
    if let Some(query) = search {
        let normalized_query = query.to_lowercase();
        packages.retain(|package| {
            utils::fuzzy_match(&package.product_name.to_lowercase(), &normalized_query)
                || normalize_code(&package.product_code) == normalize_code(query)
        });
    }
}
