pub mod models;
pub mod package_cache;
pub mod storage;
pub mod wixpdb;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::modules::common::error::UninstallerError;
use crate::modules::orchestrator::filter::FilterSet;
use models::{normalize_code, Bundle, Package};
use package_cache::PackageCache;

/// bundle 目录与孤立包索引
///
/// - `upgrade_codes`: 所有非永久包的升级代码
/// - `no_upgrade_code_product_codes`: 没有升级代码的包的产品代码
///
/// 索引中的代码都经过 [`normalize_code`] 处理。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStore {
    bundles: Vec<Bundle>,
    upgrade_codes: BTreeSet<String>,
    no_upgrade_code_product_codes: BTreeSet<String>,
}

/// 批量解析元数据的结果
#[derive(Debug, Default)]
pub struct PopulateSummary {
    pub added: usize,
    pub duplicates: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        bundles: Vec<Bundle>,
        upgrade_codes: BTreeSet<String>,
        no_upgrade_code_product_codes: BTreeSet<String>,
    ) -> Self {
        Self {
            bundles,
            upgrade_codes: normalize_codes(upgrade_codes),
            no_upgrade_code_product_codes: normalize_codes(no_upgrade_code_product_codes),
        }
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn upgrade_codes(&self) -> &BTreeSet<String> {
        &self.upgrade_codes
    }

    pub fn no_upgrade_code_product_codes(&self) -> &BTreeSet<String> {
        &self.no_upgrade_code_product_codes
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn find_bundle(&self, bundle_id: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.same_id(bundle_id))
    }

    /// 登记 bundle 的包到索引; 同 ID 的 bundle 已存在时不重复加入列表
    ///
    /// 返回是否新增了 bundle。
    pub fn add_bundle(&mut self, bundle: Bundle) -> bool {
        for package in &bundle.packages {
            self.register_package(package);
        }

        if self.find_bundle(&bundle.bundle_id).is_some() {
            tracing::debug!("bundle 已存在, 仅合并索引: {} ({})", bundle.name, bundle.bundle_id);
            return false;
        }

        tracing::debug!("加入 bundle: {} ({})", bundle.name, bundle.bundle_id);
        self.bundles.push(bundle);
        true
    }

    fn register_package(&mut self, package: &Package) {
        match package.upgrade_code() {
            Some(upgrade_code) => {
                self.upgrade_codes.insert(normalize_code(upgrade_code));
            }
            None => {
                if !package.product_code.trim().is_empty() {
                    self.no_upgrade_code_product_codes
                        .insert(normalize_code(&package.product_code));
                }
            }
        }
    }

    /// 合并另一个目录 (如 `--base` 指定的已有目录文件)
    pub fn merge(&mut self, other: CatalogStore) -> usize {
        self.upgrade_codes.extend(normalize_codes(other.upgrade_codes));
        self.no_upgrade_code_product_codes
            .extend(normalize_codes(other.no_upgrade_code_product_codes));
        let mut added = 0;
        for bundle in other.bundles {
            if self.add_bundle(bundle) {
                added += 1;
            }
        }
        added
    }

    /// 并行解析元数据文件, 按输入顺序合并
    ///
    /// 单个文件解析失败只记录, 不影响其余文件。
    pub async fn populate_from_metadata(&mut self, paths: &[PathBuf]) -> PopulateSummary {
        let handles: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| tokio::task::spawn_blocking(move || wixpdb::parse_wixpdb(&path)))
            .collect();

        let mut summary = PopulateSummary::default();
        for (path, handle) in paths.iter().zip(handles) {
            match handle.await {
                Ok(Ok(bundle)) => {
                    if self.add_bundle(bundle) {
                        summary.added += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("解析元数据失败 {}: {}", path.display(), e);
                    summary.failures.push((path.clone(), e.to_string()));
                }
                Err(e) => {
                    tracing::error!("解析任务异常 {}: {}", path.display(), e);
                    summary.failures.push((path.clone(), e.to_string()));
                }
            }
        }
        summary
    }

    /// 包缓存目录存在的 bundle, 保持目录顺序
    pub fn installed_bundles(&self, cache: &PackageCache) -> Vec<&Bundle> {
        self.bundles.iter().filter(|b| cache.is_installed(b)).collect()
    }

    pub fn selected_bundles(&self) -> Vec<&Bundle> {
        self.bundles.iter().filter(|b| b.selected).collect()
    }

    pub fn has_selection(&self) -> bool {
        self.bundles.iter().any(|b| b.selected)
    }

    pub fn clear_selection(&mut self) {
        for bundle in &mut self.bundles {
            bundle.selected = false;
        }
    }

    /// 按 1 起始的序号选择 bundle, 如 "1,3"
    ///
    /// 任一序号无效时不做任何修改。
    pub fn select(&mut self, selection: &str) -> Result<Vec<usize>, UninstallerError> {
        tracing::info!("选择: {}", selection);
        let positions = parse_positions(selection, self.bundles.len())?;
        for position in &positions {
            if let Some(bundle) = self.bundles.get_mut(position - 1) {
                bundle.selected = true;
                tracing::debug!("已选择: {}", bundle.name);
            }
        }
        Ok(positions)
    }

    /// 孤立包判定: 升级代码命中索引, 或没有升级代码且产品代码命中后备索引
    pub fn is_orphan(&self, package: &Package) -> bool {
        match package.upgrade_code() {
            Some(upgrade_code) => self.upgrade_codes.contains(&normalize_code(upgrade_code)),
            None => self
                .no_upgrade_code_product_codes
                .contains(&normalize_code(&package.product_code)),
        }
    }

    pub fn orphans<'a>(&self, installed: &'a [Package]) -> Vec<&'a Package> {
        installed.iter().filter(|p| self.is_orphan(p)).collect()
    }

    /// 用当前已安装的包替换所选 bundle 的包列表 (按产品代码对应, 保留链式包 ID)
    pub fn cross_reference(&mut self, installed: &[Package]) -> Vec<&Bundle> {
        for bundle in self.bundles.iter_mut().filter(|b| b.selected) {
            tracing::debug!("对照已安装包: {}", bundle.name);
            let matched: Vec<Package> = installed
                .iter()
                .filter_map(|live| {
                    bundle.find_package(&live.product_code).map(|known| {
                        let mut package = live.clone();
                        package.chaining_package_id = known.chaining_package_id.clone();
                        package.package_type = known.package_type;
                        package
                    })
                })
                .collect();
            bundle.packages = matched;
        }
        self.selected_bundles()
    }
}

/// 目录列表中的一行: 序号、过滤后的名称与状态标记
pub fn listing_line(position: usize, name: &str, installed: bool, selected: bool) -> String {
    let markers: Vec<&str> = [(installed, "Installed"), (selected, "Selected")]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, marker)| marker)
        .collect();
    format!("{:>2}. {:<55}[{}]", position, name, markers.join(", "))
}

impl CatalogStore {
    /// 按目录顺序生成列表, 序号即 `select` 使用的位置
    pub fn listing(&self, cache: &PackageCache, filters: &FilterSet) -> Vec<String> {
        self.bundles
            .iter()
            .enumerate()
            .map(|(i, bundle)| {
                listing_line(
                    i + 1,
                    &filters.apply(&bundle.name),
                    cache.is_installed(bundle),
                    bundle.selected,
                )
            })
            .collect()
    }
}

/// 外部来源 (目录文件, 调用方) 的索引代码与 `register_package` 使用同一规范形式
fn normalize_codes(codes: BTreeSet<String>) -> BTreeSet<String> {
    codes
        .iter()
        .map(|code| normalize_code(code))
        .filter(|code| !code.is_empty())
        .collect()
}

fn parse_positions(selection: &str, count: usize) -> Result<Vec<usize>, UninstallerError> {
    let mut positions = Vec::new();
    for raw in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let position: usize = raw
            .parse()
            .map_err(|_| UninstallerError::Configuration(format!("无效的序号: {}", raw)))?;
        if position == 0 || position > count {
            return Err(UninstallerError::Configuration(format!(
                "序号超出范围: {} (共 {} 个 bundle)",
                position, count
            )));
        }
        if !positions.contains(&position) {
            positions.push(position);
        }
    }

    if positions.is_empty() {
        return Err(UninstallerError::Configuration("未提供任何序号".to_string()));
    }
    Ok(positions)
}
