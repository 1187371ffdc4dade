use serde::Serialize;

use super::phase::BundleRun;
use crate::modules::catalog::models::{Bundle, Package};
use crate::modules::executor::{EXIT_SUCCESS, EXIT_UNKNOWN, REBOOT_REQUIRED};

/// `uninstall_all` 中单个 bundle 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleResult {
    pub bundle_id: String,
    pub name: String,
    pub exit_code: i32,
    /// 是否真正启动了卸载进程 (演练模式下为 false)
    pub executed: bool,
    pub error: Option<String>,
}

impl BundleResult {
    pub fn new(bundle: &Bundle) -> Self {
        Self {
            bundle_id: bundle.bundle_id.clone(),
            name: bundle.name.clone(),
            exit_code: EXIT_SUCCESS,
            executed: false,
            error: None,
        }
    }

    pub fn log_line(&self) -> String {
        format!("Bundle: {} 卸载结束, 退出码: {}", self.name, self.exit_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageResult {
    pub product_code: String,
    pub product_name: String,
    pub exit_code: i32,
    pub executed: bool,
    pub error: Option<String>,
}

impl PackageResult {
    pub fn new(package: &Package) -> Self {
        Self {
            product_code: package.product_code.clone(),
            product_name: package.product_name.clone(),
            exit_code: EXIT_SUCCESS,
            executed: false,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some() || !matches!(self.exit_code, EXIT_SUCCESS | REBOOT_REQUIRED)
    }
}

/// 孤立包清扫汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<PackageResult>,
}

impl SweepSummary {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: PackageResult) {
        if result.failed() {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
        self.results.push(result);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub bundles: Vec<BundleResult>,
    /// 因需要重启而提前结束时为 None
    pub sweep: Option<SweepSummary>,
    pub exit_code: i32,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            bundles: Vec::new(),
            sweep: None,
            exit_code: EXIT_UNKNOWN,
        }
    }
}

impl RunReport {
    pub fn reboot_required(&self) -> bool {
        self.exit_code == REBOOT_REQUIRED
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.bundles.iter().map(BundleResult::log_line).collect()
    }
}

/// `uninstall --selected` 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedRunReport {
    pub runs: Vec<BundleRun>,
    pub exit_code: i32,
}
