use std::path::PathBuf;

use super::{BundleExecutor, ProcessRunner, EXIT_SUCCESS, EXIT_UNKNOWN};
use crate::modules::catalog::models::Bundle;
use crate::modules::catalog::package_cache::PackageCache;
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils;

/// 通过包缓存中的 bundle 引导程序卸载
pub struct CachedBundleExecutor<R> {
    cache: PackageCache,
    runner: R,
    log_dir: PathBuf,
}

impl<R: ProcessRunner> CachedBundleExecutor<R> {
    pub fn new(cache: PackageCache, runner: R) -> Self {
        Self {
            cache,
            runner,
            log_dir: utils::get_uninstall_log_dir(),
        }
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    fn uninstall_arguments(&self, exe: &std::path::Path) -> Vec<String> {
        let stem = exe
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "bundle".to_string());
        let log_file = self.log_dir.join(format!("Uninstall_{}.log", stem));
        vec![
            "/uninstall".to_string(),
            "/force".to_string(),
            "/Q".to_string(),
            "/Log".to_string(),
            log_file.to_string_lossy().to_string(),
        ]
    }
}

impl<R: ProcessRunner> BundleExecutor for CachedBundleExecutor<R> {
    fn uninstall(&self, bundle: &Bundle) -> Result<i32, UninstallerError> {
        let executables = self.cache.bundle_executables(bundle);
        if executables.is_empty() {
            tracing::warn!(
                "包缓存中未找到 {} 的卸载程序: {}",
                bundle.name,
                self.cache.bundle_dir(bundle).display()
            );
            return Ok(EXIT_UNKNOWN);
        }

        let mut exit_code = EXIT_UNKNOWN;
        for exe in &executables {
            let args = self.uninstall_arguments(exe);
            exit_code = self.runner.run(exe, &args)?;
            if exit_code != EXIT_SUCCESS {
                break;
            }
        }
        Ok(exit_code)
    }
}
