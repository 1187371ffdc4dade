pub mod bundle_installed;
pub mod create;
pub mod detect;
pub mod dir;
pub mod installed;
pub mod list;
pub mod load;
pub mod logs;
pub mod select;
pub mod sweep;
pub mod uninstall;

use anyhow::Result;
use clap::Subcommand;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::modules::catalog::package_cache::PackageCache;
use crate::modules::catalog::{storage, CatalogStore};
use crate::modules::common::config::AppConfig;
use crate::modules::common::system;
use crate::modules::inventory::RegistryInventory;
use crate::modules::orchestrator::Orchestrator;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 查看或设置数据目录
    Dir(dir::DirCommand),

    /// 列出目录中的 bundle
    List(list::ListCommand),

    /// 从安装元数据 (WixPdb) 创建目录文件
    Create(create::CreateCommand),

    /// 从导出的 bundle 文件加载目录
    Load(load::LoadCommand),

    /// 按序号选择要卸载的 bundle
    Select(select::SelectCommand),

    /// 列出本机已安装的 MSI 包
    Installed(installed::InstalledCommand),

    /// 对照已选择 bundle 与本机已安装的包
    BundleInstalled(bundle_installed::BundleInstalledCommand),

    /// 报告本机检测到的 bundle
    Detect(detect::DetectCommand),

    /// 卸载已安装的 bundle 并清扫孤立 MSI
    Uninstall(uninstall::UninstallCommand),

    /// 只清扫孤立 MSI
    Sweep(sweep::SweepCommand),

    /// 打开日志目录
    Logs(logs::LogsCommand),
}

/// 各命令共享的配置与目录访问
#[derive(Debug, Clone)]
pub struct Context {
    pub config: AppConfig,
}

impl Context {
    /// 加载配置, 命令行指定的数据目录优先于配置文件
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = AppConfig::load()?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        tracing::debug!("数据目录: {}", config.data_dir.display());
        Ok(Self { config })
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.config.catalog_path()
    }

    /// 读取目录文件; 文件不存在时返回空目录
    pub fn load_catalog(&self) -> Result<CatalogStore> {
        let path = self.catalog_path();
        if !path.exists() {
            tracing::warn!("目录文件不存在: {}, 请先执行 create 或 load", path.display());
            return Ok(CatalogStore::new());
        }
        Ok(storage::load_catalog(&path)?)
    }

    pub fn save_catalog(&self, catalog: &CatalogStore) -> Result<PathBuf> {
        let path = self.catalog_path();
        storage::save_catalog(catalog, &path)?;
        Ok(path)
    }

    pub fn package_cache(&self) -> PackageCache {
        PackageCache::detect()
    }

    pub fn inventory(&self) -> RegistryInventory {
        RegistryInventory::new(self.config.filter_set())
    }

    /// 命令行超时优先于配置文件, 0 表示无限等待
    pub fn process_timeout(&self, override_secs: Option<u64>) -> Option<Duration> {
        match override_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => self.config.process_timeout(),
        }
    }

    pub fn orchestrator(
        &self,
        catalog: CatalogStore,
        dry_run: bool,
        timeout: Option<Duration>,
    ) -> Orchestrator {
        Orchestrator::new(catalog, self.package_cache(), system::detect_machine())
            .with_process_timeout(timeout)
            .with_actions(self.config.remediation_actions.clone())
            .with_inventory(Box::new(self.inventory()))
            .dry_run(dry_run)
    }
}

/// 卸载类命令在非演练模式下需要管理员权限
pub fn ensure_elevated(dry_run: bool) -> Result<()> {
    if dry_run || system::is_elevated() {
        return Ok(());
    }
    println!("安全提示: 卸载会删除系统组件, 必须以管理员身份运行。");
    println!("可以先使用 --dry-run 查看将要执行的操作。");
    anyhow::bail!("当前进程没有管理员权限")
}

/// 交互确认, 只有 y/yes 视为同意
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
