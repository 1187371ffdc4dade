//! 卸载编排
//!
//! 负责决定哪些 bundle 以什么顺序卸载、前后置修复动作何时执行、
//! 退出码如何向上传播, 以及主卸载结束后的孤立包清扫。
//! 所有卸载都在调用线程上顺序执行, 3010 (需要重启) 是唯一的提前结束信号。

pub mod actions;
pub mod filter;
pub mod matcher;
pub mod phase;
pub mod report;

use std::time::Duration;

use crate::modules::catalog::models::{Bundle, Package, PackageType};
use crate::modules::catalog::package_cache::PackageCache;
use crate::modules::catalog::CatalogStore;
use crate::modules::common::error::UninstallerError;
use crate::modules::executor::{
    BundleExecutor, CachedBundleExecutor, NativePackageExecutor, PackageExecutor,
    SystemProcessRunner, EXIT_SUCCESS, EXIT_UNKNOWN, REBOOT_REQUIRED,
};
use crate::modules::inventory::{InventoryReader, RegistryInventory};
use actions::{ExitCodeAggregator, ObjectType, RemediationAction, TemplateType};
use matcher::MachineProfile;
use phase::{BundlePhase, BundleRun};
use report::{BundleResult, PackageResult, RunReport, SelectedRunReport, SweepSummary};

pub struct Orchestrator {
    catalog: CatalogStore,
    cache: PackageCache,
    machine: MachineProfile,
    actions: Vec<RemediationAction>,
    inventory: Box<dyn InventoryReader>,
    bundle_executor: Box<dyn BundleExecutor>,
    package_executor: Box<dyn PackageExecutor>,
    /// 演练模式: 不启动任何卸载进程, 退出码按 0 处理
    do_not_execute_process: bool,
}

impl Orchestrator {
    /// 使用真实的注册表清单与原生卸载程序
    pub fn new(catalog: CatalogStore, cache: PackageCache, machine: MachineProfile) -> Self {
        Self {
            catalog,
            machine,
            actions: actions::default_actions(),
            inventory: Box::new(RegistryInventory::default()),
            bundle_executor: Box::new(CachedBundleExecutor::new(
                cache.clone(),
                SystemProcessRunner::default(),
            )),
            package_executor: Box::new(NativePackageExecutor::new(SystemProcessRunner::default())),
            cache,
            do_not_execute_process: false,
        }
    }

    /// 为原生卸载进程设置超时
    pub fn with_process_timeout(mut self, timeout: Option<Duration>) -> Self {
        let runner = SystemProcessRunner::new(timeout);
        self.bundle_executor = Box::new(CachedBundleExecutor::new(self.cache.clone(), runner));
        self.package_executor = Box::new(NativePackageExecutor::new(runner));
        self
    }

    pub fn with_actions(mut self, actions: Vec<RemediationAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_inventory(mut self, inventory: Box<dyn InventoryReader>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_bundle_executor(mut self, executor: Box<dyn BundleExecutor>) -> Self {
        self.bundle_executor = executor;
        self
    }

    pub fn with_package_executor(mut self, executor: Box<dyn PackageExecutor>) -> Self {
        self.package_executor = executor;
        self
    }

    pub fn dry_run(mut self, do_not_execute_process: bool) -> Self {
        self.do_not_execute_process = do_not_execute_process;
        self
    }

    pub fn machine(&self) -> &MachineProfile {
        &self.machine
    }

    pub fn is_dry_run(&self) -> bool {
        self.do_not_execute_process
    }

    /// 已安装的 bundle, 产品 bundle 在前, 名称含 "(KB" 的更新 bundle 在后
    pub fn planned_bundles(&self) -> Vec<&Bundle> {
        uninstall_order(self.catalog.installed_bundles(&self.cache))
    }

    /// 卸载所有已安装的 bundle, 然后清扫孤立包
    ///
    /// 任一 bundle 返回 3010 时立即停止, 不再处理后续 bundle 与清扫。
    pub fn uninstall_all(&self) -> Result<RunReport, UninstallerError> {
        let mut report = RunReport::default();

        for bundle in self.planned_bundles() {
            let mut result = BundleResult::new(bundle);
            if self.do_not_execute_process {
                tracing::debug!("演练模式, 跳过 bundle 卸载: {}", bundle.name);
            } else {
                match self.bundle_executor.uninstall(bundle) {
                    Ok(code) => {
                        result.executed = true;
                        result.exit_code = code;
                    }
                    Err(e) => {
                        tracing::error!("Bundle: {} 卸载异常: {}", bundle.name, e);
                        result.exit_code = EXIT_UNKNOWN;
                        result.error = Some(e.to_string());
                    }
                }
            }

            tracing::info!("{}", result.log_line());
            let exit_code = result.exit_code;
            report.bundles.push(result);

            if exit_code == REBOOT_REQUIRED {
                tracing::warn!("需要重启, 停止后续卸载");
                report.exit_code = REBOOT_REQUIRED;
                return Ok(report);
            }
        }

        tracing::info!("bundle 卸载完成");
        tracing::info!("开始查找并清理孤立的 MSI");
        report.sweep = Some(self.sweep_orphans()?);
        report.exit_code = EXIT_SUCCESS;
        Ok(report)
    }

    /// 卸载单个 bundle, 前后执行匹配的修复动作
    ///
    /// 前置动作汇总为 3010 时不卸载 bundle; 否则后置动作总会执行。
    /// 返回记录中的退出码是 bundle 自身的退出码。
    pub fn uninstall_bundle(&self, bundle: &Bundle) -> Result<BundleRun, UninstallerError> {
        if !self.catalog.has_selection() {
            return Err(UninstallerError::NoReleaseSelected);
        }

        let mut run = BundleRun::new(bundle);

        tracing::info!("前置修复动作开始: {}", bundle.name);
        run.advance(BundlePhase::PreActionsRunning);
        let pre_code = self.run_remediation(bundle, TemplateType::Pre);
        run.advance(BundlePhase::PreActionsDone(pre_code));
        tracing::info!("前置修复动作结束, 退出码: {}", pre_code);

        if pre_code == REBOOT_REQUIRED {
            tracing::warn!("前置修复动作需要重启, 跳过 bundle 卸载: {}", bundle.name);
            run.exit_code = REBOOT_REQUIRED;
            run.advance(BundlePhase::Terminal);
            return Ok(run);
        }

        run.advance(BundlePhase::BundleUninstalling);
        let exit_code = if self.do_not_execute_process {
            tracing::debug!("演练模式, 跳过 bundle 卸载: {}", bundle.name);
            EXIT_SUCCESS
        } else {
            match self.bundle_executor.uninstall(bundle) {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!("Bundle: {} 卸载异常: {}", bundle.name, e);
                    EXIT_UNKNOWN
                }
            }
        };
        run.advance(BundlePhase::BundleDone(exit_code));

        tracing::info!("后置修复动作开始: {}", bundle.name);
        run.advance(BundlePhase::PostActionsRunning);
        let post_code = self.run_remediation(bundle, TemplateType::Post);
        run.advance(BundlePhase::PostActionsDone(post_code));
        tracing::info!("后置修复动作结束, 退出码: {}", post_code);

        run.exit_code = exit_code;
        run.advance(BundlePhase::Terminal);
        Ok(run)
    }

    /// 依次卸载已选择且已安装的 bundle, 遇到非零退出码即停止并返回该退出码
    pub fn uninstall_selected(&self) -> Result<SelectedRunReport, UninstallerError> {
        if !self.catalog.has_selection() {
            return Err(UninstallerError::NoReleaseSelected);
        }

        let targets: Vec<&Bundle> = self
            .planned_bundles()
            .into_iter()
            .filter(|b| b.selected)
            .collect();

        let mut report = SelectedRunReport::default();
        for bundle in targets {
            let run = self.uninstall_bundle(bundle)?;
            tracing::info!("{} 卸载结束, 退出码: {}", run.bundle_name, run.exit_code);
            let exit_code = run.exit_code;
            report.runs.push(run);
            if exit_code != EXIT_SUCCESS {
                report.exit_code = exit_code;
                break;
            }
        }
        Ok(report)
    }

    /// 卸载单个包; 执行异常记为 -1
    pub fn uninstall_package(&self, package: &Package) -> i32 {
        tracing::info!("开始卸载包: {}", package.product_name);
        if self.do_not_execute_process {
            tracing::debug!("演练模式, 跳过包卸载: {}", package.product_name);
            return EXIT_SUCCESS;
        }

        match self.package_executor.uninstall(package) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("包 {} 卸载异常: {}", package.product_name, e);
                EXIT_UNKNOWN
            }
        }
    }

    /// 执行一轮前置或后置修复动作, 返回汇总后的退出码
    ///
    /// 一旦有修复动作实际执行过, 无论退出码为何都结束本轮。
    pub fn run_remediation(&self, bundle: &Bundle, template: TemplateType) -> i32 {
        let candidates: Vec<&RemediationAction> = self
            .actions
            .iter()
            .filter(|a| a.template == template)
            .collect();
        tracing::debug!(
            "{} 修复动作: {} 个, bundle: {}",
            template,
            candidates.len(),
            bundle.name
        );

        let mut aggregator = ExitCodeAggregator::new();
        let mut did_run = false;

        for action in candidates {
            if !matcher::is_applicable(action, &self.machine) {
                continue;
            }

            if let Some(package) = bundle.find_package(&action.product_code) {
                if self.do_not_execute_process {
                    continue;
                }

                tracing::info!("找到匹配架构与系统的包: {}", package.product_name);
                let target = package_for_action(package, action);
                let code = match self.package_executor.uninstall(&target) {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::error!("修复动作执行异常 {}: {}", package.product_name, e);
                        EXIT_UNKNOWN
                    }
                };
                did_run = true;

                match code {
                    EXIT_SUCCESS => {}
                    REBOOT_REQUIRED => tracing::info!("需要重启"),
                    other => tracing::info!(
                        "当前退出码: {}  返回的错误码: {}",
                        aggregator.current(),
                        other
                    ),
                }
                aggregator.record(code);
            }

            if did_run {
                break;
            }
        }

        aggregator.finish()
    }

    /// 重新读取已安装清单, 依次卸载命中孤立索引的包
    ///
    /// 单个包失败只记录, 已卸载的包不回滚。
    pub fn sweep_orphans(&self) -> Result<SweepSummary, UninstallerError> {
        let installed = self.inventory.installed_packages()?;
        let orphans = self.catalog.orphans(&installed);
        let total = orphans.len();
        let mut summary = SweepSummary::new(total);

        if total == 0 {
            tracing::info!("未发现孤立的 MSI");
            return Ok(summary);
        }

        tracing::info!("发现 {} 个孤立的 MSI, 开始卸载", total);
        let mut remaining = total;
        for package in orphans {
            let mut result = PackageResult::new(package);
            if !self.do_not_execute_process {
                match self.package_executor.uninstall(package) {
                    Ok(code) => {
                        result.executed = true;
                        result.exit_code = code;
                    }
                    Err(e) => {
                        tracing::error!("MSI: {} 卸载异常: {}", package.product_name, e);
                        result.exit_code = EXIT_UNKNOWN;
                        result.error = Some(e.to_string());
                    }
                }
            }

            remaining -= 1;
            tracing::info!(
                "已卸载 {}, 退出码: {}. {}/{}",
                package.product_name,
                result.exit_code,
                remaining,
                total
            );
            summary.record(result);
        }

        Ok(summary)
    }
}

/// 产品 bundle 在前, 更新 bundle 在后, 各自保持原有顺序
pub fn uninstall_order(bundles: Vec<&Bundle>) -> Vec<&Bundle> {
    let (updates, products): (Vec<&Bundle>, Vec<&Bundle>) =
        bundles.into_iter().partition(|b| b.is_update_bundle());
    products.into_iter().chain(updates).collect()
}

/// 修复动作声明的对象类型决定使用哪种卸载命令
fn package_for_action(package: &Package, action: &RemediationAction) -> Package {
    let mut target = package.clone();
    match action.object_type {
        ObjectType::Msi => target.package_type = PackageType::Msi,
        ObjectType::Msu => target.package_type = PackageType::Msu,
        ObjectType::Bundle => {}
    }
    target
}

#[cfg(test)]
mod tests {
    use super::matcher::{Architecture, OsVersion};
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeSet, HashMap, VecDeque};
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<String>>>;

    struct FakeBundles {
        codes: HashMap<String, i32>,
        failing: Vec<String>,
        calls: Calls,
    }

    impl BundleExecutor for FakeBundles {
        fn uninstall(&self, bundle: &Bundle) -> Result<i32, UninstallerError> {
            self.calls.borrow_mut().push(format!("bundle:{}", bundle.name));
            if self.failing.contains(&bundle.name) {
                return Err(UninstallerError::Process {
                    program: bundle.name.clone(),
                    reason: "access denied".to_string(),
                });
            }
            Ok(self.codes.get(&bundle.name).copied().unwrap_or(0))
        }
    }

    struct FakePackages {
        codes: RefCell<VecDeque<Result<i32, String>>>,
        calls: Calls,
    }

    impl PackageExecutor for FakePackages {
        fn uninstall(&self, package: &Package) -> Result<i32, UninstallerError> {
            self.calls.borrow_mut().push(format!(
                "package:{}:{}",
                package.product_code, package.package_type
            ));
            match self.codes.borrow_mut().pop_front() {
                Some(Ok(code)) => Ok(code),
                Some(Err(reason)) => Err(UninstallerError::Process {
                    program: "msiexec.exe".to_string(),
                    reason,
                }),
                None => Ok(0),
            }
        }
    }

    struct FakeInventory {
        packages: Vec<Package>,
        calls: Calls,
    }

    impl InventoryReader for FakeInventory {
        fn installed_packages(&self) -> Result<Vec<Package>, UninstallerError> {
            self.calls.borrow_mut().push("inventory".to_string());
            Ok(self.packages.clone())
        }
    }

    struct Scenario {
        _root: tempfile::TempDir,
        catalog: CatalogStore,
        cache: PackageCache,
        bundle_codes: HashMap<String, i32>,
        failing_bundles: Vec<String>,
        package_codes: Vec<Result<i32, String>>,
        installed: Vec<Package>,
        actions: Vec<RemediationAction>,
        machine: MachineProfile,
        calls: Calls,
    }

    impl Scenario {
        /// 每个名称对应一个已安装 (包缓存目录存在) 的 bundle
        fn with_installed(names: &[&str]) -> Self {
            let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
            let cache = PackageCache::new(root.path());
            let mut catalog = CatalogStore::new();
            for (i, name) in names.iter().enumerate() {
                let bundle = Bundle::new(&format!("{{0000000{}-0000-0000-0000-000000000000}}", i), *name, "1.0");
                std::fs::create_dir_all(cache.bundle_dir(&bundle))
                    .unwrap_or_else(|e| panic!("mkdir: {}", e));
                catalog.add_bundle(bundle);
            }
            Self {
                _root: root,
                catalog,
                cache,
                bundle_codes: HashMap::new(),
                failing_bundles: Vec::new(),
                package_codes: Vec::new(),
                installed: Vec::new(),
                actions: Vec::new(),
                machine: MachineProfile::new(Architecture::X64, Some(OsVersion::Windows81)),
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn orchestrator(self, dry_run: bool) -> (Orchestrator, Calls, tempfile::TempDir) {
            let calls = self.calls.clone();
            let orchestrator = Orchestrator::new(self.catalog, self.cache, self.machine)
                .with_actions(self.actions)
                .with_inventory(Box::new(FakeInventory {
                    packages: self.installed,
                    calls: calls.clone(),
                }))
                .with_bundle_executor(Box::new(FakeBundles {
                    codes: self.bundle_codes,
                    failing: self.failing_bundles,
                    calls: calls.clone(),
                }))
                .with_package_executor(Box::new(FakePackages {
                    codes: RefCell::new(self.package_codes.into_iter().collect()),
                    calls: calls.clone(),
                }))
                .dry_run(dry_run);
            (orchestrator, calls, self._root)
        }
    }

    fn kb_action(template: TemplateType, product_code: &str) -> RemediationAction {
        RemediationAction::new(
            vec![Architecture::X86, Architecture::X64],
            vec![OsVersion::Windows81],
            product_code,
            template,
            ObjectType::Msu,
        )
    }

    fn calls_of(calls: &Calls) -> Vec<String> {
        calls.borrow().clone()
    }

    #[test]
    fn update_bundles_are_uninstalled_last() {
        let scenario = Scenario::with_installed(&["Tool A", "Update (KB1234)", "Tool B"]);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let report = orchestrator
            .uninstall_all()
            .unwrap_or_else(|e| panic!("uninstall_all: {}", e));

        assert_eq!(report.exit_code, 0);
        assert_eq!(
            calls_of(&calls),
            vec![
                "bundle:Tool A",
                "bundle:Tool B",
                "bundle:Update (KB1234)",
                "inventory"
            ]
        );
    }

    #[test]
    fn bundles_without_cache_directory_are_skipped() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario
            .catalog
            .add_bundle(Bundle::new("{99999999-0000-0000-0000-000000000000}", "Not Installed", "1.0"));
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let _ = orchestrator.uninstall_all();
        assert_eq!(calls_of(&calls), vec!["bundle:Tool A", "inventory"]);
    }

    #[test]
    fn reboot_required_halts_remaining_bundles_and_sweep() {
        let mut scenario = Scenario::with_installed(&["Tool A", "Tool B", "Update (KB1)"]);
        scenario.bundle_codes.insert("Tool A".to_string(), 3010);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let report = orchestrator
            .uninstall_all()
            .unwrap_or_else(|e| panic!("uninstall_all: {}", e));

        assert_eq!(report.exit_code, 3010);
        assert!(report.reboot_required());
        assert!(report.sweep.is_none());
        assert_eq!(calls_of(&calls), vec!["bundle:Tool A"]);
    }

    #[test]
    fn bundle_failures_do_not_stop_the_run() {
        let mut scenario = Scenario::with_installed(&["Tool A", "Tool B"]);
        scenario.failing_bundles.push("Tool A".to_string());
        scenario.bundle_codes.insert("Tool B".to_string(), 1603);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let report = orchestrator
            .uninstall_all()
            .unwrap_or_else(|e| panic!("uninstall_all: {}", e));

        assert_eq!(report.exit_code, 0);
        assert_eq!(report.bundles[0].exit_code, EXIT_UNKNOWN);
        assert!(report.bundles[0].error.is_some());
        assert_eq!(report.bundles[1].exit_code, 1603);
        assert!(report.sweep.is_some());
        assert_eq!(calls_of(&calls).last().map(String::as_str), Some("inventory"));
    }

    #[test]
    fn dry_run_executes_nothing_but_logs_the_same_lines() {
        let build = || {
            let mut scenario = Scenario::with_installed(&["Tool A", "Update (KB1234)", "Tool B"]);
            let mut retired = Bundle::new("{99999999-0000-0000-0000-000000000000}", "Retired", "1.0");
            retired
                .packages
                .push(Package::new("{P1}", "Core").with_upgrade_code("{U1}"));
            scenario.catalog.add_bundle(retired);
            scenario.installed = vec![Package::new("{P1}", "Core").with_upgrade_code("{U1}")];
            scenario
        };

        let (dry, dry_calls, _dry_root) = build().orchestrator(true);
        let dry_report = dry.uninstall_all().unwrap_or_else(|e| panic!("dry: {}", e));

        let (live, _live_calls, _live_root) = build().orchestrator(false);
        let live_report = live.uninstall_all().unwrap_or_else(|e| panic!("live: {}", e));

        assert_eq!(dry_report.exit_code, 0);
        assert_eq!(calls_of(&dry_calls), vec!["inventory"]);
        assert!(dry_report.bundles.iter().all(|b| !b.executed));
        assert_eq!(dry_report.log_lines(), live_report.log_lines());

        let sweep = dry_report.sweep.unwrap_or_default();
        assert_eq!(sweep.candidates, 1);
        assert!(sweep.results.iter().all(|r| !r.executed));
    }

    #[test]
    fn sweep_is_best_effort_and_sequential() {
        let mut scenario = Scenario::with_installed(&[]);
        scenario.catalog = CatalogStore::from_parts(
            Vec::new(),
            BTreeSet::from(["U1".to_string()]),
            BTreeSet::from(["P9".to_string()]),
        );
        scenario.installed = vec![
            Package::new("X", "first").with_upgrade_code("U1"),
            Package::new("Y", "second").with_upgrade_code("U1"),
            Package::new("P9", "third"),
            Package::new("Z", "unrelated"),
        ];
        scenario.package_codes = vec![Ok(0), Err("spawn failed".to_string()), Ok(1603)];
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let summary = orchestrator
            .sweep_orphans()
            .unwrap_or_else(|e| panic!("sweep: {}", e));

        assert_eq!(summary.candidates, 3);
        assert_eq!((summary.succeeded, summary.failed), (1, 2));
        assert_eq!(
            calls_of(&calls),
            vec!["inventory", "package:X:MSI", "package:Y:MSI", "package:P9:MSI"]
        );
    }

    fn selected_bundle(scenario: &mut Scenario, packages: Vec<Package>) -> Bundle {
        let _ = scenario.catalog.select("1");
        let mut bundle = scenario.catalog.bundles()[0].clone();
        bundle.packages = packages;
        bundle
    }

    #[test]
    fn bundle_uninstall_requires_a_selection() {
        let scenario = Scenario::with_installed(&["Tool A"]);
        let bundle = scenario.catalog.bundles()[0].clone();
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        assert!(matches!(
            orchestrator.uninstall_bundle(&bundle),
            Err(UninstallerError::NoReleaseSelected)
        ));
        assert!(matches!(
            orchestrator.uninstall_selected(),
            Err(UninstallerError::NoReleaseSelected)
        ));
        assert!(calls_of(&calls).is_empty());
    }

    #[test]
    fn pre_action_reboot_skips_bundle_and_post_actions() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![
            kb_action(TemplateType::Pre, "2999226"),
            kb_action(TemplateType::Post, "2999226"),
        ];
        scenario.package_codes = vec![Ok(3010)];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let run = orchestrator
            .uninstall_bundle(&bundle)
            .unwrap_or_else(|e| panic!("uninstall_bundle: {}", e));

        assert_eq!(run.exit_code, 3010);
        assert!(!run.bundle_executed());
        assert_eq!(
            run.phases,
            vec![
                BundlePhase::NotStarted,
                BundlePhase::PreActionsRunning,
                BundlePhase::PreActionsDone(3010),
                BundlePhase::Terminal,
            ]
        );
        assert_eq!(calls_of(&calls), vec!["package:2999226:MSU"]);
    }

    #[test]
    fn post_actions_run_even_when_bundle_fails() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![kb_action(TemplateType::Post, "2999226")];
        scenario.bundle_codes.insert("Tool A".to_string(), 1603);
        scenario.package_codes = vec![Ok(0)];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let run = orchestrator
            .uninstall_bundle(&bundle)
            .unwrap_or_else(|e| panic!("uninstall_bundle: {}", e));

        assert_eq!(run.exit_code, 1603);
        assert!(run.is_terminal());
        assert_eq!(
            calls_of(&calls),
            vec!["bundle:Tool A", "package:2999226:MSU"]
        );
        assert!(run.phases.contains(&BundlePhase::BundleDone(1603)));
        assert!(run.phases.contains(&BundlePhase::PostActionsDone(0)));
    }

    #[test]
    fn bundle_code_is_returned_not_post_action_code() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![kb_action(TemplateType::Post, "2999226")];
        scenario.package_codes = vec![Ok(1603)];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, _calls, _root) = scenario.orchestrator(false);

        let run = orchestrator
            .uninstall_bundle(&bundle)
            .unwrap_or_else(|e| panic!("uninstall_bundle: {}", e));
        assert_eq!(run.exit_code, 0);
        assert!(run.phases.contains(&BundlePhase::PostActionsDone(1603)));
    }

    #[test]
    fn remediation_stops_after_first_executed_action_even_on_success() {
        // 第一个动作成功执行后本轮即结束, 第二个动作不会执行
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![
            kb_action(TemplateType::Pre, "NOT-IN-BUNDLE"),
            kb_action(TemplateType::Pre, "2999226"),
            kb_action(TemplateType::Pre, "2919355"),
        ];
        scenario.package_codes = vec![Ok(0), Ok(0)];
        let bundle = selected_bundle(
            &mut scenario,
            vec![
                Package::new("2999226", "KB2999226"),
                Package::new("2919355", "KB2919355"),
            ],
        );
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let code = orchestrator.run_remediation(&bundle, TemplateType::Pre);

        assert_eq!(code, 0);
        assert_eq!(calls_of(&calls), vec!["package:2999226:MSU"]);
    }

    #[test]
    fn remediation_failure_code_is_returned() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![kb_action(TemplateType::Pre, "2999226")];
        scenario.package_codes = vec![Err("wusa missing".to_string())];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, _calls, _root) = scenario.orchestrator(false);

        assert_eq!(orchestrator.run_remediation(&bundle, TemplateType::Pre), EXIT_UNKNOWN);
    }

    #[test]
    fn remediation_requires_exact_machine_match() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.machine = MachineProfile::new(Architecture::X64, Some(OsVersion::Windows10));
        scenario.actions = vec![kb_action(TemplateType::Pre, "2999226")];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        assert_eq!(orchestrator.run_remediation(&bundle, TemplateType::Pre), 0);
        assert!(calls_of(&calls).is_empty());
    }

    #[test]
    fn dry_run_bundle_uninstall_walks_every_phase_without_executing() {
        let mut scenario = Scenario::with_installed(&["Tool A"]);
        scenario.actions = vec![
            kb_action(TemplateType::Pre, "2999226"),
            kb_action(TemplateType::Post, "2999226"),
        ];
        let bundle = selected_bundle(&mut scenario, vec![Package::new("2999226", "KB2999226")]);
        let (orchestrator, calls, _root) = scenario.orchestrator(true);

        let run = orchestrator
            .uninstall_bundle(&bundle)
            .unwrap_or_else(|e| panic!("uninstall_bundle: {}", e));

        assert_eq!(run.exit_code, 0);
        assert_eq!(
            run.phases,
            vec![
                BundlePhase::NotStarted,
                BundlePhase::PreActionsRunning,
                BundlePhase::PreActionsDone(0),
                BundlePhase::BundleUninstalling,
                BundlePhase::BundleDone(0),
                BundlePhase::PostActionsRunning,
                BundlePhase::PostActionsDone(0),
                BundlePhase::Terminal,
            ]
        );
        assert!(calls_of(&calls).is_empty());
    }

    #[test]
    fn selected_run_stops_at_first_non_zero_code() {
        let mut scenario = Scenario::with_installed(&["Tool A", "Tool B", "Tool C"]);
        scenario.bundle_codes.insert("Tool B".to_string(), 1603);
        let _ = scenario.catalog.select("1,2,3");
        let (orchestrator, calls, _root) = scenario.orchestrator(false);

        let report = orchestrator
            .uninstall_selected()
            .unwrap_or_else(|e| panic!("uninstall_selected: {}", e));

        assert_eq!(report.exit_code, 1603);
        assert_eq!(report.runs.len(), 2);
        assert_eq!(calls_of(&calls), vec!["bundle:Tool A", "bundle:Tool B"]);
    }

    #[test]
    fn package_uninstall_honours_dry_run_and_maps_errors() {
        let mut scenario = Scenario::with_installed(&[]);
        scenario.package_codes = vec![Err("boom".to_string())];
        let (live, calls, _root) = scenario.orchestrator(false);
        assert_eq!(live.uninstall_package(&Package::new("{P1}", "Core")), EXIT_UNKNOWN);
        assert_eq!(calls_of(&calls).len(), 1);

        let (dry, dry_calls, _dry_root) = Scenario::with_installed(&[]).orchestrator(true);
        assert_eq!(dry.uninstall_package(&Package::new("{P1}", "Core")), 0);
        assert!(calls_of(&dry_calls).is_empty());
    }
}
