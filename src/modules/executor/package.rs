use std::path::PathBuf;

use super::{PackageExecutor, ProcessRunner, EXIT_SUCCESS, EXIT_UNKNOWN, MSU_ALREADY_UNINSTALLED};
use crate::modules::catalog::models::{Package, PackageType};
use crate::modules::common::error::UninstallerError;
use crate::modules::common::utils;

const WINDOWS_UPDATE_SERVICE: &str = "wuauserv";

/// 使用系统自带的 msiexec / wusa 卸载包
pub struct NativePackageExecutor<R> {
    runner: R,
    system_dir: PathBuf,
    log_dir: PathBuf,
}

impl<R: ProcessRunner> NativePackageExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            system_dir: utils::get_system_dir(),
            log_dir: utils::get_uninstall_log_dir(),
        }
    }

    pub fn with_dirs(mut self, system_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        self.system_dir = system_dir.into();
        self.log_dir = log_dir.into();
        self
    }

    pub fn msi_arguments(&self, package: &Package) -> Vec<String> {
        let log_file = self.log_dir.join(format!(
            "dd_Uninstall_{}.log",
            utils::sanitize_file_name(&package.product_name)
        ));
        vec![
            "/qn".to_string(),
            "/norestart".to_string(),
            "IGNOREDEPENDENCIES=ALL".to_string(),
            "/x".to_string(),
            package.product_code.clone(),
            "/L*v".to_string(),
            log_file.to_string_lossy().to_string(),
        ]
    }

    pub fn msu_arguments(&self, package: &Package) -> Vec<String> {
        vec![
            "/quiet".to_string(),
            "/norestart".to_string(),
            "/uninstall".to_string(),
            format!("/kb:{}", package.product_code.trim()),
        ]
    }

    fn uninstall_msi(&self, package: &Package) -> Result<i32, UninstallerError> {
        let msiexec = self.system_dir.join("msiexec.exe");
        self.runner.run(&msiexec, &self.msi_arguments(package))
    }

    fn uninstall_msu(&self, package: &Package) -> Result<i32, UninstallerError> {
        // wusa 在更新服务运行时可能挂起, 先尝试停止服务
        self.stop_update_service();

        let wusa = self.system_dir.join("wusa.exe");
        let code = self.runner.run(&wusa, &self.msu_arguments(package))?;
        Ok(remap_msu_exit_code(code))
    }

    fn stop_update_service(&self) {
        let sc = self.system_dir.join("sc.exe");
        let args = ["stop".to_string(), WINDOWS_UPDATE_SERVICE.to_string()];
        match self.runner.run(&sc, &args) {
            Ok(code) => tracing::debug!("停止 {} 服务, 退出码: {}", WINDOWS_UPDATE_SERVICE, code),
            Err(e) => tracing::warn!("无法停止 {} 服务: {}", WINDOWS_UPDATE_SERVICE, e),
        }
    }
}

impl<R: ProcessRunner> PackageExecutor for NativePackageExecutor<R> {
    fn uninstall(&self, package: &Package) -> Result<i32, UninstallerError> {
        tracing::debug!("卸载包 {} ({}): {}", package.product_name, package.package_type, package.product_code);
        match package.package_type {
            PackageType::Msi => self.uninstall_msi(package),
            PackageType::Msu => self.uninstall_msu(package),
            PackageType::Exe => {
                tracing::warn!("不支持卸载 EXE 类型的包: {}", package.product_name);
                Ok(EXIT_UNKNOWN)
            }
        }
    }
}

/// wusa 对已卸载的更新返回 2359303, 视同成功
pub fn remap_msu_exit_code(code: i32) -> i32 {
    if code == MSU_ALREADY_UNINSTALLED {
        EXIT_SUCCESS
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::Path;

    /// wusa 按脚本返回退出码, 其它程序一律返回 0
    #[derive(Default)]
    struct WusaScript {
        codes: RefCell<VecDeque<i32>>,
        programs: RefCell<Vec<String>>,
        last_args: RefCell<Vec<String>>,
    }

    impl ProcessRunner for WusaScript {
        fn run(&self, program: &Path, args: &[String]) -> Result<i32, UninstallerError> {
            let name = program
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.programs.borrow_mut().push(name.clone());
            *self.last_args.borrow_mut() = args.to_vec();
            if name == "wusa.exe" {
                Ok(self.codes.borrow_mut().pop_front().unwrap_or(0))
            } else {
                Ok(0)
            }
        }
    }

    fn executor(runner: &WusaScript) -> NativePackageExecutor<&WusaScript> {
        NativePackageExecutor::new(runner).with_dirs(r"C:\Windows\System32", r"C:\Temp")
    }

    #[test]
    fn msu_already_uninstalled_is_reported_as_success() {
        let runner = WusaScript::default();
        runner.codes.borrow_mut().extend([0, 3010, 2359303, 1603]);
        let executor = executor(&runner);
        let update = Package::new("2999226", "KB2999226").with_type(PackageType::Msu);

        let codes: Vec<i32> = (0..4)
            .map(|_| executor.uninstall(&update).unwrap_or(EXIT_UNKNOWN))
            .collect();
        assert_eq!(codes, vec![0, 3010, 0, 1603]);
    }

    #[test]
    fn msu_uninstall_stops_update_service_first() {
        let runner = WusaScript::default();
        let update = Package::new("2999226", "KB2999226").with_type(PackageType::Msu);
        let _ = executor(&runner).uninstall(&update);

        assert_eq!(*runner.programs.borrow(), vec!["sc.exe", "wusa.exe"]);
        assert_eq!(
            *runner.last_args.borrow(),
            vec!["/quiet", "/norestart", "/uninstall", "/kb:2999226"]
        );
    }

    #[test]
    fn msi_codes_pass_through_unchanged() {
        let runner = WusaScript::default();
        let package = Package::new("{12345678-0000-0000-0000-000000000000}", "Tools: Core");
        let result = executor(&runner).uninstall(&package);

        assert_eq!(result.ok(), Some(0));
        assert_eq!(*runner.programs.borrow(), vec!["msiexec.exe"]);
        let args = runner.last_args.borrow();
        assert_eq!(&args[..5], ["/qn", "/norestart", "IGNOREDEPENDENCIES=ALL", "/x", "{12345678-0000-0000-0000-000000000000}"]);
        assert_eq!(args[5], "/L*v");
        assert!(args[6].ends_with("dd_Uninstall_Tools_ Core.log"));
    }

    #[test]
    fn exe_packages_are_not_executed() {
        let runner = WusaScript::default();
        let package = Package::new("setup", "Setup").with_type(PackageType::Exe);

        assert_eq!(executor(&runner).uninstall(&package).ok(), Some(EXIT_UNKNOWN));
        assert!(runner.programs.borrow().is_empty());
    }

    #[test]
    fn remap_only_touches_already_uninstalled_code() {
        assert_eq!(remap_msu_exit_code(2359303), 0);
        assert_eq!(remap_msu_exit_code(2359302), 2359302);
        assert_eq!(remap_msu_exit_code(-1), -1);
    }
}
