pub mod bundle;
pub mod package;
pub mod process;

use std::path::Path;

use crate::modules::catalog::models::{Bundle, Package};
use crate::modules::common::error::UninstallerError;

pub use bundle::CachedBundleExecutor;
pub use package::NativePackageExecutor;
pub use process::SystemProcessRunner;

pub const EXIT_SUCCESS: i32 = 0;
/// 需要重启, 作为控制信号向上传播
pub const REBOOT_REQUIRED: i32 = 3010;
/// wusa: 更新未安装 (已被卸载)
pub const MSU_ALREADY_UNINSTALLED: i32 = 2359303;
/// 没有进程被执行或无法取得退出码
pub const EXIT_UNKNOWN: i32 = -1;

/// 执行 bundle 的原生卸载程序, 原样返回进程退出码
pub trait BundleExecutor {
    fn uninstall(&self, bundle: &Bundle) -> Result<i32, UninstallerError>;
}

/// 执行单个包 (msiexec / wusa) 的卸载
pub trait PackageExecutor {
    fn uninstall(&self, package: &Package) -> Result<i32, UninstallerError>;
}

/// 同步启动进程并等待退出
pub trait ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<i32, UninstallerError>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn run(&self, program: &Path, args: &[String]) -> Result<i32, UninstallerError> {
        (**self).run(program, args)
    }
}

/// 拼接成便于日志阅读的命令行, 含空格的参数加引号
pub fn display_command(program: &Path, args: &[String]) -> String {
    let mut line = quote_if_needed(&program.to_string_lossy());
    for arg in args {
        line.push(' ');
        line.push_str(&quote_if_needed(arg));
    }
    line
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(' ') && !value.starts_with('"') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
