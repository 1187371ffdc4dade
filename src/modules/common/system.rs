//! 当前机器信息: 架构、系统版本、管理员权限

use crate::modules::orchestrator::matcher::{Architecture, MachineProfile, OsVersion};

pub fn detect_machine() -> MachineProfile {
    let architecture = Architecture::current();
    let os_version = read_os_version();
    match os_version {
        Some(os) => tracing::debug!("检测到系统: {} / {}", architecture, os),
        None => tracing::warn!("无法识别当前系统版本, 修复动作将全部跳过"),
    }
    MachineProfile::new(architecture, os_version)
}

#[cfg(windows)]
fn read_os_version() -> Option<OsVersion> {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_64KEY};
    use winreg::RegKey;

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey_with_flags(
            r"SOFTWARE\Microsoft\Windows NT\CurrentVersion",
            KEY_READ | KEY_WOW64_64KEY,
        )
        .ok()?;

    let major: Option<u32> = key.get_value("CurrentMajorVersionNumber").ok();
    let minor: Option<u32> = key.get_value("CurrentMinorVersionNumber").ok();
    if let (Some(major), Some(minor)) = (major, minor) {
        return OsVersion::from_parts(major, minor);
    }

    // Windows 10 之前只有 CurrentVersion 字符串
    let current: String = key.get_value("CurrentVersion").ok()?;
    parse_current_version(&current)
}

#[cfg(not(windows))]
fn read_os_version() -> Option<OsVersion> {
    None
}

/// "6.3" / "6.3.9600" -> 按 major.minor 映射
pub fn parse_current_version(raw: &str) -> Option<OsVersion> {
    let mut parts = raw.trim().split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts.next()?.trim().parse().ok()?;
    OsVersion::from_parts(major, minor)
}

/// 当前进程是否以管理员身份运行
pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        unsafe { windows::Win32::UI::Shell::IsUserAnAdmin().as_bool() }
    }

    #[cfg(not(windows))]
    {
        false
    }
}
