//! 兼容性匹配: 修复动作是否适用于当前机器
//!
//! 架构与系统版本都是封闭枚举, 未知字符串在配置加载阶段就被拒绝,
//! 匹配只做值相等比较, 不存在范围或前缀匹配。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::actions::RemediationAction;
use crate::modules::common::error::UninstallerError;

/// CPU 架构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Architecture {
    X86,
    X64,
}

impl Architecture {
    /// 以当前进程位数判定 (64 位进程即 x64)
    pub fn current() -> Self {
        if cfg!(target_pointer_width = "64") {
            Architecture::X64
        } else {
            Architecture::X86
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = UninstallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" => Ok(Architecture::X86),
            "x64" => Ok(Architecture::X64),
            other => Err(UninstallerError::Configuration(format!(
                "未知的架构: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Architecture {
    type Error = UninstallerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Architecture> for String {
    fn from(value: Architecture) -> Self {
        value.as_str().to_string()
    }
}

/// Windows 内核版本 (major.minor)
///
/// 同一版本号对应多个产品名 (如 6.3 = Windows 8.1 / Server 2012 R2),
/// 这里按版本号建模, 产品名只作为解析别名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OsVersion {
    /// 5.0
    Windows2000,
    /// 5.1
    WindowsXp,
    /// 5.2: XP 64 位 / Server 2003 / 2003 R2
    WindowsXp64,
    /// 6.0: Vista / Server 2008
    WindowsVista,
    /// 6.1: Windows 7 / Server 2008 R2
    Windows7,
    /// 6.2: Windows 8 / Server 2012
    Windows8,
    /// 6.3: Windows 8.1 / Server 2012 R2
    Windows81,
    /// 10.0: Windows 10 及之后
    Windows10,
}

const OS_ALIASES: &[(&str, OsVersion)] = &[
    ("5.0", OsVersion::Windows2000),
    ("windows2000", OsVersion::Windows2000),
    ("5.1", OsVersion::WindowsXp),
    ("windowsxp", OsVersion::WindowsXp),
    ("5.2", OsVersion::WindowsXp64),
    ("windowsxp64bit", OsVersion::WindowsXp64),
    ("windows2003", OsVersion::WindowsXp64),
    ("windows2003r2", OsVersion::WindowsXp64),
    ("6.0", OsVersion::WindowsVista),
    ("windowsvista", OsVersion::WindowsVista),
    ("windowsserver2008", OsVersion::WindowsVista),
    ("6.1", OsVersion::Windows7),
    ("windows7", OsVersion::Windows7),
    ("windowsserver2008r2", OsVersion::Windows7),
    ("6.2", OsVersion::Windows8),
    ("windows8", OsVersion::Windows8),
    ("windowsserver2012", OsVersion::Windows8),
    ("6.3", OsVersion::Windows81),
    ("windows81", OsVersion::Windows81),
    ("windows8.1", OsVersion::Windows81),
    ("windowsserver2012r2", OsVersion::Windows81),
    ("10.0", OsVersion::Windows10),
    ("windows10", OsVersion::Windows10),
    ("windowsservertechnicalpreview", OsVersion::Windows10),
];

impl OsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsVersion::Windows2000 => "5.0",
            OsVersion::WindowsXp => "5.1",
            OsVersion::WindowsXp64 => "5.2",
            OsVersion::WindowsVista => "6.0",
            OsVersion::Windows7 => "6.1",
            OsVersion::Windows8 => "6.2",
            OsVersion::Windows81 => "6.3",
            OsVersion::Windows10 => "10.0",
        }
    }

    /// 由 major/minor 构造, 不认识的版本返回 None
    pub fn from_parts(major: u32, minor: u32) -> Option<Self> {
        format!("{}.{}", major, minor).parse().ok()
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsVersion {
    type Err = UninstallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        OS_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, version)| *version)
            .ok_or_else(|| UninstallerError::Configuration(format!("未知的系统版本: {}", s.trim())))
    }
}

impl TryFrom<String> for OsVersion {
    type Error = UninstallerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OsVersion> for String {
    fn from(value: OsVersion) -> Self {
        value.as_str().to_string()
    }
}

/// 当前机器的架构与系统版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineProfile {
    pub architecture: Architecture,
    /// 无法识别的系统版本记为 None, 此时任何修复动作都不适用
    pub os_version: Option<OsVersion>,
}

impl MachineProfile {
    pub fn new(architecture: Architecture, os_version: Option<OsVersion>) -> Self {
        Self {
            architecture,
            os_version,
        }
    }
}

impl fmt::Display for MachineProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.os_version {
            Some(os) => write!(f, "{} / {}", self.architecture, os),
            None => write!(f, "{} / unknown", self.architecture),
        }
    }
}

pub fn architecture_matches(action: &RemediationAction, machine: &MachineProfile) -> bool {
    action.architectures.contains(&machine.architecture)
}

pub fn os_matches(action: &RemediationAction, machine: &MachineProfile) -> bool {
    match machine.os_version {
        Some(os) => action.os_versions.contains(&os),
        None => false,
    }
}

/// 修复动作是否适用于当前机器: 架构与系统版本都必须精确命中
pub fn is_applicable(action: &RemediationAction, machine: &MachineProfile) -> bool {
    architecture_matches(action, machine) && os_matches(action, machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::orchestrator::actions::{ObjectType, TemplateType};

    fn kb_action(os: Vec<OsVersion>, arch: Vec<Architecture>) -> RemediationAction {
        RemediationAction::new(arch, os, "2999226", TemplateType::Pre, ObjectType::Msu)
    }

    #[test]
    fn parses_version_numbers_and_product_aliases() {
        assert_eq!("6.3".parse::<OsVersion>().ok(), Some(OsVersion::Windows81));
        assert_eq!(
            "Windows Server 2012 R2".parse::<OsVersion>().ok(),
            Some(OsVersion::Windows81)
        );
        assert_eq!("windows7".parse::<OsVersion>().ok(), Some(OsVersion::Windows7));
        assert_eq!("10.0".parse::<OsVersion>().ok(), Some(OsVersion::Windows10));
        assert_eq!(OsVersion::from_parts(6, 1), Some(OsVersion::Windows7));
        assert_eq!(OsVersion::from_parts(6, 4), None);
    }

    #[test]
    fn rejects_unknown_strings() {
        assert!("6.4".parse::<OsVersion>().is_err());
        assert!("6".parse::<OsVersion>().is_err());
        assert!("arm64".parse::<Architecture>().is_err());
        assert!(serde_json::from_str::<Architecture>("\"ia64\"").is_err());
    }

    #[test]
    fn serializes_as_canonical_strings() {
        assert_eq!(
            serde_json::to_string(&OsVersion::Windows81).unwrap_or_default(),
            "\"6.3\""
        );
        assert_eq!(
            serde_json::to_string(&Architecture::X64).unwrap_or_default(),
            "\"x64\""
        );
    }

    #[test]
    fn applicability_requires_exact_arch_and_os() {
        let action = kb_action(
            vec![OsVersion::Windows81],
            vec![Architecture::X86, Architecture::X64],
        );

        let win81_x64 = MachineProfile::new(Architecture::X64, Some(OsVersion::Windows81));
        let win8_x64 = MachineProfile::new(Architecture::X64, Some(OsVersion::Windows8));
        let unknown_os = MachineProfile::new(Architecture::X64, None);

        assert!(is_applicable(&action, &win81_x64));
        assert!(!is_applicable(&action, &win8_x64));
        assert!(!is_applicable(&action, &unknown_os));

        let x86_only = kb_action(vec![OsVersion::Windows81], vec![Architecture::X86]);
        assert!(!is_applicable(&x86_only, &win81_x64));
    }
}
