use serde::{Deserialize, Serialize};
use std::fmt;

use super::matcher::{Architecture, OsVersion};
use crate::modules::executor::{EXIT_SUCCESS, REBOOT_REQUIRED};

/// 修复动作在主卸载之前还是之后执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Pre,
    Post,
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateType::Pre => write!(f, "Pre"),
            TemplateType::Post => write!(f, "Post"),
        }
    }
}

/// 修复动作作用的对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Bundle,
    Msi,
    Msu,
}

/// 前置/后置修复动作
///
/// 启动时注册, 编排过程中只读。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub architectures: Vec<Architecture>,
    pub os_versions: Vec<OsVersion>,
    /// bundle 内目标包的产品代码 (MSU 为 KB 编号)
    pub product_code: String,
    pub template: TemplateType,
    pub object_type: ObjectType,
}

impl RemediationAction {
    pub fn new(
        architectures: Vec<Architecture>,
        os_versions: Vec<OsVersion>,
        product_code: impl Into<String>,
        template: TemplateType,
        object_type: ObjectType,
    ) -> Self {
        Self {
            architectures,
            os_versions,
            product_code: product_code.into(),
            template,
            object_type,
        }
    }
}

/// 内置修复动作: KB2999226 (通用 C 运行时更新) 在 Win7/8/8.1 上需要先于 bundle 卸载
pub fn default_actions() -> Vec<RemediationAction> {
    [OsVersion::Windows81, OsVersion::Windows8, OsVersion::Windows7]
        .into_iter()
        .map(|os| {
            RemediationAction::new(
                vec![Architecture::X86, Architecture::X64],
                vec![os],
                "2999226",
                TemplateType::Pre,
                ObjectType::Msu,
            )
        })
        .collect()
}

/// 一轮修复动作的退出码汇总
///
/// - 0 覆盖之前的非重启错误码
/// - 3010 置位重启标记, 之后的 0 不会清除该标记
/// - 其它非零码覆盖当前值, 但当前值为 3010 时保持 3010
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitCodeAggregator {
    error_code: i32,
    reboot_required: bool,
}

impl ExitCodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, code: i32) {
        match code {
            EXIT_SUCCESS => self.error_code = code,
            REBOOT_REQUIRED => {
                self.error_code = code;
                self.reboot_required = true;
            }
            other => {
                if self.error_code != REBOOT_REQUIRED {
                    self.error_code = other;
                }
            }
        }
    }

    pub fn current(&self) -> i32 {
        self.error_code
    }

    pub fn reboot_required(&self) -> bool {
        self.reboot_required
    }

    pub fn finish(&self) -> i32 {
        if self.error_code != EXIT_SUCCESS {
            self.error_code
        } else if self.reboot_required {
            REBOOT_REQUIRED
        } else {
            EXIT_SUCCESS
        }
    }
}
