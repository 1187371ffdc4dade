use serde::Serialize;

use crate::modules::catalog::models::Bundle;
use crate::modules::executor::EXIT_UNKNOWN;

/// 单个 bundle 卸载过程的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "exit_code", rename_all = "snake_case")]
pub enum BundlePhase {
    NotStarted,
    PreActionsRunning,
    PreActionsDone(i32),
    BundleUninstalling,
    BundleDone(i32),
    PostActionsRunning,
    PostActionsDone(i32),
    Terminal,
}

impl BundlePhase {
    /// 合法的阶段迁移; 前置动作返回重启码时可直接进入终态
    pub fn can_advance_to(&self, next: &BundlePhase) -> bool {
        use BundlePhase::*;
        matches!(
            (self, next),
            (NotStarted, PreActionsRunning)
                | (PreActionsRunning, PreActionsDone(_))
                | (PreActionsDone(_), BundleUninstalling)
                | (PreActionsDone(_), Terminal)
                | (BundleUninstalling, BundleDone(_))
                | (BundleDone(_), PostActionsRunning)
                | (PostActionsRunning, PostActionsDone(_))
                | (PostActionsDone(_), Terminal)
        )
    }
}

/// 一次 `uninstall_bundle` 的执行记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleRun {
    pub bundle_id: String,
    pub bundle_name: String,
    /// bundle 自身的退出码 (前置动作要求重启时为 3010)
    pub exit_code: i32,
    pub phases: Vec<BundlePhase>,
}

impl BundleRun {
    pub fn new(bundle: &Bundle) -> Self {
        Self {
            bundle_id: bundle.bundle_id.clone(),
            bundle_name: bundle.name.clone(),
            exit_code: EXIT_UNKNOWN,
            phases: vec![BundlePhase::NotStarted],
        }
    }

    pub fn phase(&self) -> BundlePhase {
        self.phases.last().copied().unwrap_or(BundlePhase::NotStarted)
    }

    pub fn advance(&mut self, next: BundlePhase) {
        let current = self.phase();
        if !current.can_advance_to(&next) {
            tracing::error!("非法的阶段迁移 {:?} -> {:?} ({})", current, next, self.bundle_name);
        }
        tracing::debug!("{}: {:?}", self.bundle_name, next);
        self.phases.push(next);
    }

    pub fn bundle_executed(&self) -> bool {
        self.phases
            .iter()
            .any(|p| matches!(p, BundlePhase::BundleDone(_)))
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() == BundlePhase::Terminal
    }
}
