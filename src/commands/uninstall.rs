//! uninstall 命令 - 按目录卸载 bundle 并清扫孤立 MSI

use anyhow::Result;
use clap::Parser;

use super::Context;
use crate::modules::orchestrator::report::{RunReport, SelectedRunReport};

#[derive(Parser, Debug)]
pub struct UninstallCommand {
    /// 演练模式: 只记录将要执行的操作, 不启动任何卸载进程
    #[arg(long, env = "RUST_SCORCH_DRY_RUN")]
    pub dry_run: bool,

    /// 只卸载已选择的 bundle (含前后置修复动作)
    #[arg(long)]
    pub selected: bool,

    /// 跳过确认
    #[arg(short, long)]
    pub yes: bool,

    /// 单个卸载进程的超时 (秒), 0 表示无限等待
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub async fn execute(cmd: UninstallCommand, ctx: &Context) -> Result<i32> {
    super::ensure_elevated(cmd.dry_run)?;

    let catalog = ctx.load_catalog()?;
    if catalog.is_empty() {
        anyhow::bail!("目录为空, 请先执行 create 或 load");
    }

    let timeout = ctx.process_timeout(cmd.timeout);
    let orchestrator = ctx.orchestrator(catalog, cmd.dry_run, timeout);

    println!("=== 卸载 bundle ===\n");
    println!("系统: {}", orchestrator.machine());
    if orchestrator.is_dry_run() {
        println!("演练模式: 不会执行任何卸载进程");
    }

    let planned: Vec<String> = orchestrator
        .planned_bundles()
        .into_iter()
        .filter(|b| !cmd.selected || b.selected)
        .map(|b| b.name.clone())
        .collect();
    println!("\n将按以下顺序卸载 {} 个 bundle:", planned.len());
    for (i, name) in planned.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, name);
    }
    if !cmd.selected {
        println!("随后清扫目录中登记过的孤立 MSI");
    }

    if !cmd.yes && !cmd.dry_run && !super::confirm("\n确认卸载?")? {
        println!("已取消");
        return Ok(0);
    }
    println!();

    if cmd.selected {
        let report = orchestrator.uninstall_selected()?;
        match cmd.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => print_selected(&report),
        }
        return Ok(report.exit_code);
    }

    let report = orchestrator.uninstall_all()?;
    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }
    Ok(report.exit_code)
}

fn print_report(report: &RunReport) {
    println!("--- 卸载完成 ---");
    for result in &report.bundles {
        let status = match (&result.error, result.executed) {
            (Some(error), _) => format!("异常: {}", error),
            (None, false) => "未执行".to_string(),
            (None, true) => format!("退出码 {}", result.exit_code),
        };
        println!("  {:<55} {}", result.name, status);
    }

    match &report.sweep {
        Some(sweep) => {
            println!("\n孤立 MSI: {} 个", sweep.candidates);
            println!("  成功: {}", sweep.succeeded);
            println!("  失败: {}", sweep.failed);
        }
        None => println!("\n未执行孤立 MSI 清扫"),
    }

    if report.reboot_required() {
        println!("\n需要重启计算机, 重启后请再次运行卸载");
    }
}

fn print_selected(report: &SelectedRunReport) {
    println!("--- 卸载完成 ---");
    for run in &report.runs {
        let status = if run.bundle_executed() {
            format!("退出码 {}", run.exit_code)
        } else {
            format!("未卸载 (前置修复动作退出码 {})", run.exit_code)
        };
        println!("  {:<55} {}", run.bundle_name, status);
    }
    if report.exit_code != 0 {
        println!("\n卸载在退出码 {} 处停止", report.exit_code);
    }
}
