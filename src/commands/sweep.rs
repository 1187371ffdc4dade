use anyhow::Result;
use clap::Parser;

use super::Context;

#[derive(Parser, Debug)]
pub struct SweepCommand {
    /// 演练模式: 只列出孤立 MSI, 不卸载
    #[arg(long, env = "RUST_SCORCH_DRY_RUN")]
    pub dry_run: bool,

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

pub async fn execute(cmd: SweepCommand, ctx: &Context) -> Result<i32> {
    super::ensure_elevated(cmd.dry_run)?;

    let catalog = ctx.load_catalog()?;
    if catalog.upgrade_codes().is_empty() && catalog.no_upgrade_code_product_codes().is_empty() {
        anyhow::bail!("目录中没有登记任何包, 请先执行 create 或 load");
    }

    if !cmd.yes && !cmd.dry_run && !super::confirm("卸载所有目录中登记过的已安装 MSI?")? {
        println!("已取消");
        return Ok(0);
    }

    let orchestrator = ctx.orchestrator(catalog, cmd.dry_run, ctx.process_timeout(cmd.timeout));
    let summary = orchestrator.sweep_orphans()?;

    if cmd.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(0);
    }

    for result in &summary.results {
        let status = match (&result.error, result.executed) {
            (Some(error), _) => format!("异常: {}", error),
            (None, false) => "未执行".to_string(),
            (None, true) => format!("退出码 {}", result.exit_code),
        };
        println!("  {:<55} {}", result.product_name, status);
    }
    println!("\n孤立 MSI: {} 个", summary.candidates);
    println!("  成功: {}", summary.succeeded);
    println!("  失败: {}", summary.failed);
    Ok(0)
}
