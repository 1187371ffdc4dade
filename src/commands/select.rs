use anyhow::Result;
use clap::Parser;

use super::Context;

#[derive(Parser, Debug)]
pub struct SelectCommand {
    /// 以逗号分隔的序号, 如 1,3 (见 list 输出)
    pub positions: Option<String>,

    /// 先清除已有选择
    #[arg(long)]
    pub reset: bool,
}

pub async fn execute(cmd: SelectCommand, ctx: &Context) -> Result<i32> {
    let mut catalog = ctx.load_catalog()?;
    if catalog.is_empty() {
        anyhow::bail!("目录为空, 请先执行 create 或 load");
    }

    if cmd.reset {
        catalog.clear_selection();
        println!("已清除所有选择");
    }

    if let Some(positions) = &cmd.positions {
        catalog.select(positions)?;
    } else if !cmd.reset {
        anyhow::bail!("请指定序号, 如: select 1,3");
    }

    ctx.save_catalog(&catalog)?;

    let selected = catalog.selected_bundles();
    println!("已选择 {} 个 bundle:", selected.len());
    for bundle in selected {
        println!("  - {}", bundle.name);
    }
    Ok(0)
}
