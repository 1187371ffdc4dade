use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use super::Context;

#[derive(Parser, Debug)]
pub struct DirCommand {
    /// 新的数据目录 (不指定则显示当前目录)
    pub path: Option<PathBuf>,
}

pub async fn execute(cmd: DirCommand, ctx: &Context) -> Result<i32> {
    let Some(path) = cmd.path else {
        println!("数据目录: {}", ctx.config.data_dir.display());
        println!("目录文件: {}", ctx.catalog_path().display());
        return Ok(0);
    };

    if path.exists() && !path.is_dir() {
        anyhow::bail!("不是目录: {}", path.display());
    }
    std::fs::create_dir_all(&path)?;

    let mut config = ctx.config.clone();
    config.data_dir = path;
    let saved = config.save()?;
    tracing::info!("数据目录已设置为 {}", config.data_dir.display());
    println!("数据目录已设置为: {}", config.data_dir.display());
    println!("配置已保存: {}", saved.display());
    Ok(0)
}
