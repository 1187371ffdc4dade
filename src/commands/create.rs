//! create 命令 - 解析 WixPdb 元数据生成目录文件

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use super::Context;
use crate::modules::catalog::{storage, CatalogStore};

#[derive(Parser, Debug)]
pub struct CreateCommand {
    /// 元数据文件 (.wixpdb)
    pub paths: Vec<PathBuf>,

    /// 元数据文件列表, 每行一个路径
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// 先合并的已有目录文件
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// 不导出单个 bundle 文件
    #[arg(long)]
    pub no_export: bool,
}

pub async fn execute(cmd: CreateCommand, ctx: &Context) -> Result<i32> {
    let mut paths = cmd.paths.clone();
    if let Some(list) = &cmd.list {
        paths.extend(read_path_list(list)?);
    }
    if paths.is_empty() {
        anyhow::bail!("未指定任何元数据文件");
    }

    let mut catalog = match &cmd.base {
        Some(base) => {
            println!("合并已有目录: {}", base.display());
            storage::load_catalog(base)?
        }
        None => CatalogStore::new(),
    };

    println!("正在解析 {} 个元数据文件...", paths.len());
    let summary = catalog.populate_from_metadata(&paths).await;

    println!("  - 新增 bundle: {}", summary.added);
    if summary.duplicates > 0 {
        println!("  - 重复 bundle: {} (仅合并索引)", summary.duplicates);
    }
    for (path, reason) in &summary.failures {
        println!("  - 解析失败: {} ({})", path.display(), reason);
    }

    let saved = ctx.save_catalog(&catalog)?;
    println!("\n目录文件已保存: {}", saved.display());

    if !cmd.no_export {
        let mut exported = 0;
        for bundle in catalog.bundles() {
            match storage::save_bundle(bundle, &ctx.config.data_dir) {
                Ok(_) => exported += 1,
                Err(e) => tracing::warn!("导出 bundle 失败 {}: {}", bundle.name, e),
            }
        }
        println!("已导出 {} 个 bundle 文件到 {}", exported, ctx.config.data_dir.display());
    }

    if summary.added == 0 && summary.duplicates == 0 {
        anyhow::bail!("没有成功解析任何元数据文件");
    }
    Ok(0)
}

/// 空行与 `#` 开头的行被忽略
fn read_path_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_path_list(&content))
}

fn parse_path_list(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(|line| line.trim().trim_matches('"'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}
