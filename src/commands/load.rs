use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use super::Context;
use crate::modules::catalog::storage;

#[derive(Parser, Debug)]
pub struct LoadCommand {
    /// bundle 文件所在目录 (默认数据目录)
    pub dir: Option<PathBuf>,

    /// 丢弃现有目录, 只保留本次加载的 bundle
    #[arg(long)]
    pub replace: bool,
}

pub async fn execute(cmd: LoadCommand, ctx: &Context) -> Result<i32> {
    let dir = cmd.dir.unwrap_or_else(|| ctx.config.data_dir.clone());
    println!("从 {} 加载 bundle 文件...", dir.display());

    let bundles = storage::load_bundle_dir(&dir)?;
    if bundles.is_empty() {
        println!("未找到 bundle 文件 (*{})", storage::BUNDLE_FILE_SUFFIX);
        return Ok(0);
    }

    let mut catalog = if cmd.replace {
        Default::default()
    } else {
        ctx.load_catalog()?
    };

    let total = bundles.len();
    let mut added = 0;
    for bundle in bundles {
        tracing::debug!("加载 bundle: {}", bundle.name);
        if catalog.add_bundle(bundle) {
            added += 1;
        }
    }

    let saved = ctx.save_catalog(&catalog)?;
    println!("已加载 {} 个 bundle 文件, 新增 {} 个", total, added);
    println!("目录文件已保存: {}", saved.display());
    Ok(0)
}
