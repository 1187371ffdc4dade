use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use super::Context;

#[derive(Parser, Debug)]
pub struct ListCommand {
    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    position: usize,
    name: String,
    bundle_id: &'a str,
    version: &'a str,
    installed: bool,
    selected: bool,
}

pub async fn execute(cmd: ListCommand, ctx: &Context) -> Result<i32> {
    let catalog = ctx.load_catalog()?;
    let cache = ctx.package_cache();
    let filters = ctx.config.filter_set();
    tracing::info!("列出目录中的 bundle: {} 个", catalog.bundles().len());

    match cmd.format.as_str() {
        "json" => {
            let entries: Vec<ListEntry> = catalog
                .bundles()
                .iter()
                .enumerate()
                .map(|(i, bundle)| ListEntry {
                    position: i + 1,
                    name: filters.apply(&bundle.name),
                    bundle_id: &bundle.bundle_id,
                    version: &bundle.version,
                    installed: cache.is_installed(bundle),
                    selected: bundle.selected,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            if catalog.is_empty() {
                println!("目录为空, 请先执行 create 或 load");
                return Ok(0);
            }
            println!();
            for line in catalog.listing(&cache, &filters) {
                println!("{}", line);
            }
            println!("\n总计: {} 个 bundle", catalog.bundles().len());
        }
    }

    Ok(0)
}
