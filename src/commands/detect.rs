use anyhow::Result;
use clap::Parser;

use super::Context;
use crate::modules::common::system;

#[derive(Parser, Debug)]
pub struct DetectCommand {}

pub async fn execute(_cmd: DetectCommand, ctx: &Context) -> Result<i32> {
    let catalog = ctx.load_catalog()?;
    let cache = ctx.package_cache();
    let machine = system::detect_machine();

    println!("系统: {}", machine);
    println!("包缓存: {}", cache.root().display());
    println!("\n本机检测到以下 bundle:");

    let installed = catalog.installed_bundles(&cache);
    for bundle in &installed {
        let line = format!(
            "(Name: {}, Version: {}, BundleId: {})",
            bundle.name, bundle.version, bundle.bundle_id
        );
        tracing::info!("{}", line);
        println!("  {}", line);
    }
    if installed.is_empty() {
        println!("  (无)");
    }
    Ok(0)
}
