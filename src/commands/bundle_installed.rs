use anyhow::Result;
use clap::Parser;

use super::Context;
use crate::modules::inventory::InventoryReader;

#[derive(Parser, Debug)]
pub struct BundleInstalledCommand {
    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub async fn execute(cmd: BundleInstalledCommand, ctx: &Context) -> Result<i32> {
    let mut catalog = ctx.load_catalog()?;
    if !catalog.has_selection() {
        anyhow::bail!(crate::UninstallerError::NoReleaseSelected);
    }

    let installed = ctx.inventory().installed_packages()?;
    tracing::info!("对照已选择 bundle 与 {} 个已安装包", installed.len());
    let bundles = catalog.cross_reference(&installed);

    if cmd.format == "json" {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(0);
    }

    for bundle in bundles {
        println!("\n{} ({})", bundle.name, bundle.version);
        if bundle.packages.is_empty() {
            println!("  (未安装任何包)");
        }
        for package in &bundle.packages {
            println!(
                "  {:<50} {} {}",
                package.product_name,
                package.product_code,
                package.chaining_package_id.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(0)
}
