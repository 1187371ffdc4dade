use anyhow::Result;
use clap::Parser;

use super::Context;
use crate::modules::catalog::models::Package;
use crate::modules::common::utils::truncate_string;
use crate::modules::inventory::{self, InventoryReader};

#[derive(Parser, Debug)]
pub struct InstalledCommand {
    /// 按名称模糊搜索或按产品代码精确匹配
    #[arg(short, long)]
    pub search: Option<String>,

    /// 输出格式 (table/json)
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub async fn execute(cmd: InstalledCommand, ctx: &Context) -> Result<i32> {
    tracing::info!("列出已安装的 MSI, search: {:?}", cmd.search);

    let mut packages = ctx.inventory().installed_packages()?;
    inventory::apply_search_filter(&mut packages, cmd.search.as_deref());

    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&packages)?),
        _ => print_table(&packages),
    }
    Ok(0)
}

fn print_table(packages: &[Package]) {
    println!("\n{}", "=".repeat(110));
    println!("{:<50} {:<40} {:<16}", "名称", "产品代码", "版本");
    println!("{}", "=".repeat(110));

    for p in packages {
        println!(
            "{:<50} {:<40} {:<16}",
            truncate_string(&p.product_name, 49),
            p.product_code,
            truncate_string(p.product_version.as_deref().unwrap_or_default(), 15),
        );
    }

    println!("{}", "=".repeat(110));
    println!("总计: {} 个包\n", packages.len());
}
