use clap::Parser;
use std::path::PathBuf;
use std::process;

use rust_scorch_lib::commands::{self, Command, Context};
use rust_scorch_lib::modules::common::logging;

#[derive(Parser, Debug)]
#[command(name = "rust-scorch")]
#[command(about = "Windows 链式安装包 (Burn bundle) 卸载命令行工具", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 数据目录 (目录文件与 bundle 文件)
    #[arg(long, global = true, env = "RUST_SCORCH_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context::load(cli.data_dir)?;

    match cli.command {
        Command::Dir(cmd) => commands::dir::execute(cmd, &ctx).await,
        Command::List(cmd) => commands::list::execute(cmd, &ctx).await,
        Command::Create(cmd) => commands::create::execute(cmd, &ctx).await,
        Command::Load(cmd) => commands::load::execute(cmd, &ctx).await,
        Command::Select(cmd) => commands::select::execute(cmd, &ctx).await,
        Command::Installed(cmd) => commands::installed::execute(cmd, &ctx).await,
        Command::BundleInstalled(cmd) => commands::bundle_installed::execute(cmd, &ctx).await,
        Command::Detect(cmd) => commands::detect::execute(cmd, &ctx).await,
        Command::Uninstall(cmd) => commands::uninstall::execute(cmd, &ctx).await,
        Command::Sweep(cmd) => commands::sweep::execute(cmd, &ctx).await,
        Command::Logs(cmd) => commands::logs::execute(cmd, &ctx).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let verbose = cli.verbose;

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if verbose {
                tracing::error!("错误: {:#}", e);
            } else {
                eprintln!("错误: {}", e);
            }
            1
        }
    };

    tracing::debug!("退出码: {}", code);
    process::exit(code);
}
