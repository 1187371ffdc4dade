use anyhow::Result;
use clap::Parser;

use super::Context;
use crate::modules::common::{logging, utils};

#[derive(Parser, Debug)]
pub struct LogsCommand {
    /// 只显示路径, 不打开资源管理器
    #[arg(long)]
    pub no_open: bool,
}

pub async fn execute(cmd: LogsCommand, _ctx: &Context) -> Result<i32> {
    let log_dir = logging::get_log_dir();
    println!("程序日志: {}", log_dir.display());
    println!("卸载日志: {}", utils::get_uninstall_log_dir().display());

    if !cmd.no_open {
        utils::open_in_explorer(&log_dir)?;
    }
    Ok(0)
}
