//! 进程执行
//!
//! 默认无限期等待进程退出; 配置超时后轮询 try_wait, 超时即结束子进程。

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::{display_command, ProcessRunner, EXIT_UNKNOWN};
use crate::modules::common::error::UninstallerError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner {
    timeout: Option<Duration>,
}

impl SystemProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<i32, UninstallerError> {
        let command_line = display_command(program, args);
        tracing::info!("执行命令: {}", command_line);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| UninstallerError::Process {
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("进程 PID: {}", child.id());

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let started = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if started.elapsed() >= timeout {
                        tracing::warn!("进程超时 ({}s), 强制结束: {}", timeout.as_secs(), command_line);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(UninstallerError::Timeout(command_line));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let code = status.code().unwrap_or(EXIT_UNKNOWN);
        tracing::debug!("进程退出码: {}", code);
        Ok(code)
    }
}
