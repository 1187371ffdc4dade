use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const APP_DIR: &str = "rust-scorch";

pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let log_dir = get_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    // 文件输出按天滚动
    let file_appender = tracing_appender::rolling::daily(&log_dir, "rust-scorch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 进程结束前 guard 必须存活, 否则尾部日志丢失
    std::mem::forget(guard);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "rust_scorch={},rust_scorch_lib={},info",
            level, level
        )))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        );

    let _ = subscriber.try_init();
}

pub fn get_log_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
}
