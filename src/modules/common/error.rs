use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UninstallerError {
    #[error("注册表错误: {0}")]
    Registry(String),

    #[error("文件系统错误: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("元数据解析失败 {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("尚未选择任何发行版, 请先使用 select 命令选择要卸载的 bundle")]
    NoReleaseSelected,

    #[error("不支持的目录文件版本: {found} (当前支持 <= {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("进程执行失败 {program}: {reason}")]
    Process { program: String, reason: String },

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("超时: {0}")]
    Timeout(String),

    #[error("序列化错误: {0}")]
    Serde(String),
}

impl UninstallerError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for UninstallerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serde(error.to_string())
    }
}

impl serde::Serialize for UninstallerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
