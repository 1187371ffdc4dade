use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::path::PathBuf;

/// 模糊匹配字符串
pub fn fuzzy_match(text: &str, pattern: &str) -> bool {
    let matcher = SkimMatcherV2::default();
    matcher.fuzzy_match(text, pattern).is_some()
}

/// 按字符截断 (正确处理中文等多字节字符)
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let chars: String = s.chars().take(max_len.saturating_sub(2)).collect();
        format!("{}..", chars)
    } else {
        s.to_string()
    }
}

/// 规范化 GUID 为 `{xxxxxxxx-...}` 小写形式
///
/// Burn 的缓存目录与 MSI 产品代码在不同来源里大小写、花括号都不统一,
/// 比较和拼路径前统一一次。
pub fn normalize_guid(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('{').trim_end_matches('}');
    format!("{{{}}}", trimmed.to_lowercase())
}

/// 生成可作为文件名的字符串
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim().trim_end_matches('.').to_string();
    if cleaned.is_empty() {
        "bundle".to_string()
    } else {
        cleaned
    }
}

/// 获取 Windows 系统目录 (System32)
pub fn get_system_dir() -> PathBuf {
    let root = std::env::var("SystemRoot")
        .or_else(|_| std::env::var("windir"))
        .unwrap_or_else(|_| r"C:\Windows".to_string());
    PathBuf::from(root).join("System32")
}

/// 卸载日志统一写到临时目录
pub fn get_uninstall_log_dir() -> PathBuf {
    std::env::temp_dir()
}

/// 在资源管理器中打开目录
pub fn open_in_explorer(path: &std::path::Path) -> std::io::Result<()> {
    #[cfg(windows)]
    {
        std::process::Command::new("explorer.exe").arg(path).spawn()?;
    }

    #[cfg(not(windows))]
    {
        let _ = path;
    }

    Ok(())
}
