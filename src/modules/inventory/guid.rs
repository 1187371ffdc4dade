//! Windows Installer 压缩 GUID 转换
//!
//! 注册表中的产品代码/升级代码以 32 位十六进制的压缩形式保存:
//! 前三段各自反转, 其余 8 个字节每个字节内交换两个十六进制位。
//! 该变换是自反的, 压缩与解压使用同一个 `transpose`。

fn transpose(hex: &str) -> Option<String> {
    let chars: Vec<char> = hex.chars().collect();
    if chars.len() != 32 || !chars.iter().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut out = String::with_capacity(32);
    out.extend(chars[0..8].iter().rev());
    out.extend(chars[8..12].iter().rev());
    out.extend(chars[12..16].iter().rev());
    for pair in chars[16..32].chunks(2) {
        out.push(pair[1]);
        out.push(pair[0]);
    }
    Some(out.to_ascii_uppercase())
}

/// `{12345678-ABCD-...}` -> 压缩形式
pub fn pack_guid(guid: &str) -> Option<String> {
    let hex: String = guid
        .trim()
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '-'))
        .collect();
    transpose(&hex)
}

/// 压缩形式 -> `{12345678-ABCD-EF01-2345-6789ABCDEF01}`
pub fn unpack_guid(packed: &str) -> Option<String> {
    let hex = transpose(packed.trim())?;
    Some(format!(
        "{{{}-{}-{}-{}-{}}}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}
