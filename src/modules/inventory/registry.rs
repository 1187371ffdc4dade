use chrono::NaiveDate;

use crate::modules::catalog::models::Package;
use crate::modules::common::error::UninstallerError;

#[cfg(windows)]
const USER_DATA_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Installer\UserData";
#[cfg(windows)]
const UPGRADE_CODES_KEY: &str = r"SOFTWARE\Classes\Installer\UpgradeCodes";

/// 从 Windows Installer 注册表数据读取已安装的 MSI 产品
pub fn list_installed_packages() -> Result<Vec<Package>, UninstallerError> {
    #[cfg(windows)]
    {
        list_installed_packages_impl()
    }

    #[cfg(not(windows))]
    {
        Ok(Vec::new())
    }
}

#[cfg(windows)]
fn list_installed_packages_impl() -> Result<Vec<Package>, UninstallerError> {
    use std::collections::HashMap;
    use winreg::enums::*;
    use winreg::RegKey;

    use super::guid;
    use crate::modules::catalog::models::normalize_code;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let flags = KEY_READ | KEY_WOW64_64KEY;

    // 产品代码 -> 升级代码
    let mut upgrade_codes: HashMap<String, String> = HashMap::new();
    match hklm.open_subkey_with_flags(UPGRADE_CODES_KEY, flags) {
        Ok(root) => {
            for packed_upgrade in root.enum_keys().filter_map(|k| k.ok()) {
                let Some(upgrade_code) = guid::unpack_guid(&packed_upgrade) else {
                    continue;
                };
                if let Ok(key) = root.open_subkey_with_flags(&packed_upgrade, KEY_READ) {
                    for (packed_product, _) in key.enum_values().filter_map(|v| v.ok()) {
                        if let Some(product_code) = guid::unpack_guid(&packed_product) {
                            upgrade_codes.insert(normalize_code(&product_code), upgrade_code.clone());
                        }
                    }
                }
            }
        }
        Err(e) => tracing::debug!("无法打开注册表路径 {}: {}", UPGRADE_CODES_KEY, e),
    }

    let user_data = hklm
        .open_subkey_with_flags(USER_DATA_KEY, flags)
        .map_err(|e| UninstallerError::Registry(format!("{}: {}", USER_DATA_KEY, e)))?;

    let mut packages = Vec::new();
    for sid in user_data.enum_keys().filter_map(|k| k.ok()) {
        let products = match user_data.open_subkey_with_flags(format!(r"{}\Products", sid), KEY_READ) {
            Ok(key) => key,
            Err(_) => continue,
        };

        for packed_product in products.enum_keys().filter_map(|k| k.ok()) {
            let Some(product_code) = guid::unpack_guid(&packed_product) else {
                continue;
            };
            let Ok(properties) =
                products.open_subkey_with_flags(format!(r"{}\InstallProperties", packed_product), KEY_READ)
            else {
                continue;
            };

            // 没有显示名称的条目不是可见产品
            let Ok(name) = properties.get_value::<String, _>("DisplayName") else {
                continue;
            };

            let mut package = Package::new(product_code.clone(), name);
            if let Some(upgrade_code) = upgrade_codes.get(&normalize_code(&product_code)) {
                package = package.with_upgrade_code(upgrade_code.clone());
            }
            package.product_version = properties.get_value("DisplayVersion").ok();
            package.install_date = properties
                .get_value::<String, _>("InstallDate")
                .ok()
                .and_then(|raw| parse_install_date(&raw));
            package.install_location = properties
                .get_value::<String, _>("InstallLocation")
                .ok()
                .filter(|s| !s.is_empty());
            package.info_url = properties
                .get_value::<String, _>("URLInfoAbout")
                .ok()
                .filter(|s| !s.is_empty());
            packages.push(package);
        }
    }

    tracing::debug!("注册表中找到 {} 个已安装产品", packages.len());
    Ok(packages)
}

/// InstallDate 以 YYYYMMDD 保存
pub fn parse_install_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").ok()
}
