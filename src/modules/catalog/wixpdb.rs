//! WiX PDB (XML) 元数据解析
//!
//! 只读取 Bundle 类型输出中的三张表:
//! - `WixBundle`: bundle 标识、名称、版本
//! - `ChainMsiPackage`: 链中的 MSI 包
//! - `UxPackageBehavior`: 包行为, ReallyPermanent = yes 的包永远不自动卸载
//!
//! 列顺序由 `tableDefinitions` 给出, 行内 `field` 按列顺序排列, 空字段视为 null。

use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::Path;

use super::models::{Bundle, FileType, Package, PackageType};
use crate::modules::common::error::UninstallerError;

const WIX_BUNDLE: &str = "WixBundle";
const CHAIN_MSI_PACKAGE: &str = "ChainMsiPackage";
const UX_PACKAGE_BEHAVIOR: &str = "UxPackageBehavior";

/// 已解析的表: 列名 + 行数据
#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
    }

    fn value<'a>(&self, row: &'a [Option<String>], names: &[&str]) -> Option<&'a str> {
        let index = self.column_index(names)?;
        row.get(index)?.as_deref()
    }
}

/// 解析单个元数据文件
pub fn parse_wixpdb(path: &Path) -> Result<Bundle, UninstallerError> {
    tracing::debug!("解析元数据文件: {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| UninstallerError::parse(path, format!("无法读取文件: {}", e)))?;

    let mut bundle = parse_wixpdb_str(&content, path)?;
    bundle.source_path = Some(path.to_path_buf());
    bundle.release_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string());
    bundle.file_type = FileType::Metadata;
    Ok(bundle)
}

pub fn parse_wixpdb_str(content: &str, path: &Path) -> Result<Bundle, UninstallerError> {
    let document =
        Document::parse(content).map_err(|e| UninstallerError::parse(path, e.to_string()))?;

    let output = document
        .descendants()
        .find(|n| {
            n.is_element()
                && n.tag_name().name() == "wixOutput"
                && n.attribute("type")
                    .map(|t| t.eq_ignore_ascii_case("Bundle"))
                    .unwrap_or(false)
        })
        .ok_or_else(|| UninstallerError::parse(path, "未找到 Bundle 类型的 wixOutput"))?;

    let definitions = read_table_definitions(output);
    let wix_bundle = read_table(output, &definitions, WIX_BUNDLE)
        .ok_or_else(|| UninstallerError::parse(path, "缺少 WixBundle 表"))?;

    let row = wix_bundle
        .rows
        .first()
        .ok_or_else(|| UninstallerError::parse(path, "WixBundle 表为空"))?;
    let bundle_id = wix_bundle
        .value(row, &["BundleId"])
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| UninstallerError::parse(path, "WixBundle 缺少 BundleId"))?;
    let name = wix_bundle.value(row, &["Name"]).unwrap_or_default();
    let version = wix_bundle.value(row, &["Version"]).unwrap_or_default();

    let mut bundle = Bundle::new(bundle_id, name, version);

    let permanent = read_table(output, &definitions, UX_PACKAGE_BEHAVIOR)
        .map(|table| really_permanent_packages(&table))
        .unwrap_or_default();

    if let Some(chain) = read_table(output, &definitions, CHAIN_MSI_PACKAGE) {
        for row in &chain.rows {
            let Some(product_code) = chain
                .value(row, &["ProductCode"])
                .filter(|code| !code.trim().is_empty())
            else {
                tracing::debug!("跳过缺少 ProductCode 的链式包: {}", path.display());
                continue;
            };

            let chain_id = chain.value(row, &["ChainPackage_"]).unwrap_or_default();
            if !chain_id.is_empty() && permanent.get(chain_id).copied().unwrap_or(false) {
                tracing::debug!("跳过永久包: {} ({})", chain_id, product_code);
                continue;
            }

            let mut package = Package::new(
                product_code.trim(),
                chain.value(row, &["ProductName"]).unwrap_or_default(),
            )
            .with_type(PackageType::Msi)
            .with_upgrade_code(chain.value(row, &["UpgradeCode"]).unwrap_or_default());
            package.product_version = chain.value(row, &["ProductVersion"]).map(str::to_string);
            if !chain_id.is_empty() {
                package = package.with_chaining_package(chain_id);
            }
            bundle.packages.push(package);
        }
    }

    tracing::debug!(
        "解析完成: {} {} ({} 个包)",
        bundle.name,
        bundle.version,
        bundle.packages.len()
    );
    Ok(bundle)
}

fn read_table_definitions(output: Node) -> HashMap<String, Vec<String>> {
    output
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "tableDefinition")
        .filter_map(|definition| {
            let name = definition.attribute("name")?;
            let columns = definition
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "columnDefinition")
                .filter_map(|c| c.attribute("name").map(str::to_string))
                .collect();
            Some((name.to_string(), columns))
        })
        .collect()
}

fn read_table(
    output: Node,
    definitions: &HashMap<String, Vec<String>>,
    table_name: &str,
) -> Option<Table> {
    let node = output.children().find(|n| {
        n.is_element() && n.tag_name().name() == "table" && n.attribute("name") == Some(table_name)
    })?;

    let columns = definitions.get(table_name).cloned().unwrap_or_default();
    let rows = node
        .children()
        .filter(|r| r.is_element() && r.tag_name().name() == "row")
        .map(|row| {
            row.children()
                .filter(|f| f.is_element() && f.tag_name().name() == "field")
                .map(|field| field.text().map(str::to_string).filter(|t| !t.is_empty()))
                .collect()
        })
        .collect();

    Some(Table { columns, rows })
}

/// 包 ID -> 是否 ReallyPermanent (首次出现为准)
fn really_permanent_packages(table: &Table) -> HashMap<String, bool> {
    let mut behavior = HashMap::new();
    for row in &table.rows {
        let Some(package_id) = table
            .value(row, &["Package_", "PackageId"])
            .filter(|id| !id.is_empty())
        else {
            continue;
        };
        let permanent = table
            .value(row, &["ReallyPermanent"])
            .map(|v| v.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(false);
        behavior.entry(package_id.to_string()).or_insert(permanent);
    }
    behavior
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// 构造最小的 WixPdb XML: (链式包 ID, 产品代码, 升级代码) + 永久包 ID 列表
    pub fn pdb_xml(
        bundle_id: &str,
        name: &str,
        packages: &[(&str, &str, &str)],
        permanent: &[&str],
    ) -> String {
        let field = |value: &str| {
            if value.is_empty() {
                "<field />".to_string()
            } else {
                format!("<field>{}</field>", value)
            }
        };

        let chain_rows: String = packages
            .iter()
            .map(|(chain, product, upgrade)| {
                format!(
                    "<row>{}{}{}{}{}</row>",
                    field(chain),
                    field(product),
                    field(upgrade),
                    field("1.0.0"),
                    field(&format!("{} Package", chain))
                )
            })
            .collect();
        let behavior_rows: String = packages
            .iter()
            .map(|(chain, _, _)| {
                let flag = if permanent.contains(chain) { "yes" } else { "no" };
                format!("<row>{}{}</row>", field(chain), field(flag))
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<wixPdb version="3.0.3200.0" xmlns="http://schemas.microsoft.com/wix/2006/pdbs">
  <wixOutput type="Bundle" codepage="1252" version="3.0.3200.0" xmlns="http://schemas.microsoft.com/wix/2006/outputs">
    <tableDefinitions xmlns="http://schemas.microsoft.com/wix/2006/tables">
      <tableDefinition name="WixBundle">
        <columnDefinition name="Version" type="string" />
        <columnDefinition name="Name" type="string" />
        <columnDefinition name="BundleId" type="string" />
      </tableDefinition>
      <tableDefinition name="ChainMsiPackage">
        <columnDefinition name="ChainPackage_" type="string" />
        <columnDefinition name="ProductCode" type="string" />
        <columnDefinition name="UpgradeCode" type="string" />
        <columnDefinition name="ProductVersion" type="string" />
        <columnDefinition name="ProductName" type="string" />
      </tableDefinition>
      <tableDefinition name="UxPackageBehavior">
        <columnDefinition name="Package_" type="string" />
        <columnDefinition name="ReallyPermanent" type="string" />
      </tableDefinition>
    </tableDefinitions>
    <table name="WixBundle">
      <row><field>14.0.23107</field><field>{name}</field><field>{bundle_id}</field></row>
    </table>
    <table name="ChainMsiPackage">{chain_rows}</table>
    <table name="UxPackageBehavior">{behavior_rows}</table>
  </wixOutput>
</wixPdb>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::pdb_xml;
    use super::*;
    use std::path::PathBuf;

    fn parse(xml: &str) -> Result<Bundle, UninstallerError> {
        parse_wixpdb_str(xml, &PathBuf::from("fixture.wixpdb"))
    }

    #[test]
    fn reads_bundle_identity_and_chain_packages() {
        let xml = pdb_xml(
            "{AAAAAAAA-1111-2222-3333-444444444444}",
            "Tool A",
            &[("core_msi", "{P1}", "{U1}"), ("res_msi", "{P2}", "")],
            &[],
        );
        let bundle = parse(&xml).unwrap_or_else(|e| panic!("parse failed: {}", e));

        assert_eq!(bundle.bundle_id, "{aaaaaaaa-1111-2222-3333-444444444444}");
        assert_eq!(bundle.name, "Tool A");
        assert_eq!(bundle.version, "14.0.23107");
        assert_eq!(bundle.packages.len(), 2);

        let core = &bundle.packages[0];
        assert_eq!(core.product_code, "{P1}");
        assert_eq!(core.upgrade_code(), Some("{U1}"));
        assert_eq!(core.chaining_package_id.as_deref(), Some("core_msi"));
        assert_eq!(core.product_version.as_deref(), Some("1.0.0"));
        assert_eq!(bundle.packages[1].upgrade_code(), None);
    }

    #[test]
    fn really_permanent_packages_are_dropped() {
        let xml = pdb_xml(
            "{AAAAAAAA-1111-2222-3333-444444444444}",
            "Tool A",
            &[("vcredist", "{P1}", "{U1}"), ("core_msi", "{P2}", "{U2}")],
            &["vcredist"],
        );
        let bundle = parse(&xml).unwrap_or_else(|e| panic!("parse failed: {}", e));

        let codes: Vec<&str> = bundle.packages.iter().map(|p| p.product_code.as_str()).collect();
        assert_eq!(codes, vec!["{P2}"]);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(parse("<wixPdb><unclosed>"), Err(UninstallerError::Parse { .. })));
        assert!(matches!(
            parse(r#"<wixPdb><wixOutput type="Product" /></wixPdb>"#),
            Err(UninstallerError::Parse { .. })
        ));
    }

    #[test]
    fn parse_file_records_source_and_release_name() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {}", e));
        let path = dir.path().join("vs_enterprise.wixpdb");
        let xml = pdb_xml("{AAAAAAAA-1111-2222-3333-444444444444}", "Tool A", &[], &[]);
        std::fs::write(&path, xml).unwrap_or_else(|e| panic!("write: {}", e));

        let bundle = parse_wixpdb(&path).unwrap_or_else(|e| panic!("parse failed: {}", e));
        assert_eq!(bundle.release_name.as_deref(), Some("vs_enterprise"));
        assert_eq!(bundle.source_path.as_deref(), Some(path.as_path()));
        assert!(bundle.packages.is_empty());
    }

    #[test]
    fn missing_file_is_reported_as_parse_error() {
        let result = parse_wixpdb(&PathBuf::from("does-not-exist.wixpdb"));
        assert!(matches!(result, Err(UninstallerError::Parse { .. })));
    }
}
