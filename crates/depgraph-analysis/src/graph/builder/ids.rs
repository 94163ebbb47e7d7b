//! Stable ids derived from unit paths.

use depgraph_core::types::{MetadataKind, NodeId};

/// Id of the single configuration root node.
pub const CONFIGURATION_ID: &str = "Configuration";

/// Where a source module sits in the export tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLocation {
    pub id: NodeId,
    /// Metadata object whose folder holds the module.
    pub owner: Option<NodeId>,
    /// Name under which qualified calls reach the module (common modules only).
    pub common_module: Option<String>,
    /// Last meaningful path component, used as the display name.
    pub short_name: String,
}

fn strip_bsl(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    if lower.ends_with(".bsl") {
        &segment[..segment.len() - 4]
    } else {
        segment
    }
}

/// Derive a module's id from its path.
///
/// - `CommonModules/Utils/Ext/Module.bsl` → `CommonModule.Utils.Module`
/// - `Catalogs/Products/Ext/ObjectModule.bsl` → `Catalog.Products.ObjectModule`
/// - `Catalogs/Products/Forms/Item/Ext/Form/Module.bsl` → `Catalog.Products.Form.Item`
/// - `Ext/SessionModule.bsl` → `Configuration.SessionModule`
/// - anything else → the path without extension, `/` replaced by `.`
pub fn module_location(path: &str) -> ModuleLocation {
    let raw: Vec<&str> = path.split('/').collect();
    let last = raw.len().saturating_sub(1);
    let segments: Vec<&str> = raw
        .iter()
        .copied()
        .enumerate()
        .map(|(i, s)| if i == last { strip_bsl(s) } else { s })
        .collect();

    if segments.len() >= 3 {
        if let Some(kind) = MetadataKind::from_folder(segments[0]) {
            let object = kind.object_id(segments[1]);
            let rest = &segments[2..];
            let tail = match rest {
                ["Forms", form, ..] => format!("Form.{form}"),
                ["Commands", command, ..] => format!("Command.{command}"),
                _ => rest
                    .iter()
                    .filter(|s| !s.eq_ignore_ascii_case("Ext"))
                    .copied()
                    .collect::<Vec<_>>()
                    .join("."),
            };
            let id = if tail.is_empty() {
                object.to_string()
            } else {
                format!("{object}.{tail}")
            };
            let common_module = (kind == MetadataKind::CommonModule).then(|| segments[1].to_string());
            let short_name = match kind {
                MetadataKind::CommonModule => segments[1].to_string(),
                _ => id.rsplit('.').next().unwrap_or(&id).to_string(),
            };
            return ModuleLocation {
                id: NodeId::new(id),
                owner: Some(object),
                common_module,
                short_name,
            };
        }
    }

    if segments.first().is_some_and(|s| s.eq_ignore_ascii_case("Ext")) && segments.len() == 2 {
        return ModuleLocation {
            id: NodeId::new(format!("{CONFIGURATION_ID}.{}", segments[1])),
            owner: Some(NodeId::new(CONFIGURATION_ID)),
            common_module: None,
            short_name: segments[1].to_string(),
        };
    }

    let short_name = segments.last().copied().unwrap_or_default().to_string();
    ModuleLocation {
        id: NodeId::new(segments.join(".")),
        owner: None,
        common_module: None,
        short_name,
    }
}

/// `Catalogs/Products.xml` → (`Catalog`, `Products`).
pub fn descriptor_object(path: &str) -> Option<(MetadataKind, String)> {
    let (folder, file) = path.split_once('/')?;
    let kind = MetadataKind::from_folder(folder)?;
    let name = file.strip_suffix(".xml").or_else(|| file.strip_suffix(".XML"))?;
    Some((kind, name.to_string()))
}

/// A module is a test module when a path segment (or its common-module
/// name) equals, starts with or ends with a marker, case-insensitively.
pub fn is_test_module(path: &str, markers: &[String]) -> bool {
    let markers: Vec<String> = markers.iter().map(|m| m.to_lowercase()).collect();
    path.split('/').any(|segment| {
        let seg = strip_bsl(segment).to_lowercase();
        markers
            .iter()
            .any(|m| !m.is_empty() && (seg == *m || seg.starts_with(m.as_str()) || seg.ends_with(m.as_str())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_module() {
        let loc = module_location("CommonModules/Utils/Ext/Module.bsl");
        assert_eq!(loc.id.as_str(), "CommonModule.Utils.Module");
        assert_eq!(loc.owner.unwrap().as_str(), "CommonModule.Utils");
        assert_eq!(loc.common_module.as_deref(), Some("Utils"));
        assert_eq!(loc.short_name, "Utils");
    }

    #[test]
    fn object_and_form_modules() {
        let loc = module_location("Catalogs/Products/Ext/ObjectModule.bsl");
        assert_eq!(loc.id.as_str(), "Catalog.Products.ObjectModule");
        assert!(loc.common_module.is_none());

        let form = module_location("Documents/Order/Forms/DocumentForm/Ext/Form/Module.bsl");
        assert_eq!(form.id.as_str(), "Document.Order.Form.DocumentForm");
        assert_eq!(form.owner.unwrap().as_str(), "Document.Order");
    }

    #[test]
    fn root_and_loose_modules() {
        assert_eq!(
            module_location("Ext/SessionModule.bsl").id.as_str(),
            "Configuration.SessionModule"
        );
        let loose = module_location("src/ModuleA.bsl");
        assert_eq!(loose.id.as_str(), "src.ModuleA");
        assert!(loose.owner.is_none());
    }

    #[test]
    fn descriptors() {
        assert_eq!(
            descriptor_object("Catalogs/Products.xml"),
            Some((MetadataKind::Catalog, "Products".to_string()))
        );
        assert_eq!(descriptor_object("Configuration.xml"), None);
    }

    #[test]
    fn test_markers() {
        let markers = vec!["Tests".to_string(), "Тесты".to_string()];
        assert!(is_test_module("CommonModules/Тесты_Расчет/Ext/Module.bsl", &markers));
        assert!(is_test_module("Tests/CalcTests.bsl", &markers));
        assert!(!is_test_module("CommonModules/Utils/Ext/Module.bsl", &markers));
    }
}
