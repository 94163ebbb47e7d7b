//! File classification by relative path.

use depgraph_core::types::MetadataKind;

use super::types::UnitKind;

pub const CONFIGURATION_FILE: &str = "Configuration.xml";

/// Classify a `/`-separated path relative to the export root.
/// Returns `None` for files that are not ingestion units.
pub fn classify(rel_path: &str) -> Option<UnitKind> {
    if rel_path == CONFIGURATION_FILE {
        return Some(UnitKind::ConfigurationRoot);
    }
    let lower = rel_path.to_ascii_lowercase();
    if lower.ends_with(".bsl") {
        return Some(UnitKind::SourceModule);
    }
    if lower.ends_with(".xml") {
        let segments: Vec<&str> = rel_path.split('/').collect();
        if segments.len() == 2 && MetadataKind::from_folder(segments[0]).is_some() {
            return Some(UnitKind::MetadataDescriptor);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_configuration() {
        assert_eq!(classify("Configuration.xml"), Some(UnitKind::ConfigurationRoot));
        assert_eq!(classify("Sub/Configuration.xml"), None);
    }

    #[test]
    fn descriptors_need_known_plural_folder_at_depth_two() {
        assert_eq!(classify("Catalogs/Products.xml"), Some(UnitKind::MetadataDescriptor));
        assert_eq!(classify("CommonModules/Utils.xml"), Some(UnitKind::MetadataDescriptor));
        assert_eq!(classify("Widgets/Products.xml"), None);
        assert_eq!(classify("Catalogs/Products/Ext/Form.xml"), None);
    }

    #[test]
    fn bsl_anywhere() {
        assert_eq!(
            classify("Catalogs/Products/Ext/ObjectModule.bsl"),
            Some(UnitKind::SourceModule)
        );
        assert_eq!(classify("loose.BSL"), Some(UnitKind::SourceModule));
        assert_eq!(classify("readme.md"), None);
    }
}
