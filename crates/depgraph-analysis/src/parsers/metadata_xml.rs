//! Metadata descriptor reader (`Configuration.xml`, `Catalogs/Products.xml`).

use std::collections::BTreeSet;

use depgraph_core::types::MetadataKind;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::types::{DescriptorInfo, StructuralRecord};

const ROOT: &str = "MetaDataObject";
const CONFIGURATION: &str = "Configuration";

/// Parse a descriptor. Malformed XML, or XML without a recognizable
/// `MetaDataObject` root, yields an empty record flagged `parse_failed`.
pub fn parse_descriptor(content: &str) -> StructuralRecord {
    match read_descriptor(content) {
        Some(info) => StructuralRecord {
            descriptor: Some(info),
            loc: content.lines().filter(|l| !l.trim().is_empty()).count() as u32,
            ..Default::default()
        },
        None => StructuralRecord::failed(),
    }
}

fn read_descriptor(content: &str) -> Option<DescriptorInfo> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut info = DescriptorInfo::default();
    let mut object_seen = false;
    let mut type_refs: BTreeSet<String> = BTreeSet::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                on_open(&path, &name, &mut info, &mut object_seen);
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                on_open(&path, &name, &mut info, &mut object_seen);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(e) => {
                        tracing::debug!(error = %e, "descriptor text unescape failed");
                        return None;
                    }
                };
                on_text(&path, &text, &mut info, &mut type_refs);
            }
            Ok(Event::Eof) => {
                if !path.is_empty() {
                    return None;
                }
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed descriptor");
                return None;
            }
            _ => {}
        }
    }

    if !object_seen || info.name.is_empty() {
        return None;
    }
    if let Some(kind) = info.kind {
        let own = kind.object_id(&info.name).to_string();
        type_refs.remove(&own);
    }
    info.type_refs = type_refs.into_iter().collect();
    Some(info)
}

fn on_open(path: &[String], name: &str, info: &mut DescriptorInfo, object_seen: &mut bool) {
    if path.len() == 1 && path[0] == ROOT && !*object_seen {
        *object_seen = true;
        info.kind = if name == CONFIGURATION {
            None
        } else {
            Some(MetadataKind::from_name(name).unwrap_or(MetadataKind::Other))
        };
        return;
    }
    if name == "Attribute" && path.iter().any(|p| p == "ChildObjects") {
        info.attribute_count += 1;
    }
}

fn on_text(
    path: &[String],
    text: &str,
    info: &mut DescriptorInfo,
    type_refs: &mut BTreeSet<String>,
) {
    let Some(last) = path.last() else {
        return;
    };
    if path.len() == 4 && path[0] == ROOT && path[2] == "Properties" && last == "Name" {
        if info.name.is_empty() {
            info.name = text.to_string();
        }
        return;
    }
    if path.len() == 4 && path[0] == ROOT && path[2] == "ChildObjects" {
        if path[1] == CONFIGURATION {
            if let Some(kind) = MetadataKind::from_name(last) {
                info.child_objects.push(kind.object_id(text).to_string());
            }
        } else if last == "Form" {
            info.forms.push(text.to_string());
        }
        return;
    }
    if last == "Type" {
        if let Some(id) = type_reference(text) {
            type_refs.insert(id);
        }
    }
}

/// `cfg:CatalogRef.Units` → `Catalog.Units`.
pub fn type_reference(text: &str) -> Option<String> {
    let body = text.trim();
    let body = body.strip_prefix("cfg:").unwrap_or(body);
    let (type_name, object) = body.split_once('.')?;
    let kind_name = type_name.strip_suffix("Ref")?;
    let kind = MetadataKind::from_name(kind_name)?;
    if object.is_empty() || object.contains('.') {
        return None;
    }
    Some(kind.object_id(object).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MetaDataObject xmlns="http://v8.1c.ru/8.3/MDClasses" xmlns:v8="http://v8.1c.ru/8.1/data/core" version="2.16">
  <Catalog uuid="1">
    <Properties>
      <Name>Products</Name>
      <Synonym><v8:item><v8:content>Товары</v8:content></v8:item></Synonym>
    </Properties>
    <ChildObjects>
      <Attribute uuid="2">
        <Properties>
          <Name>Unit</Name>
          <Type><v8:Type>cfg:CatalogRef.Units</v8:Type></Type>
        </Properties>
      </Attribute>
      <Attribute uuid="3">
        <Properties>
          <Name>Parent</Name>
          <Type><v8:Type>cfg:CatalogRef.Products</v8:Type></Type>
        </Properties>
      </Attribute>
      <TabularSection uuid="4">
        <ChildObjects>
          <Attribute uuid="5">
            <Properties>
              <Name>Kind</Name>
              <Type><v8:Type>cfg:EnumRef.ProductKinds</v8:Type></Type>
            </Properties>
          </Attribute>
        </ChildObjects>
      </TabularSection>
      <Form>ItemForm</Form>
    </ChildObjects>
  </Catalog>
</MetaDataObject>"#;

    #[test]
    fn object_descriptor() {
        let record = parse_descriptor(CATALOG);
        assert!(!record.flags.parse_failed);
        let info = record.descriptor.unwrap();
        assert_eq!(info.kind, Some(MetadataKind::Catalog));
        assert_eq!(info.name, "Products");
        assert_eq!(info.attribute_count, 3);
        assert_eq!(info.type_refs, vec!["Catalog.Units", "Enum.ProductKinds"]);
        assert_eq!(info.forms, vec!["ItemForm"]);
    }

    #[test]
    fn configuration_lists_children() {
        let xml = r#"<MetaDataObject><Configuration uuid="x"><Properties><Name>Trade</Name></Properties>
            <ChildObjects><Language>Русский</Language><Catalog>Products</Catalog><CommonModule>Utils</CommonModule></ChildObjects>
            </Configuration></MetaDataObject>"#;
        let info = parse_descriptor(xml).descriptor.unwrap();
        assert_eq!(info.kind, None);
        assert_eq!(info.name, "Trade");
        assert_eq!(info.child_objects, vec!["Catalog.Products", "CommonModule.Utils"]);
    }

    #[test]
    fn malformed_xml_is_flagged() {
        let record = parse_descriptor("<MetaDataObject><Catalog><Properties><Name>X</Nam");
        assert!(record.flags.parse_failed);
        assert!(record.descriptor.is_none());
        assert!(parse_descriptor("<Other/>").flags.parse_failed);
    }

    #[test]
    fn type_reference_forms() {
        assert_eq!(type_reference("cfg:DocumentRef.Order").as_deref(), Some("Document.Order"));
        assert_eq!(type_reference("xs:string"), None);
        assert_eq!(type_reference("cfg:CatalogObject.Units"), None);
    }
}
