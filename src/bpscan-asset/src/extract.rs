//! Blueprint class and graph node extraction
//!
//! Walks every export of a parsed package once and reduces it to
//! [`AssetFacts`]. A failure inside one export drops that export only, unless
//! the error says the file itself can no longer be trusted.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::facts::{
    AssetFacts, BlueprintClassObject, K2GraphNodeObject, K2NodeKind, OtherAssetObject,
};
use crate::hash::word_hashes;
use crate::linker::Linker;
use crate::object::PackageIndex;
use crate::property::{decode_properties, PropertyBag, PropertyValue};
use crate::reader::Reader;
use crate::versions::VersionGate;
use crate::{Error, Result};

/// Classes whose instances are blueprint-generated classes
pub const BLUEPRINT_CLASS_CLASSES: &[&str] = &[
    "BlueprintGeneratedClass",
    "WidgetBlueprintGeneratedClass",
    "AnimBlueprintGeneratedClass",
];

pub fn is_blueprint_class_class(class_name: &str) -> bool {
    BLUEPRINT_CLASS_CLASSES.contains(&class_name)
}

/// An export that failed to decode
#[derive(Debug, Clone, PartialEq)]
pub struct ExportError {
    pub index: PackageIndex,
    pub object_name: String,
    pub error: Error,
}

/// Facts plus the exports that contributed nothing because they failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub facts: AssetFacts,
    pub export_errors: Vec<ExportError>,
}

/// Parse a package and extract its facts
pub fn extract_facts(data: impl Into<Arc<[u8]>>) -> Result<Extraction> {
    let linker = Linker::parse(data)?;
    extract(&linker)
}

/// Extract facts from an already parsed package
pub fn extract(linker: &Linker) -> Result<Extraction> {
    let mut extraction = Extraction::default();

    for slot in 0..linker.exports().len() {
        let index = PackageIndex::from_export(slot);
        match extract_export(linker, index, &mut extraction.facts) {
            Ok(()) => {}
            Err(error) if error.is_file_fatal() => return Err(error),
            Err(error) => {
                let object_name = linker.object_string_name(index);
                warn!(%index, object = %object_name, %error, "export skipped");
                extraction.export_errors.push(ExportError {
                    index,
                    object_name,
                    error,
                });
            }
        }
    }

    extraction.facts.word_hashes = word_hashes(linker.names().iter());
    Ok(extraction)
}

fn extract_export(linker: &Linker, index: PackageIndex, facts: &mut AssetFacts) -> Result<()> {
    let Some(class_name) = linker.class_name(index) else {
        return Ok(());
    };

    if is_blueprint_class_class(class_name) {
        facts
            .blueprint_classes
            .push(read_blueprint_class(linker, index, class_name)?);
    } else if let Some(kind) = K2NodeKind::from_class_name(class_name) {
        if kind == K2NodeKind::Event && !linker.supports(VersionGate::EventOverrideNodes) {
            return Ok(());
        }
        let properties = linker.export_properties(index)?;
        match read_graph_node(linker, index, kind, &properties) {
            Some(node) => facts.k2_nodes.push(node),
            None => debug!(%index, ?kind, "graph node without member reference"),
        }
    } else {
        facts.other_objects.push(OtherAssetObject {
            index,
            class_name: class_name.to_string(),
        });
    }
    Ok(())
}

fn read_blueprint_class(
    linker: &Linker,
    index: PackageIndex,
    class_name: &str,
) -> Result<BlueprintClassObject> {
    let export = linker
        .export(index)
        .ok_or(Error::InvalidExportBounds {
            index: index.raw(),
            offset: 0,
            size: 0,
            file_len: linker.data().len(),
        })?;
    let mut r = linker
        .export_reader(index)
        .ok_or(Error::InvalidExportBounds {
            index: index.raw(),
            offset: export.serial_offset,
            size: export.serial_size,
            file_len: linker.data().len(),
        })?;

    skip_field_list(&mut r, linker)?;
    if linker.supports(VersionGate::ClassDefaultsSerialized) {
        let _defaults = decode_properties(&mut r, &linker.decode_context())?;
    }
    let interfaces = read_interfaces(&mut r, linker)?
        .into_iter()
        .map(|i| linker.object_string_name(i))
        .collect();

    Ok(BlueprintClassObject {
        index,
        object_name: export.object_name.clone(),
        class_name: class_name.to_string(),
        super_class_name: linker.object_name(export.super_index).map(str::to_string),
        interfaces,
    })
}

fn skip_field_list(r: &mut Reader<'_>, linker: &Linker) -> Result<()> {
    if linker.supports(VersionGate::FieldListIsArray) {
        let _children = r.read_array(|r| r.read_package_index())?;
    } else {
        let _first_child = r.read_i32()?;
        let _next = r.read_i32()?;
    }
    Ok(())
}

/// Implemented interfaces, in either the plain or the struct-wrapped layout
pub fn read_interfaces(r: &mut Reader<'_>, linker: &Linker) -> Result<Vec<PackageIndex>> {
    if linker.supports(VersionGate::InterfacesAsStruct) {
        r.read_array(|r| {
            let class = r.read_package_index()?;
            let _pointer_offset = r.read_i32()?;
            let _implemented_by_k2 = r.read_i32()?;
            Ok(class)
        })
    } else {
        r.read_array(|r| r.read_package_index())
    }
}

fn read_graph_node(
    linker: &Linker,
    index: PackageIndex,
    kind: K2NodeKind,
    properties: &PropertyBag,
) -> Option<K2GraphNodeObject> {
    let reference = properties.get_struct(kind.reference_key())?;
    let member_name = reference.get_name("MemberName")?.to_string();
    let member_parent = reference
        .get("MemberParent")
        .and_then(PropertyValue::as_object)
        .and_then(|parent| linker.object_name(parent))
        .map(str::to_string);
    let self_context = reference
        .get("bSelfContext")
        .and_then(PropertyValue::as_bool)
        .unwrap_or(false);
    let member_guid = reference
        .get("MemberGuid")
        .and_then(PropertyValue::as_guid)
        .filter(|g| !g.is_zero());

    Some(K2GraphNodeObject {
        index,
        kind,
        member_name,
        member_parent,
        self_context,
        member_guid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::word_hash;
    use crate::reader::{Endian, Guid};
    use crate::testing::{ExportSpec, PackageBuilder, PropertyWriter};
    use crate::versions::custom;

    /// A Pawn subclass with one interface and two graph nodes
    fn hero_package(mut b: PackageBuilder) -> Vec<u8> {
        let engine = b.import_package("/Script/Engine");
        let pawn = b.import_class(engine, "Pawn");
        let bp_class = b.import_class(engine, "BlueprintGeneratedClass");
        let damageable = b.import_class(engine, "Damageable");
        let graph_class = b.import_class(engine, "EdGraph");
        let get_class = b.import_class(engine, "K2Node_VariableGet");
        let call_class = b.import_class(engine, "K2Node_CallFunction");

        let class_payload = b.class_payload(&[], &[damageable]);
        let class = b.export(
            ExportSpec::new("Hero_C")
                .class(bp_class)
                .super_class(pawn)
                .payload(class_payload),
        );
        let graph = b.export(ExportSpec::new("EventGraph").class(graph_class).outer(class));

        let get_payload = {
            let mut w = PropertyWriter::new(&mut b);
            w.member_reference_full("VariableReference", "Health", None, true, Some(Guid::new(9, 9, 9, 9)));
            w.finish()
        };
        b.export(
            ExportSpec::new("K2Node_VariableGet_0")
                .class(get_class)
                .outer(graph)
                .payload(get_payload),
        );

        let call_payload = {
            let mut w = PropertyWriter::new(&mut b);
            w.member_reference("FunctionReference", "TakeDamage", Some(pawn), false);
            w.finish()
        };
        b.export(
            ExportSpec::new("K2Node_CallFunction_0")
                .class(call_class)
                .outer(graph)
                .payload(call_payload),
        );
        b.build()
    }

    #[test]
    fn test_extracts_class_nodes_and_words() {
        let extraction = extract_facts(hero_package(PackageBuilder::new())).unwrap();
        assert!(extraction.export_errors.is_empty());
        let facts = extraction.facts;

        assert_eq!(facts.blueprint_classes.len(), 1);
        let class = &facts.blueprint_classes[0];
        assert_eq!(class.object_name, "Hero_C");
        assert_eq!(class.super_class_name.as_deref(), Some("Pawn"));
        assert_eq!(class.interfaces, vec!["Damageable".to_string()]);

        assert_eq!(facts.k2_nodes.len(), 2);
        let get = &facts.k2_nodes[0];
        assert_eq!(get.kind, K2NodeKind::VariableGet);
        assert_eq!(get.member_name, "Health");
        assert!(get.self_context);
        assert_eq!(get.member_guid, Some(Guid::new(9, 9, 9, 9)));
        let call = &facts.k2_nodes[1];
        assert_eq!(call.kind, K2NodeKind::FunctionCall);
        assert_eq!(call.member_parent.as_deref(), Some("Pawn"));

        assert_eq!(facts.other_objects.len(), 1);
        assert_eq!(facts.other_objects[0].class_name, "EdGraph");

        assert!(facts.contains_word_hash(word_hash("health")));
        assert!(facts.contains_word_hash(word_hash("Pawn")));
        assert!(!facts.contains_word_hash(word_hash("Mana")));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let bytes = hero_package(PackageBuilder::new());
        let first = extract_facts(bytes.clone()).unwrap();
        let second = extract_facts(bytes).unwrap();
        assert_eq!(first.facts, second.facts);
    }

    #[test]
    fn test_interface_layouts_agree() {
        let plain = hero_package(
            PackageBuilder::new().with_custom_version(custom::UE5_RELEASE_STREAM, 9),
        );
        let wrapped = hero_package(
            PackageBuilder::new().with_custom_version(custom::UE5_RELEASE_STREAM, 10),
        );
        assert_ne!(plain, wrapped);

        let plain = extract_facts(plain).unwrap().facts;
        let wrapped = extract_facts(wrapped).unwrap().facts;
        assert_eq!(plain.blueprint_classes[0].interfaces, vec!["Damageable".to_string()]);
        assert_eq!(
            plain.blueprint_classes[0].interfaces,
            wrapped.blueprint_classes[0].interfaces
        );
    }

    #[test]
    fn test_field_list_and_defaults_layouts() {
        let b = PackageBuilder::new()
            .with_endian(Endian::Big)
            .with_custom_version(custom::CORE, 4)
            .with_custom_version(custom::FRAMEWORK, 28);
        let facts = extract_facts(hero_package(b)).unwrap().facts;
        assert_eq!(facts.blueprint_classes[0].interfaces, vec!["Damageable".to_string()]);
        assert_eq!(facts.k2_nodes.len(), 2);
    }

    #[test]
    fn test_bad_export_is_isolated() {
        let mut b = PackageBuilder::new();
        let engine = b.import_package("/Script/Engine");
        let get_class = b.import_class(engine, "K2Node_VariableGet");
        let mesh_class = b.import_class(engine, "StaticMesh");
        let bad = {
            let mut w = PropertyWriter::new(&mut b);
            w.raw("Weird", "NotARealProperty", &[]);
            w.finish()
        };
        b.export(ExportSpec::new("K2Node_VariableGet_0").class(get_class).payload(bad));
        b.export(ExportSpec::new("Mesh").class(mesh_class));

        let extraction = extract_facts(b.build()).unwrap();
        assert_eq!(extraction.export_errors.len(), 1);
        assert!(matches!(
            extraction.export_errors[0].error,
            Error::UnsupportedPropertyType(_)
        ));
        assert!(extraction.facts.k2_nodes.is_empty());
        assert_eq!(extraction.facts.other_objects.len(), 1);
    }

    #[test]
    fn test_unresolved_interface_is_empty_string() {
        let mut b = PackageBuilder::new();
        let engine = b.import_package("/Script/Engine");
        let bp_class = b.import_class(engine, "BlueprintGeneratedClass");
        let payload = b.class_payload(&[], &[PackageIndex::new(-40)]);
        b.export(ExportSpec::new("Lonely_C").class(bp_class).payload(payload));

        let facts = extract_facts(b.build()).unwrap().facts;
        let class = &facts.blueprint_classes[0];
        assert_eq!(class.interfaces, vec![String::new()]);
        assert_eq!(class.super_class_name, None);
    }

    #[test]
    fn test_event_nodes_need_ue5() {
        for (ue5, expected) in [(None, 0), (Some(crate::versions::ue5::DATA_RESOURCES), 1)] {
            let mut b = PackageBuilder::new().with_ue5_opt(ue5);
            let engine = b.import_package("/Script/Engine");
            let event_class = b.import_class(engine, "K2Node_Event");
            let payload = {
                let mut w = PropertyWriter::new(&mut b);
                w.member_reference("EventReference", "ReceiveBeginPlay", None, false);
                w.finish()
            };
            b.export(ExportSpec::new("K2Node_Event_0").class(event_class).payload(payload));
            let facts = extract_facts(b.build()).unwrap().facts;
            assert_eq!(facts.k2_nodes.len(), expected);
        }
    }
}
