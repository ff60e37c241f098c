//! Per-file facts produced by extraction
//!
//! Fact tables are plain values: two extractions of the same bytes compare
//! equal, which is how the index recognizes a rebuild that changed nothing.

use serde::{Deserialize, Serialize};

use crate::object::PackageIndex;
use crate::reader::Guid;

/// One blueprint-generated class export
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlueprintClassObject {
    pub index: PackageIndex,
    pub object_name: String,
    pub class_name: String,
    /// `None` only when the super index does not resolve
    pub super_class_name: Option<String>,
    /// Resolved interface names; unresolved entries are empty strings
    pub interfaces: Vec<String>,
}

/// Script graph node kinds the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum K2NodeKind {
    VariableGet,
    VariableSet,
    FunctionCall,
    AddDelegate,
    ClearDelegate,
    CallDelegate,
    Event,
}

impl K2NodeKind {
    /// Node kind for a graph node class name
    pub fn from_class_name(class_name: &str) -> Option<Self> {
        Some(match class_name {
            "K2Node_VariableGet" => Self::VariableGet,
            "K2Node_VariableSet" => Self::VariableSet,
            "K2Node_CallFunction" | "K2Node_CallParentFunction" | "K2Node_CallArrayFunction" => {
                Self::FunctionCall
            }
            "K2Node_AddDelegate" => Self::AddDelegate,
            "K2Node_ClearDelegate" | "K2Node_RemoveDelegate" => Self::ClearDelegate,
            "K2Node_CallDelegate" => Self::CallDelegate,
            "K2Node_Event" | "K2Node_ComponentBoundEvent" => Self::Event,
            _ => return None,
        })
    }

    /// Struct property holding the node's member reference
    pub fn reference_key(self) -> &'static str {
        match self {
            Self::VariableGet | Self::VariableSet => "VariableReference",
            Self::FunctionCall => "FunctionReference",
            Self::AddDelegate | Self::ClearDelegate | Self::CallDelegate => "DelegateReference",
            Self::Event => "EventReference",
        }
    }

    pub fn is_delegate(self) -> bool {
        matches!(
            self,
            Self::AddDelegate | Self::ClearDelegate | Self::CallDelegate
        )
    }
}

/// One recognized script graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct K2GraphNodeObject {
    pub index: PackageIndex,
    pub kind: K2NodeKind,
    pub member_name: String,
    /// Object name of the class the reference names explicitly
    pub member_parent: Option<String>,
    pub self_context: bool,
    pub member_guid: Option<Guid>,
}

/// Any other export with a resolvable class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtherAssetObject {
    pub index: PackageIndex,
    pub class_name: String,
}

/// Everything the index needs from one asset file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetFacts {
    pub blueprint_classes: Vec<BlueprintClassObject>,
    pub k2_nodes: Vec<K2GraphNodeObject>,
    pub other_objects: Vec<OtherAssetObject>,
    /// Sorted and de-duplicated
    pub word_hashes: Vec<u32>,
}

impl AssetFacts {
    pub fn is_empty(&self) -> bool {
        self.blueprint_classes.is_empty()
            && self.k2_nodes.is_empty()
            && self.other_objects.is_empty()
            && self.word_hashes.is_empty()
    }

    pub fn contains_word_hash(&self, hash: u32) -> bool {
        self.word_hashes.binary_search(&hash).is_ok()
    }

    pub fn blueprint_class(&self, index: PackageIndex) -> Option<&BlueprintClassObject> {
        self.blueprint_classes.iter().find(|c| c.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kinds() {
        assert_eq!(
            K2NodeKind::from_class_name("K2Node_CallParentFunction"),
            Some(K2NodeKind::FunctionCall)
        );
        assert_eq!(K2NodeKind::from_class_name("K2Node_Knot"), None);
        assert_eq!(K2NodeKind::VariableSet.reference_key(), "VariableReference");
        assert!(K2NodeKind::CallDelegate.is_delegate());
    }

    #[test]
    fn test_json_shape() {
        let facts = AssetFacts {
            other_objects: vec![OtherAssetObject {
                index: PackageIndex::new(3),
                class_name: "StaticMesh".into(),
            }],
            word_hashes: vec![1, 5],
            ..AssetFacts::default()
        };
        let json = serde_json::to_string(&facts).unwrap();
        assert!(json.contains("\"index\":3"));
        let back: AssetFacts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, facts);
        assert!(back.contains_word_hash(5));
        assert!(!back.contains_word_hash(2));
    }
}
