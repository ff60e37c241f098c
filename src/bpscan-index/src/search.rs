//! Usage search over indexed blueprint packages
//!
//! A search shortlists files through [`GlobalIndex::can_contain_word`], then
//! decodes each surviving file and confirms matches against its facts and
//! property trees. Decoding happens outside the index lock and runs in
//! parallel across files.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bpscan_asset::{extract, AssetFacts, Guid, K2NodeKind, Linker, PackageIndex};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::builder::AssetSource;
use crate::index::{DerivedClassDescriptor, FileId, GlobalIndex, IndexStatus};
use crate::resolve::SearchTarget;
use crate::{Error, Result};

/// Class of the function objects listed in a class's dependencies
const FUNCTION_CLASS: &str = "Function";

/// How a matched export uses the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UsageKind {
    Instantiation,
    ExtendedType,
    Read,
    Write,
    Invocation,
    Override,
    DelegateBind,
    DelegateUnbind,
    DelegateCall,
}

impl UsageKind {
    fn for_node(kind: K2NodeKind) -> Self {
        match kind {
            K2NodeKind::VariableGet => Self::Read,
            K2NodeKind::VariableSet => Self::Write,
            K2NodeKind::FunctionCall => Self::Invocation,
            K2NodeKind::AddDelegate => Self::DelegateBind,
            K2NodeKind::ClearDelegate => Self::DelegateUnbind,
            K2NodeKind::CallDelegate => Self::DelegateCall,
            K2NodeKind::Event => Self::Override,
        }
    }
}

/// One confirmed usage, navigable by file and export
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageRecord {
    pub kind: UsageKind,
    pub owner_class_name: String,
    pub node_index: PackageIndex,
    pub asset_file: FileId,
    pub member_name: Option<String>,
    pub guid: Option<Guid>,
}

/// A parsed package together with its extracted facts
#[derive(Debug)]
pub struct DecodedAsset {
    pub linker: Linker,
    pub facts: AssetFacts,
}

impl DecodedAsset {
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let linker = Linker::parse(bytes)?;
        let facts = extract(&linker)?.facts;
        Ok(Self { linker, facts })
    }

    /// Blueprint class that owns a graph node two outers up
    ///
    /// The outer may be the class itself or the blueprint asset that
    /// generated it (`Hero` for `Hero_C`).
    fn graph_owner(&self, node: PackageIndex) -> Option<String> {
        let owner = self.linker.outer(node, 2)?;
        let export = self.linker.export(owner)?;
        if let Some(class) = self.facts.blueprint_class(owner) {
            return Some(class.object_name.clone());
        }
        let generated = format!("{}_C", export.object_name);
        let name = self
            .facts
            .blueprint_classes
            .iter()
            .find(|c| c.object_name.eq_ignore_ascii_case(&generated))
            .map_or_else(|| export.object_name.clone(), |c| c.object_name.clone());
        Some(name)
    }
}

/// Per-request cache of decoded packages keyed by file
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: Mutex<HashMap<FileId, Arc<DecodedAsset>>>,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached decode of `file`, decoding it on first use
    ///
    /// The lock is not held while decoding; two callers racing on the same
    /// file both decode it and the first insert wins.
    pub fn get_or_decode<S: AssetSource>(&self, file: &FileId, source: &S) -> Result<Arc<DecodedAsset>> {
        if let Some(asset) = self.entries.lock().get(file) {
            return Ok(Arc::clone(asset));
        }
        let asset = Arc::new(DecodedAsset::decode(source.read(file)?)?);
        Ok(Arc::clone(
            self.entries.lock().entry(file.clone()).or_insert(asset),
        ))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Search results plus whether the index was settled when they were taken
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub records: Vec<UsageRecord>,
    pub index_complete: bool,
}

/// A target with its lowercased owner names precomputed
struct PreparedTarget<'t> {
    target: &'t SearchTarget,
    /// Target class aliases plus every blueprint class deriving from them
    owners: HashSet<String>,
}

impl PreparedTarget<'_> {
    fn owns(&self, class_name: &str) -> bool {
        self.owners.contains(&class_name.to_ascii_lowercase())
    }
}

/// Finds usages of [`SearchTarget`]s across indexed files
pub struct UsageSearcher<'a, S: AssetSource> {
    index: &'a GlobalIndex,
    source: &'a S,
    cache: &'a DecodeCache,
}

impl<'a, S: AssetSource> UsageSearcher<'a, S> {
    pub fn new(index: &'a GlobalIndex, source: &'a S, cache: &'a DecodeCache) -> Self {
        Self {
            index,
            source,
            cache,
        }
    }

    /// Every usage of any of `targets` within `scope`
    ///
    /// Files that fail to decode contribute nothing. Results are sorted and
    /// free of duplicates.
    pub fn find_usages(
        &self,
        targets: &[SearchTarget],
        scope: &[FileId],
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        let index_complete = self.index.status() == IndexStatus::Complete;
        let prepared: Vec<PreparedTarget<'_>> =
            targets.iter().map(|t| self.prepare(t)).collect();

        let per_file: Vec<Vec<UsageRecord>> = scope
            .par_iter()
            .map(|file| {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                self.search_file(file, &prepared)
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut records: Vec<UsageRecord> = per_file.into_iter().flatten().collect();
        records.sort();
        records.dedup();
        Ok(SearchOutcome {
            records,
            index_complete,
        })
    }

    /// Blueprint classes deriving from any target's class, from the index alone
    pub fn find_go_to_inheritors(&self, targets: &[SearchTarget]) -> Vec<DerivedClassDescriptor> {
        let mut seen = HashSet::new();
        targets
            .iter()
            .flat_map(|t| self.index.transitive_inheritors(t.class_name()))
            .filter(|d| seen.insert(d.clone()))
            .collect()
    }

    fn prepare<'t>(&self, target: &'t SearchTarget) -> PreparedTarget<'t> {
        let mut owners = HashSet::from([target.class_name().to_ascii_lowercase()]);
        if !matches!(target, SearchTarget::Class { .. }) {
            owners.extend(
                self.index
                    .transitive_inheritors(target.class_name())
                    .into_iter()
                    .map(|d| d.name.to_ascii_lowercase()),
            );
        }
        PreparedTarget { target, owners }
    }

    fn search_file(&self, file: &FileId, targets: &[PreparedTarget<'_>]) -> Vec<UsageRecord> {
        let candidates: Vec<&PreparedTarget<'_>> = targets
            .iter()
            .filter(|t| self.index.can_contain_word(file, t.target.word()))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let asset = match self.cache.get_or_decode(file, self.source) {
            Ok(asset) => asset,
            Err(error) => {
                warn!(%file, %error, "skipping undecodable file");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for prepared in candidates {
            match prepared.target {
                SearchTarget::Class { class_name, .. } => {
                    class_usages(file, &asset, class_name, &mut records)
                }
                SearchTarget::Field { field_name, .. } => {
                    field_usages(file, &asset, prepared, field_name, &mut records)
                }
                SearchTarget::Function { function_name, .. } => {
                    function_usages(file, &asset, prepared, function_name, &mut records)
                }
            }
        }
        debug!(%file, found = records.len(), "file searched");
        records
    }
}

fn record(
    kind: UsageKind,
    owner: &str,
    index: PackageIndex,
    file: &FileId,
    member: Option<&str>,
    guid: Option<Guid>,
) -> UsageRecord {
    UsageRecord {
        kind,
        owner_class_name: owner.to_string(),
        node_index: index,
        asset_file: file.clone(),
        member_name: member.map(str::to_string),
        guid,
    }
}

fn class_usages(file: &FileId, asset: &DecodedAsset, class_name: &str, out: &mut Vec<UsageRecord>) {
    for index in (0..asset.linker.exports().len()).map(PackageIndex::from_export) {
        let Some(instance_of) = asset.linker.class_name(index) else {
            continue;
        };
        if instance_of.eq_ignore_ascii_case(class_name) {
            out.push(record(
                UsageKind::Instantiation,
                instance_of,
                index,
                file,
                None,
                None,
            ));
        }
    }
    for class in &asset.facts.blueprint_classes {
        let extends = class
            .super_class_name
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(class_name))
            || class
                .interfaces
                .iter()
                .any(|i| i.eq_ignore_ascii_case(class_name));
        if extends {
            out.push(record(
                UsageKind::ExtendedType,
                &class.object_name,
                class.index,
                file,
                None,
                None,
            ));
        }
    }
}

/// Graph nodes of `wanted` kinds naming `member` on an owner in the set
fn node_usages(
    file: &FileId,
    asset: &DecodedAsset,
    target: &PreparedTarget<'_>,
    member: &str,
    wanted: impl Fn(K2NodeKind) -> bool,
    out: &mut Vec<UsageRecord>,
) {
    for node in &asset.facts.k2_nodes {
        if !wanted(node.kind) || !node.member_name.eq_ignore_ascii_case(member) {
            continue;
        }
        let Some(graph_owner) = asset.graph_owner(node.index) else {
            trace!(%file, index = %node.index, "graph node outside any class");
            continue;
        };
        let owner = match &node.member_parent {
            Some(parent) if !node.self_context => parent.as_str(),
            _ => graph_owner.as_str(),
        };
        if target.owns(owner) {
            out.push(record(
                UsageKind::for_node(node.kind),
                &graph_owner,
                node.index,
                file,
                Some(node.member_name.as_str()),
                node.member_guid,
            ));
        }
    }
}

fn field_usages(
    file: &FileId,
    asset: &DecodedAsset,
    target: &PreparedTarget<'_>,
    field: &str,
    out: &mut Vec<UsageRecord>,
) {
    node_usages(
        file,
        asset,
        target,
        field,
        |kind| !matches!(kind, K2NodeKind::FunctionCall | K2NodeKind::Event),
        out,
    );

    for object in &asset.facts.other_objects {
        if !target.owns(&object.class_name) {
            continue;
        }
        match asset.linker.export_properties(object.index) {
            Ok(properties) if properties.contains(field) => out.push(record(
                UsageKind::Write,
                &object.class_name,
                object.index,
                file,
                Some(field),
                None,
            )),
            Ok(_) => {}
            Err(error) => debug!(%file, index = %object.index, %error, "properties unreadable"),
        }
    }
}

fn function_usages(
    file: &FileId,
    asset: &DecodedAsset,
    target: &PreparedTarget<'_>,
    function: &str,
    out: &mut Vec<UsageRecord>,
) {
    node_usages(
        file,
        asset,
        target,
        function,
        |kind| matches!(kind, K2NodeKind::FunctionCall | K2NodeKind::Event),
        out,
    );

    // a function export in a deriving class's dependencies is an override
    for class in &asset.facts.blueprint_classes {
        if !target.owns(&class.object_name) {
            continue;
        }
        let Some(export) = asset.linker.export(class.index) else {
            continue;
        };
        for &dependency in &export.dependencies {
            let Some(function_export) = asset.linker.export(dependency) else {
                continue;
            };
            let is_function = asset
                .linker
                .class_name(dependency)
                .is_some_and(|c| c == FUNCTION_CLASS);
            if is_function && function_export.object_name.eq_ignore_ascii_case(function) {
                out.push(record(
                    UsageKind::Override,
                    &class.object_name,
                    dependency,
                    file,
                    Some(function_export.object_name.as_str()),
                    None,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{IndexBuilder, MemorySource};
    use crate::config::IndexConfig;
    use crate::redirects::CoreRedirects;
    use crate::resolve::{tests::Hierarchy, Resolver, SourceSymbol};
    use bpscan_asset::testing::{ExportSpec, PackageBuilder, PropertyWriter};

    /// `Hero_C : APawn` with a graph reading and writing `Health`, calling
    /// `Jump`, and overriding `TakeDamage`
    fn hero_package() -> Vec<u8> {
        let mut b = PackageBuilder::new();
        let engine = b.import_package("/Script/Engine");
        let pawn = b.import_class(engine, "APawn");
        let bp_class = b.import_class(engine, "BlueprintGeneratedClass");
        let graph_class = b.import_class(engine, "EdGraph");
        let get_class = b.import_class(engine, "K2Node_VariableGet");
        let set_class = b.import_class(engine, "K2Node_VariableSet");
        let call_class = b.import_class(engine, "K2Node_CallFunction");
        let function_class = b.import_class(engine, "Function");

        // the generated class lists its function exports as dependencies
        let take_damage_slot = PackageIndex::from_export(1);
        let payload = b.class_payload(&[], &[]);
        let class = b.export(
            ExportSpec::new("Hero_C")
                .class(bp_class)
                .super_class(pawn)
                .payload(payload)
                .dependencies(vec![take_damage_slot]),
        );
        let take_damage = b.export(
            ExportSpec::new("TakeDamage")
                .class(function_class)
                .outer(class),
        );
        assert_eq!(take_damage, take_damage_slot);
        let graph = b.export(ExportSpec::new("EventGraph").class(graph_class).outer(class));

        for (name, node_class, key, member) in [
            ("K2Node_VariableGet_0", get_class, "VariableReference", "Health"),
            ("K2Node_VariableSet_0", set_class, "VariableReference", "Health"),
            ("K2Node_CallFunction_0", call_class, "FunctionReference", "Jump"),
        ] {
            let payload = {
                let mut w = PropertyWriter::new(&mut b);
                w.member_reference(key, member, None, true);
                w.finish()
            };
            b.export(
                ExportSpec::new(name)
                    .class(node_class)
                    .outer(graph)
                    .payload(payload),
            );
        }

        // a detached node whose outer chain never reaches an export
        let orphan_payload = {
            let mut w = PropertyWriter::new(&mut b);
            w.member_reference("VariableReference", "Health", None, true);
            w.finish()
        };
        b.export(
            ExportSpec::new("K2Node_VariableGet_1")
                .class(get_class)
                .payload(orphan_payload),
        );
        b.build()
    }

    /// An instance of `Hero_C` whose defaults set `Health`
    fn spawner_package() -> Vec<u8> {
        let mut b = PackageBuilder::new();
        let game = b.import_package("/Game/Hero");
        let hero = b.import_class(game, "Hero_C");
        let payload = {
            let mut w = PropertyWriter::new(&mut b);
            w.int("Health", 250);
            w.finish()
        };
        b.export(ExportSpec::new("Hero_C_0").class(hero).payload(payload));
        b.build()
    }

    /// `Medic_C : APawn` whose event graph holds one node per class in
    /// `node_classes`, each with a reference written by `reference`
    fn medic_package(
        mut b: PackageBuilder,
        node_classes: &[&str],
        reference: impl Fn(&mut PropertyWriter<'_>, &str),
    ) -> Vec<u8> {
        let engine = b.import_package("/Script/Engine");
        let pawn = b.import_class(engine, "APawn");
        let bp_class = b.import_class(engine, "BlueprintGeneratedClass");
        let graph_class = b.import_class(engine, "EdGraph");

        let payload = b.class_payload(&[], &[]);
        let class = b.export(
            ExportSpec::new("Medic_C")
                .class(bp_class)
                .super_class(pawn)
                .payload(payload),
        );
        let graph = b.export(ExportSpec::new("EventGraph").class(graph_class).outer(class));

        for (i, &node_class) in node_classes.iter().enumerate() {
            let Some(kind) = K2NodeKind::from_class_name(node_class) else {
                panic!("{} is not a graph node class", node_class);
            };
            let class_index = b.import_class(engine, node_class);
            let payload = {
                let mut w = PropertyWriter::new(&mut b);
                reference(&mut w, kind.reference_key());
                w.finish()
            };
            b.export(
                ExportSpec::new(&format!("{}_{}", node_class, i))
                    .class(class_index)
                    .outer(graph)
                    .payload(payload),
            );
        }
        b.build()
    }

    /// Delegate nodes for `OnDied` and an event overriding `TakeDamage`
    fn delegate_package(b: PackageBuilder) -> Vec<u8> {
        medic_package(
            b,
            &[
                "K2Node_AddDelegate",
                "K2Node_ClearDelegate",
                "K2Node_CallDelegate",
                "K2Node_Event",
            ],
            |w, key| {
                let member = if key == "EventReference" { "TakeDamage" } else { "OnDied" };
                w.member_reference(key, member, None, true);
            },
        )
    }

    struct Fixture {
        source: MemorySource,
        index: GlobalIndex,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_files(vec![
                ("Hero.uasset", hero_package()),
                ("Spawner.umap", spawner_package()),
            ])
        }

        fn with_files(files: Vec<(&str, Vec<u8>)>) -> Self {
            let mut source = MemorySource::new();
            for (name, bytes) in files {
                source.insert(FileId::new(name), bytes);
            }
            let index = GlobalIndex::new(IndexConfig::default());
            IndexBuilder::new(&index, &source)
                .build_files(&source.files(), &CancellationToken::new())
                .unwrap();
            Self { source, index }
        }

        fn search(&self, targets: &[SearchTarget]) -> SearchOutcome {
            let cache = DecodeCache::new();
            UsageSearcher::new(&self.index, &self.source, &cache)
                .find_usages(targets, &self.source.files(), &CancellationToken::new())
                .unwrap()
        }
    }

    fn field(class_name: &str, field_name: &str) -> SearchTarget {
        SearchTarget::Field {
            class_name: class_name.into(),
            field_name: field_name.into(),
            module_name: None,
            config_name: None,
            is_redirect: false,
        }
    }

    fn function(class_name: &str, function_name: &str) -> SearchTarget {
        SearchTarget::Function {
            class_name: class_name.into(),
            function_name: function_name.into(),
            module_name: None,
            is_redirect: false,
        }
    }

    fn kinds(outcome: &SearchOutcome) -> Vec<(UsageKind, &str)> {
        let mut kinds: Vec<_> = outcome
            .records
            .iter()
            .map(|r| (r.kind, r.asset_file.as_str()))
            .collect();
        kinds.sort();
        kinds
    }

    #[test]
    fn test_field_usages_on_ancestor() {
        let fixture = Fixture::new();
        let outcome = fixture.search(&[field("APawn", "Health")]);
        assert!(outcome.index_complete);
        assert_eq!(
            kinds(&outcome),
            vec![
                (UsageKind::Read, "Hero.uasset"),
                (UsageKind::Write, "Hero.uasset"),
                (UsageKind::Write, "Spawner.umap"),
            ]
        );
        assert!(outcome
            .records
            .iter()
            .all(|r| r.owner_class_name == "Hero_C"));
    }

    #[test]
    fn test_field_on_unrelated_class() {
        let fixture = Fixture::new();
        assert!(fixture.search(&[field("AActor", "Health")]).records.is_empty());
    }

    #[test]
    fn test_word_prefilter_is_sound() {
        let fixture = Fixture::new();
        let hero = FileId::new("Hero.uasset");
        assert!(fixture.index.can_contain_word(&hero, "Health"));
        assert!(!fixture.index.can_contain_word(&hero, "Stamina"));
        assert!(fixture.search(&[field("APawn", "Stamina")]).records.is_empty());

        // a file the index already ruled out is never decoded
        let cache = DecodeCache::new();
        UsageSearcher::new(&fixture.index, &fixture.source, &cache)
            .find_usages(&[field("APawn", "Stamina")], &[hero], &CancellationToken::new())
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_function_invocation_and_override() {
        let fixture = Fixture::new();
        let outcome = fixture.search(&[function("APawn", "Jump"), function("APawn", "TakeDamage")]);
        let found: Vec<_> = outcome
            .records
            .iter()
            .map(|r| (r.kind, r.member_name.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(
            found,
            vec![
                (UsageKind::Invocation, "Jump"),
                (UsageKind::Override, "TakeDamage"),
            ]
        );
    }

    #[test]
    fn test_class_usages() {
        let fixture = Fixture::new();
        let class = |name: &str| SearchTarget::Class {
            class_name: name.into(),
            module_name: None,
            is_redirect: false,
        };
        let outcome = fixture.search(&[class("APawn"), class("Hero_C")]);
        assert_eq!(
            kinds(&outcome),
            vec![
                (UsageKind::Instantiation, "Spawner.umap"),
                (UsageKind::ExtendedType, "Hero.uasset"),
            ]
        );
    }

    #[test]
    fn test_instantiation_of_any_export_class() {
        let fixture = Fixture::new();
        let class = |name: &str| SearchTarget::Class {
            class_name: name.into(),
            module_name: None,
            is_redirect: false,
        };

        let outcome = fixture.search(&[class("BlueprintGeneratedClass")]);
        assert_eq!(kinds(&outcome), vec![(UsageKind::Instantiation, "Hero.uasset")]);
        assert_eq!(outcome.records[0].node_index, PackageIndex::from_export(0));
        assert_eq!(outcome.records[0].owner_class_name, "BlueprintGeneratedClass");

        let outcome = fixture.search(&[class("K2Node_VariableGet")]);
        assert_eq!(
            kinds(&outcome),
            vec![
                (UsageKind::Instantiation, "Hero.uasset"),
                (UsageKind::Instantiation, "Hero.uasset"),
            ]
        );
    }

    #[test]
    fn test_numbered_member_name_is_found() {
        let medic = medic_package(PackageBuilder::new(), &["K2Node_VariableGet"], |w, key| {
            w.structure(key, "MemberReference", |w| {
                w.numbered_name("MemberName", "Health", 2);
                w.bool("bSelfContext", true);
            });
        });
        let fixture = Fixture::with_files(vec![("Medic.uasset", medic)]);
        let file = FileId::new("Medic.uasset");
        assert!(fixture.index.can_contain_word(&file, "Health_1"));

        let outcome = fixture.search(&[field("APawn", "Health_1")]);
        assert_eq!(kinds(&outcome), vec![(UsageKind::Read, "Medic.uasset")]);
        assert_eq!(outcome.records[0].member_name.as_deref(), Some("Health_1"));
        assert_eq!(outcome.records[0].owner_class_name, "Medic_C");
        assert!(fixture.search(&[field("APawn", "Health")]).records.is_empty());
    }

    #[test]
    fn test_delegate_node_usages() {
        let fixture =
            Fixture::with_files(vec![("Medic.uasset", delegate_package(PackageBuilder::new()))]);
        let outcome = fixture.search(&[field("APawn", "OnDied")]);
        assert_eq!(
            kinds(&outcome),
            vec![
                (UsageKind::DelegateBind, "Medic.uasset"),
                (UsageKind::DelegateUnbind, "Medic.uasset"),
                (UsageKind::DelegateCall, "Medic.uasset"),
            ]
        );
        assert!(outcome
            .records
            .iter()
            .all(|r| r.owner_class_name == "Medic_C"
                && r.member_name.as_deref() == Some("OnDied")));
    }

    #[test]
    fn test_event_override_depends_on_version() {
        let fixture =
            Fixture::with_files(vec![("Medic.uasset", delegate_package(PackageBuilder::new()))]);
        let outcome = fixture.search(&[function("APawn", "TakeDamage")]);
        assert_eq!(kinds(&outcome), vec![(UsageKind::Override, "Medic.uasset")]);
        assert_eq!(outcome.records[0].owner_class_name, "Medic_C");

        // packages older than UE5 carry no event override nodes
        let legacy = delegate_package(PackageBuilder::new().with_ue5_opt(None));
        let fixture = Fixture::with_files(vec![("Medic.uasset", legacy)]);
        assert!(fixture.search(&[function("APawn", "TakeDamage")]).records.is_empty());
        assert_eq!(fixture.search(&[field("APawn", "OnDied")]).records.len(), 3);
    }

    #[test]
    fn test_resolved_targets_with_redirect() {
        let fixture = Fixture::new();
        let redirects = CoreRedirects::parse(
            r#"+PropertyRedirects=(OldName="Pawn.Health",NewName="Pawn.Vitality")"#,
        );
        let symbols = Hierarchy::default();
        let resolver = Resolver::new(&redirects, &symbols);

        let mut targets: Vec<_> = resolver
            .resolve(&SourceSymbol::field("APawn", "Vitality"), false)
            .into_iter()
            .collect();
        targets.sort();
        let outcome = fixture.search(&targets);
        assert_eq!(outcome.records.len(), 3);
    }

    #[test]
    fn test_go_to_inheritors() {
        let fixture = Fixture::new();
        let cache = DecodeCache::new();
        let searcher = UsageSearcher::new(&fixture.index, &fixture.source, &cache);
        let found = searcher.find_go_to_inheritors(&[field("APawn", "Health"), function("APawn", "Jump")]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hero_C");
        assert_eq!(found[0].containing_file, FileId::new("Hero.uasset"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cancelled_search() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cache = DecodeCache::new();
        let result = UsageSearcher::new(&fixture.index, &fixture.source, &cache).find_usages(
            &[field("APawn", "Health")],
            &fixture.source.files(),
            &cancel,
        );
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_decode_cache_reuses_entries() {
        let fixture = Fixture::new();
        let cache = DecodeCache::new();
        let file = FileId::new("Hero.uasset");
        let first = cache.get_or_decode(&file, &fixture.source).unwrap();
        let second = cache.get_or_decode(&file, &fixture.source).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
