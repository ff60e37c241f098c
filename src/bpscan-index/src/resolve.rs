//! Expansion of a source symbol into search targets
//!
//! A symbol can appear in blueprint data under its current name, under any
//! historical name a redirect maps to it, and (when asked) under the names of
//! every subclass. Every walk here is breadth-first over a visited set, so
//! cyclic redirect tables or malformed hierarchies terminate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::IndexConfig;

/// Historical names, supplied by the host
pub trait RedirectProvider: Send + Sync {
    /// Old names of types that are now called `class_name`
    fn old_class_names(&self, class_name: &str, module_name: Option<&str>) -> Vec<String>;

    /// Old names of `class_name`'s member that is now called `member_name`
    fn old_member_names(
        &self,
        class_name: &str,
        member_name: &str,
        module_name: Option<&str>,
    ) -> Vec<String>;
}

/// Native type hierarchy, supplied by the host
pub trait SymbolCache: Send + Sync {
    fn direct_subtypes(&self, type_name: &str) -> Vec<String>;

    fn direct_supertype(&self, type_name: &str) -> Option<String>;

    /// Explicit config section declared by the type itself
    fn config_name(&self, type_name: &str) -> Option<String>;
}

/// Maps a source location to the module that owns it
pub trait ModuleResolver: Send + Sync {
    fn module_name(&self, file_location: &std::path::Path) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Field,
    Function,
}

/// Symbol the caller wants usages of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSymbol {
    pub kind: SymbolKind,
    pub class_name: String,
    /// Field or function name; ignored for classes
    pub member_name: Option<String>,
    pub module_name: Option<String>,
    pub file_location: Option<PathBuf>,
    /// Field values come from ini config rather than blueprint data
    pub is_config: bool,
}

impl SourceSymbol {
    pub fn class(class_name: &str) -> Self {
        Self {
            kind: SymbolKind::Class,
            class_name: class_name.to_string(),
            member_name: None,
            module_name: None,
            file_location: None,
            is_config: false,
        }
    }

    pub fn field(class_name: &str, field_name: &str) -> Self {
        Self {
            kind: SymbolKind::Field,
            member_name: Some(field_name.to_string()),
            ..Self::class(class_name)
        }
    }

    pub fn function(class_name: &str, function_name: &str) -> Self {
        Self {
            kind: SymbolKind::Function,
            member_name: Some(function_name.to_string()),
            ..Self::class(class_name)
        }
    }

    pub fn with_module(mut self, module_name: &str) -> Self {
        self.module_name = Some(module_name.to_string());
        self
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.file_location = Some(location.into());
        self
    }

    pub fn config(mut self) -> Self {
        self.is_config = true;
        self
    }
}

/// One name a symbol may be stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchTarget {
    Class {
        class_name: String,
        module_name: Option<String>,
        is_redirect: bool,
    },
    Field {
        class_name: String,
        field_name: String,
        module_name: Option<String>,
        config_name: Option<String>,
        is_redirect: bool,
    },
    Function {
        class_name: String,
        function_name: String,
        module_name: Option<String>,
        is_redirect: bool,
    },
}

impl SearchTarget {
    pub fn class_name(&self) -> &str {
        match self {
            Self::Class { class_name, .. }
            | Self::Field { class_name, .. }
            | Self::Function { class_name, .. } => class_name,
        }
    }

    pub fn member_name(&self) -> Option<&str> {
        match self {
            Self::Class { .. } => None,
            Self::Field { field_name, .. } => Some(field_name),
            Self::Function { function_name, .. } => Some(function_name),
        }
    }

    /// Name whose presence in a file's name table is necessary for a match
    pub fn word(&self) -> &str {
        self.member_name().unwrap_or_else(|| self.class_name())
    }

    pub fn is_redirect(&self) -> bool {
        match self {
            Self::Class { is_redirect, .. }
            | Self::Field { is_redirect, .. }
            | Self::Function { is_redirect, .. } => *is_redirect,
        }
    }
}

/// Native class prefixes dropped from names stored in packages
const NATIVE_PREFIXES: &[char] = &['A', 'U', 'F', 'S', 'I', 'E', 'T'];

/// The name plus its prefix-stripped form (`APawn` -> `Pawn`)
pub fn canonical_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    let mut chars = name.chars();
    if let (Some(first), Some(second)) = (chars.next(), chars.next()) {
        if NATIVE_PREFIXES.contains(&first) && second.is_ascii_uppercase() {
            names.push(name[first.len_utf8()..].to_string());
        }
    }
    names
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Breadth-first closure of `root` under `old_names`
///
/// `forms` expands every discovered name before it is visited. The root's own
/// forms come back with `is_redirect == false`.
fn alias_closure(
    root: &str,
    forms: impl Fn(&str) -> Vec<String>,
    old_names: impl Fn(&str) -> Vec<String>,
) -> Vec<(String, bool)> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    for name in forms(root) {
        if visited.insert(key(&name)) {
            queue.push_back(name.clone());
            result.push((name, false));
        }
    }
    while let Some(name) = queue.pop_front() {
        for old in old_names(&name) {
            for alias in forms(&old) {
                if visited.insert(key(&alias)) {
                    queue.push_back(alias.clone());
                    result.push((alias, true));
                }
            }
        }
    }
    result
}

/// Expands source symbols into [`SearchTarget`] sets
pub struct Resolver<'a> {
    redirects: &'a dyn RedirectProvider,
    symbols: &'a dyn SymbolCache,
    modules: Option<&'a dyn ModuleResolver>,
    config_depth_limit: usize,
    config_names: Mutex<HashMap<String, Option<String>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(redirects: &'a dyn RedirectProvider, symbols: &'a dyn SymbolCache) -> Self {
        Self {
            redirects,
            symbols,
            modules: None,
            config_depth_limit: 100,
            config_names: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_modules(mut self, modules: &'a dyn ModuleResolver) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn with_config_depth_limit(mut self, limit: usize) -> Self {
        self.config_depth_limit = limit;
        self
    }

    pub fn with_index_config(self, config: &IndexConfig) -> Self {
        self.with_config_depth_limit(config.config_name_depth_limit)
    }

    fn module_of(&self, symbol: &SourceSymbol) -> Option<String> {
        symbol.module_name.clone().or_else(|| {
            let location = symbol.file_location.as_deref()?;
            self.modules?.module_name(location)
        })
    }

    /// Every search target `symbol` may appear as
    pub fn resolve(&self, symbol: &SourceSymbol, with_all_inheritors: bool) -> HashSet<SearchTarget> {
        let module = self.module_of(symbol);

        let mut owners = vec![symbol.class_name.clone()];
        if with_all_inheritors {
            owners.extend(self.inheritors(&symbol.class_name));
        }

        // (alias, is_redirect) for every owning type
        let owner_aliases: Vec<(String, bool)> = owners
            .par_iter()
            .flat_map_iter(|owner| self.class_aliases(owner, module.as_deref()))
            .collect();

        let mut targets = HashSet::new();
        match (symbol.kind, symbol.member_name.as_deref()) {
            (SymbolKind::Class, _) | (_, None) => {
                for (class_name, is_redirect) in owner_aliases {
                    targets.insert(SearchTarget::Class {
                        class_name,
                        module_name: module.clone(),
                        is_redirect,
                    });
                }
            }
            (kind, Some(member)) => {
                let mut member_aliases: Vec<(String, bool)> = Vec::new();
                let mut seen = HashSet::new();
                for (owner, _) in &owner_aliases {
                    for alias in self.member_aliases(owner, member, module.as_deref()) {
                        if seen.insert(key(&alias.0)) {
                            member_aliases.push(alias);
                        }
                    }
                }

                for (class_name, owner_redirect) in &owner_aliases {
                    let config_name = (kind == SymbolKind::Field && symbol.is_config)
                        .then(|| self.config_name(class_name))
                        .flatten();
                    for (member_name, member_redirect) in &member_aliases {
                        let is_redirect = *owner_redirect || *member_redirect;
                        targets.insert(match kind {
                            SymbolKind::Function => SearchTarget::Function {
                                class_name: class_name.clone(),
                                function_name: member_name.clone(),
                                module_name: module.clone(),
                                is_redirect,
                            },
                            _ => SearchTarget::Field {
                                class_name: class_name.clone(),
                                field_name: member_name.clone(),
                                module_name: module.clone(),
                                config_name: config_name.clone(),
                                is_redirect,
                            },
                        });
                    }
                }
            }
        }
        targets
    }

    /// Type name, its canonical forms, and every redirect alias reachable
    /// from them
    pub fn class_aliases(&self, class_name: &str, module: Option<&str>) -> Vec<(String, bool)> {
        alias_closure(class_name, canonical_names, |name| {
            self.redirects.old_class_names(name, module)
        })
    }

    /// Member name and every redirect alias reachable from it on `owner`
    pub fn member_aliases(
        &self,
        owner: &str,
        member: &str,
        module: Option<&str>,
    ) -> Vec<(String, bool)> {
        alias_closure(member, |name| vec![name.to_string()], |name| {
            self.redirects.old_member_names(owner, name, module)
        })
    }

    /// Every direct and transitive subtype of `root`, excluding `root`
    ///
    /// Each breadth-first level is expanded in parallel.
    pub fn inheritors(&self, root: &str) -> Vec<String> {
        let mut visited = HashSet::from([key(root)]);
        let mut frontier = vec![root.to_string()];
        let mut result = Vec::new();

        while !frontier.is_empty() {
            let children: Vec<String> = frontier
                .par_iter()
                .flat_map_iter(|t| self.symbols.direct_subtypes(t))
                .collect();
            frontier = children
                .into_iter()
                .filter(|child| visited.insert(key(child)))
                .collect();
            result.extend(frontier.iter().cloned());
        }
        result
    }

    /// Config section for `type_name`: the first one declared walking up
    /// from the type itself, memoized per type
    pub fn config_name(&self, type_name: &str) -> Option<String> {
        if let Some(cached) = self.config_names.lock().get(&key(type_name)) {
            return cached.clone();
        }

        let mut current = type_name.to_string();
        let mut found = None;
        for _ in 0..self.config_depth_limit {
            if let Some(name) = self.symbols.config_name(&current) {
                found = Some(name);
                break;
            }
            match self.symbols.direct_supertype(&current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        self.config_names
            .lock()
            .insert(key(type_name), found.clone());
        found
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::redirects::CoreRedirects;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hierarchy given as (child, parent) pairs
    #[derive(Default)]
    pub(crate) struct Hierarchy {
        pub parents: HashMap<String, String>,
        pub configs: HashMap<String, String>,
        pub config_lookups: AtomicUsize,
    }

    impl Hierarchy {
        pub(crate) fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                parents: pairs
                    .iter()
                    .map(|(c, p)| (c.to_string(), p.to_string()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl SymbolCache for Hierarchy {
        fn direct_subtypes(&self, type_name: &str) -> Vec<String> {
            let mut subtypes: Vec<String> = self
                .parents
                .iter()
                .filter(|(_, p)| p.eq_ignore_ascii_case(type_name))
                .map(|(c, _)| c.clone())
                .collect();
            subtypes.sort();
            subtypes
        }

        fn direct_supertype(&self, type_name: &str) -> Option<String> {
            self.parents.get(type_name).cloned()
        }

        fn config_name(&self, type_name: &str) -> Option<String> {
            self.config_lookups.fetch_add(1, Ordering::Relaxed);
            self.configs.get(type_name).cloned()
        }
    }

    struct FixedModule;

    impl ModuleResolver for FixedModule {
        fn module_name(&self, _file_location: &std::path::Path) -> Option<String> {
            Some("Game".into())
        }
    }

    fn class_names(targets: &HashSet<SearchTarget>) -> Vec<String> {
        let mut names: Vec<_> = targets.iter().map(|t| t.class_name().to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_names("APawn"), vec!["APawn", "Pawn"]);
        assert_eq!(canonical_names("Pawn"), vec!["Pawn"]);
        assert_eq!(canonical_names("Arrow"), vec!["Arrow"]);
    }

    #[test]
    fn test_alias_chain_with_cycle() {
        // A was renamed to B, B to C, and a bogus entry maps C back to A
        let redirects = CoreRedirects::parse(
            r#"
+ClassRedirects=(OldName="B",NewName="A")
+ClassRedirects=(OldName="C",NewName="B")
+ClassRedirects=(OldName="A",NewName="C")
"#,
        );
        let symbols = Hierarchy::default();
        let resolver = Resolver::new(&redirects, &symbols);

        let aliases = resolver.class_aliases("A", None);
        let names: Vec<_> = aliases.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(!aliases[0].1);
        assert!(aliases[1].1 && aliases[2].1);
    }

    #[test]
    fn test_inheritance_closure_and_cycle() {
        let symbols = Hierarchy::new(&[("Mid", "Base"), ("Leaf", "Mid"), ("Base", "Leaf")]);
        let redirects = CoreRedirects::new();
        let resolver = Resolver::new(&redirects, &symbols);

        let mut found = resolver.inheritors("Base");
        found.sort();
        assert_eq!(found, vec!["Leaf".to_string(), "Mid".to_string()]);

        let targets = resolver.resolve(&SourceSymbol::class("Base"), true);
        assert_eq!(class_names(&targets), vec!["Base", "Leaf", "Mid"]);
    }

    #[test]
    fn test_member_cross_product() {
        let redirects = CoreRedirects::parse(
            r#"
+ClassRedirects=(OldName="OldHero",NewName="Hero")
+PropertyRedirects=(OldName="Hero.HP",NewName="Hero.Health")
"#,
        );
        let symbols = Hierarchy::default();
        let resolver = Resolver::new(&redirects, &symbols);

        let targets = resolver.resolve(&SourceSymbol::field("Hero", "Health"), false);
        assert_eq!(targets.len(), 4);
        assert!(targets.contains(&SearchTarget::Field {
            class_name: "OldHero".into(),
            field_name: "HP".into(),
            module_name: None,
            config_name: None,
            is_redirect: true,
        }));
        assert!(targets.contains(&SearchTarget::Field {
            class_name: "Hero".into(),
            field_name: "Health".into(),
            module_name: None,
            config_name: None,
            is_redirect: false,
        }));
    }

    #[test]
    fn test_prefixed_native_class() {
        let redirects = CoreRedirects::new();
        let symbols = Hierarchy::default();
        let resolver = Resolver::new(&redirects, &symbols);
        let targets = resolver.resolve(&SourceSymbol::function("APawn", "Jump"), false);
        assert_eq!(class_names(&targets), vec!["APawn", "Pawn"]);
        assert!(targets.iter().all(|t| t.word() == "Jump"));
    }

    #[test]
    fn test_config_name_walk_is_memoized() {
        let mut symbols = Hierarchy::new(&[("Leaf", "Mid"), ("Mid", "Base")]);
        symbols.configs.insert("Base".into(), "Game".into());
        let redirects = CoreRedirects::new();
        let resolver = Resolver::new(&redirects, &symbols);

        assert_eq!(resolver.config_name("Leaf"), Some("Game".into()));
        let lookups = symbols.config_lookups.load(Ordering::Relaxed);
        assert_eq!(resolver.config_name("Leaf"), Some("Game".into()));
        assert_eq!(symbols.config_lookups.load(Ordering::Relaxed), lookups);
    }

    #[test]
    fn test_config_name_depth_limit() {
        // a self-parented type would loop forever without the bound
        let symbols = Hierarchy::new(&[("Loop", "Loop")]);
        let redirects = CoreRedirects::new();
        let config = IndexConfig {
            config_name_depth_limit: 10,
            ..IndexConfig::default()
        };
        let resolver = Resolver::new(&redirects, &symbols).with_index_config(&config);
        assert_eq!(resolver.config_name("Loop"), None);
        assert_eq!(symbols.config_lookups.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_config_field_and_module_resolution() {
        let mut symbols = Hierarchy::new(&[("Hero", "Pawn")]);
        symbols.configs.insert("Pawn".into(), "Input".into());
        let redirects = CoreRedirects::new();
        let modules = FixedModule;
        let resolver = Resolver::new(&redirects, &symbols).with_modules(&modules);

        let symbol = SourceSymbol::field("Hero", "Sensitivity")
            .with_location("Source/Game/Hero.h")
            .config();
        let targets = resolver.resolve(&symbol, false);
        assert_eq!(targets.len(), 1);
        let Some(SearchTarget::Field {
            config_name,
            module_name,
            ..
        }) = targets.into_iter().next()
        else {
            panic!("expected field target");
        };
        assert_eq!(config_name.as_deref(), Some("Input"));
        assert_eq!(module_name.as_deref(), Some("Game"));
    }
}
