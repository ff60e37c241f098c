//! Core redirect tables read from engine ini files
//!
//! Recognizes the `[CoreRedirects]` entry forms
//!
//! ```ini
//! +ClassRedirects=(OldName="/Script/Game.OldHero",NewName="/Script/Game.Hero")
//! +PropertyRedirects=(OldName="Hero.HP",NewName="Hero.Health")
//! ```
//!
//! Class and struct redirects rename types; property and function redirects
//! rename members, optionally scoped to an owning type.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::resolve::RedirectProvider;

static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+]?(Class|Struct|Enum|Property|Function)Redirects\s*=\s*\((.*)\)\s*$")
        .expect("valid redirect entry pattern")
});

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#).expect("valid redirect field pattern")
});

/// A type path split into module and object name
#[derive(Debug, Clone, PartialEq, Eq)]
struct TypePath {
    module: Option<String>,
    name: String,
}

/// `/Script/Module.Name` or a bare `Name`
fn parse_type_path(path: &str) -> TypePath {
    match path.rsplit_once('.') {
        Some((package, name)) => TypePath {
            module: package.rsplit('/').next().map(str::to_string),
            name: name.to_string(),
        },
        None => TypePath {
            module: None,
            name: path.to_string(),
        },
    }
}

/// `Owner.Member`, `/Script/Module.Owner.Member` or a bare `Member`
fn parse_member_path(path: &str) -> (Option<TypePath>, String) {
    match path.rsplit_once('.') {
        Some((owner, member)) => (Some(parse_type_path(owner)), member.to_string()),
        None => (None, path.to_string()),
    }
}

#[derive(Debug, Clone)]
struct TypeRedirect {
    old: TypePath,
    new_module: Option<String>,
}

#[derive(Debug, Clone)]
struct MemberRedirect {
    old_member: String,
    owner: Option<String>,
    module: Option<String>,
}

/// Old names keyed by the names they now map to
#[derive(Debug, Clone, Default)]
pub struct CoreRedirects {
    types: HashMap<String, Vec<TypeRedirect>>,
    members: HashMap<String, Vec<MemberRedirect>>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl CoreRedirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every redirect entry in ini text; other lines are ignored
    pub fn parse(ini: &str) -> Self {
        let mut redirects = Self::new();
        redirects.extend_from_ini(ini);
        redirects
    }

    pub fn extend_from_ini(&mut self, ini: &str) {
        for line in ini.lines() {
            let Some(entry) = ENTRY.captures(line) else {
                continue;
            };
            let fields: HashMap<&str, &str> = FIELD
                .captures_iter(&entry[2])
                .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
                .collect();
            let (Some(old), Some(new)) = (fields.get("OldName"), fields.get("NewName")) else {
                debug!(line, "redirect without OldName/NewName");
                continue;
            };
            match &entry[1] {
                "Class" | "Struct" | "Enum" => self.add_type(old, new),
                _ => self.add_member(old, new),
            }
        }
    }

    pub fn add_type(&mut self, old: &str, new: &str) {
        let old = parse_type_path(old);
        let new = parse_type_path(new);
        self.types.entry(key(&new.name)).or_default().push(TypeRedirect {
            old,
            new_module: new.module,
        });
    }

    pub fn add_member(&mut self, old: &str, new: &str) {
        let (old_owner, old_member) = parse_member_path(old);
        let (new_owner, new_member) = parse_member_path(new);
        let owner = new_owner.or(old_owner);
        let module = owner.as_ref().and_then(|o| o.module.clone());
        self.members
            .entry(key(&new_member))
            .or_default()
            .push(MemberRedirect {
                old_member,
                owner: owner.map(|o| key(&o.name)),
                module,
            });
    }

    pub fn len(&self) -> usize {
        self.types.values().map(Vec::len).sum::<usize>()
            + self.members.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RedirectProvider for CoreRedirects {
    fn old_class_names(&self, class_name: &str, module_name: Option<&str>) -> Vec<String> {
        self.types
            .get(&key(class_name))
            .into_iter()
            .flatten()
            .filter(|r| match (module_name, r.new_module.as_deref()) {
                (Some(wanted), Some(module)) => wanted.eq_ignore_ascii_case(module),
                _ => true,
            })
            .map(|r| r.old.name.clone())
            .collect()
    }

    fn old_member_names(
        &self,
        class_name: &str,
        member_name: &str,
        module_name: Option<&str>,
    ) -> Vec<String> {
        let owner = key(class_name);
        self.members
            .get(&key(member_name))
            .into_iter()
            .flatten()
            .filter(|r| r.owner.as_ref().is_none_or(|o| *o == owner))
            .filter(|r| match (module_name, r.module.as_deref()) {
                (Some(wanted), Some(module)) => wanted.eq_ignore_ascii_case(module),
                _ => true,
            })
            .map(|r| r.old_member.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INI: &str = r#"
[CoreRedirects]
+ClassRedirects=(OldName="/Script/Game.OldHero",NewName="/Script/Game.Hero")
+ClassRedirects=(OldName="LegacyHero", NewName="Hero")
+StructRedirects=(OldName="/Script/Game.OldStats",NewName="/Script/Game.Stats")
+PropertyRedirects=(OldName="Hero.HP",NewName="Hero.Health")
+FunctionRedirects=(OldName="Fire",NewName="Shoot")
+PropertyRedirects=(OldName="/Script/Game.Hero.Armor",NewName="/Script/Game.Hero.Shield")
; a comment
+ClassRedirects=(NewName="Orphan")
"#;

    #[test]
    fn test_parse_types() {
        let redirects = CoreRedirects::parse(INI);
        let mut old = redirects.old_class_names("hero", None);
        old.sort();
        assert_eq!(old, vec!["LegacyHero".to_string(), "OldHero".to_string()]);
        assert_eq!(redirects.old_class_names("Stats", None), vec!["OldStats".to_string()]);
        assert_eq!(redirects.len(), 6);
    }

    #[test]
    fn test_module_filter() {
        let redirects = CoreRedirects::parse(INI);
        let old = redirects.old_class_names("Hero", Some("Engine"));
        // only the unscoped redirect applies outside its module
        assert_eq!(old, vec!["LegacyHero".to_string()]);
    }

    #[test]
    fn test_member_scoping() {
        let redirects = CoreRedirects::parse(INI);
        assert_eq!(redirects.old_member_names("Hero", "Health", None), vec!["HP".to_string()]);
        assert!(redirects.old_member_names("Villain", "Health", None).is_empty());
        assert_eq!(redirects.old_member_names("Anything", "Shoot", None), vec!["Fire".to_string()]);
    }

    #[test]
    fn test_member_module_filter() {
        let redirects = CoreRedirects::parse(INI);
        assert_eq!(
            redirects.old_member_names("Hero", "Shield", Some("Game")),
            vec!["Armor".to_string()]
        );
        assert!(redirects.old_member_names("Hero", "Shield", Some("Engine")).is_empty());
        // unscoped member redirects apply in every module
        assert_eq!(
            redirects.old_member_names("Hero", "Health", Some("Engine")),
            vec!["HP".to_string()]
        );
        assert_eq!(redirects.old_member_names("Hero", "Shield", None), vec!["Armor".to_string()]);
    }
}
