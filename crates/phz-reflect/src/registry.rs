//! The global registry.
//!
//! Arenas plus lowercased-FQN indexes for classes, functions and constants,
//! the loaded-file set, and the per-file AST store. The language is
//! case-insensitive for class/function/constant/namespace identifiers and
//! case-sensitive for variables and properties; the indexes encode that.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

use phz_parser::Name;
use phz_types::ClassGraph;

use crate::{
    ClassId, ClassInfo, ConstDef, FileId, FuncEntry, FuncId, SourceFile, UseAliases,
};

#[derive(Default)]
pub struct Registry {
    classes: Vec<ClassInfo>,
    class_index: FxHashMap<String, ClassId>,
    functions: Vec<FuncEntry>,
    function_index: FxHashMap<String, FuncId>,
    constants: FxHashMap<String, ConstDef>,
    files: Vec<SourceFile>,
    loaded: FxHashSet<PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh registry with the host environment installed.
    pub fn with_host() -> Self {
        let mut registry = Registry::new();
        crate::host::install(&mut registry);
        registry
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    /// Register a class. `Err` returns the already-registered id; the first
    /// definition wins.
    pub fn add_class(&mut self, info: ClassInfo) -> Result<ClassId, ClassId> {
        let key = info.name.to_ascii_lowercase();
        if let Some(&existing) = self.class_index.get(&key) {
            return Err(existing);
        }
        let id = ClassId(self.classes.len() as u32);
        self.class_index.insert(key, id);
        self.classes.push(info);
        Ok(id)
    }

    pub fn get_class(&self, name: &str) -> Option<ClassId> {
        self.class_index
            .get(&name.to_ascii_lowercase().trim_start_matches('\\').to_string())
            .copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0 as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.0 as usize]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn class_exists(&self, name: &str) -> bool {
        self.get_class(name).is_some()
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    pub fn add_function(&mut self, entry: FuncEntry) -> Result<FuncId, FuncId> {
        let key = entry.name.to_ascii_lowercase();
        if let Some(&existing) = self.function_index.get(&key) {
            return Err(existing);
        }
        let id = FuncId(self.functions.len() as u32);
        self.function_index.insert(key, id);
        self.functions.push(entry);
        Ok(id)
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.function_index
            .get(&name.to_ascii_lowercase().trim_start_matches('\\').to_string())
            .copied()
    }

    pub fn function(&self, id: FuncId) -> &FuncEntry {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut FuncEntry {
        &mut self.functions[id.0 as usize]
    }

    pub fn function_exists(&self, name: &str) -> bool {
        self.get_function(name).is_some()
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len() as u32).map(FuncId)
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// Register a constant. Returns false when the name is already taken.
    pub fn add_constant(&mut self, def: ConstDef) -> bool {
        let key = def.name.to_ascii_lowercase();
        if self.constants.contains_key(&key) {
            return false;
        }
        self.constants.insert(key, def);
        true
    }

    pub fn get_constant(&self, name: &str) -> Option<&ConstDef> {
        self.constants
            .get(&name.to_ascii_lowercase().trim_start_matches('\\').to_string())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub fn add_file(&mut self, file: SourceFile) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(file);
        id
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0 as usize]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains(path)
    }

    pub fn mark_loaded(&mut self, path: PathBuf) {
        self.loaded.insert(path);
    }

    // ------------------------------------------------------------------
    // Reference-name resolution
    // ------------------------------------------------------------------

    /// Resolve a class reference to its fully qualified name, whether or not
    /// such a class exists. Order: fully qualified as written; first segment
    /// against the alias map; otherwise the current namespace is prepended.
    /// Classes have no global fallback.
    pub fn resolve_class_name(&self, name: &Name, namespace: &str, aliases: &UseAliases) -> String {
        if name.fully_qualified {
            return name.joined();
        }
        if let Some(target) = aliases.classes.get(&name.first().to_ascii_lowercase()) {
            if name.parts.len() == 1 {
                return target.clone();
            }
            let rest = name.parts[1..].join("\\");
            return format!("{target}\\{rest}");
        }
        qualify(namespace, &name.joined())
    }

    /// Resolve a function reference. Unqualified names fall back to the
    /// global namespace when the namespaced lookup misses.
    pub fn resolve_function_ref(
        &self,
        name: &Name,
        namespace: &str,
        aliases: &UseAliases,
    ) -> Option<FuncId> {
        if name.fully_qualified {
            return self.get_function(&name.joined());
        }
        if name.parts.len() == 1 {
            if let Some(target) = aliases.functions.get(&name.first().to_ascii_lowercase()) {
                return self.get_function(target);
            }
        } else if let Some(target) = aliases.classes.get(&name.first().to_ascii_lowercase()) {
            let rest = name.parts[1..].join("\\");
            return self.get_function(&format!("{target}\\{rest}"));
        }
        if let Some(id) = self.get_function(&qualify(namespace, &name.joined())) {
            return Some(id);
        }
        if name.is_simple() {
            return self.get_function(name.first());
        }
        None
    }

    /// Resolve a constant reference, with the same global fallback rule as
    /// functions.
    pub fn resolve_const_ref(
        &self,
        name: &Name,
        namespace: &str,
        aliases: &UseAliases,
    ) -> Option<&ConstDef> {
        if name.fully_qualified {
            return self.get_constant(&name.joined());
        }
        if name.parts.len() == 1 {
            if let Some(target) = aliases.constants.get(&name.first().to_ascii_lowercase()) {
                return self.get_constant(target);
            }
        } else if let Some(target) = aliases.classes.get(&name.first().to_ascii_lowercase()) {
            let rest = name.parts[1..].join("\\");
            return self.get_constant(&format!("{target}\\{rest}"));
        }
        if let Some(def) = self.get_constant(&qualify(namespace, &name.joined())) {
            return Some(def);
        }
        if name.is_simple() {
            return self.get_constant(name.first());
        }
        None
    }

    /// Ancestor chain of a class (parents only, nearest first).
    pub fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut cursor = self.class(id).parent;
        while let Some(parent) = cursor {
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            cursor = self.class(parent).parent;
        }
        out
    }
}

impl ClassGraph for Registry {
    fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool {
        let Some(id) = self.get_class(name) else {
            return false;
        };
        let ancestor_lower = ancestor.trim_start_matches('\\').to_ascii_lowercase();
        if self.class(id).interface_closure.contains(&ancestor_lower) {
            return true;
        }
        self.ancestors(id)
            .iter()
            .any(|&a| self.class(a).name.eq_ignore_ascii_case(&ancestor_lower))
    }

    fn has_stringable(&self, name: &str) -> bool {
        self.get_class(name)
            .map(|id| self.class(id).interface_closure.contains("stringable"))
            .unwrap_or(false)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}\\{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host;

    #[test]
    fn duplicate_class_returns_existing_id() {
        let mut registry = Registry::new();
        let info = host::marker_interface("Foo");
        let id = registry.add_class(info.clone()).unwrap();
        assert_eq!(registry.add_class(info), Err(id));
        assert_eq!(registry.get_class("foo"), Some(id));
        assert_eq!(registry.get_class("\\FOO"), Some(id));
    }

    #[test]
    fn class_lookup_has_no_global_fallback() {
        let mut registry = Registry::new();
        registry.add_class(host::marker_interface("Foo")).unwrap();
        let name = Name::simple("Foo", 1);
        let aliases = UseAliases::default();
        let resolved = registry.resolve_class_name(&name, "App", &aliases);
        assert_eq!(resolved, "App\\Foo");
        assert!(registry.get_class(&resolved).is_none());
    }

    #[test]
    fn function_lookup_falls_back_to_global() {
        let registry = Registry::with_host();
        let name = Name::simple("strlen", 1);
        let aliases = UseAliases::default();
        assert!(registry
            .resolve_function_ref(&name, "App", &aliases)
            .is_some());
    }

    #[test]
    fn alias_resolution_is_case_insensitive_on_alias() {
        let mut registry = Registry::new();
        registry
            .add_class(host::marker_interface("Vendor\\Lib\\Thing"))
            .unwrap();
        let mut aliases = UseAliases::default();
        aliases
            .classes
            .insert("thing".to_string(), "Vendor\\Lib\\Thing".to_string());
        let name = Name::simple("THING", 1);
        let resolved = registry.resolve_class_name(&name, "App", &aliases);
        assert_eq!(resolved, "Vendor\\Lib\\Thing");
    }

    #[test]
    fn host_hierarchy_is_queryable() {
        let registry = Registry::with_host();
        assert!(registry.is_subclass_of("Exception", "Throwable"));
        assert!(registry.is_subclass_of("Exception", "Stringable"));
        assert!(!registry.is_subclass_of("stdClass", "Throwable"));
        assert!(registry.has_stringable("Exception"));
    }
}
